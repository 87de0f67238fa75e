// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Unauthenticated read endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::ApiError,
    models::{Bid, Project, User, UserRates, WalletAddress},
    state::AppState,
};

/// Public service parameters clients need before signing anything.
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceConfig {
    /// Wallet address of the marketplace service itself.
    pub service_address: WalletAddress,
}

/// Wallet addresses in paths are matched case-insensitively.
pub(crate) fn address_param(raw: String) -> WalletAddress {
    WalletAddress::from(raw.to_ascii_lowercase())
}

#[utoipa::path(
    get,
    path = "/api/public/config",
    tag = "Public",
    responses((status = 200, body = ServiceConfig))
)]
pub async fn config(State(state): State<AppState>) -> Json<ServiceConfig> {
    Json(ServiceConfig {
        service_address: state.service_address.clone(),
    })
}

#[utoipa::path(
    get,
    path = "/api/public/user_list",
    tag = "Public",
    responses((status = 200, body = [User]))
)]
pub async fn user_list(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.marketplace.user_list()?))
}

#[utoipa::path(
    get,
    path = "/api/public/user/{id}",
    params(("id" = String, Path, description = "Wallet address of the user")),
    tag = "Public",
    responses((status = 200, body = User), (status = 404))
)]
pub async fn user(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.marketplace.user(&address_param(id))?))
}

#[utoipa::path(
    get,
    path = "/api/public/user/{id}/history",
    params(("id" = String, Path, description = "Wallet address of the project owner")),
    tag = "Public",
    responses((status = 200, body = [Project]), (status = 404))
)]
pub async fn user_history(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Project>>, ApiError> {
    Ok(Json(state.marketplace.user_projects(&address_param(id))?))
}

#[utoipa::path(
    get,
    path = "/api/public/user/{id}/rates",
    params(("id" = String, Path, description = "Wallet address of the user")),
    tag = "Public",
    responses((status = 200, body = UserRates), (status = 404))
)]
pub async fn user_rates(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<UserRates>, ApiError> {
    Ok(Json(state.marketplace.user_rates(&address_param(id))?))
}

#[utoipa::path(
    get,
    path = "/api/public/project_list",
    tag = "Public",
    responses((status = 200, body = [Project]))
)]
pub async fn project_list(State(state): State<AppState>) -> Result<Json<Vec<Project>>, ApiError> {
    Ok(Json(state.marketplace.project_list()?))
}

#[utoipa::path(
    get,
    path = "/api/public/project/{id}",
    params(("id" = u64, Path, description = "Project identifier")),
    tag = "Public",
    responses((status = 200, body = Project), (status = 404))
)]
pub async fn project(
    Path(id): Path<u64>,
    State(state): State<AppState>,
) -> Result<Json<Project>, ApiError> {
    Ok(Json(state.marketplace.project(id)?))
}

#[utoipa::path(
    get,
    path = "/api/public/project/{id}/bids",
    params(("id" = u64, Path, description = "Project identifier")),
    tag = "Public",
    responses((status = 200, body = [Bid]), (status = 404))
)]
pub async fn project_bids(
    Path(id): Path<u64>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Bid>>, ApiError> {
    Ok(Json(state.marketplace.project_bids(id)?))
}

#[utoipa::path(
    get,
    path = "/api/public/bid/{id}",
    params(("id" = u64, Path, description = "Bid identifier")),
    tag = "Public",
    responses((status = 200, body = Bid), (status = 404))
)]
pub async fn bid(
    Path(id): Path<u64>,
    State(state): State<AppState>,
) -> Result<Json<Bid>, ApiError> {
    Ok(Json(state.marketplace.bid(id)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewProject, User};
    use std::time::Duration;

    #[test]
    fn address_param_lowercases() {
        assert_eq!(address_param("0xABcD".into()).as_str(), "0xabcd");
    }

    #[tokio::test]
    async fn reads_projects_and_users() {
        let state = AppState::default();
        let owner = WalletAddress::from("0xowner");
        state
            .marketplace
            .add_user(&owner, User::new(owner.clone(), "owner"))
            .unwrap();
        let id = state
            .marketplace
            .create_project(
                &owner,
                NewProject {
                    title: "Logo".into(),
                    description: String::new(),
                    tags: vec![],
                    owner: None,
                    deadline: Duration::from_secs(60),
                    price: 10,
                },
            )
            .unwrap();

        let Json(project) = project(Path(id), State(state.clone())).await.unwrap();
        assert_eq!(project.owner, owner);

        let Json(history) = user_history(Path("0xOWNER".into()), State(state.clone()))
            .await
            .unwrap();
        assert_eq!(history, vec![project]);

        let Json(bids) = project_bids(Path(id), State(state.clone())).await.unwrap();
        assert!(bids.is_empty());
    }

    #[tokio::test]
    async fn missing_entities_are_not_found() {
        let state = AppState::default();

        let err = project(Path(7), State(state.clone())).await.unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::NOT_FOUND);

        let err = user(Path("0xnobody".into()), State(state)).await.unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::NOT_FOUND);
    }
}
