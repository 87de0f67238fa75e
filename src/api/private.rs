// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signed marketplace endpoints.
//!
//! Every route here sits behind `require_signed_request`; the acting wallet
//! always comes from the [`Caller`] extractor.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    auth::Caller,
    error::ApiError,
    models::{BidTerms, NewBid, NewProject, Project, ProjectUpdate, RateRequest},
    state::AppState,
};

/// Identifier of a newly created entity.
#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Created {
    pub id: u64,
}

#[utoipa::path(
    post,
    path = "/api/private/create_project",
    request_body = NewProject,
    tag = "Projects",
    responses((status = 201, body = Created), (status = 400), (status = 401), (status = 403))
)]
pub async fn create_project(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(request): Json<NewProject>,
) -> Result<(StatusCode, Json<Created>), ApiError> {
    let id = state.marketplace.create_project(&caller, request)?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

#[utoipa::path(
    post,
    path = "/api/private/project/{id}/update",
    params(("id" = u64, Path, description = "Project identifier")),
    request_body = ProjectUpdate,
    tag = "Projects",
    responses((status = 204), (status = 403), (status = 404), (status = 409))
)]
pub async fn update_project(
    Path(id): Path<u64>,
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(update): Json<ProjectUpdate>,
) -> Result<StatusCode, ApiError> {
    state.marketplace.update_project(&caller, id, update)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/private/project/{id}/delete",
    params(("id" = u64, Path, description = "Project identifier")),
    tag = "Projects",
    responses((status = 204), (status = 403), (status = 404), (status = 409))
)]
pub async fn delete_project(
    Path(id): Path<u64>,
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<StatusCode, ApiError> {
    state.marketplace.delete_project(&caller, id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/private/project/{id}/bid",
    params(("id" = u64, Path, description = "Project to bid on")),
    request_body = NewBid,
    tag = "Bids",
    responses((status = 201, body = Created), (status = 403), (status = 404), (status = 409))
)]
pub async fn create_bid(
    Path(id): Path<u64>,
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(request): Json<NewBid>,
) -> Result<(StatusCode, Json<Created>), ApiError> {
    let id = state.marketplace.create_bid(&caller, id, request)?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

#[utoipa::path(
    post,
    path = "/api/private/project/{id}/ready",
    params(("id" = u64, Path, description = "Project identifier")),
    tag = "Projects",
    responses((status = 200, body = Project), (status = 403), (status = 404), (status = 409))
)]
pub async fn set_project_ready(
    Path(id): Path<u64>,
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<Project>, ApiError> {
    state.marketplace.set_project_ready(&caller, id)?;
    Ok(Json(state.marketplace.project(id)?))
}

#[utoipa::path(
    post,
    path = "/api/private/project/{id}/accept",
    params(("id" = u64, Path, description = "Project identifier")),
    tag = "Projects",
    responses((status = 200, body = Project), (status = 403), (status = 404), (status = 409))
)]
pub async fn accept_project(
    Path(id): Path<u64>,
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<Project>, ApiError> {
    state.marketplace.accept_project(&caller, id)?;
    Ok(Json(state.marketplace.project(id)?))
}

#[utoipa::path(
    post,
    path = "/api/private/project/{id}/cancel",
    params(("id" = u64, Path, description = "Project identifier")),
    tag = "Projects",
    responses((status = 200, body = Project), (status = 403), (status = 404), (status = 409))
)]
pub async fn cancel_project(
    Path(id): Path<u64>,
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<Project>, ApiError> {
    state.marketplace.cancel_project(&caller, id)?;
    Ok(Json(state.marketplace.project(id)?))
}

#[utoipa::path(
    post,
    path = "/api/private/project/{id}/rate",
    params(("id" = u64, Path, description = "Finished project")),
    request_body = RateRequest,
    tag = "Rates",
    responses((status = 201, body = Created), (status = 400), (status = 403), (status = 409))
)]
pub async fn rate_project(
    Path(id): Path<u64>,
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(request): Json<RateRequest>,
) -> Result<(StatusCode, Json<Created>), ApiError> {
    let id = state.marketplace.rate_project(&caller, id, request)?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

#[utoipa::path(
    post,
    path = "/api/private/bid/{id}/accept",
    params(("id" = u64, Path, description = "Bid identifier")),
    tag = "Bids",
    responses((status = 200, body = Project), (status = 403), (status = 404), (status = 409))
)]
pub async fn accept_bid(
    Path(id): Path<u64>,
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<Project>, ApiError> {
    let project_id = state.marketplace.accept_bid(&caller, id)?;
    Ok(Json(state.marketplace.project(project_id)?))
}

#[utoipa::path(
    post,
    path = "/api/private/bid/{id}/update",
    params(("id" = u64, Path, description = "Bid identifier")),
    request_body = BidTerms,
    tag = "Bids",
    responses((status = 204), (status = 403), (status = 404))
)]
pub async fn update_bid(
    Path(id): Path<u64>,
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(terms): Json<BidTerms>,
) -> Result<StatusCode, ApiError> {
    state.marketplace.update_bid(&caller, id, terms)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/private/bid/{id}/delete",
    params(("id" = u64, Path, description = "Bid identifier")),
    tag = "Bids",
    responses((status = 204), (status = 403), (status = 404))
)]
pub async fn delete_bid(
    Path(id): Path<u64>,
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<StatusCode, ApiError> {
    state.marketplace.delete_bid(&caller, id)?;
    Ok(StatusCode::NO_CONTENT)
}

// Mentorship is reserved in the route table; no workflow exists yet.

#[utoipa::path(
    post,
    path = "/api/private/user/{id}/request_mentorship",
    params(("id" = String, Path, description = "Wallet address of the mentor")),
    tag = "Mentorship",
    responses((status = 501))
)]
pub async fn request_mentorship(Path(_id): Path<String>, Caller(_caller): Caller) -> StatusCode {
    StatusCode::NOT_IMPLEMENTED
}

#[utoipa::path(
    post,
    path = "/api/private/user/{id}/accept_mentorship",
    params(("id" = String, Path, description = "Wallet address of the mentee")),
    tag = "Mentorship",
    responses((status = 501))
)]
pub async fn accept_mentorship(Path(_id): Path<String>, Caller(_caller): Caller) -> StatusCode {
    StatusCode::NOT_IMPLEMENTED
}

#[utoipa::path(
    post,
    path = "/api/private/user/{id}/cancel_mentorship",
    params(("id" = String, Path, description = "Wallet address of the other party")),
    tag = "Mentorship",
    responses((status = 501))
)]
pub async fn cancel_mentorship(Path(_id): Path<String>, Caller(_caller): Caller) -> StatusCode {
    StatusCode::NOT_IMPLEMENTED
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::models::{ProjectStatus, User, WalletAddress};

    fn seeded() -> (AppState, WalletAddress, WalletAddress) {
        let state = AppState::default();
        let owner = WalletAddress::from("0xowner");
        let worker = WalletAddress::from("0xworker");
        for (address, name) in [(&owner, "owner"), (&worker, "worker")] {
            state
                .marketplace
                .add_user(address, User::new(address.clone(), name))
                .unwrap();
        }
        (state, owner, worker)
    }

    fn new_project() -> NewProject {
        NewProject {
            title: "Landing page".into(),
            description: "One page".into(),
            tags: vec!["web".into()],
            owner: None,
            deadline: Duration::from_secs(3600),
            price: 500,
        }
    }

    #[tokio::test]
    async fn bid_acceptance_starts_project() {
        let (state, owner, worker) = seeded();

        let (status, Json(Created { id: project_id })) = create_project(
            State(state.clone()),
            Caller(owner.clone()),
            Json(new_project()),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let bid = NewBid {
            user: None,
            price: 450,
            deadline: Duration::from_secs(7200),
            message: "Can do".into(),
        };
        let (_, Json(Created { id: bid_id })) = create_bid(
            Path(project_id),
            State(state.clone()),
            Caller(worker.clone()),
            Json(bid),
        )
        .await
        .unwrap();

        let Json(project) = accept_bid(Path(bid_id), State(state.clone()), Caller(owner))
            .await
            .unwrap();
        assert_eq!(project.status, ProjectStatus::InWork);
        assert_eq!(project.contractor, Some(worker));
        assert_eq!(project.price, 450);
    }

    #[tokio::test]
    async fn non_owner_cannot_delete() {
        let (state, owner, worker) = seeded();
        let id = state.marketplace.create_project(&owner, new_project()).unwrap();

        let err = delete_project(Path(id), State(state.clone()), Caller(worker))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        let status = delete_project(Path(id), State(state), Caller(owner))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn cancel_of_open_project_conflicts() {
        let (state, owner, _) = seeded();
        let id = state.marketplace.create_project(&owner, new_project()).unwrap();

        let err = cancel_project(Path(id), State(state), Caller(owner))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn mentorship_is_not_implemented() {
        let caller = Caller(WalletAddress::from("0xowner"));
        assert_eq!(
            request_mentorship(Path("0xmentor".into()), caller).await,
            StatusCode::NOT_IMPLEMENTED
        );
    }
}
