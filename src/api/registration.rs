// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    auth::VerifiedCaller,
    error::ApiError,
    models::{RegisterRequest, User},
    state::AppState,
};

/// Register the signing wallet as a marketplace user.
///
/// Only the signature is checked here. The nonce the request was signed
/// with becomes the user's starting nonce, so the next private request must
/// use a greater one.
#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    tag = "Users",
    responses((status = 201, body = User), (status = 400), (status = 401), (status = 409))
)]
pub async fn register(
    State(state): State<AppState>,
    caller: VerifiedCaller,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let mut user = User::new(caller.address.clone(), request.nickname);
    user.description = request.description;
    user.tags = request.tags;
    user.nonce = caller.nonce;

    state.marketplace.add_user(&caller.address, user)?;
    Ok((StatusCode::CREATED, Json(state.marketplace.user(&caller.address)?)))
}
