// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::{extract::State, Json};

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::User;
use crate::state::AppState;

/// Get the synchronized user record for the authenticated caller.
///
/// 404 until Clerk has delivered the `user.created` webhook for this user.
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Stored user record", body = User),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 404, description = "User not synchronized yet"),
    )
)]
pub async fn get_my_profile(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<User>, ApiError> {
    let record = state
        .users
        .get(&user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(record))
}
