// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated users.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```
//!
//! `OptionalAuth` accepts requests without credentials. Credentials that are
//! present but invalid are still rejected; a broken token should never be
//! mistaken for an anonymous visitor.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::{AuthError, AuthenticatedUser};
use crate::state::AppState;

/// Extractor for authenticated users.
///
/// Validates the bearer token from the Authorization header against the
/// Clerk JWKS.
///
/// # Example
///
/// ```rust,ignore
/// async fn get_me(Auth(user): Auth) -> Json<AuthenticatedUser> {
///     // user.id is the Clerk user ID
///     Json(user)
/// }
/// ```
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.ok_or(AuthError::MissingAuthHeader)?;
        let user = state.verifier.verify(token).await?;
        Ok(Auth(user))
    }
}

/// Optional authentication extractor.
///
/// `None` when no Authorization header is sent at all.
pub struct OptionalAuth(pub Option<AuthenticatedUser>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => Ok(OptionalAuth(Some(state.verifier.verify(token).await?))),
            None => Ok(OptionalAuth(None)),
        }
    }
}

/// Extract the bearer token.
///
/// `Ok(None)` when the header is absent; an error when it is present but not
/// `Bearer <token>` (scheme is case-insensitive).
fn bearer_token(parts: &Parts) -> Result<Option<&str>, AuthError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value.to_str().map_err(|_| AuthError::InvalidAuthHeader)?;
    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or(AuthError::InvalidAuthHeader)?;

    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }
    Ok(Some(token))
}
