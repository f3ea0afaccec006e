// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claims read from a Clerk session JWT.
///
/// `exp`, `sub`, `iss` and `aud` are enforced by the decoder; `iat` is
/// checked by the verifier. Profile claims are optional and only present when
/// the Clerk session token template includes them.
/// See: https://clerk.com/docs/backend-requests/resources/session-tokens
#[derive(Debug, Clone, Deserialize)]
pub struct ClerkClaims {
    /// Subject (user ID) - the canonical Clerk user identifier
    pub sub: String,

    /// Expiration timestamp
    pub exp: i64,

    /// Issued at timestamp
    #[serde(default)]
    pub iat: Option<i64>,

    /// Issuer (the Clerk frontend API URL)
    #[serde(default)]
    pub iss: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub email_verified: Option<bool>,

    #[serde(default)]
    pub name: Option<String>,
}

/// Authenticated user information extracted from a verified JWT.
///
/// Request-scoped; derived fresh on every request and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Clerk user ID (`sub` claim)
    pub id: String,
    pub email: Option<String>,
    /// Defaults to `false` when the claim is absent
    pub email_verified: bool,
    pub name: Option<String>,
}

impl AuthenticatedUser {
    /// Create from Clerk claims.
    pub fn from_claims(claims: ClerkClaims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            email_verified: claims.email_verified.unwrap_or(false),
            name: claims.name,
        }
    }
}
