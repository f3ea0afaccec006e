// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! This module provides Clerk JWT authentication for the GoodJob API.
//!
//! ## Auth Flow
//!
//! 1. Frontend (Next.js) authenticates user with Clerk
//! 2. Frontend sends `Authorization: Bearer <Clerk JWT>`
//! 3. Server:
//!    - Fetches Clerk JWKS via HTTPS (lazily, cached per `kid`)
//!    - Verifies RS256 signature, expiry, issuer, audience
//!    - Extracts `sub` → canonical user ID, plus email/name claims
//!
//! ## Security
//!
//! - Only RS256 is accepted
//! - `iss` and `aud` must equal `CLERK_FRONTEND_URL`
//! - No clock skew leeway
//! - The verifier never touches the database

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod verifier;

#[cfg(test)]
pub(crate) mod test_support;

pub use claims::{AuthenticatedUser, ClerkClaims};
pub use error::AuthError;
pub use extractor::{Auth, OptionalAuth};
pub use jwks::JwksManager;
pub use verifier::TokenVerifier;
