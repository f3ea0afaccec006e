// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Clerk JWT verification.
//!
//! A token is accepted only if:
//!
//! - it is signed with RS256 (anything else, including `none`, is rejected)
//! - its `kid` names a key in the Clerk JWKS
//! - `exp`, `iat` and `sub` are present and `exp` is strictly in the future
//! - `iss` and `aud` both equal the Clerk frontend URL

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};

use super::claims::{AuthenticatedUser, ClerkClaims};
use super::error::AuthError;
use super::jwks::JwksManager;

/// The only signature algorithm Clerk uses for session tokens.
const SIGNING_ALGORITHM: Algorithm = Algorithm::RS256;

/// Claims the decoder must find before anything else is checked.
const REQUIRED_CLAIMS: [&str; 4] = ["exp", "sub", "iss", "aud"];

/// Verifies bearer tokens and derives the request identity.
#[derive(Clone)]
pub struct TokenVerifier {
    jwks: Arc<JwksManager>,
    /// Expected `iss` and `aud` (Clerk frontend URL)
    domain: String,
}

impl TokenVerifier {
    pub fn new(jwks: Arc<JwksManager>, domain: impl Into<String>) -> Self {
        Self {
            jwks,
            domain: domain.into(),
        }
    }

    pub fn jwks(&self) -> &JwksManager {
        &self.jwks
    }

    /// Verify `token` and return the identity it carries.
    pub async fn verify(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let header = decode_header(token)
            .map_err(|e| AuthError::InvalidToken(format!("malformed token header: {e}")))?;

        if header.alg != SIGNING_ALGORITHM {
            return Err(AuthError::InvalidToken(format!(
                "The specified alg value is not allowed: {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("token header has no key id".to_string()))?;

        let decoding_key = self.jwks.get_decoding_key(&kid).await?;

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.leeway = 0;
        validation.set_issuer(&[&self.domain]);
        validation.set_audience(&[&self.domain]);
        validation.set_required_spec_claims(&REQUIRED_CLAIMS);

        let claims = decode::<ClerkClaims>(token, &decoding_key, &validation)
            .map_err(map_jwt_error)?
            .claims;

        if claims.iat.is_none() {
            return Err(AuthError::InvalidToken(
                "Token is missing the \"iat\" claim".to_string(),
            ));
        }

        // The decoder accepts exp == now; expiry must be strictly in the future.
        if claims.exp <= Utc::now().timestamp() {
            return Err(AuthError::TokenExpired);
        }

        Ok(AuthenticatedUser::from_claims(claims))
    }
}

fn map_jwt_error(err: JwtError) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::InvalidAudience => AuthError::InvalidAudience,
        ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
        ErrorKind::MissingRequiredClaim(claim) => {
            AuthError::InvalidToken(format!("Token is missing the \"{claim}\" claim"))
        }
        ErrorKind::InvalidSignature => {
            AuthError::InvalidToken("Signature verification failed".to_string())
        }
        _ => AuthError::InvalidToken(err.to_string()),
    }
}
