// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Data Models
//!
//! The persisted [`User`] entity and the JSON bodies returned by the API.
//! All API types derive `Serialize` and `ToSchema` for automatic JSON handling
//! and OpenAPI documentation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// =============================================================================
// User
// =============================================================================

/// Local mirror of a Clerk user.
///
/// `id` is the Clerk user ID (the `sub` claim of that user's JWTs) and never
/// changes once the row exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct User {
    /// Clerk user ID
    pub id: String,
    /// Primary email address (unique)
    pub email: String,
    /// Display name ("first last"), if any
    pub name: Option<String>,
    /// Whether Clerk reports the email as verified
    pub email_verified: bool,
    /// Profile image URL
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a new user row from a profile, stamping both timestamps with `now`.
    pub fn new(id: impl Into<String>, profile: UserProfile, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            email: profile.email,
            name: profile.name,
            email_verified: profile.email_verified,
            image_url: profile.image_url,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite the mutable fields and refresh `updated_at`.
    pub fn apply(&mut self, profile: &UserProfile, now: DateTime<Utc>) {
        self.email = profile.email.clone();
        self.name = profile.name.clone();
        self.email_verified = profile.email_verified;
        self.image_url = profile.image_url.clone();
        self.updated_at = now;
    }
}

/// The fields of a [`User`] that Clerk owns and may change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub email: String,
    pub name: Option<String>,
    pub email_verified: bool,
    pub image_url: Option<String>,
}

// =============================================================================
// Responses
// =============================================================================

/// Generic `{ "message": ... }` response.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Acknowledgement returned to the identity provider for a webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    /// `success` or `ignored`
    pub status: String,
    pub message: String,
}

impl WebhookAck {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
        }
    }

    pub fn ignored(message: impl Into<String>) -> Self {
        Self {
            status: "ignored".to_string(),
            message: message.into(),
        }
    }
}
