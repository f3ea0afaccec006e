// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Webhook errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::signature::SignatureError;
use crate::storage::RepositoryError;

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// `CLERK_WEBHOOK_SECRET` is not set
    #[error("Clerk webhook secret not configured")]
    Misconfigured,

    /// One of `svix-id`, `svix-timestamp`, `svix-signature` is absent
    #[error("Missing svix headers")]
    MissingHeaders,

    #[error("Webhook verification failed: {0}")]
    Verification(#[from] SignatureError),

    /// Verified body lacks `type`/`data` or the user data is unusable
    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),

    #[error("User not found")]
    UserNotFound(String),

    /// Email belongs to a different user
    #[error("Email address already in use by another user")]
    EmailConflict(String),

    #[error("Failed to apply webhook event")]
    Repository(#[source] RepositoryError),
}

impl From<RepositoryError> for WebhookError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::EmailTaken(email) => WebhookError::EmailConflict(email),
            other => WebhookError::Repository(other),
        }
    }
}

#[derive(Serialize)]
struct WebhookErrorBody {
    status: &'static str,
    message: String,
}

impl WebhookError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::Misconfigured | WebhookError::Repository(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            WebhookError::MissingHeaders
            | WebhookError::Verification(_)
            | WebhookError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            WebhookError::UserNotFound(_) => StatusCode::NOT_FOUND,
            WebhookError::EmailConflict(_) => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let body = Json(WebhookErrorBody {
            status: "error",
            message: self.to_string(),
        });
        (self.status_code(), body).into_response()
    }
}
