// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::storage::UserRepository;
use crate::webhooks::{WebhookSecret, WebhookVerifier};

#[derive(Clone)]
pub struct AppState {
    /// Shared across requests; owns the JWKS cache
    pub verifier: TokenVerifier,
    pub users: Arc<dyn UserRepository>,
    /// `None` when `CLERK_WEBHOOK_SECRET` is not configured
    pub webhook_verifier: Option<WebhookVerifier>,
}

impl AppState {
    pub fn new(verifier: TokenVerifier, users: Arc<dyn UserRepository>) -> Self {
        Self {
            verifier,
            users,
            webhook_verifier: None,
        }
    }

    pub fn with_webhook_secret(mut self, secret: Option<WebhookSecret>) -> Self {
        self.webhook_verifier = secret.map(WebhookVerifier::new);
        self
    }
}
