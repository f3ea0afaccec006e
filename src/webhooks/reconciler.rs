// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Applies Clerk user lifecycle events to the local `users` table.
//!
//! | Event | Effect |
//! |-------|--------|
//! | `user.created` | insert; an existing id is acknowledged without writing |
//! | `user.updated` | overwrite profile fields, refresh `updated_at`; 404 if unknown |
//! | `user.deleted` | delete; 404 if unknown |
//! | anything else | acknowledged as ignored, no write |

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::error::WebhookError;
use super::event::{ClerkUser, WebhookEvent};
use crate::models::{User, WebhookAck};
use crate::storage::{CreateOutcome, UserRepository};

/// Reconciles local user rows with upstream identity events.
#[derive(Clone)]
pub struct IdentityReconciler {
    users: Arc<dyn UserRepository>,
}

impl IdentityReconciler {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Apply one verified event.
    pub async fn apply(&self, event: WebhookEvent) -> Result<WebhookAck, WebhookError> {
        match event {
            WebhookEvent::UserCreated(user) => self.create(user).await,
            WebhookEvent::UserUpdated(user) => self.update(user).await,
            WebhookEvent::UserDeleted { id } => self.delete(&id).await,
            WebhookEvent::Other(event_type) => {
                info!(event_type = %event_type, "Ignoring unhandled webhook event");
                Ok(WebhookAck::ignored(format!("Unhandled event: {event_type}")))
            }
        }
    }

    async fn create(&self, data: ClerkUser) -> Result<WebhookAck, WebhookError> {
        let profile = data.profile()?;
        let user = User::new(data.id, profile, Utc::now());

        match self.users.create(&user).await? {
            CreateOutcome::Created => {
                info!(user_id = %user.id, "User created from webhook");
                Ok(WebhookAck::success("User created"))
            }
            CreateOutcome::AlreadyExists => {
                info!(user_id = %user.id, "Duplicate user.created delivery, nothing to do");
                Ok(WebhookAck::success("User already exists"))
            }
        }
    }

    async fn update(&self, data: ClerkUser) -> Result<WebhookAck, WebhookError> {
        if self.users.get(&data.id).await?.is_none() {
            return Err(WebhookError::UserNotFound(data.id));
        }
        let profile = data.profile()?;

        match self.users.update(&data.id, &profile, Utc::now()).await? {
            Some(user) => {
                info!(user_id = %user.id, "User updated from webhook");
                Ok(WebhookAck::success("User updated"))
            }
            None => Err(WebhookError::UserNotFound(data.id)),
        }
    }

    async fn delete(&self, id: &str) -> Result<WebhookAck, WebhookError> {
        if self.users.delete(id).await? {
            info!(user_id = %id, "User deleted from webhook");
            Ok(WebhookAck::success("User deleted"))
        } else {
            Err(WebhookError::UserNotFound(id.to_string()))
        }
    }
}
