// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # User Storage
//!
//! The `users` table is the only persisted state. It mirrors Clerk's user
//! records and is written exclusively by the webhook reconciler.
//!
//! ## Backends
//!
//! - [`PostgresUserRepository`] - production backend (sqlx, one transaction per mutation)
//! - [`InMemoryUserRepository`] - same uniqueness rules, for tests and local tooling
//!
//! ## Uniqueness
//!
//! - `id` is the Clerk user ID and the primary key
//! - `email` is unique across all rows

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{User, UserProfile};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryUserRepository;
pub use postgres::{PgPool, PostgresUserRepository};

/// Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Another user already owns this email address.
    #[error("email address already in use: {0}")]
    EmailTaken(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Outcome of inserting a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// A row with the same `id` exists; nothing was written.
    AlreadyExists,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Look up a user by Clerk user ID.
    async fn get(&self, id: &str) -> RepositoryResult<Option<User>>;

    /// Insert a new user. An existing row with the same `id` is left untouched.
    async fn create(&self, user: &User) -> RepositoryResult<CreateOutcome>;

    /// Overwrite the profile fields of an existing user and refresh `updated_at`.
    ///
    /// Returns `None` if no user has this `id`.
    async fn update(
        &self,
        id: &str,
        profile: &UserProfile,
        now: DateTime<Utc>,
    ) -> RepositoryResult<Option<User>>;

    /// Delete a user. Returns `false` if no user has this `id`.
    async fn delete(&self, id: &str) -> RepositoryResult<bool>;

    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> RepositoryResult<()>;
}
