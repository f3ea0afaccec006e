// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory user repository.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{CreateOutcome, RepositoryError, RepositoryResult, UserRepository};
use crate::models::{User, UserProfile};

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }

    /// Snapshot of every stored user, ordered by id.
    pub async fn all(&self) -> Vec<User> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        users
    }
}

fn email_owned_by_other(users: &HashMap<String, User>, id: &str, email: &str) -> bool {
    users.values().any(|u| u.id != id && u.email == email)
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn get(&self, id: &str) -> RepositoryResult<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn create(&self, user: &User) -> RepositoryResult<CreateOutcome> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        if email_owned_by_other(&users, &user.id, &user.email) {
            return Err(RepositoryError::EmailTaken(user.email.clone()));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(CreateOutcome::Created)
    }

    async fn update(
        &self,
        id: &str,
        profile: &UserProfile,
        now: DateTime<Utc>,
    ) -> RepositoryResult<Option<User>> {
        let mut users = self.users.write().await;
        if !users.contains_key(id) {
            return Ok(None);
        }
        if email_owned_by_other(&users, id, &profile.email) {
            return Err(RepositoryError::EmailTaken(profile.email.clone()));
        }
        Ok(users.get_mut(id).map(|user| {
            user.apply(profile, now);
            user.clone()
        }))
    }

    async fn delete(&self, id: &str) -> RepositoryResult<bool> {
        Ok(self.users.write().await.remove(id).is_some())
    }

    async fn ping(&self) -> RepositoryResult<()> {
        Ok(())
    }
}
