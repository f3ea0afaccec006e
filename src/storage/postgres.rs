// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Postgres user repository.
//!
//! Every mutation runs in its own transaction; a dropped transaction rolls
//! back, so an error anywhere leaves no partial row state behind.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, Pool, Postgres};

use super::{CreateOutcome, RepositoryError, RepositoryResult, UserRepository};
use crate::models::{User, UserProfile};

pub type PgPool = Pool<Postgres>;

const USER_COLUMNS: &str = "id, email, name, email_verified, image_url, created_at, updated_at";

const CREATE_USERS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id             TEXT PRIMARY KEY,
        email          TEXT NOT NULL UNIQUE,
        name           TEXT,
        email_verified BOOLEAN NOT NULL DEFAULT FALSE,
        image_url      TEXT,
        created_at     TIMESTAMPTZ NOT NULL,
        updated_at     TIMESTAMPTZ NOT NULL
    )
"#;

#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool. Connections are established lazily.
    pub fn connect_lazy(database_url: &str, max_connections: u32) -> RepositoryResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy(database_url)?;
        Ok(Self::new(pool))
    }

    /// Create the `users` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> RepositoryResult<()> {
        sqlx::query(CREATE_USERS_TABLE).execute(&self.pool).await?;
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct UserRecord {
    id: String,
    email: String,
    name: Option<String>,
    email_verified: bool,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            email: record.email,
            name: record.name,
            email_verified: record.email_verified,
            image_url: record.image_url,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Translate unique violations on `email` into [`RepositoryError::EmailTaken`].
fn map_write_error(err: sqlx::Error, email: &str) -> RepositoryError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return RepositoryError::EmailTaken(email.to_string());
        }
    }
    RepositoryError::Database(err)
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn get(&self, id: &str) -> RepositoryResult<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record.map(User::from))
    }

    async fn create(&self, user: &User) -> RepositoryResult<CreateOutcome> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO users (id, email, name, email_verified, image_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.email_verified)
        .bind(&user.image_url)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, &user.email))?;

        tx.commit().await?;

        if result.rows_affected() == 0 {
            Ok(CreateOutcome::AlreadyExists)
        } else {
            Ok(CreateOutcome::Created)
        }
    }

    async fn update(
        &self,
        id: &str,
        profile: &UserProfile,
        now: DateTime<Utc>,
    ) -> RepositoryResult<Option<User>> {
        let mut tx = self.pool.begin().await?;

        let record = sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            UPDATE users
            SET email = $2,
                name = $3,
                email_verified = $4,
                image_url = $5,
                updated_at = $6
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&profile.email)
        .bind(&profile.name)
        .bind(profile.email_verified)
        .bind(&profile.image_url)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, &profile.email))?;

        tx.commit().await?;
        Ok(record.map(User::from))
    }

    async fn delete(&self, id: &str) -> RepositoryResult<bool> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> RepositoryResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
