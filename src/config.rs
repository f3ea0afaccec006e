// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! All settings are read from the environment (optionally seeded from a
//! `.env` file) exactly once at startup and validated eagerly. Every problem is
//! collected so a misconfigured deployment reports all of them in one go.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATABASE_URL` | Postgres connection string | Required |
//! | `CLERK_FRONTEND_URL` | Clerk frontend API URL (JWKS root, `iss` and `aud`) | Required |
//! | `CLERK_WEBHOOK_SECRET` | Svix signing secret for Clerk webhooks | Optional |
//! | `CORS_ORIGINS` | Comma-separated allowed origins | `http://localhost:3000` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8000` |
//! | `JWKS_CACHE_TTL_SECS` | Signing key cache lifespan | `3600` |
//! | `JWKS_MAX_CACHED_KEYS` | Signing key cache capacity | `16` |
//! | `DATABASE_MAX_CONNECTIONS` | Postgres pool size | `10` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::webhooks::WebhookSecret;

/// Version of the settings schema below. Bump when variables are added,
/// renamed or change meaning.
pub const SETTINGS_SCHEMA_VERSION: u32 = 1;

pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
pub const CLERK_FRONTEND_URL_ENV: &str = "CLERK_FRONTEND_URL";
pub const CLERK_WEBHOOK_SECRET_ENV: &str = "CLERK_WEBHOOK_SECRET";
pub const CORS_ORIGINS_ENV: &str = "CORS_ORIGINS";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const JWKS_CACHE_TTL_ENV: &str = "JWKS_CACHE_TTL_SECS";
pub const JWKS_MAX_CACHED_KEYS_ENV: &str = "JWKS_MAX_CACHED_KEYS";
pub const DATABASE_MAX_CONNECTIONS_ENV: &str = "DATABASE_MAX_CONNECTIONS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_JWKS_CACHE_TTL_SECS: u64 = 3600;
const DEFAULT_JWKS_MAX_CACHED_KEYS: usize = 16;
const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Well-known JWKS path under the Clerk frontend API.
const JWKS_PATH: &str = "/.well-known/jwks.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration:\n  - {}", .0.join("\n  - "))]
    Invalid(Vec<String>),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("expected `json` or `pretty`, got `{other}`")),
        }
    }
}

/// Validated application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub database_max_connections: u32,
    /// Clerk frontend API URL without trailing slash.
    pub clerk_frontend_url: String,
    pub clerk_webhook_secret: Option<WebhookSecret>,
    pub cors_origins: Vec<String>,
    pub host: String,
    pub port: u16,
    pub jwks_cache_ttl: Duration,
    pub jwks_max_cached_keys: usize,
    pub log_format: LogFormat,
}

impl Settings {
    /// Load settings from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut problems = Vec::new();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = get(DATABASE_URL_ENV).unwrap_or_else(|| {
            problems.push(format!("{DATABASE_URL_ENV} is required"));
            String::new()
        });

        let clerk_frontend_url = match get(CLERK_FRONTEND_URL_ENV) {
            Some(raw) => match Url::parse(raw.trim()) {
                Ok(url) if url.has_host() => raw.trim().trim_end_matches('/').to_string(),
                Ok(_) => {
                    problems.push(format!("{CLERK_FRONTEND_URL_ENV} must include a host"));
                    String::new()
                }
                Err(e) => {
                    problems.push(format!("{CLERK_FRONTEND_URL_ENV} is not a valid URL: {e}"));
                    String::new()
                }
            },
            None => {
                problems.push(format!("{CLERK_FRONTEND_URL_ENV} is required"));
                String::new()
            }
        };

        let clerk_webhook_secret = match get(CLERK_WEBHOOK_SECRET_ENV) {
            Some(raw) => match WebhookSecret::parse(raw.trim()) {
                Ok(secret) => Some(secret),
                Err(e) => {
                    problems.push(format!("{CLERK_WEBHOOK_SECRET_ENV} is malformed: {e}"));
                    None
                }
            },
            None => None,
        };

        let cors_origins = get(CORS_ORIGINS_ENV)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_else(|| vec![DEFAULT_CORS_ORIGIN.to_string()]);

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(&get, PORT_ENV, DEFAULT_PORT, &mut problems);
        let ttl_secs = parse_or(
            &get,
            JWKS_CACHE_TTL_ENV,
            DEFAULT_JWKS_CACHE_TTL_SECS,
            &mut problems,
        );
        let jwks_max_cached_keys = parse_or(
            &get,
            JWKS_MAX_CACHED_KEYS_ENV,
            DEFAULT_JWKS_MAX_CACHED_KEYS,
            &mut problems,
        );
        if jwks_max_cached_keys == 0 {
            problems.push(format!("{JWKS_MAX_CACHED_KEYS_ENV} must be at least 1"));
        }
        let database_max_connections = parse_or(
            &get,
            DATABASE_MAX_CONNECTIONS_ENV,
            DEFAULT_DATABASE_MAX_CONNECTIONS,
            &mut problems,
        );
        let log_format = parse_or(&get, LOG_FORMAT_ENV, LogFormat::default(), &mut problems);

        if !problems.is_empty() {
            return Err(ConfigError::Invalid(problems));
        }

        Ok(Self {
            database_url,
            database_max_connections,
            clerk_frontend_url,
            clerk_webhook_secret,
            cors_origins,
            host,
            port,
            jwks_cache_ttl: Duration::from_secs(ttl_secs),
            jwks_max_cached_keys,
            log_format,
        })
    }

    /// JWKS endpoint derived from the Clerk frontend URL.
    pub fn jwks_url(&self) -> String {
        format!("{}{JWKS_PATH}", self.clerk_frontend_url)
    }

    /// `host:port` bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, G>(get: &G, name: &str, default: T, problems: &mut Vec<String>) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            problems.push(format!("{name} is invalid: {e}"));
            default
        }),
        None => default,
    }
}
