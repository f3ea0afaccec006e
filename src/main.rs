// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{error::Error, process::ExitCode, sync::Arc};

use goodjob_api::{
    api::router,
    auth::{JwksManager, TokenVerifier},
    config::{Settings, SETTINGS_SCHEMA_VERSION},
    init_tracing,
    state::AppState,
    storage::PostgresUserRepository,
};
use tokio::{net::TcpListener, signal};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(settings.log_format);

    match run(settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: Settings) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!(
        schema_version = SETTINGS_SCHEMA_VERSION,
        clerk_frontend_url = %settings.clerk_frontend_url,
        "Loaded settings"
    );

    let jwks = JwksManager::new(settings.jwks_url())?
        .with_cache_ttl(settings.jwks_cache_ttl)
        .with_max_cached_keys(settings.jwks_max_cached_keys);
    let verifier = TokenVerifier::new(Arc::new(jwks), settings.clerk_frontend_url.clone());

    let users = PostgresUserRepository::connect_lazy(
        &settings.database_url,
        settings.database_max_connections,
    )?;
    users.ensure_schema().await?;
    info!("Database schema ready");

    if settings.clerk_webhook_secret.is_none() {
        warn!("CLERK_WEBHOOK_SECRET is not set; webhook deliveries will be rejected");
    }

    let state = AppState::new(verifier, Arc::new(users))
        .with_webhook_secret(settings.clerk_webhook_secret.clone());
    let app = router(state, &settings.cors_origins);

    let addr = settings.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "GoodJob API listening (docs at /api/docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
