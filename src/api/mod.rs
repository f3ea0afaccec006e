// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::AuthenticatedUser,
    models::{MessageResponse, User, WebhookAck},
    state::AppState,
};

pub mod health;
pub mod users;
pub mod webhooks;

pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    let api_routes = Router::new()
        .route("/test/me", get(test::get_me))
        .route("/users/me", get(users::get_my_profile))
        .route("/webhooks/clerk", post(webhooks::clerk_webhook));

    let app = Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/api", api_routes)
        .with_state(state);

    app.merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors_layer(cors_origins)),
        )
}

/// CORS for the configured browser origins, with credentials.
///
/// Invalid origin strings are skipped with a warning.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

#[derive(OpenApi)]
#[openapi(
    info(title = "GoodJob AI Interview API", version = "1.0.0"),
    paths(
        health::root,
        health::liveness,
        health::readiness,
        test::get_me,
        users::get_my_profile,
        webhooks::clerk_webhook
    ),
    components(
        schemas(
            AuthenticatedUser,
            User,
            MessageResponse,
            WebhookAck,
            health::HealthResponse,
            health::ReadyResponse,
            health::HealthChecks,
            test::TestMeResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Health", description = "Liveness and readiness"),
        (name = "Test", description = "Authentication smoke test"),
        (name = "Users", description = "Synchronized user records"),
        (name = "Webhooks", description = "Clerk user lifecycle events")
    )
)]
struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
