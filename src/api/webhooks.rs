// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Clerk webhook receiver.
//!
//! Processing order is fixed: configuration, headers, signature, payload,
//! then the database. Nothing is written unless every earlier step passed.

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};

use crate::models::WebhookAck;
use crate::state::AppState;
use crate::webhooks::{IdentityReconciler, SignedHeaders, WebhookError, WebhookEvent};

pub const SVIX_ID_HEADER: &str = "svix-id";
pub const SVIX_TIMESTAMP_HEADER: &str = "svix-timestamp";
pub const SVIX_SIGNATURE_HEADER: &str = "svix-signature";

fn signed_headers(headers: &HeaderMap) -> Option<SignedHeaders<'_>> {
    let get = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    Some(SignedHeaders {
        id: get(SVIX_ID_HEADER)?,
        timestamp: get(SVIX_TIMESTAMP_HEADER)?,
        signature: get(SVIX_SIGNATURE_HEADER)?,
    })
}

/// Receive a Svix-signed Clerk user lifecycle event.
#[utoipa::path(
    post,
    path = "/api/webhooks/clerk",
    tag = "Webhooks",
    request_body(
        content = String,
        description = "Raw Clerk event JSON",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Event applied or ignored", body = WebhookAck),
        (status = 400, description = "Missing headers, bad signature or invalid payload"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already belongs to another user"),
        (status = 500, description = "Webhook secret not configured or database failure"),
    )
)]
pub async fn clerk_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, WebhookError> {
    let Some(verifier) = state.webhook_verifier.as_ref() else {
        tracing::error!("Webhook received but CLERK_WEBHOOK_SECRET is not configured");
        return Err(WebhookError::Misconfigured);
    };

    let signed = signed_headers(&headers).ok_or(WebhookError::MissingHeaders)?;

    verifier.verify(signed, &body).inspect_err(|e| {
        tracing::warn!(svix_id = %signed.id, error = %e, "Webhook signature rejected");
    })?;

    let event = WebhookEvent::parse(&body)?;
    tracing::info!(
        svix_id = %signed.id,
        event_type = %event.event_type(),
        "Received Clerk webhook"
    );

    let ack = IdentityReconciler::new(state.users.clone())
        .apply(event)
        .await
        .inspect_err(|e| {
            if let WebhookError::Repository(cause) = e {
                tracing::error!(svix_id = %signed.id, error = %cause, "Failed to apply webhook");
            }
        })?;

    Ok(Json(ack))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::router;
    use crate::auth::{JwksManager, TokenVerifier};
    use crate::models::{User, UserProfile};
    use crate::storage::{InMemoryUserRepository, UserRepository};
    use crate::webhooks::{WebhookSecret, WebhookVerifier};
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use chrono::Utc;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    const SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";

    fn app(users: Arc<InMemoryUserRepository>, secret: Option<&str>) -> Router {
        // Webhook handling never consults the JWKS.
        let jwks = JwksManager::new("http://127.0.0.1:9/.well-known/jwks.json").unwrap();
        let verifier = TokenVerifier::new(Arc::new(jwks), "http://127.0.0.1:9");
        let secret = secret.map(|s| WebhookSecret::parse(s).unwrap());
        router(AppState::new(verifier, users).with_webhook_secret(secret), &[])
    }

    fn signer() -> WebhookVerifier {
        WebhookVerifier::new(WebhookSecret::parse(SECRET).unwrap())
    }

    fn user_event(event_type: &str, id: &str, email: &str) -> Value {
        json!({
            "type": event_type,
            "object": "event",
            "data": {
                "id": id,
                "email_addresses": [{
                    "id": "idn_1",
                    "email_address": email,
                    "verification": {"status": "verified"}
                }],
                "primary_email_address_id": "idn_1",
                "first_name": "Ada",
                "last_name": "Lovelace",
                "image_url": "https://img.clerk.com/ada.png"
            }
        })
    }

    fn signed_request(body: &Value) -> Request<Body> {
        let body = body.to_string();
        let timestamp = Utc::now().timestamp();
        let signature = signer()
            .sign("msg_test", timestamp, body.as_bytes())
            .unwrap();
        Request::post("/api/webhooks/clerk")
            .header(SVIX_ID_HEADER, "msg_test")
            .header(SVIX_TIMESTAMP_HEADER, timestamp.to_string())
            .header(SVIX_SIGNATURE_HEADER, signature)
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn user_created_inserts_row() {
        let users = Arc::new(InMemoryUserRepository::new());
        let event = user_event("user.created", "user_ada", "ada@example.com");

        let (status, body) = send(app(users.clone(), Some(SECRET)), signed_request(&event)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "success", "message": "User created"}));

        let stored = users.get("user_ada").await.unwrap().unwrap();
        assert_eq!(stored.email, "ada@example.com");
        assert_eq!(stored.name.as_deref(), Some("Ada Lovelace"));
        assert!(stored.email_verified);
    }

    #[tokio::test]
    async fn user_updated_and_deleted_flow() {
        let users = Arc::new(InMemoryUserRepository::new());
        let created = user_event("user.created", "user_ada", "ada@example.com");
        send(app(users.clone(), Some(SECRET)), signed_request(&created)).await;

        let updated = user_event("user.updated", "user_ada", "countess@example.com");
        let (status, body) = send(app(users.clone(), Some(SECRET)), signed_request(&updated)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "User updated");
        assert_eq!(
            users.get("user_ada").await.unwrap().unwrap().email,
            "countess@example.com"
        );

        let deleted = json!({"type": "user.deleted", "data": {"id": "user_ada", "deleted": true}});
        let (status, body) = send(app(users.clone(), Some(SECRET)), signed_request(&deleted)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "User deleted");
        assert!(users.is_empty().await);
    }

    #[tokio::test]
    async fn missing_secret_is_500() {
        let users = Arc::new(InMemoryUserRepository::new());
        let event = user_event("user.created", "user_ada", "ada@example.com");

        let (status, body) = send(app(users.clone(), None), signed_request(&event)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "error");
        assert!(users.is_empty().await);
    }

    #[tokio::test]
    async fn each_missing_header_is_400_without_write() {
        for missing in [SVIX_ID_HEADER, SVIX_TIMESTAMP_HEADER, SVIX_SIGNATURE_HEADER] {
            let users = Arc::new(InMemoryUserRepository::new());
            let event = user_event("user.created", "user_ada", "ada@example.com");
            let mut request = signed_request(&event);
            request.headers_mut().remove(missing);

            let (status, body) = send(app(users.clone(), Some(SECRET)), request).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "without {missing}");
            assert_eq!(body["message"], "Missing svix headers");
            assert!(users.is_empty().await);
        }
    }

    #[tokio::test]
    async fn tampered_body_is_400_without_write() {
        let users = Arc::new(InMemoryUserRepository::new());
        let event = user_event("user.created", "user_ada", "ada@example.com");
        let request = signed_request(&event);

        // Same headers, different body.
        let (parts, _) = request.into_parts();
        let forged = user_event("user.created", "user_eve", "eve@example.com");
        let request = Request::from_parts(parts, Body::from(forged.to_string()));

        let (status, body) = send(app(users.clone(), Some(SECRET)), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("Webhook verification failed"));
        assert!(users.is_empty().await);
    }

    #[tokio::test]
    async fn stale_timestamp_is_rejected() {
        let users = Arc::new(InMemoryUserRepository::new());
        let body = user_event("user.created", "user_ada", "ada@example.com").to_string();
        let timestamp = Utc::now().timestamp() - 3600;
        let signature = signer().sign("msg_old", timestamp, body.as_bytes()).unwrap();

        let request = Request::post("/api/webhooks/clerk")
            .header(SVIX_ID_HEADER, "msg_old")
            .header(SVIX_TIMESTAMP_HEADER, timestamp.to_string())
            .header(SVIX_SIGNATURE_HEADER, signature)
            .body(Body::from(body))
            .unwrap();

        let (status, _) = send(app(users.clone(), Some(SECRET)), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(users.is_empty().await);
    }

    #[tokio::test]
    async fn unhandled_event_is_ignored() {
        let users = Arc::new(InMemoryUserRepository::new());
        let event = json!({"type": "session.created", "data": {"id": "sess_1"}});

        let (status, body) = send(app(users.clone(), Some(SECRET)), signed_request(&event)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"status": "ignored", "message": "Unhandled event: session.created"})
        );
        assert!(users.is_empty().await);
    }

    #[tokio::test]
    async fn signed_but_malformed_payload_is_400() {
        let users = Arc::new(InMemoryUserRepository::new());
        let event = json!({"data": {"id": "user_ada"}});

        let (status, _) = send(app(users.clone(), Some(SECRET)), signed_request(&event)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(users.is_empty().await);
    }

    #[tokio::test]
    async fn update_of_unknown_user_is_404() {
        let users = Arc::new(InMemoryUserRepository::new());
        let event = user_event("user.updated", "user_ghost", "ghost@example.com");

        let (status, body) = send(app(users.clone(), Some(SECRET)), signed_request(&event)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "User not found");
    }

    #[tokio::test]
    async fn email_conflict_is_409() {
        let users = Arc::new(InMemoryUserRepository::new());
        let profile = UserProfile {
            email: "taken@example.com".to_string(),
            name: None,
            email_verified: true,
            image_url: None,
        };
        users
            .create(&User::new("user_owner", profile, Utc::now()))
            .await
            .unwrap();

        let event = user_event("user.created", "user_other", "taken@example.com");
        let (status, _) = send(app(users.clone(), Some(SECRET)), signed_request(&event)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(users.len().await, 1);
    }
}
