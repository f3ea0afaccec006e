// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Clerk webhook payloads.
//!
//! Deliveries have the envelope `{"type": "...", "data": {...}}`. Only the
//! user lifecycle events are interpreted; everything else is surfaced as
//! [`WebhookEvent::Other`] so it can be acknowledged and ignored.
//!
//! See: https://clerk.com/docs/webhooks/overview

use serde::Deserialize;
use serde_json::Value;

use super::error::WebhookError;
use crate::models::UserProfile;

pub const USER_CREATED: &str = "user.created";
pub const USER_UPDATED: &str = "user.updated";
pub const USER_DELETED: &str = "user.deleted";

/// Verification status Clerk reports for a confirmed address.
const VERIFIED_STATUS: &str = "verified";

/// A parsed, already signature-verified delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    UserCreated(ClerkUser),
    UserUpdated(ClerkUser),
    UserDeleted { id: String },
    /// Any event type this service does not handle
    Other(String),
}

impl WebhookEvent {
    /// Parse a verified webhook body.
    pub fn parse(body: &[u8]) -> Result<Self, WebhookError> {
        let envelope: Value = serde_json::from_slice(body)
            .map_err(|e| WebhookError::InvalidPayload(format!("body is not JSON: {e}")))?;

        let event_type = envelope
            .get("type")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| WebhookError::InvalidPayload("missing `type`".to_string()))?;

        let data = envelope
            .get("data")
            .filter(|d| d.as_object().is_some_and(|o| !o.is_empty()))
            .ok_or_else(|| WebhookError::InvalidPayload("missing `data`".to_string()))?;

        match event_type {
            USER_CREATED => Ok(WebhookEvent::UserCreated(ClerkUser::from_value(data)?)),
            USER_UPDATED => Ok(WebhookEvent::UserUpdated(ClerkUser::from_value(data)?)),
            USER_DELETED => {
                let id = data
                    .get("id")
                    .and_then(Value::as_str)
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| WebhookError::InvalidPayload("missing `data.id`".to_string()))?;
                Ok(WebhookEvent::UserDeleted { id: id.to_string() })
            }
            other => Ok(WebhookEvent::Other(other.to_string())),
        }
    }

    pub fn event_type(&self) -> &str {
        match self {
            WebhookEvent::UserCreated(_) => USER_CREATED,
            WebhookEvent::UserUpdated(_) => USER_UPDATED,
            WebhookEvent::UserDeleted { .. } => USER_DELETED,
            WebhookEvent::Other(t) => t,
        }
    }
}

/// The `data` object of `user.created` / `user.updated`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClerkUser {
    pub id: String,
    #[serde(default)]
    pub email_addresses: Vec<ClerkEmailAddress>,
    #[serde(default)]
    pub primary_email_address_id: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClerkEmailAddress {
    #[serde(default)]
    pub id: Option<String>,
    pub email_address: String,
    #[serde(default)]
    pub verification: Option<ClerkVerification>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClerkVerification {
    #[serde(default)]
    pub status: Option<String>,
}

impl ClerkUser {
    fn from_value(data: &Value) -> Result<Self, WebhookError> {
        let user: ClerkUser = serde_json::from_value(data.clone())
            .map_err(|e| WebhookError::InvalidPayload(format!("invalid user data: {e}")))?;
        if user.id.is_empty() {
            return Err(WebhookError::InvalidPayload("missing `data.id`".to_string()));
        }
        Ok(user)
    }

    /// The primary email address, falling back to the first listed one.
    pub fn primary_email(&self) -> Option<&ClerkEmailAddress> {
        self.primary_email_address_id
            .as_deref()
            .and_then(|primary| {
                self.email_addresses
                    .iter()
                    .find(|e| e.id.as_deref() == Some(primary))
            })
            .or_else(|| self.email_addresses.first())
    }

    /// `"first last"` trimmed; `None` when both are blank.
    pub fn display_name(&self) -> Option<String> {
        let first = self.first_name.as_deref().unwrap_or_default();
        let last = self.last_name.as_deref().unwrap_or_default();
        let name = format!("{first} {last}").trim().to_string();
        (!name.is_empty()).then_some(name)
    }

    /// Derive the locally stored profile fields.
    pub fn profile(&self) -> Result<UserProfile, WebhookError> {
        let email = self.primary_email().ok_or_else(|| {
            WebhookError::InvalidPayload("user has no email address".to_string())
        })?;

        Ok(UserProfile {
            email: email.email_address.clone(),
            name: self.display_name(),
            email_verified: email
                .verification
                .as_ref()
                .and_then(|v| v.status.as_deref())
                == Some(VERIFIED_STATUS),
            image_url: self.image_url.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn parses_user_created_and_derives_profile() {
        let event = WebhookEvent::parse(&body(json!({
            "type": "user.created",
            "data": {
                "id": "u1",
                "email_addresses": [
                    {"email_address": "a@b.com", "verification": {"status": "verified"}}
                ],
                "first_name": "A",
                "last_name": "B"
            }
        })))
        .unwrap();

        let WebhookEvent::UserCreated(user) = event else {
            panic!("expected user.created");
        };
        assert_eq!(user.id, "u1");
        assert_eq!(
            user.profile().unwrap(),
            UserProfile {
                email: "a@b.com".to_string(),
                name: Some("A B".to_string()),
                email_verified: true,
                image_url: None,
            }
        );
    }

    #[test]
    fn name_is_trimmed_and_blank_becomes_none() {
        let mut user = ClerkUser {
            id: "u1".into(),
            email_addresses: vec![],
            primary_email_address_id: None,
            first_name: Some("Ada".into()),
            last_name: None,
            image_url: None,
        };
        assert_eq!(user.display_name().as_deref(), Some("Ada"));

        user.first_name = None;
        user.last_name = Some("  ".into());
        assert_eq!(user.display_name(), None);
    }

    #[test]
    fn prefers_primary_email_and_reads_verification() {
        let event = WebhookEvent::parse(&body(json!({
            "type": "user.updated",
            "data": {
                "id": "u1",
                "primary_email_address_id": "idn_2",
                "email_addresses": [
                    {"id": "idn_1", "email_address": "old@b.com", "verification": {"status": "verified"}},
                    {"id": "idn_2", "email_address": "new@b.com", "verification": {"status": "unverified"}}
                ],
                "image_url": "https://img.clerk.com/x.png"
            }
        })))
        .unwrap();

        let WebhookEvent::UserUpdated(user) = event else {
            panic!("expected user.updated");
        };
        let profile = user.profile().unwrap();
        assert_eq!(profile.email, "new@b.com");
        assert!(!profile.email_verified);
        assert_eq!(profile.name, None);
        assert_eq!(profile.image_url.as_deref(), Some("https://img.clerk.com/x.png"));
    }

    #[test]
    fn user_without_email_is_invalid() {
        let event = WebhookEvent::parse(&body(json!({
            "type": "user.created",
            "data": {"id": "u1", "email_addresses": []}
        })))
        .unwrap();
        let WebhookEvent::UserCreated(user) = event else {
            panic!("expected user.created");
        };
        assert!(matches!(user.profile(), Err(WebhookError::InvalidPayload(_))));
    }

    #[test]
    fn parses_user_deleted() {
        let event = WebhookEvent::parse(&body(json!({
            "type": "user.deleted",
            "data": {"id": "u1", "deleted": true, "object": "user"}
        })))
        .unwrap();
        assert_eq!(event, WebhookEvent::UserDeleted { id: "u1".into() });
    }

    #[test]
    fn unknown_types_are_other() {
        let event = WebhookEvent::parse(&body(json!({
            "type": "session.created",
            "data": {"id": "sess_1"}
        })))
        .unwrap();
        assert_eq!(event, WebhookEvent::Other("session.created".into()));
        assert_eq!(event.event_type(), "session.created");
    }

    #[test]
    fn rejects_missing_type_or_data() {
        for payload in [
            json!({"data": {"id": "u1"}}),
            json!({"type": "", "data": {"id": "u1"}}),
            json!({"type": "user.created"}),
            json!({"type": "user.created", "data": {}}),
            json!({"type": "user.created", "data": null}),
        ] {
            assert!(
                matches!(WebhookEvent::parse(&body(payload.clone())), Err(WebhookError::InvalidPayload(_))),
                "{payload} should be rejected"
            );
        }
        assert!(matches!(
            WebhookEvent::parse(b"not json"),
            Err(WebhookError::InvalidPayload(_))
        ));
    }
}
