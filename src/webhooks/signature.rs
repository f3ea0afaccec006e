// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Svix webhook signature verification.
//!
//! Clerk delivers webhooks through Svix. Each delivery carries three headers:
//!
//! - `svix-id` - unique message identifier
//! - `svix-timestamp` - Unix seconds at which the message was signed
//! - `svix-signature` - space separated `version,base64` signatures
//!
//! The signed content is `"{id}.{timestamp}.{body}"` over the raw body bytes,
//! MACed with HMAC-SHA256 using the base64 key after the `whsec_` prefix.
//! Any one matching `v1` signature verifies the message.

use base64ct::{Base64, Encoding};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Prefix Clerk/Svix put in front of the base64 key material.
const SECRET_PREFIX: &str = "whsec_";

/// Accepted distance between `svix-timestamp` and the local clock.
pub const TIMESTAMP_TOLERANCE_SECS: i64 = 5 * 60;

/// Only this signature scheme version is understood.
const SIGNATURE_VERSION: &str = "v1";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("webhook secret is not valid base64")]
    InvalidSecret,

    #[error("invalid svix-timestamp header")]
    InvalidTimestamp,

    #[error("message timestamp too old")]
    TimestampTooOld,

    #[error("message timestamp too new")]
    TimestampTooNew,

    #[error("no matching signature found")]
    NoMatchingSignature,
}

/// Decoded webhook signing secret.
#[derive(Clone)]
pub struct WebhookSecret {
    key: Vec<u8>,
}

impl std::fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookSecret").finish_non_exhaustive()
    }
}

impl WebhookSecret {
    /// Parse a `whsec_...` secret (the prefix is optional).
    pub fn parse(raw: &str) -> Result<Self, SignatureError> {
        let encoded = raw.strip_prefix(SECRET_PREFIX).unwrap_or(raw);
        let key = Base64::decode_vec(encoded).map_err(|_| SignatureError::InvalidSecret)?;
        if key.is_empty() {
            return Err(SignatureError::InvalidSecret);
        }
        Ok(Self { key })
    }
}

/// The three Svix headers of one delivery.
#[derive(Debug, Clone, Copy)]
pub struct SignedHeaders<'a> {
    pub id: &'a str,
    pub timestamp: &'a str,
    pub signature: &'a str,
}

/// Verifies Svix-signed payloads with a shared secret.
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    secret: WebhookSecret,
    tolerance_secs: i64,
}

impl WebhookVerifier {
    pub fn new(secret: WebhookSecret) -> Self {
        Self {
            secret,
            tolerance_secs: TIMESTAMP_TOLERANCE_SECS,
        }
    }

    /// Verify `body` against the headers using the current time.
    pub fn verify(&self, headers: SignedHeaders<'_>, body: &[u8]) -> Result<(), SignatureError> {
        self.verify_at(headers, body, Utc::now())
    }

    /// Verify `body` against the headers as if the current time were `now`.
    pub fn verify_at(
        &self,
        headers: SignedHeaders<'_>,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<(), SignatureError> {
        let timestamp: i64 = headers
            .timestamp
            .trim()
            .parse()
            .map_err(|_| SignatureError::InvalidTimestamp)?;

        let now = now.timestamp();
        if timestamp < now - self.tolerance_secs {
            return Err(SignatureError::TimestampTooOld);
        }
        if timestamp > now + self.tolerance_secs {
            return Err(SignatureError::TimestampTooNew);
        }

        let mac = self.mac(headers.id, headers.timestamp.trim(), body)?;

        let matched = headers
            .signature
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == SIGNATURE_VERSION)
            .filter_map(|(_, sig)| Base64::decode_vec(sig).ok())
            .any(|sig| mac.clone().verify_slice(&sig).is_ok());

        if matched {
            Ok(())
        } else {
            Err(SignatureError::NoMatchingSignature)
        }
    }

    /// Produce a `v1,<base64>` signature for the given message.
    pub fn sign(&self, id: &str, timestamp: i64, body: &[u8]) -> Result<String, SignatureError> {
        let mac = self.mac(id, &timestamp.to_string(), body)?;
        let digest = mac.finalize().into_bytes();
        Ok(format!("{SIGNATURE_VERSION},{}", Base64::encode_string(&digest)))
    }

    fn mac(&self, id: &str, timestamp: &str, body: &[u8]) -> Result<HmacSha256, SignatureError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret.key)
            .map_err(|_| SignatureError::InvalidSecret)?;
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(mac)
    }
}
