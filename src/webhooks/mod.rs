// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Clerk Webhooks
//!
//! Keeps the local `users` table in sync with Clerk.
//!
//! ## Flow
//!
//! 1. Clerk (via Svix) POSTs a signed event to `/api/webhooks/clerk`
//! 2. The raw body is verified against `svix-id`, `svix-timestamp` and
//!    `svix-signature` using `CLERK_WEBHOOK_SECRET`
//! 3. Only a verified body is parsed into a [`WebhookEvent`]
//! 4. [`IdentityReconciler`] applies the event in a single transaction
//!
//! Clerk delivers at least once and possibly out of order; a non-2xx answer
//! makes it redeliver.

pub mod error;
pub mod event;
pub mod reconciler;
pub mod signature;

pub use error::WebhookError;
pub use event::{ClerkUser, WebhookEvent};
pub use reconciler::IdentityReconciler;
pub use signature::{SignatureError, SignedHeaders, WebhookSecret, WebhookVerifier};
