// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! The three trust boundaries of the service:
//!
//! 1. **Interaction requests** from the chat platform carry an Ed25519
//!    signature over `timestamp || raw body` ([`RequestAuthenticator`]).
//! 2. **OAuth2 state tokens** round-tripped through the wiki are
//!    HMAC-protected and bind a platform user ID ([`TokenCodec`]).
//! 3. **Delivery webhooks** from the mail provider carry a time-windowed
//!    HMAC over the raw body ([`WebhookAuthenticator`]).
//!
//! ## Security
//!
//! - Signatures are always checked over raw transport bytes, never over a
//!   re-serialized payload
//! - Tag comparisons are constant-time
//! - Rejections are generic; the failing check only reaches the logs
//! - There is no replay-nonce store: state tokens never expire and a
//!   delivery may be replayed within its freshness window

pub mod error;
pub mod extractor;
pub mod interaction;
pub mod token;
pub mod webhook;

pub use error::AuthError;
pub use extractor::{SignedDelivery, SignedInteraction};
pub use interaction::{RequestAuthenticator, SignatureError};
pub use token::{InvalidToken, TokenCodec};
pub use webhook::{DeliverySignature, WebhookAuthenticator, WebhookError};
