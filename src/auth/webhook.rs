// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verification of mail delivery webhooks.
//!
//! The mail provider sends a `producer-signature` header of the form
//! `ts=<unix millis>;s=<base64 HMAC-SHA256 of the raw body>`. Requests are
//! accepted only when the timestamp is at most [`FRESHNESS_WINDOW_MS`] old
//! and the tag matches. Timestamps in the future are not rejected.

use std::collections::HashMap;

use base64ct::{Base64Unpadded, Encoding};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the delivery signature.
pub const SIGNATURE_HEADER: &str = "producer-signature";

/// Maximum accepted age of a signed delivery, in milliseconds.
pub const FRESHNESS_WINDOW_MS: i64 = 5 * 60 * 1000;

/// Reasons a delivery is rejected. Every variant maps to the same response;
/// the distinction only reaches the logs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WebhookError {
    #[error("signature header missing")]
    MissingHeader,

    #[error("signature header is missing `ts` or `s`")]
    MissingFields,

    #[error("signature timestamp is not an integer: {0}")]
    InvalidTimestamp(String),

    #[error("signature timestamp is {age_ms} ms old")]
    Stale { age_ms: i64 },

    #[error("signature does not match body")]
    InvalidSignature,
}

/// Parsed `producer-signature` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverySignature {
    /// Signing time in unix milliseconds.
    pub ts: i64,
    /// Base64 tag as sent.
    pub s: String,
}

impl DeliverySignature {
    /// Parse a `key=value;key=value` header. Unknown keys are ignored.
    pub fn parse(header: &str) -> Result<Self, WebhookError> {
        let decoded = urlencoding::decode(header).map_err(|_| WebhookError::MissingFields)?;
        let fields: HashMap<&str, &str> = decoded
            .split(';')
            .filter_map(|part| part.split_once('='))
            .map(|(key, value)| (key.trim(), value.trim()))
            .collect();

        let (Some(ts), Some(s)) = (fields.get("ts"), fields.get("s")) else {
            return Err(WebhookError::MissingFields);
        };
        if ts.is_empty() || s.is_empty() {
            return Err(WebhookError::MissingFields);
        }

        let ts = ts
            .parse::<i64>()
            .map_err(|_| WebhookError::InvalidTimestamp(ts.to_string()))?;

        Ok(Self {
            ts,
            s: s.to_string(),
        })
    }
}

/// Verifies delivery webhooks signed with the shared secret.
#[derive(Clone)]
pub struct WebhookAuthenticator {
    mac: HmacSha256,
}

impl WebhookAuthenticator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            mac: HmacSha256::new_from_slice(secret.as_ref())
                .expect("HMAC accepts keys of any length"),
        }
    }

    /// Verify a delivery against the current time.
    pub fn verify(&self, header: Option<&str>, body: &[u8]) -> Result<(), WebhookError> {
        self.verify_at(header, body, Utc::now().timestamp_millis())
    }

    /// Verify a delivery as of `now_ms` (unix milliseconds).
    pub fn verify_at(
        &self,
        header: Option<&str>,
        body: &[u8],
        now_ms: i64,
    ) -> Result<(), WebhookError> {
        let header = header.ok_or(WebhookError::MissingHeader)?;
        let signature = DeliverySignature::parse(header)?;

        let age_ms = now_ms.saturating_sub(signature.ts);
        if age_ms > FRESHNESS_WINDOW_MS {
            return Err(WebhookError::Stale { age_ms });
        }

        // Padding is optional on the wire.
        let received = Base64Unpadded::decode_vec(signature.s.trim_end_matches('='))
            .map_err(|_| WebhookError::InvalidSignature)?;

        let mut mac = self.mac.clone();
        mac.update(body);
        // verify_slice rejects length mismatches and compares in constant time
        mac.verify_slice(&received)
            .map_err(|_| WebhookError::InvalidSignature)
    }
}

impl std::fmt::Debug for WebhookAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookAuthenticator").finish_non_exhaustive()
    }
}
