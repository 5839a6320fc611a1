// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ed25519 verification of inbound interaction requests.
//!
//! The platform signs `timestamp || body` and sends the signature and the
//! timestamp in headers. Verification always runs over the raw body bytes
//! exactly as received; a parsed and re-serialized payload may differ in
//! key order, number formatting or whitespace.

use ring::signature::{UnparsedPublicKey, ED25519};

/// Header carrying the hex-encoded Ed25519 signature.
pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";

/// Header carrying the signed timestamp.
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

/// Reasons a signed request is rejected. Only used for logging; every
/// variant maps to the same response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("signature or timestamp header missing")]
    MissingHeaders,

    #[error("signature header is not valid hex")]
    MalformedSignature,

    #[error("signature does not match")]
    Mismatch,
}

/// Verifies interaction requests against the application's public key.
#[derive(Debug, Clone)]
pub struct RequestAuthenticator {
    public_key: UnparsedPublicKey<[u8; 32]>,
}

impl RequestAuthenticator {
    pub fn new(public_key: [u8; 32]) -> Self {
        Self {
            public_key: UnparsedPublicKey::new(&ED25519, public_key),
        }
    }

    /// Verify `signature` over `timestamp || body`.
    pub fn verify(
        &self,
        signature: Option<&str>,
        timestamp: Option<&str>,
        body: &[u8],
    ) -> Result<(), SignatureError> {
        let (Some(signature), Some(timestamp)) = (signature, timestamp) else {
            return Err(SignatureError::MissingHeaders);
        };
        if signature.is_empty() || timestamp.is_empty() {
            return Err(SignatureError::MissingHeaders);
        }

        let signature = hex::decode(signature).map_err(|_| SignatureError::MalformedSignature)?;

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        self.public_key
            .verify(&message, &signature)
            .map_err(|_| SignatureError::Mismatch)
    }
}
