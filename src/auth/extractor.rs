// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for signed request bodies.
//!
//! Both extractors capture the raw body bytes at the transport boundary,
//! verify them, and only then hand them to the handler for parsing:
//!
//! ```rust,ignore
//! async fn interactions(SignedInteraction(body): SignedInteraction) -> impl IntoResponse {
//!     // body is the verified raw payload
//! }
//! ```

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::HeaderMap,
};
use tracing::{debug, warn};

use super::{interaction, webhook, AuthError};
use crate::state::AppState;

/// Raw body of an interaction request whose Ed25519 signature verified.
#[derive(Debug)]
pub struct SignedInteraction(pub Bytes);

impl FromRequest<AppState> for SignedInteraction {
    type Rejection = AuthError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let signature = header_value(req.headers(), interaction::SIGNATURE_HEADER);
        let timestamp = header_value(req.headers(), interaction::TIMESTAMP_HEADER);

        // Reject before the body is even read.
        if signature.is_none() || timestamp.is_none() {
            debug!("interaction request without signature headers");
            return Err(AuthError::InvalidRequestSignature);
        }

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|_| AuthError::UnreadableBody)?;

        state
            .request_auth
            .verify(signature.as_deref(), timestamp.as_deref(), &body)
            .map_err(|error| {
                warn!(error = %error, "interaction signature rejected");
                AuthError::InvalidRequestSignature
            })?;

        Ok(SignedInteraction(body))
    }
}

/// Raw body of a delivery webhook whose HMAC signature verified.
#[derive(Debug)]
pub struct SignedDelivery(pub Bytes);

impl FromRequest<AppState> for SignedDelivery {
    type Rejection = AuthError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(authenticator) = state.webhook_auth.clone() else {
            warn!("delivery webhook received but ZEPTOMAIL_AUTH is not configured");
            return Err(AuthError::DeliveryWebhookDisabled);
        };

        let header = header_value(req.headers(), webhook::SIGNATURE_HEADER);
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|_| AuthError::UnreadableBody)?;

        authenticator
            .verify(header.as_deref(), &body)
            .map_err(|error| {
                warn!(error = %error, "delivery webhook rejected");
                AuthError::InvalidDeliverySignature
            })?;

        Ok(SignedDelivery(body))
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
