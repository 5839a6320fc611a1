// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! Rejections at the verification boundaries never reveal which check
//! failed; the detailed reason is logged by the extractor and dropped here.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// Interaction request failed Ed25519 verification
    InvalidRequestSignature,
    /// Delivery webhook failed HMAC or freshness verification
    InvalidDeliverySignature,
    /// Delivery webhook secret is not configured
    DeliveryWebhookDisabled,
    /// Request body could not be read
    UnreadableBody,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::InvalidRequestSignature => "invalid_request_signature",
            AuthError::InvalidDeliverySignature => "invalid_delivery_signature",
            AuthError::DeliveryWebhookDisabled => "delivery_webhook_disabled",
            AuthError::UnreadableBody => "unreadable_body",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidRequestSignature => StatusCode::UNAUTHORIZED,
            AuthError::InvalidDeliverySignature | AuthError::UnreadableBody => {
                StatusCode::BAD_REQUEST
            }
            AuthError::DeliveryWebhookDisabled => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidRequestSignature => write!(f, "Invalid request signature"),
            AuthError::InvalidDeliverySignature => write!(f, "Invalid webhook signature"),
            AuthError::DeliveryWebhookDisabled => write!(f, "Delivery webhook is not configured"),
            AuthError::UnreadableBody => write!(f, "Request body could not be read"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
