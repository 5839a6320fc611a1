// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Outbound HTTP integrations.
//!
//! - [`wiki`]: OAuth2 token exchange and profile lookup against the wiki
//! - [`discord`]: role grants and message posts on the chat platform
//!
//! Each integration is an async trait so the OAuth2 flow can be exercised
//! without network access.

use std::time::Duration;

use reqwest::{Client, Response};
use tracing::error;

pub mod discord;
pub mod wiki;

pub use discord::{DiscordClient, PlatformApi};
pub use wiki::{AccessToken, WikiOAuth, WikiOAuthClient, WikiProfile};

/// Timeout applied to every outbound request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{endpoint} request failed: {message}")]
    Request {
        endpoint: &'static str,
        message: String,
    },

    /// Non-2xx response. The body is kept for server-side logs only.
    #[error("{endpoint} returned HTTP {status}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    #[error("{endpoint} response was invalid: {message}")]
    InvalidResponse {
        endpoint: &'static str,
        message: String,
    },
}

pub(crate) fn build_http_client() -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| ProviderError::Request {
            endpoint: "client",
            message: format!("failed to build HTTP client: {e}"),
        })
}

/// Pass 2xx responses through; log and convert anything else.
pub(crate) async fn ensure_success(
    endpoint: &'static str,
    response: Response,
) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    error!(
        endpoint,
        status = status.as_u16(),
        body = %body,
        "upstream request failed"
    );
    Err(ProviderError::Status {
        endpoint,
        status: status.as_u16(),
        body,
    })
}

pub(crate) fn request_error(endpoint: &'static str, error: reqwest::Error) -> ProviderError {
    ProviderError::Request {
        endpoint,
        message: error.to_string(),
    }
}
