// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Mail delivery notifications.

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{auth::SignedDelivery, error::ApiError, state::AppState};

const HARD_BOUNCE_EVENT: &str = "hardbounce";
const HARD_BOUNCE_ALERT: &str = "Received a hard bounce. Check Zeptomail for details.";

#[derive(Debug, Deserialize)]
struct DeliveryEvent {
    #[serde(default)]
    event_name: Option<EventNames>,
}

/// `event_name` arrives either as a single name or a list of names.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EventNames {
    One(String),
    Many(Vec<String>),
}

impl EventNames {
    fn mentions(&self, needle: &str) -> bool {
        match self {
            EventNames::One(name) => name.contains(needle),
            EventNames::Many(names) => names.iter().any(|name| name.contains(needle)),
        }
    }
}

/// Mail provider delivery webhook.
///
/// Accepts any authenticated event and raises an operator alert on hard
/// bounces.
#[utoipa::path(
    post,
    path = "/webhooks/zeptomail",
    tag = "Webhooks",
    request_body(content = String, description = "Delivery event", content_type = "application/json"),
    params(
        ("producer-signature" = String, Header, description = "`ts=<millis>;s=<base64 HMAC-SHA256>`")
    ),
    responses(
        (status = 204, description = "Event accepted"),
        (status = 400, description = "Invalid signature or payload"),
        (status = 503, description = "Webhook secret not configured")
    )
)]
pub async fn delivery_webhook(
    State(state): State<AppState>,
    SignedDelivery(body): SignedDelivery,
) -> Result<StatusCode, ApiError> {
    let event: DeliveryEvent = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "authenticated delivery event is not valid JSON");
        ApiError::bad_request("Malformed delivery event")
    })?;

    if event
        .event_name
        .as_ref()
        .is_some_and(|names| names.mentions(HARD_BOUNCE_EVENT))
    {
        info!("hard bounce reported by mail provider");
        state.notifier.alert(HARD_BOUNCE_ALERT).await;
    }

    Ok(StatusCode::NO_CONTENT)
}
