// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

pub mod delivery;
pub mod health;
pub mod interactions;
pub mod oauth;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/interactions", post(interactions::handle_interaction))
        .route("/oauth/callback", get(oauth::oauth_callback))
        .route("/webhooks/zeptomail", post(delivery::delivery_webhook))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .fallback(redirect_to_invite)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state)
}

/// Unknown paths lead to the community invite when one is configured.
async fn redirect_to_invite(State(state): State<AppState>) -> Response {
    match &state.config.discord_invite {
        Some(invite) => (StatusCode::FOUND, [(header::LOCATION, invite.clone())]).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        interactions::handle_interaction,
        oauth::oauth_callback,
        delivery::delivery_webhook,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Interactions", description = "Signed chat platform interactions"),
        (name = "OAuth", description = "Wiki account linking"),
        (name = "Webhooks", description = "Mail delivery notifications"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
