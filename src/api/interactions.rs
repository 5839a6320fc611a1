// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};

use crate::{
    auth::SignedInteraction,
    error::ApiError,
    interactions::{self, InteractionResponse},
    state::AppState,
};

/// Chat platform interaction endpoint.
///
/// The body is parsed only after its signature verified over the raw bytes.
#[utoipa::path(
    post,
    path = "/interactions",
    tag = "Interactions",
    request_body(content = String, description = "Signed interaction payload", content_type = "application/json"),
    params(
        ("x-signature-ed25519" = String, Header, description = "Hex Ed25519 signature of timestamp + body"),
        ("x-signature-timestamp" = String, Header, description = "Signed timestamp")
    ),
    responses(
        (status = 200, description = "Interaction response envelope"),
        (status = 400, description = "Unknown interaction, command or component"),
        (status = 401, description = "Invalid request signature")
    )
)]
pub async fn handle_interaction(
    State(state): State<AppState>,
    SignedInteraction(body): SignedInteraction,
) -> Result<Json<InteractionResponse>, ApiError> {
    let interaction = interactions::parse(&body)?;
    let response = interactions::dispatch(&state, interaction).await?;
    Ok(Json(response))
}
