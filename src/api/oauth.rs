// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::{
    oauth::{CallbackParams, SUCCESS_MESSAGE},
    state::AppState,
};

/// OAuth2 redirect target of the wiki authorization step.
///
/// Answers in plain text: the success message, or the rejection reason with
/// a 400 status. An unreadable query counts as missing code and state.
#[utoipa::path(
    get,
    path = "/oauth/callback",
    tag = "OAuth",
    params(CallbackParams),
    responses(
        (status = 200, description = "Account linked", body = String, content_type = "text/plain"),
        (status = 400, description = "Linking rejected; body holds the reason", body = String, content_type = "text/plain")
    )
)]
pub async fn oauth_callback(
    State(state): State<AppState>,
    query: Result<Query<CallbackParams>, QueryRejection>,
) -> Response {
    let params = match query {
        Ok(Query(params)) => params,
        Err(rejection) => {
            debug!(error = %rejection, "unreadable callback query");
            CallbackParams::default()
        }
    };
    match state.flow.complete(params).await {
        Ok(_) => (StatusCode::OK, SUCCESS_MESSAGE).into_response(),
        Err(rejection) => (StatusCode::BAD_REQUEST, rejection.reason()).into_response(),
    }
}
