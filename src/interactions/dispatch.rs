// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Routes verified interactions to their handlers.

use tracing::{debug, error};

use super::{Interaction, InteractionResponse, User};
use crate::error::ApiError;
use crate::state::AppState;

const VERIFY_COMMANDS: [&str; 2] = ["verify", "v"];
const VERIFY_COMPONENT: &str = "verify";

const ALREADY_VERIFIED: &str = "Verification successful!";
const VERIFY_BUTTON_LABEL: &str = "Log in to the wiki";

pub async fn dispatch(
    state: &AppState,
    interaction: Interaction,
) -> Result<InteractionResponse, ApiError> {
    match interaction {
        Interaction::Ping => Ok(InteractionResponse::pong()),
        Interaction::Command(command) => {
            if VERIFY_COMMANDS.contains(&command.name.as_str()) {
                verify(state, &command.user).await
            } else {
                debug!(name = %command.name, "unknown command");
                Err(ApiError::bad_request("Nonexistent command."))
            }
        }
        Interaction::Component(component) => {
            if component.custom_id == VERIFY_COMPONENT {
                verify(state, &component.user).await
            } else {
                debug!(custom_id = %component.custom_id, "unknown component");
                Err(ApiError::bad_request("Nonexistent component."))
            }
        }
    }
}

/// Re-grant the role to linked users, otherwise hand out an authorization
/// link bound to the user.
async fn verify(state: &AppState, user: &User) -> Result<InteractionResponse, ApiError> {
    let linked = state.flow.resync(user.id).await.map_err(|e| {
        error!(platform_user_id = user.id, error = %e, "failed to read identity store");
        ApiError::internal("Failed to look up verification status.")
    })?;
    if linked {
        return Ok(InteractionResponse::ephemeral(ALREADY_VERIFIED));
    }

    let url = state.flow.begin(user.id).map_err(|e| {
        error!(error = %e, "failed to build authorization URL");
        ApiError::internal("Failed to start verification.")
    })?;
    let content = format!(
        "**To continue verification, please visit this link:** <{url}>.\n\
         Log in to the wiki and allow access. Your account is verified as soon as you return \
         to the confirmation page."
    );
    Ok(InteractionResponse::ephemeral(content).with_link_button(VERIFY_BUTTON_LABEL, url))
}
