// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Best-effort side effects: role grants, verification log posts and
//! operator alerts.
//!
//! None of these operations return a `Result`. Failures are reduced to a
//! log entry and reported as [`Outcome::Failed`], which callers may inspect
//! but cannot propagate with `?`.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::providers::PlatformApi;

/// Result of a best-effort operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Failed,
    /// Not attempted because the target is not configured.
    Skipped,
}

/// Grants the verified role and posts verification notices.
#[derive(Clone)]
pub struct RoleGrantNotifier {
    api: Arc<dyn PlatformApi>,
    guild_id: String,
    role_id: String,
    audit_webhook: String,
    alert_channel: Option<String>,
}

impl RoleGrantNotifier {
    pub fn new(api: Arc<dyn PlatformApi>, config: &AppConfig) -> Self {
        Self {
            api,
            guild_id: config.verify_guild.clone(),
            role_id: config.verify_role.clone(),
            audit_webhook: config.verify_webhook.clone(),
            alert_channel: config.notification_channel.clone(),
        }
    }

    /// Grant the verified role. Idempotent on the platform side.
    pub async fn grant_role(&self, platform_user_id: u64) -> Outcome {
        match self
            .api
            .add_member_role(&self.guild_id, platform_user_id, &self.role_id)
            .await
        {
            Ok(()) => {
                debug!(platform_user_id, "verified role granted");
                Outcome::Completed
            }
            Err(error) => {
                warn!(
                    platform_user_id,
                    error = %error,
                    "failed to grant verified role"
                );
                Outcome::Failed
            }
        }
    }

    /// Post to the verification log.
    pub async fn notify(&self, message: &str) -> Outcome {
        match self.api.execute_webhook(&self.audit_webhook, message).await {
            Ok(()) => Outcome::Completed,
            Err(error) => {
                warn!(error = %error, "failed to post to verification log");
                Outcome::Failed
            }
        }
    }

    /// Post an operator alert to the notification channel, if configured.
    pub async fn alert(&self, message: &str) -> Outcome {
        let Some(channel) = &self.alert_channel else {
            warn!("NOTIFICATION_CHANNEL is not configured; alert dropped");
            return Outcome::Skipped;
        };
        match self.api.create_message(channel, message).await {
            Ok(()) => Outcome::Completed,
            Err(error) => {
                warn!(error = %error, channel = %channel, "failed to post alert");
                Outcome::Failed
            }
        }
    }
}

/// Verification log line: a mention of the platform user and a link to the
/// wiki user page.
pub fn verification_log_message(
    platform_user_id: u64,
    username: &str,
    wiki_base_url: &str,
) -> String {
    format!(
        "<@{platform_user_id}> - [{username}](<{wiki_base_url}/User:{}>)",
        urlencoding::encode(username)
    )
}
