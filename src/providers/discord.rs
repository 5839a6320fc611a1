// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chat platform REST API (Discord).

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::{build_http_client, ensure_success, request_error, ProviderError};
use crate::config::AppConfig;

const ROLE_ENDPOINT: &str = "role grant";
const WEBHOOK_ENDPOINT: &str = "webhook post";
const MESSAGE_ENDPOINT: &str = "channel message";

/// Reason recorded in the guild audit log for role grants.
const ROLE_GRANT_REASON: &str = "Wiki account verified";

/// Chat platform operations used by the service.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// Add a role to a guild member. Granting a held role is a no-op.
    async fn add_member_role(
        &self,
        guild_id: &str,
        user_id: u64,
        role_id: &str,
    ) -> Result<(), ProviderError>;

    /// Post a message through an incoming webhook URL.
    async fn execute_webhook(&self, webhook_url: &str, content: &str) -> Result<(), ProviderError>;

    /// Post a message to a channel as the bot.
    async fn create_message(&self, channel_id: &str, content: &str) -> Result<(), ProviderError>;
}

/// reqwest-backed [`PlatformApi`] authenticating as the bot.
#[derive(Debug, Clone)]
pub struct DiscordClient {
    api_base: String,
    bot_token: String,
    http: Client,
}

impl DiscordClient {
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            api_base: config.discord_api_base.clone(),
            bot_token: config.bot_token.clone(),
            http: build_http_client()?,
        })
    }

    fn authorization(&self) -> String {
        format!("Bot {}", self.bot_token)
    }

    fn role_url(&self, guild_id: &str, user_id: u64, role_id: &str) -> String {
        format!(
            "{}/guilds/{guild_id}/members/{user_id}/roles/{role_id}",
            self.api_base
        )
    }

    fn message_url(&self, channel_id: &str) -> String {
        format!("{}/channels/{channel_id}/messages", self.api_base)
    }
}

#[async_trait]
impl PlatformApi for DiscordClient {
    async fn add_member_role(
        &self,
        guild_id: &str,
        user_id: u64,
        role_id: &str,
    ) -> Result<(), ProviderError> {
        let response = self
            .http
            .put(self.role_url(guild_id, user_id, role_id))
            .header("Authorization", self.authorization())
            .header("X-Audit-Log-Reason", ROLE_GRANT_REASON)
            .body("")
            .send()
            .await
            .map_err(|e| request_error(ROLE_ENDPOINT, e))?;
        ensure_success(ROLE_ENDPOINT, response).await?;
        Ok(())
    }

    async fn execute_webhook(&self, webhook_url: &str, content: &str) -> Result<(), ProviderError> {
        let response = self
            .http
            .post(webhook_url)
            .json(&json!({ "content": content }))
            .send()
            .await
            .map_err(|e| request_error(WEBHOOK_ENDPOINT, e))?;
        ensure_success(WEBHOOK_ENDPOINT, response).await?;
        Ok(())
    }

    async fn create_message(&self, channel_id: &str, content: &str) -> Result<(), ProviderError> {
        let response = self
            .http
            .post(self.message_url(channel_id))
            .header("Authorization", self.authorization())
            .json(&json!({ "content": content }))
            .send()
            .await
            .map_err(|e| request_error(MESSAGE_ENDPOINT, e))?;
        ensure_success(MESSAGE_ENDPOINT, response).await?;
        Ok(())
    }
}
