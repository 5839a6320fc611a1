// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tracing::info;

use crate::auth::{RequestAuthenticator, WebhookAuthenticator};
use crate::config::AppConfig;
use crate::notify::RoleGrantNotifier;
use crate::oauth::OAuthFlow;
use crate::providers::{DiscordClient, PlatformApi, ProviderError, WikiOAuth, WikiOAuthClient};
use crate::storage::{IdentityStore, MemoryIdentityStore, RedbIdentityStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to open identity store: {0}")]
    Store(#[from] StoreError),

    #[error("failed to build HTTP client: {0}")]
    Provider(#[from] ProviderError),
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn IdentityStore>,
    pub request_auth: Arc<RequestAuthenticator>,
    /// `None` when `ZEPTOMAIL_AUTH` is unset.
    pub webhook_auth: Option<Arc<WebhookAuthenticator>>,
    pub flow: Arc<OAuthFlow>,
    pub notifier: RoleGrantNotifier,
}

impl AppState {
    /// Wire the service from explicit collaborators.
    pub fn from_parts(
        config: AppConfig,
        store: Arc<dyn IdentityStore>,
        wiki: Arc<dyn WikiOAuth>,
        platform: Arc<dyn PlatformApi>,
    ) -> Self {
        let notifier = RoleGrantNotifier::new(platform, &config);
        let flow = OAuthFlow::new(&config, wiki, store.clone(), notifier.clone());
        let webhook_auth = config
            .zeptomail_auth
            .as_deref()
            .map(|secret| Arc::new(WebhookAuthenticator::new(secret.as_bytes())));

        Self {
            request_auth: Arc::new(RequestAuthenticator::new(config.bot_public_key)),
            webhook_auth,
            flow: Arc::new(flow),
            notifier,
            store,
            config: Arc::new(config),
        }
    }

    /// Wire the service against the real store and HTTP clients.
    pub fn from_config(config: AppConfig) -> Result<Self, StateError> {
        let store: Arc<dyn IdentityStore> = match config.identity_db_path() {
            Some(path) => {
                info!(path = %path.display(), "opening identity database");
                Arc::new(RedbIdentityStore::open(&path)?)
            }
            None => {
                info!("using in-memory identity store; links are lost on restart");
                Arc::new(MemoryIdentityStore::new())
            }
        };
        let wiki = Arc::new(WikiOAuthClient::from_config(&config)?);
        let platform = Arc::new(DiscordClient::from_config(&config)?);
        Ok(Self::from_parts(config, store, wiki, platform))
    }
}
