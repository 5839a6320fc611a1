// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for unit tests: a fully wired [`AppState`] backed by an
//! in-memory store and recording fakes of the outbound APIs, plus a local
//! HTTP upstream for exercising the real clients.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::Router;
use ring::signature::Ed25519KeyPair;
use serde_json::Value;
use tokio::net::TcpListener;

use crate::auth::interaction::tests::keypair;
use crate::auth::TokenCodec;
use crate::config::tests::base_vars;
use crate::config::{AppConfig, IN_MEMORY_DATA_DIR};
use crate::providers::{AccessToken, PlatformApi, ProviderError, WikiOAuth, WikiProfile};
use crate::state::AppState;
use crate::storage::{IdentityStore, MemoryIdentityStore, StoreError, StoreResult};

pub(crate) const DELIVERY_SECRET: &str = "delivery-secret";
pub(crate) const INVITE_URL: &str = "https://discord.gg/example";

/// Configuration used by every test, with all optional features enabled.
pub(crate) fn test_config() -> AppConfig {
    let mut vars = base_vars();
    vars.insert("NOTIFICATION_CHANNEL", "3000".to_string());
    vars.insert("ZEPTOMAIL_AUTH", DELIVERY_SECRET.to_string());
    vars.insert("DISCORD_INVITE", INVITE_URL.to_string());
    vars.insert("DATA_DIR", IN_MEMORY_DATA_DIR.to_string());
    AppConfig::from_lookup(|name| vars.get(name).cloned()).expect("test config should load")
}

/// Store whose every operation fails.
pub(crate) struct FailingStore;

fn disk_unavailable() -> StoreError {
    StoreError::Io(std::io::Error::other("disk unavailable"))
}

#[async_trait]
impl IdentityStore for FailingStore {
    async fn get(&self, _platform_user_id: u64) -> StoreResult<Option<String>> {
        Err(disk_unavailable())
    }

    async fn put(&self, _platform_user_id: u64, _external_id: &str) -> StoreResult<()> {
        Err(disk_unavailable())
    }
}

#[derive(Default)]
pub(crate) struct FakeWiki {
    profile: Mutex<Option<Value>>,
    codes: Mutex<Vec<String>>,
    fail_exchange: AtomicBool,
    fail_profile: AtomicBool,
}

impl FakeWiki {
    /// Profile JSON returned by the next profile fetches.
    pub(crate) fn set_profile(&self, profile: Value) {
        *self.profile.lock().unwrap() = Some(profile);
    }

    pub(crate) fn fail_exchange(&self) {
        self.fail_exchange.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_profile(&self) {
        self.fail_profile.store(true, Ordering::SeqCst);
    }

    pub(crate) fn exchanged_codes(&self) -> Vec<String> {
        self.codes.lock().unwrap().clone()
    }
}

#[async_trait]
impl WikiOAuth for FakeWiki {
    async fn exchange_code(&self, code: &str) -> Result<AccessToken, ProviderError> {
        self.codes.lock().unwrap().push(code.to_string());
        if self.fail_exchange.load(Ordering::SeqCst) {
            return Err(ProviderError::Status {
                endpoint: "token exchange",
                status: 400,
                body: "invalid_grant".to_string(),
            });
        }
        Ok(AccessToken::new(format!("access-{code}")))
    }

    async fn fetch_profile(&self, _token: &AccessToken) -> Result<WikiProfile, ProviderError> {
        if self.fail_profile.load(Ordering::SeqCst) {
            return Err(ProviderError::Status {
                endpoint: "profile fetch",
                status: 401,
                body: "invalid token".to_string(),
            });
        }
        let profile = self.profile.lock().unwrap().clone();
        let profile = profile.ok_or_else(|| ProviderError::InvalidResponse {
            endpoint: "profile fetch",
            message: "no profile configured".to_string(),
        })?;
        serde_json::from_value(profile).map_err(|e| ProviderError::InvalidResponse {
            endpoint: "profile fetch",
            message: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PlatformCall {
    AddRole {
        guild_id: String,
        user_id: u64,
        role_id: String,
    },
    Webhook {
        url: String,
        content: String,
    },
    Message {
        channel_id: String,
        content: String,
    },
}

#[derive(Default)]
pub(crate) struct FakePlatform {
    calls: Mutex<Vec<PlatformCall>>,
    fail_roles: AtomicBool,
    fail_posts: AtomicBool,
}

impl FakePlatform {
    /// A platform on which every call fails.
    pub(crate) fn failing() -> Self {
        let platform = Self::default();
        platform.fail_role_grants();
        platform.fail_posts();
        platform
    }

    pub(crate) fn fail_role_grants(&self) {
        self.fail_roles.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_posts(&self) {
        self.fail_posts.store(true, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: PlatformCall, fail: &AtomicBool) -> Result<(), ProviderError> {
        self.calls.lock().unwrap().push(call);
        if fail.load(Ordering::SeqCst) {
            return Err(ProviderError::Status {
                endpoint: "fake platform",
                status: 500,
                body: "unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PlatformApi for FakePlatform {
    async fn add_member_role(
        &self,
        guild_id: &str,
        user_id: u64,
        role_id: &str,
    ) -> Result<(), ProviderError> {
        self.record(
            PlatformCall::AddRole {
                guild_id: guild_id.to_string(),
                user_id,
                role_id: role_id.to_string(),
            },
            &self.fail_roles,
        )
    }

    async fn execute_webhook(&self, webhook_url: &str, content: &str) -> Result<(), ProviderError> {
        self.record(
            PlatformCall::Webhook {
                url: webhook_url.to_string(),
                content: content.to_string(),
            },
            &self.fail_posts,
        )
    }

    async fn create_message(&self, channel_id: &str, content: &str) -> Result<(), ProviderError> {
        self.record(
            PlatformCall::Message {
                channel_id: channel_id.to_string(),
                content: content.to_string(),
            },
            &self.fail_posts,
        )
    }
}

/// Application state plus handles to its collaborators.
pub(crate) struct TestHarness {
    pub state: AppState,
    pub config: AppConfig,
    /// Key matching the state's interaction public key.
    pub signing_key: Ed25519KeyPair,
    pub store: Arc<MemoryIdentityStore>,
    pub wiki: Arc<FakeWiki>,
    pub platform: Arc<FakePlatform>,
}

impl TestHarness {
    /// State token the service would issue for `platform_user_id`.
    pub(crate) fn issue_token(&self, platform_user_id: u64) -> String {
        TokenCodec::new(self.config.secret_key.as_bytes()).issue(platform_user_id)
    }

    /// Rewire the state onto `store`. `self.store` is left detached.
    pub(crate) fn with_store(mut self, store: Arc<dyn IdentityStore>) -> Self {
        self.state = AppState::from_parts(
            self.config.clone(),
            store,
            self.wiki.clone(),
            self.platform.clone(),
        );
        self
    }
}

pub(crate) fn test_state() -> TestHarness {
    let (signing_key, public_key) = keypair();
    let mut config = test_config();
    config.bot_public_key = public_key;

    let store = Arc::new(MemoryIdentityStore::new());
    let wiki = Arc::new(FakeWiki::default());
    let platform = Arc::new(FakePlatform::default());
    let state = AppState::from_parts(
        config.clone(),
        store.clone(),
        wiki.clone(),
        platform.clone(),
    );

    TestHarness {
        state,
        config,
        signing_key,
        store,
        wiki,
        platform,
    }
}

/// A request as seen by [`spawn_upstream`].
#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: String,
}

impl RecordedRequest {
    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// Serve every request on a local port with `status` and `body`, recording
/// what arrives. Returns the base URL and the request log.
pub(crate) async fn spawn_upstream(
    status: u16,
    body: &'static str,
) -> (String, Arc<Mutex<Vec<RecordedRequest>>>) {
    let recorded = Arc::new(Mutex::new(Vec::new()));
    let log = recorded.clone();
    let status = StatusCode::from_u16(status).unwrap();
    let app = Router::new().fallback(
        move |method: Method, uri: Uri, headers: HeaderMap, request_body: String| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push(RecordedRequest {
                    method,
                    path: uri.path().to_string(),
                    headers,
                    body: request_body,
                });
                (status, body)
            }
        },
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    (format!("http://{addr}"), recorded)
}
