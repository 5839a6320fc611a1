// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Account Linking Flow
//!
//! Links a chat platform user to a wiki account through the wiki's OAuth2
//! authorization-code grant.
//!
//! ## Stages
//!
//! ```text
//! Initiated → CallbackReceived → TokenVerified → CodeExchanged → ProfileFetched
//!           → Eligible → Persisted → Notified → RoleGranted → Done
//! ```
//!
//! Any stage before `Persisted` may end in a [`Rejection`]. From `Persisted`
//! on the outcome is fixed: the verification log post and the role grant are
//! best-effort and never undo the stored mapping or change the response.
//!
//! [`OAuthFlow::resync`] skips straight to the role grant for users who are
//! already linked.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::auth::TokenCodec;
use crate::config::AppConfig;
use crate::notify::{verification_log_message, RoleGrantNotifier};
use crate::providers::{wiki, WikiOAuth};
use crate::storage::{IdentityStore, StoreError};

/// Progress of a single linking attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStage {
    Initiated,
    CallbackReceived,
    TokenVerified,
    CodeExchanged,
    ProfileFetched,
    Eligible,
    Persisted,
    Notified,
    RoleGranted,
    Done,
}

impl LinkStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStage::Initiated => "initiated",
            LinkStage::CallbackReceived => "callback_received",
            LinkStage::TokenVerified => "token_verified",
            LinkStage::CodeExchanged => "code_exchanged",
            LinkStage::ProfileFetched => "profile_fetched",
            LinkStage::Eligible => "eligible",
            LinkStage::Persisted => "persisted",
            LinkStage::Notified => "notified",
            LinkStage::RoleGranted => "role_granted",
            LinkStage::Done => "done",
        }
    }
}

impl fmt::Display for LinkStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a callback did not produce a link. The message is shown to the user
/// verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error(
        "Request does not contain an OAuth2 code or state. If this is because you \
         rejected authorization, you can leave the page."
    )]
    MissingCodeOrState,

    #[error("Invalid token.")]
    InvalidToken,

    #[error("Failed to get access token.")]
    ExchangeFailed,

    #[error("Failed to get user info.")]
    ProfileFetchFailed,

    #[error(
        "You are most likely using a temporary account. Please use the user option on \
         the wiki navigation bar to instead register a full account before verifying!"
    )]
    TemporaryAccount,

    #[error("Your account is blocked on the wiki.")]
    BlockedAccount,

    #[error("Failed to save the account link. Please try again later.")]
    StoreUnavailable,
}

impl Rejection {
    /// Literal reason returned to the user.
    pub fn reason(&self) -> String {
        self.to_string()
    }

    /// Last stage reached before the rejection.
    pub fn stage(&self) -> LinkStage {
        match self {
            Rejection::MissingCodeOrState => LinkStage::Initiated,
            Rejection::InvalidToken => LinkStage::CallbackReceived,
            Rejection::ExchangeFailed => LinkStage::TokenVerified,
            Rejection::ProfileFetchFailed => LinkStage::CodeExchanged,
            Rejection::TemporaryAccount | Rejection::BlockedAccount => LinkStage::ProfileFetched,
            Rejection::StoreUnavailable => LinkStage::Eligible,
        }
    }
}

/// Query parameters of the OAuth2 callback.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct CallbackParams {
    /// Authorization code issued by the wiki
    pub code: Option<String>,
    /// State token issued when the link was requested
    pub state: Option<String>,
}

/// Result of a completed link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedIdentity {
    pub platform_user_id: u64,
    pub wiki_user_id: u64,
    pub wiki_username: String,
}

/// Message shown after a completed link.
pub const SUCCESS_MESSAGE: &str = "Verification successful! You can now close the page.";

#[derive(Debug, Clone)]
struct FlowSettings {
    rest_api: String,
    client_id: String,
    redirect_uri: Option<String>,
    wiki_base_url: String,
}

/// Orchestrates the linking flow.
pub struct OAuthFlow {
    codec: TokenCodec,
    wiki: Arc<dyn WikiOAuth>,
    store: Arc<dyn IdentityStore>,
    notifier: RoleGrantNotifier,
    settings: FlowSettings,
}

impl OAuthFlow {
    pub fn new(
        config: &AppConfig,
        wiki: Arc<dyn WikiOAuth>,
        store: Arc<dyn IdentityStore>,
        notifier: RoleGrantNotifier,
    ) -> Self {
        Self {
            codec: TokenCodec::new(config.secret_key.as_bytes()),
            wiki,
            store,
            notifier,
            settings: FlowSettings {
                rest_api: config.wiki_rest_api.clone(),
                client_id: config.oauth_client_id.clone(),
                redirect_uri: config.oauth_redirect_uri.clone(),
                wiki_base_url: config.wiki_base_url.clone(),
            },
        }
    }

    /// Authorization URL carrying a state token bound to `platform_user_id`.
    pub fn begin(&self, platform_user_id: u64) -> Result<Url, url::ParseError> {
        let state = self.codec.issue(platform_user_id);
        debug!(platform_user_id, stage = %LinkStage::Initiated, "issued state token");
        wiki::authorize_url(
            &self.settings.rest_api,
            &self.settings.client_id,
            self.settings.redirect_uri.as_deref(),
            &state,
        )
    }

    /// Run a callback through every stage. The first failing check wins.
    pub async fn complete(&self, params: CallbackParams) -> Result<LinkedIdentity, Rejection> {
        let flow_id = Uuid::new_v4();
        let result = self.run(flow_id, params).await;
        if let Err(rejection) = &result {
            info!(
                %flow_id,
                stage = %rejection.stage(),
                rejection = ?rejection,
                "account link rejected"
            );
        }
        result
    }

    async fn run(&self, flow_id: Uuid, params: CallbackParams) -> Result<LinkedIdentity, Rejection> {
        let code = non_empty(params.code);
        let state = non_empty(params.state);
        let (Some(code), Some(state)) = (code, state) else {
            return Err(Rejection::MissingCodeOrState);
        };
        debug!(%flow_id, stage = %LinkStage::CallbackReceived);

        let platform_user_id = self
            .codec
            .verify(&state)
            .map_err(|_| Rejection::InvalidToken)?;
        debug!(%flow_id, platform_user_id, stage = %LinkStage::TokenVerified);

        let access_token = self.wiki.exchange_code(&code).await.map_err(|error| {
            warn!(%flow_id, platform_user_id, error = %error, "code exchange failed");
            Rejection::ExchangeFailed
        })?;
        debug!(%flow_id, platform_user_id, stage = %LinkStage::CodeExchanged);

        let profile = self
            .wiki
            .fetch_profile(&access_token)
            .await
            .map_err(|error| {
                warn!(%flow_id, platform_user_id, error = %error, "profile fetch failed");
                Rejection::ProfileFetchFailed
            })?;
        debug!(
            %flow_id,
            platform_user_id,
            wiki_user_id = profile.sub,
            stage = %LinkStage::ProfileFetched
        );

        if !profile.is_registered() {
            return Err(Rejection::TemporaryAccount);
        }
        if profile.blocked {
            return Err(Rejection::BlockedAccount);
        }
        debug!(%flow_id, platform_user_id, stage = %LinkStage::Eligible);

        self.store
            .put(platform_user_id, &profile.sub.to_string())
            .await
            .map_err(|error| store_failure(flow_id, platform_user_id, &error))?;
        debug!(%flow_id, platform_user_id, stage = %LinkStage::Persisted);

        self.notifier
            .notify(&verification_log_message(
                platform_user_id,
                &profile.username,
                &self.settings.wiki_base_url,
            ))
            .await;
        debug!(%flow_id, platform_user_id, stage = %LinkStage::Notified);

        self.notifier.grant_role(platform_user_id).await;
        debug!(%flow_id, platform_user_id, stage = %LinkStage::RoleGranted);

        info!(
            %flow_id,
            platform_user_id,
            wiki_user_id = profile.sub,
            stage = %LinkStage::Done,
            "account linked"
        );
        Ok(LinkedIdentity {
            platform_user_id,
            wiki_user_id: profile.sub,
            wiki_username: profile.username,
        })
    }

    /// Re-grant the verified role to an already linked user.
    ///
    /// Returns `false` without side effects when no link exists.
    pub async fn resync(&self, platform_user_id: u64) -> Result<bool, StoreError> {
        if self.store.get(platform_user_id).await?.is_none() {
            return Ok(false);
        }
        debug!(platform_user_id, "re-granting verified role");
        self.notifier.grant_role(platform_user_id).await;
        Ok(true)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

fn store_failure(flow_id: Uuid, platform_user_id: u64, error: &StoreError) -> Rejection {
    warn!(%flow_id, platform_user_id, error = %error, "failed to persist account link");
    Rejection::StoreUnavailable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_state, FailingStore, PlatformCall, TestHarness};
    use serde_json::json;

    fn params(code: Option<&str>, state: Option<String>) -> CallbackParams {
        CallbackParams {
            code: code.map(str::to_string),
            state,
        }
    }

    fn valid_params(harness: &TestHarness, platform_user_id: u64) -> CallbackParams {
        params(Some("auth-code"), Some(harness.issue_token(platform_user_id)))
    }

    fn registered_profile(sub: u64) -> serde_json::Value {
        json!({ "groups": ["*", "user"], "blocked": false, "sub": sub, "username": "Frisk" })
    }

    #[tokio::test]
    async fn missing_code_and_state_is_rejected() {
        let harness = test_state();
        let err = harness
            .state
            .flow
            .complete(CallbackParams::default())
            .await
            .unwrap_err();
        assert_eq!(err, Rejection::MissingCodeOrState);
        assert!(err.reason().contains("code or state"));
        assert!(harness.wiki.exchanged_codes().is_empty());
    }

    #[tokio::test]
    async fn missing_state_is_rejected() {
        let harness = test_state();
        let err = harness
            .state
            .flow
            .complete(params(Some("auth-code"), None))
            .await
            .unwrap_err();
        assert_eq!(err, Rejection::MissingCodeOrState);
    }

    #[tokio::test]
    async fn empty_code_counts_as_missing() {
        let harness = test_state();
        let state = harness.issue_token(123);
        let err = harness
            .state
            .flow
            .complete(params(Some(""), Some(state)))
            .await
            .unwrap_err();
        assert_eq!(err, Rejection::MissingCodeOrState);
    }

    #[tokio::test]
    async fn forged_state_is_rejected_before_exchange() {
        let harness = test_state();
        let err = harness
            .state
            .flow
            .complete(params(Some("auth-code"), Some("00".repeat(40))))
            .await
            .unwrap_err();
        assert_eq!(err, Rejection::InvalidToken);
        assert_eq!(err.reason(), "Invalid token.");
        assert!(harness.wiki.exchanged_codes().is_empty());
    }

    #[tokio::test]
    async fn successful_link_persists_mapping() {
        let harness = test_state();
        harness
            .wiki
            .set_profile(json!({ "groups": ["user"], "blocked": false, "sub": 456 }));

        let linked = harness
            .state
            .flow
            .complete(valid_params(&harness, 123))
            .await
            .expect("link should succeed");

        assert_eq!(linked.platform_user_id, 123);
        assert_eq!(linked.wiki_user_id, 456);
        assert_eq!(harness.store.get(123).await.unwrap(), Some("456".to_string()));
        assert_eq!(harness.wiki.exchanged_codes(), vec!["auth-code".to_string()]);
        assert!(SUCCESS_MESSAGE.contains("successful"));
    }

    #[tokio::test]
    async fn successful_link_posts_log_and_grants_role() {
        let harness = test_state();
        harness.wiki.set_profile(registered_profile(456));

        harness
            .state
            .flow
            .complete(valid_params(&harness, 123))
            .await
            .expect("link should succeed");

        assert_eq!(
            harness.platform.calls(),
            vec![
                PlatformCall::Webhook {
                    url: "https://hooks.example/verify".to_string(),
                    content: "<@123> - [Frisk](<https://undertale.wiki/User:Frisk>)".to_string(),
                },
                PlatformCall::AddRole {
                    guild_id: "1000".to_string(),
                    user_id: 123,
                    role_id: "2000".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn temporary_account_is_not_linked() {
        let harness = test_state();
        harness
            .wiki
            .set_profile(json!({ "groups": [], "blocked": false, "sub": 456 }));

        let err = harness
            .state
            .flow
            .complete(valid_params(&harness, 123))
            .await
            .unwrap_err();

        assert_eq!(err, Rejection::TemporaryAccount);
        assert!(err.reason().contains("temporary account"));
        assert_eq!(harness.store.get(123).await.unwrap(), None);
        assert!(harness.platform.calls().is_empty());
    }

    #[tokio::test]
    async fn temporary_check_precedes_block_check() {
        let harness = test_state();
        harness
            .wiki
            .set_profile(json!({ "groups": [], "blocked": true, "sub": 456 }));
        let err = harness
            .state
            .flow
            .complete(valid_params(&harness, 123))
            .await
            .unwrap_err();
        assert_eq!(err, Rejection::TemporaryAccount);
    }

    #[tokio::test]
    async fn blocked_account_is_not_linked() {
        let harness = test_state();
        harness
            .wiki
            .set_profile(json!({ "groups": ["user"], "blocked": true, "sub": 456 }));
        let err = harness
            .state
            .flow
            .complete(valid_params(&harness, 123))
            .await
            .unwrap_err();
        assert_eq!(err, Rejection::BlockedAccount);
        assert_eq!(harness.store.get(123).await.unwrap(), None);
    }

    #[tokio::test]
    async fn relinking_overwrites_mapping() {
        let harness = test_state();
        harness.wiki.set_profile(registered_profile(456));
        harness
            .state
            .flow
            .complete(valid_params(&harness, 123))
            .await
            .expect("first link should succeed");

        harness.wiki.set_profile(registered_profile(789));
        harness
            .state
            .flow
            .complete(valid_params(&harness, 123))
            .await
            .expect("second link should succeed");

        assert_eq!(harness.store.get(123).await.unwrap(), Some("789".to_string()));
    }

    #[tokio::test]
    async fn role_grant_failure_does_not_fail_link() {
        let harness = test_state();
        harness.wiki.set_profile(registered_profile(456));
        harness.platform.fail_role_grants();

        let linked = harness
            .state
            .flow
            .complete(valid_params(&harness, 123))
            .await;

        assert!(linked.is_ok());
        assert_eq!(harness.store.get(123).await.unwrap(), Some("456".to_string()));
    }

    #[tokio::test]
    async fn log_post_failure_still_grants_role() {
        let harness = test_state();
        harness.wiki.set_profile(registered_profile(456));
        harness.platform.fail_posts();

        harness
            .state
            .flow
            .complete(valid_params(&harness, 123))
            .await
            .expect("link should succeed");

        assert!(harness
            .platform
            .calls()
            .iter()
            .any(|call| matches!(call, PlatformCall::AddRole { user_id: 123, .. })));
    }

    #[tokio::test]
    async fn exchange_failure_is_rejected_without_upstream_body() {
        let harness = test_state();
        harness.wiki.fail_exchange();
        let err = harness
            .state
            .flow
            .complete(valid_params(&harness, 123))
            .await
            .unwrap_err();
        assert_eq!(err, Rejection::ExchangeFailed);
        assert_eq!(err.reason(), "Failed to get access token.");
    }

    #[tokio::test]
    async fn profile_failure_is_rejected() {
        let harness = test_state();
        harness.wiki.fail_profile();
        let err = harness
            .state
            .flow
            .complete(valid_params(&harness, 123))
            .await
            .unwrap_err();
        assert_eq!(err, Rejection::ProfileFetchFailed);
        assert_eq!(harness.store.get(123).await.unwrap(), None);
    }

    #[tokio::test]
    async fn begin_binds_state_to_user() {
        let harness = test_state();
        let url = harness.state.flow.begin(123).unwrap();
        let state = url
            .query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
            .expect("state parameter");
        assert_eq!(state, harness.issue_token(123));
        assert!(url.as_str().starts_with("https://wiki.example/rest.php/oauth2/authorize?"));
    }

    #[tokio::test]
    async fn resync_regrants_linked_user() {
        let harness = test_state();
        harness.store.put(123, "456").await.unwrap();
        assert!(harness.state.flow.resync(123).await.unwrap());
        assert_eq!(
            harness.platform.calls(),
            vec![PlatformCall::AddRole {
                guild_id: "1000".to_string(),
                user_id: 123,
                role_id: "2000".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn resync_skips_unlinked_user() {
        let harness = test_state();
        assert!(!harness.state.flow.resync(123).await.unwrap());
        assert!(harness.platform.calls().is_empty());
    }

    #[tokio::test]
    async fn store_failure_rejects_link_without_side_effects() {
        let harness = test_state().with_store(Arc::new(FailingStore));
        harness.wiki.set_profile(registered_profile(456));

        let err = harness
            .state
            .flow
            .complete(valid_params(&harness, 123))
            .await
            .unwrap_err();

        assert_eq!(err, Rejection::StoreUnavailable);
        assert!(err.reason().contains("try again later"));
        assert_eq!(err.stage(), LinkStage::Eligible);
        assert!(harness.platform.calls().is_empty());
    }

    #[tokio::test]
    async fn resync_surfaces_store_failure() {
        let harness = test_state().with_store(Arc::new(FailingStore));
        assert!(harness.state.flow.resync(123).await.is_err());
        assert!(harness.platform.calls().is_empty());
    }

    #[test]
    fn rejections_map_to_stages() {
        assert_eq!(Rejection::InvalidToken.stage(), LinkStage::CallbackReceived);
        assert_eq!(Rejection::BlockedAccount.stage(), LinkStage::ProfileFetched);
        assert_eq!(LinkStage::RoleGranted.to_string(), "role_granted");
    }
}
