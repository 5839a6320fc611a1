// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wiki OAuth2 integration (MediaWiki OAuth extension REST endpoints).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use url::Url;

use super::{build_http_client, ensure_success, request_error, ProviderError};
use crate::config::AppConfig;

const TOKEN_ENDPOINT: &str = "token exchange";
const PROFILE_ENDPOINT: &str = "profile fetch";

/// Group every registered (non-temporary) wiki account belongs to.
pub const REGISTERED_USER_GROUP: &str = "user";

/// Bearer token returned by the code exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Profile of the authorizing wiki account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WikiProfile {
    /// Wiki user ID.
    #[serde(deserialize_with = "user_id_from_number_or_string")]
    pub sub: u64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub blocked: bool,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl WikiProfile {
    /// Temporary accounts are not members of the `user` group.
    pub fn is_registered(&self) -> bool {
        self.groups.iter().any(|group| group == REGISTERED_USER_GROUP)
    }
}

fn user_id_from_number_or_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(id) => Ok(id),
        RawId::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
}

/// OAuth2 operations against the wiki.
#[async_trait]
pub trait WikiOAuth: Send + Sync {
    /// Exchange an authorization code for an access token.
    async fn exchange_code(&self, code: &str) -> Result<AccessToken, ProviderError>;

    /// Fetch the profile of the account that authorized `token`.
    async fn fetch_profile(&self, token: &AccessToken) -> Result<WikiProfile, ProviderError>;
}

/// Build the authorization URL a user visits to start linking.
pub fn authorize_url(
    rest_api: &str,
    client_id: &str,
    redirect_uri: Option<&str>,
    state: &str,
) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&format!("{rest_api}/oauth2/authorize"))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("response_type", "code");
        query.append_pair("client_id", client_id);
        if let Some(redirect_uri) = redirect_uri {
            query.append_pair("redirect_uri", redirect_uri);
        }
        query.append_pair("state", state);
    }
    Ok(url)
}

/// reqwest-backed [`WikiOAuth`].
#[derive(Debug, Clone)]
pub struct WikiOAuthClient {
    rest_api: String,
    client_id: String,
    client_secret: String,
    redirect_uri: Option<String>,
    http: Client,
}

impl WikiOAuthClient {
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            rest_api: config.wiki_rest_api.clone(),
            client_id: config.oauth_client_id.clone(),
            client_secret: config.oauth_client_secret.clone(),
            redirect_uri: config.oauth_redirect_uri.clone(),
            http: build_http_client()?,
        })
    }

    fn token_form(&self, code: &str) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("grant_type", "authorization_code".to_string()),
            ("code", code.to_string()),
            ("client_id", self.client_id.clone()),
            ("client_secret", self.client_secret.clone()),
        ];
        if let Some(redirect_uri) = &self.redirect_uri {
            form.push(("redirect_uri", redirect_uri.clone()));
        }
        form
    }
}

#[async_trait]
impl WikiOAuth for WikiOAuthClient {
    async fn exchange_code(&self, code: &str) -> Result<AccessToken, ProviderError> {
        let response = self
            .http
            .post(format!("{}/oauth2/access_token", self.rest_api))
            .form(&self.token_form(code))
            .send()
            .await
            .map_err(|e| request_error(TOKEN_ENDPOINT, e))?;
        let response = ensure_success(TOKEN_ENDPOINT, response).await?;

        let token: TokenResponse =
            response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse {
                    endpoint: TOKEN_ENDPOINT,
                    message: e.to_string(),
                })?;

        if token.access_token.trim().is_empty() {
            return Err(ProviderError::InvalidResponse {
                endpoint: TOKEN_ENDPOINT,
                message: "token response did not include access_token".to_string(),
            });
        }

        Ok(AccessToken(token.access_token))
    }

    async fn fetch_profile(&self, token: &AccessToken) -> Result<WikiProfile, ProviderError> {
        let response = self
            .http
            .get(format!("{}/oauth2/resource/profile", self.rest_api))
            .bearer_auth(token.secret())
            .send()
            .await
            .map_err(|e| request_error(PROFILE_ENDPOINT, e))?;
        let response = ensure_success(PROFILE_ENDPOINT, response).await?;

        response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse {
                endpoint: PROFILE_ENDPOINT,
                message: e.to_string(),
            })
    }
}
