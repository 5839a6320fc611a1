// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup into an
//! immutable [`AppConfig`] that is handed to every component constructor.
//! Nothing reads the environment after startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `BOT_TOKEN` | Bot token used for platform API calls | Required |
//! | `BOT_PUBLIC_KEY` | Hex Ed25519 key that signs interaction requests | Required |
//! | `SECRET_KEY` | HMAC secret for OAuth2 state tokens | Required |
//! | `OAUTH_CLIENT_ID` | Wiki OAuth2 client ID | Required |
//! | `OAUTH_CLIENT_SECRET` | Wiki OAuth2 client secret | Required |
//! | `OAUTH_REDIRECT_URI` | Callback URI registered with the wiki | Optional |
//! | `WIKI_REST_API` | Wiki REST API base (`.../rest.php`) | Required |
//! | `WIKI_BASE_URL` | Wiki base URL used for user page links | `https://undertale.wiki` |
//! | `VERIFY_GUILD` | Guild in which the verified role is granted | Required |
//! | `VERIFY_ROLE` | Role granted after verification | Required |
//! | `VERIFY_WEBHOOK` | Webhook URL of the verification log | Required |
//! | `NOTIFICATION_CHANNEL` | Channel for mail delivery alerts | Optional |
//! | `ZEPTOMAIL_AUTH` | Shared secret of the delivery webhook | Optional |
//! | `DISCORD_INVITE` | Redirect target for unknown paths | Optional |
//! | `DISCORD_API_BASE` | Platform API base URL | `https://discord.com/api` |
//! | `DATA_DIR` | Directory holding `identity.redb` (`:memory:` for none) | `./data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; serve HTTPS when both set | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::fmt;
use std::path::PathBuf;

/// Environment variable name for the data directory path.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Sentinel `DATA_DIR` value selecting the in-memory identity store.
pub const IN_MEMORY_DATA_DIR: &str = ":memory:";

const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api";
const DEFAULT_WIKI_BASE_URL: &str = "https://undertale.wiki";

/// Default `RUST_LOG` filter when none is set.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Log output format selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Immutable service configuration.
#[derive(Clone)]
pub struct AppConfig {
    pub bot_token: String,
    /// Raw 32-byte Ed25519 public key of the chat platform application.
    pub bot_public_key: [u8; 32],
    pub secret_key: String,
    pub oauth_client_id: String,
    pub oauth_client_secret: String,
    pub oauth_redirect_uri: Option<String>,
    pub wiki_rest_api: String,
    pub wiki_base_url: String,
    pub verify_guild: String,
    pub verify_role: String,
    pub verify_webhook: String,
    pub notification_channel: Option<String>,
    pub zeptomail_auth: Option<String>,
    pub discord_invite: Option<String>,
    pub discord_api_base: String,
    pub data_dir: String,
    pub host: String,
    pub port: u16,
    pub tls_cert_path: Option<PathBuf>,
    pub tls_key_path: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Blank values are treated the same as unset ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &'static str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let required =
            |name: &'static str| optional(name).ok_or(ConfigError::Missing(name));

        let bot_public_key = parse_public_key(&required("BOT_PUBLIC_KEY")?)?;

        let port = match optional("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                reason: format!("`{raw}` is not a port number"),
            })?,
            None => DEFAULT_PORT,
        };

        let log_format = match optional("LOG_FORMAT").as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "LOG_FORMAT",
                    reason: format!("expected `json` or `pretty`, got `{other}`"),
                })
            }
        };

        let tls_cert_path = optional("TLS_CERT_PATH").map(PathBuf::from);
        let tls_key_path = optional("TLS_KEY_PATH").map(PathBuf::from);
        if tls_cert_path.is_some() != tls_key_path.is_some() {
            return Err(ConfigError::Invalid {
                name: "TLS_CERT_PATH",
                reason: "TLS_CERT_PATH and TLS_KEY_PATH must be set together".to_string(),
            });
        }

        Ok(Self {
            bot_token: required("BOT_TOKEN")?,
            bot_public_key,
            secret_key: required("SECRET_KEY")?,
            oauth_client_id: required("OAUTH_CLIENT_ID")?,
            oauth_client_secret: required("OAUTH_CLIENT_SECRET")?,
            oauth_redirect_uri: optional("OAUTH_REDIRECT_URI"),
            wiki_rest_api: trim_base(required("WIKI_REST_API")?),
            wiki_base_url: trim_base(
                optional("WIKI_BASE_URL").unwrap_or_else(|| DEFAULT_WIKI_BASE_URL.to_string()),
            ),
            verify_guild: required("VERIFY_GUILD")?,
            verify_role: required("VERIFY_ROLE")?,
            verify_webhook: required("VERIFY_WEBHOOK")?,
            notification_channel: optional("NOTIFICATION_CHANNEL"),
            zeptomail_auth: optional("ZEPTOMAIL_AUTH"),
            discord_invite: optional("DISCORD_INVITE"),
            discord_api_base: trim_base(
                optional("DISCORD_API_BASE")
                    .unwrap_or_else(|| DEFAULT_DISCORD_API_BASE.to_string()),
            ),
            data_dir: optional(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
            host: optional("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            tls_cert_path,
            tls_key_path,
            log_format,
        })
    }

    /// Path of the identity database, or `None` for the in-memory store.
    pub fn identity_db_path(&self) -> Option<PathBuf> {
        if self.data_dir == IN_MEMORY_DATA_DIR {
            None
        } else {
            Some(PathBuf::from(&self.data_dir).join("identity.redb"))
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("bot_token", &"<redacted>")
            .field("bot_public_key", &hex::encode(self.bot_public_key))
            .field("secret_key", &"<redacted>")
            .field("oauth_client_id", &self.oauth_client_id)
            .field("oauth_client_secret", &"<redacted>")
            .field("oauth_redirect_uri", &self.oauth_redirect_uri)
            .field("wiki_rest_api", &self.wiki_rest_api)
            .field("wiki_base_url", &self.wiki_base_url)
            .field("verify_guild", &self.verify_guild)
            .field("verify_role", &self.verify_role)
            .field("verify_webhook", &"<redacted>")
            .field("notification_channel", &self.notification_channel)
            .field(
                "zeptomail_auth",
                &self.zeptomail_auth.as_ref().map(|_| "<redacted>"),
            )
            .field("discord_invite", &self.discord_invite)
            .field("discord_api_base", &self.discord_api_base)
            .field("data_dir", &self.data_dir)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls_cert_path", &self.tls_cert_path)
            .field("tls_key_path", &self.tls_key_path)
            .field("log_format", &self.log_format)
            .finish()
    }
}

fn parse_public_key(raw: &str) -> Result<[u8; 32], ConfigError> {
    let bytes = hex::decode(raw).map_err(|e| ConfigError::Invalid {
        name: "BOT_PUBLIC_KEY",
        reason: format!("not valid hex: {e}"),
    })?;
    bytes.try_into().map_err(|bytes: Vec<u8>| ConfigError::Invalid {
        name: "BOT_PUBLIC_KEY",
        reason: format!("expected 32 bytes, got {}", bytes.len()),
    })
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
