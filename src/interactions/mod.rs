// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Interactions
//!
//! Typed model of chat platform interaction payloads.
//!
//! Payloads are deserialized into a loose raw form and then converted with
//! `TryFrom` into closed enums. Unknown `type` tags become
//! [`InteractionError::UnknownVariant`] instead of being ignored.
//!
//! | `type` | Variant |
//! |--------|---------|
//! | 1 | [`Interaction::Ping`] |
//! | 2 | [`Interaction::Command`] |
//! | 3 | [`Interaction::Component`] |

use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub mod dispatch;
pub mod response;

pub use dispatch::dispatch;
pub use response::InteractionResponse;

const PING: u64 = 1;
const APPLICATION_COMMAND: u64 = 2;
const MESSAGE_COMPONENT: u64 = 3;

const SUBCOMMAND_OPTION: u64 = 1;
const STRING_OPTION: u64 = 3;
const INTEGER_OPTION: u64 = 4;
const USER_OPTION: u64 = 6;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InteractionError {
    #[error("malformed interaction payload: {0}")]
    Malformed(String),

    #[error("unknown {kind} type {tag}")]
    UnknownVariant { kind: &'static str, tag: u64 },

    #[error("interaction is missing `{0}`")]
    MissingField(&'static str),
}

/// Platform user that triggered an interaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "snowflake")]
    pub id: u64,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    Ping,
    Command(CommandInteraction),
    Component(ComponentInteraction),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInteraction {
    pub name: String,
    pub options: Vec<CommandOption>,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentInteraction {
    pub custom_id: String,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOption {
    String { name: String, value: String },
    Integer { name: String, value: i64 },
    User { name: String, value: u64 },
    Subcommand { name: String, options: Vec<CommandOption> },
}

/// Parse a verified raw body.
pub fn parse(body: &[u8]) -> Result<Interaction, InteractionError> {
    let raw: RawInteraction =
        serde_json::from_slice(body).map_err(|e| InteractionError::Malformed(e.to_string()))?;
    Interaction::try_from(raw)
}

#[derive(Debug, Deserialize)]
struct RawInteraction {
    #[serde(rename = "type")]
    kind: u64,
    #[serde(default)]
    data: Option<RawData>,
    #[serde(default)]
    member: Option<RawMember>,
    #[serde(default)]
    user: Option<User>,
}

#[derive(Debug, Deserialize)]
struct RawMember {
    user: User,
}

#[derive(Debug, Default, Deserialize)]
struct RawData {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    custom_id: Option<String>,
    #[serde(default)]
    options: Vec<RawOption>,
}

#[derive(Debug, Deserialize)]
struct RawOption {
    name: String,
    #[serde(rename = "type")]
    kind: u64,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    options: Vec<RawOption>,
}

impl TryFrom<RawInteraction> for Interaction {
    type Error = InteractionError;

    fn try_from(raw: RawInteraction) -> Result<Self, Self::Error> {
        match raw.kind {
            PING => Ok(Interaction::Ping),
            APPLICATION_COMMAND => {
                let user = invoking_user(raw.member, raw.user)?;
                let data = raw.data.ok_or(InteractionError::MissingField("data"))?;
                let name = data.name.ok_or(InteractionError::MissingField("data.name"))?;
                let options = data
                    .options
                    .into_iter()
                    .map(CommandOption::try_from)
                    .collect::<Result<_, _>>()?;
                Ok(Interaction::Command(CommandInteraction {
                    name,
                    options,
                    user,
                }))
            }
            MESSAGE_COMPONENT => {
                let user = invoking_user(raw.member, raw.user)?;
                let custom_id = raw
                    .data
                    .and_then(|data| data.custom_id)
                    .ok_or(InteractionError::MissingField("data.custom_id"))?;
                Ok(Interaction::Component(ComponentInteraction { custom_id, user }))
            }
            tag => Err(InteractionError::UnknownVariant {
                kind: "interaction",
                tag,
            }),
        }
    }
}

impl TryFrom<RawOption> for CommandOption {
    type Error = InteractionError;

    fn try_from(raw: RawOption) -> Result<Self, Self::Error> {
        let name = raw.name;
        match raw.kind {
            SUBCOMMAND_OPTION => Ok(CommandOption::Subcommand {
                name,
                options: raw
                    .options
                    .into_iter()
                    .map(CommandOption::try_from)
                    .collect::<Result<_, _>>()?,
            }),
            STRING_OPTION => match raw.value {
                Some(Value::String(value)) => Ok(CommandOption::String { name, value }),
                _ => Err(InteractionError::Malformed(format!(
                    "option `{name}` is not a string"
                ))),
            },
            INTEGER_OPTION => match raw.value.as_ref().and_then(Value::as_i64) {
                Some(value) => Ok(CommandOption::Integer { name, value }),
                None => Err(InteractionError::Malformed(format!(
                    "option `{name}` is not an integer"
                ))),
            },
            USER_OPTION => match raw.value.as_ref().and_then(snowflake_value) {
                Some(value) => Ok(CommandOption::User { name, value }),
                None => Err(InteractionError::Malformed(format!(
                    "option `{name}` is not a user ID"
                ))),
            },
            tag => Err(InteractionError::UnknownVariant { kind: "option", tag }),
        }
    }
}

/// Guild interactions carry `member.user`; direct messages carry `user`.
fn invoking_user(member: Option<RawMember>, user: Option<User>) -> Result<User, InteractionError> {
    member
        .map(|member| member.user)
        .or(user)
        .ok_or(InteractionError::MissingField("user"))
}

fn snowflake_value(value: &Value) -> Option<u64> {
    match value {
        Value::String(text) => text.parse().ok(),
        Value::Number(number) => number.as_u64(),
        _ => None,
    }
}

fn snowflake<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    snowflake_value(&value).ok_or_else(|| serde::de::Error::custom("invalid snowflake"))
}
