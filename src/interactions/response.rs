// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Interaction response envelopes.

use serde::Serialize;

const PONG: u8 = 1;
const CHANNEL_MESSAGE_WITH_SOURCE: u8 = 4;

/// Message flag that shows a reply only to the invoking user.
pub const EPHEMERAL: u64 = 1 << 6;

const ACTION_ROW: u8 = 1;
const BUTTON: u8 = 2;
const LINK_STYLE: u8 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<MessageData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageData {
    pub content: String,
    pub flags: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ActionRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionRow {
    #[serde(rename = "type")]
    kind: u8,
    components: Vec<LinkButton>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkButton {
    #[serde(rename = "type")]
    kind: u8,
    style: u8,
    label: String,
    url: String,
}

impl InteractionResponse {
    /// Acknowledge a ping.
    pub fn pong() -> Self {
        Self {
            kind: PONG,
            data: None,
        }
    }

    /// Message visible only to the invoking user.
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            kind: CHANNEL_MESSAGE_WITH_SOURCE,
            data: Some(MessageData {
                content: content.into(),
                flags: EPHEMERAL,
                components: Vec::new(),
            }),
        }
    }

    /// Attach a row holding a single link button.
    pub fn with_link_button(mut self, label: impl Into<String>, url: impl Into<String>) -> Self {
        if let Some(data) = self.data.as_mut() {
            data.components.push(ActionRow {
                kind: ACTION_ROW,
                components: vec![LinkButton {
                    kind: BUTTON,
                    style: LINK_STYLE,
                    label: label.into(),
                    url: url.into(),
                }],
            });
        }
        self
    }
}
