// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wikilink Server - Wiki Account Verification Service
//!
//! Links wiki accounts to chat platform users through the wiki's OAuth2
//! authorization-code flow and grants a verified role once linked.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Request signatures, state tokens and webhook signatures
//! - `interactions` - Chat platform interaction payloads and dispatch
//! - `oauth` - The account linking flow
//! - `notify` - Best-effort role grants and notifications
//! - `providers` - Wiki and chat platform HTTP clients
//! - `storage` - Identity mapping persistence (redb)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod interactions;
pub mod notify;
pub mod oauth;
pub mod providers;
pub mod state;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;
