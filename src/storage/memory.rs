// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory identity store.
//!
//! Used by tests and when `DATA_DIR` is `:memory:`. Contents are lost on
//! restart.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{identity_key, IdentityStore, StoreResult};

#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn get(&self, platform_user_id: u64) -> StoreResult<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries.get(&identity_key(platform_user_id)).cloned())
    }

    async fn put(&self, platform_user_id: u64, external_id: &str) -> StoreResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(identity_key(platform_user_id), external_id.to_string());
        Ok(())
    }
}
