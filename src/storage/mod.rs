// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Identity Storage
//!
//! Persistent mapping from platform user IDs to wiki account IDs.
//!
//! ## Storage Layout
//!
//! ```text
//! identity:<platform_user_id> → <wiki user id, decimal string>
//! ```
//!
//! ## Consistency
//!
//! - `put` is an unconditional overwrite (last write wins)
//! - Concurrent completions for the same user are not serialized here
//! - Several platform users may map to the same wiki account
//! - Nothing in this service deletes or enumerates mappings

use async_trait::async_trait;

pub mod identity_db;
pub mod memory;

pub use identity_db::RedbIdentityStore;
pub use memory::MemoryIdentityStore;

/// Key prefix of identity mappings.
pub const IDENTITY_KEY_PREFIX: &str = "identity:";

/// Build the storage key for a platform user.
pub fn identity_key(platform_user_id: u64) -> String {
    format!("{IDENTITY_KEY_PREFIX}{platform_user_id}")
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value persistence of identity mappings.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Look up the wiki account linked to a platform user.
    async fn get(&self, platform_user_id: u64) -> StoreResult<Option<String>>;

    /// Link a platform user to a wiki account, replacing any previous link.
    async fn put(&self, platform_user_id: u64, external_id: &str) -> StoreResult<()>;
}
