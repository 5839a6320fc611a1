// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded identity database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `kv`: `identity:<platform_user_id>` → wiki user id
//!
//! Each `put` is its own write transaction. The store offers no
//! cross-key atomicity to callers. Transactions run on the blocking pool
//! since a commit waits on fsync.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, TableDefinition};

use super::{identity_key, IdentityStore, StoreResult};

/// Key-value table holding identity mappings.
const KV: TableDefinition<&str, &str> = TableDefinition::new("kv");

/// redb-backed [`IdentityStore`].
pub struct RedbIdentityStore {
    db: Arc<Database>,
}

impl RedbIdentityStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(KV)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }
}

fn read(db: &Database, key: &str) -> StoreResult<Option<String>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(KV)?;
    match table.get(key)? {
        Some(value) => Ok(Some(value.value().to_string())),
        None => Ok(None),
    }
}

fn write(db: &Database, key: &str, value: &str) -> StoreResult<()> {
    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(KV)?;
        table.insert(key, value)?;
    }
    write_txn.commit()?;
    Ok(())
}

#[async_trait]
impl IdentityStore for RedbIdentityStore {
    async fn get(&self, platform_user_id: u64) -> StoreResult<Option<String>> {
        let db = Arc::clone(&self.db);
        let key = identity_key(platform_user_id);
        tokio::task::spawn_blocking(move || read(&db, &key)).await?
    }

    async fn put(&self, platform_user_id: u64, external_id: &str) -> StoreResult<()> {
        let db = Arc::clone(&self.db);
        let key = identity_key(platform_user_id);
        let value = external_id.to_string();
        tokio::task::spawn_blocking(move || write(&db, &key, &value)).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (RedbIdentityStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbIdentityStore::open(&dir.path().join("identity.redb")).unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn missing_mapping_is_none() {
        let (store, _dir) = temp_store();
        assert_eq!(store.get(123).await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_then_get() {
        let (store, _dir) = temp_store();
        store.put(123, "456").await.unwrap();
        assert_eq!(store.get(123).await.unwrap(), Some("456".to_string()));
        assert_eq!(store.get(124).await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_overwrites_previous_value() {
        let (store, _dir) = temp_store();
        store.put(123, "456").await.unwrap();
        store.put(123, "789").await.unwrap();
        assert_eq!(store.get(123).await.unwrap(), Some("789".to_string()));
    }

    #[tokio::test]
    async fn one_wiki_account_may_back_several_users() {
        let (store, _dir) = temp_store();
        store.put(1, "456").await.unwrap();
        store.put(2, "456").await.unwrap();
        assert_eq!(store.get(1).await.unwrap(), Some("456".to_string()));
        assert_eq!(store.get(2).await.unwrap(), Some("456".to_string()));
    }

    #[tokio::test]
    async fn mappings_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("identity.redb");
        {
            let store = RedbIdentityStore::open(&path).unwrap();
            store.put(123, "456").await.unwrap();
        }
        let store = RedbIdentityStore::open(&path).unwrap();
        assert_eq!(store.get(123).await.unwrap(), Some("456".to_string()));
    }

    #[test]
    fn keys_use_identity_prefix() {
        let (store, _dir) = temp_store();
        write(&store.db, &identity_key(5), "6").unwrap();
        assert_eq!(read(&store.db, "identity:5").unwrap(), Some("6".to_string()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_puts_all_commit() {
        let (store, _dir) = temp_store();
        let store = Arc::new(store);
        let writers: Vec<_> = (1..=8u64)
            .map(|id| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.put(id, &(id * 10).to_string()).await })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap().unwrap();
        }
        for id in 1..=8u64 {
            assert_eq!(store.get(id).await.unwrap(), Some((id * 10).to_string()));
        }
    }
}
