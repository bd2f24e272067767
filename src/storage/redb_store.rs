// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Durable key-value store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `local_state`: key → JSON bytes

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::kv::{KeyValueStore, StoreResult};

/// Single table holding every local record.
const LOCAL_STATE: TableDefinition<&str, &[u8]> = TableDefinition::new("local_state");

/// File name used inside the data directory.
pub const DEFAULT_DB_FILE: &str = "chainpress.redb";

/// Embedded local-state database.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(LOCAL_STATE)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Open the database under a data directory.
    pub fn open_in(data_dir: &Path) -> StoreResult<Self> {
        Self::open(&data_dir.join(DEFAULT_DB_FILE))
    }
}

impl KeyValueStore for RedbStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LOCAL_STATE)?;
        Ok(table.get(key)?.map(|value| value.value().to_vec()))
    }

    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(LOCAL_STATE)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(LOCAL_STATE)?;
            table.remove(key)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}
