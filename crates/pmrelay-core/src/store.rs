//! Durable mapping from forwarded-message ids to the chat they came from.

use std::{path::Path, sync::Arc};

use redb::{Database, ReadableDatabase, ReadableTableMetadata, TableDefinition};

use crate::{
    domain::{ChatId, MessageId},
    errors::Error,
    Result,
};

/// Forwarded message id -> (origin chat id, stored-at unix seconds).
const ROUTES: TableDefinition<'static, i64, (i64, i64)> = TableDefinition::new("msg2chatid");

/// One relayed user message, keyed by the id of its copy in the admin chat.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RouteEntry {
    pub forwarded: MessageId,
    pub origin: ChatId,
    pub stored_at: i64,
}

impl RouteEntry {
    pub fn now(forwarded: MessageId, origin: ChatId) -> Self {
        Self {
            forwarded,
            origin,
            stored_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Whole-entry reads and writes only; each call is its own transaction.
pub trait RouteStore: Send + Sync {
    fn get(&self, forwarded: MessageId) -> Result<Option<RouteEntry>>;
    fn put(&self, entry: RouteEntry) -> Result<()>;
    /// Drop entries stored before `cutoff` (unix seconds). Returns how many went.
    fn prune_older_than(&self, cutoff: i64) -> Result<u64>;
    fn len(&self) -> Result<u64>;
}

fn store_err(e: impl Into<redb::Error>) -> Error {
    Error::from(e.into())
}

/// redb-backed store. The database file is exclusively locked while open.
#[derive(Clone)]
pub struct RedbRouteStore {
    db: Arc<Database>,
}

impl RedbRouteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path).map_err(|e| {
            Error::Store(format!("failed to open {}: {e}", path.display()))
        })?;

        let write_txn = db.begin_write().map_err(store_err)?;
        write_txn.open_table(ROUTES).map_err(store_err)?;
        write_txn.commit().map_err(store_err)?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl RouteStore for RedbRouteStore {
    fn get(&self, forwarded: MessageId) -> Result<Option<RouteEntry>> {
        let read_txn = self.db.begin_read().map_err(store_err)?;
        let table = read_txn.open_table(ROUTES).map_err(store_err)?;
        let entry = table
            .get(i64::from(forwarded.0))
            .map_err(store_err)?
            .map(|guard| {
                let (origin, stored_at) = guard.value();
                RouteEntry {
                    forwarded,
                    origin: ChatId(origin),
                    stored_at,
                }
            });
        Ok(entry)
    }

    fn put(&self, entry: RouteEntry) -> Result<()> {
        let write_txn = self.db.begin_write().map_err(store_err)?;
        {
            let mut table = write_txn.open_table(ROUTES).map_err(store_err)?;
            table
                .insert(i64::from(entry.forwarded.0), (entry.origin.0, entry.stored_at))
                .map_err(store_err)?;
        }
        write_txn.commit().map_err(store_err)?;
        Ok(())
    }

    fn prune_older_than(&self, cutoff: i64) -> Result<u64> {
        let write_txn = self.db.begin_write().map_err(store_err)?;
        let removed = {
            let mut table = write_txn.open_table(ROUTES).map_err(store_err)?;
            let before = table.len().map_err(store_err)?;
            table
                .retain(|_, (_, stored_at)| stored_at >= cutoff)
                .map_err(store_err)?;
            before - table.len().map_err(store_err)?
        };
        write_txn.commit().map_err(store_err)?;
        Ok(removed)
    }

    fn len(&self) -> Result<u64> {
        let read_txn = self.db.begin_read().map_err(store_err)?;
        let table = read_txn.open_table(ROUTES).map_err(store_err)?;
        table.len().map_err(store_err)
    }
}
