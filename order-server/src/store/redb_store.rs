//! redb-backed key-value store
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `kv` | `key` | bytes | Primary records |
//! | `sets` | `(set, member)` | `()` | Named unordered sets |
//!
//! # Atomicity
//!
//! Every [`Transaction`] runs inside one redb write transaction. Guards are
//! evaluated against the state inside that transaction; a failed guard or a
//! cancelled token aborts it, so no partial batch is ever committed. redb
//! serializes writers, which gives the same isolation a single-threaded
//! `MULTI`/`EXEC` would.
//!
//! # Scans
//!
//! `sets` is ordered by `(set, member)`. A scan step resumes strictly after
//! the last member examined by the previous step, so members present for
//! the whole walk are returned exactly once, even while other members are
//! added or removed.

use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use tokio_util::sync::CancellationToken;

use super::{
    Command, KvStore, ScanCursor, ScanOptions, ScanPage, StoreError, StoreResult, Transaction,
    TxOutcome,
};

/// Primary records: key = record key, value = encoded payload
const KV_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("kv");

/// Set membership: key = (set name, member), value = empty (existence check)
const SETS_TABLE: TableDefinition<(&str, &str), ()> = TableDefinition::new("sets");

/// Store handle backed by redb
///
/// Cheap to clone; all clones share the same database and see the same
/// [`close`](KvStore::close).
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<RwLock<Option<Arc<Database>>>>,
}

impl RedbStore {
    /// Open or create the database at the given path
    ///
    /// redb commits with `Durability::Immediate` by default: a committed
    /// transaction is persistent once `commit()` returns.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let db = Database::create(path)?;
        tracing::info!(path = %path.display(), "Order store opened");
        Self::init(db)
    }

    /// Open a database that lives only in memory (tests, ephemeral runs)
    pub fn open_in_memory() -> StoreResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StoreResult<Self> {
        // Create tables up front so read transactions never see them missing
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(KV_TABLE)?;
            let _ = write_txn.open_table(SETS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(RwLock::new(Some(Arc::new(db)))),
        })
    }

    fn database(&self) -> StoreResult<Arc<Database>> {
        self.db.read().clone().ok_or(StoreError::Closed)
    }

    /// Run a redb operation off the async runtime
    async fn run_blocking<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> StoreResult<T> + Send + 'static,
    {
        let db = self.database()?;
        tokio::task::spawn_blocking(move || f(&db)).await?
    }
}

#[async_trait]
impl KvStore for RedbStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let key = key.to_owned();
        self.run_blocking(move |db| {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(KV_TABLE)?;
            let value = table.get(key.as_str())?.map(|guard| guard.value().to_vec());
            Ok(value)
        })
        .await
    }

    async fn multi_get(&self, keys: &[String]) -> StoreResult<Vec<Option<Vec<u8>>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let keys = keys.to_vec();
        self.run_blocking(move |db| {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(KV_TABLE)?;

            let mut values = Vec::with_capacity(keys.len());
            for key in &keys {
                let value = table.get(key.as_str())?.map(|guard| guard.value().to_vec());
                values.push(value);
            }
            Ok(values)
        })
        .await
    }

    async fn scan_set(
        &self,
        set: &str,
        cursor: &ScanCursor,
        options: &ScanOptions,
    ) -> StoreResult<ScanPage> {
        let set = set.to_owned();
        let cursor = cursor.clone();
        let options = options.clone();

        self.run_blocking(move |db| {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(SETS_TABLE)?;

            let lower = match cursor.position() {
                Some(after) => Bound::Excluded((set.as_str(), after)),
                None => Bound::Included((set.as_str(), "")),
            };
            let count = options.count.max(1);

            let mut members = Vec::new();
            let mut last_examined: Option<String> = None;
            let mut examined = 0usize;
            let mut has_more = false;

            for entry in table.range((lower, Bound::Unbounded))? {
                let (key, _) = entry?;
                let (owner, member) = key.value();
                if owner != set {
                    break;
                }
                if examined == count {
                    has_more = true;
                    break;
                }
                examined += 1;
                if options.pattern.matches(member) {
                    members.push(member.to_owned());
                }
                last_examined = Some(member.to_owned());
            }

            let cursor = match last_examined {
                Some(member) if has_more => ScanCursor::after(member),
                _ => ScanCursor::START,
            };

            Ok(ScanPage { members, cursor })
        })
        .await
    }

    async fn exec(&self, tx: Transaction, cancel: &CancellationToken) -> StoreResult<TxOutcome> {
        if tx.is_empty() {
            return Ok(TxOutcome::Committed(Vec::new()));
        }

        let cancel = cancel.clone();
        self.run_blocking(move |db| apply_transaction(db, tx, &cancel))
            .await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.run_blocking(|db| {
            let read_txn = db.begin_read()?;
            let _ = read_txn.open_table(KV_TABLE)?;
            Ok(())
        })
        .await
    }

    async fn close(&self) -> StoreResult<()> {
        // In-flight operations keep their own Arc; the file is released
        // once the last of them finishes.
        if self.db.write().take().is_some() {
            tracing::info!("Order store closed");
        }
        Ok(())
    }
}

fn apply_transaction(
    db: &Database,
    tx: Transaction,
    cancel: &CancellationToken,
) -> StoreResult<TxOutcome> {
    if cancel.is_cancelled() {
        return Err(StoreError::Cancelled);
    }

    let write_txn = db.begin_write()?;
    let mut replies = Vec::with_capacity(tx.len());

    let aborted_at = {
        let mut kv = write_txn.open_table(KV_TABLE)?;
        let mut sets = write_txn.open_table(SETS_TABLE)?;
        let mut aborted_at = None;

        for (index, command) in tx.commands().iter().enumerate() {
            let applied = match command {
                Command::Set { key, value } => {
                    kv.insert(key.as_str(), value.as_slice())?;
                    true
                }
                Command::SetIfAbsent { key, value } => {
                    let exists = kv.get(key.as_str())?.is_some();
                    if !exists {
                        kv.insert(key.as_str(), value.as_slice())?;
                    }
                    !exists
                }
                Command::SetIfPresent { key, value } => {
                    let exists = kv.get(key.as_str())?.is_some();
                    if exists {
                        kv.insert(key.as_str(), value.as_slice())?;
                    }
                    exists
                }
                Command::SetIfEquals {
                    key,
                    expected,
                    value,
                } => {
                    let matches = kv
                        .get(key.as_str())?
                        .is_some_and(|current| current.value() == expected.as_slice());
                    if matches {
                        kv.insert(key.as_str(), value.as_slice())?;
                    }
                    matches
                }
                Command::Delete { key } => kv.remove(key.as_str())?.is_some(),
                Command::SetAdd { set, member } => sets
                    .insert((set.as_str(), member.as_str()), ())?
                    .is_none(),
                Command::SetRemove { set, member } => sets
                    .remove((set.as_str(), member.as_str()))?
                    .is_some(),
            };

            if command.is_guarded() && !applied {
                aborted_at = Some(index);
                break;
            }
            replies.push(applied);
        }

        aborted_at
    };

    if let Some(index) = aborted_at {
        write_txn.abort()?;
        let command = tx.into_commands().swap_remove(index);
        tracing::debug!(index, command = %command, "Transaction guard failed, aborted");
        return Ok(TxOutcome::Aborted { index, command });
    }

    // Last chance to back out: once commit starts the unit is applied
    if cancel.is_cancelled() {
        write_txn.abort()?;
        return Err(StoreError::Cancelled);
    }

    write_txn.commit()?;
    Ok(TxOutcome::Committed(replies))
}
