//! Key-value store abstraction
//!
//! The order persistence layer talks to its backend only through
//! [`KvStore`]: single-key reads, a one-snapshot multi-get, cursor scans
//! over named sets, and atomic multi-command submission ([`Transaction`]).
//!
//! # Modules
//!
//! - **command**: [`Command`], [`Transaction`] and [`TxOutcome`]
//! - **cursor**: opaque [`ScanCursor`] and scan parameters
//! - **glob**: member filtering for scans
//! - **redb_store**: [`RedbStore`], the embedded redb backend

pub mod command;
pub mod cursor;
pub mod error;
pub mod glob;
pub mod redb_store;

pub use command::{Command, Transaction, TxOutcome};
pub use cursor::{DEFAULT_SCAN_COUNT, ScanCursor, ScanOptions, ScanPage};
pub use error::{StoreError, StoreResult};
pub use glob::Glob;
pub use redb_store::RedbStore;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Backend consumed by the order repository
///
/// Implementations must apply each [`Transaction`] all-or-nothing and must
/// not commit a transaction whose token was cancelled before the commit.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a single key
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Read several keys from one consistent snapshot, in request order
    async fn multi_get(&self, keys: &[String]) -> StoreResult<Vec<Option<Vec<u8>>>>;

    /// One step of a cursor scan over the members of `set`
    async fn scan_set(
        &self,
        set: &str,
        cursor: &ScanCursor,
        options: &ScanOptions,
    ) -> StoreResult<ScanPage>;

    /// Submit a batch of commands as one atomic unit
    async fn exec(&self, tx: Transaction, cancel: &CancellationToken) -> StoreResult<TxOutcome>;

    /// Check the backend is reachable
    async fn ping(&self) -> StoreResult<()>;

    /// Release the backend. Later calls fail with [`StoreError::Closed`].
    async fn close(&self) -> StoreResult<()>;

    /// Write `value` unless `key` exists. Returns whether it was written.
    async fn set_if_absent(
        &self,
        key: &str,
        value: Vec<u8>,
        cancel: &CancellationToken,
    ) -> StoreResult<bool> {
        let tx = Transaction::new().set_if_absent(key, value);
        Ok(self.exec(tx, cancel).await?.is_committed())
    }

    /// Overwrite `key` only if it exists. Returns whether it was written.
    async fn set_if_present(
        &self,
        key: &str,
        value: Vec<u8>,
        cancel: &CancellationToken,
    ) -> StoreResult<bool> {
        let tx = Transaction::new().set_if_present(key, value);
        Ok(self.exec(tx, cancel).await?.is_committed())
    }

    /// Remove `key`. Returns whether it existed.
    async fn delete(&self, key: &str, cancel: &CancellationToken) -> StoreResult<bool> {
        let tx = Transaction::new().delete(key);
        Ok(self.exec(tx, cancel).await?.is_committed())
    }

    /// Add `member` to `set`. Returns whether it was newly added.
    async fn set_add(
        &self,
        set: &str,
        member: &str,
        cancel: &CancellationToken,
    ) -> StoreResult<bool> {
        let tx = Transaction::new().set_add(set, member);
        let outcome = self.exec(tx, cancel).await?;
        Ok(outcome.replies().first().copied().unwrap_or(false))
    }

    /// Remove `member` from `set`. Returns whether it was present.
    async fn set_remove(
        &self,
        set: &str,
        member: &str,
        cancel: &CancellationToken,
    ) -> StoreResult<bool> {
        let tx = Transaction::new().set_remove(set, member);
        let outcome = self.exec(tx, cancel).await?;
        Ok(outcome.replies().first().copied().unwrap_or(false))
    }
}
