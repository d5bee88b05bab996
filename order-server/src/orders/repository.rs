//! Order repository
//!
//! Maps orders onto the key-value store:
//!
//! ```text
//! insert      → SETNX order:<id> + SADD orders order:<id>   (one atomic unit)
//! find_by_id  → GET order:<id>
//! update      → SETXX order:<id>
//! delete_by_id→ DEL order:<id>   + SREM orders order:<id>   (one atomic unit)
//! find_all    → SSCAN orders <cursor> → MGET <keys>
//! ```
//!
//! The `orders` index set mirrors the primary records exactly: the only
//! operations that add or remove primary records also add or remove the
//! index entry in the same unit, and those units are all-or-nothing.
//!
//! Every call takes a [`CancellationToken`]. Reads race the token and
//! return [`RepoError::Cancelled`] as soon as it fires. Writes hand the
//! token to the store, which checks it before committing, so a write
//! reported as cancelled was never applied.

use std::future::Future;
use std::sync::Arc;

use shared::Order;
use tokio_util::sync::CancellationToken;

use super::codec;
use super::error::{RepoError, RepoResult};
use super::key::{ORDERS_INDEX, order_key};
use crate::store::{
    Command, DEFAULT_SCAN_COUNT, KvStore, ScanCursor, ScanOptions, StoreError, StoreResult,
    Transaction, TxOutcome,
};

/// Page size used when a caller asks for zero
pub const DEFAULT_PAGE_SIZE: u32 = DEFAULT_SCAN_COUNT as u32;

/// Listing request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindAllPage {
    /// Cursor returned by the previous call, or [`ScanCursor::START`]
    pub offset: ScanCursor,
    /// Members to examine in this step (a hint, not an exact count)
    pub size: u32,
}

impl FindAllPage {
    pub fn new(offset: ScanCursor, size: u32) -> Self {
        Self { offset, size }
    }
}

/// Listing response
///
/// `cursor` is [`ScanCursor::START`] once the walk is complete. An empty
/// `orders` list with a non-start cursor is normal and means "keep going".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindResult {
    pub orders: Vec<Order>,
    pub cursor: ScanCursor,
}

impl FindResult {
    pub fn is_last_page(&self) -> bool {
        self.cursor.is_start()
    }
}

/// Order persistence over a [`KvStore`]
#[derive(Clone)]
pub struct OrderRepository {
    store: Arc<dyn KvStore>,
}

impl OrderRepository {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Persist a new order and index it
    ///
    /// Fails with [`RepoError::AlreadyExists`] if the id is taken, leaving
    /// the stored record and index untouched.
    pub async fn insert(&self, order: &Order, cancel: &CancellationToken) -> RepoResult<()> {
        let id = order.order_id;
        let payload = codec::encode(order).map_err(RepoError::Encode)?;
        let key = order_key(id);

        let tx = Transaction::new()
            .set_if_absent(key.clone(), payload)
            .set_add(ORDERS_INDEX, key);

        match self.store.exec(tx, cancel).await? {
            TxOutcome::Committed(_) => {
                tracing::debug!(order_id = id, "Order inserted");
                Ok(())
            }
            TxOutcome::Aborted { index: 0, .. } => Err(RepoError::AlreadyExists(id)),
            TxOutcome::Aborted { index, command } => Err(unexpected_abort(index, command)),
        }
    }

    /// Fetch a single order
    pub async fn find_by_id(&self, id: u64, cancel: &CancellationToken) -> RepoResult<Order> {
        let key = order_key(id);
        let bytes = cancellable(cancel, self.store.get(&key))
            .await?
            .ok_or(RepoError::NotExist(id))?;
        decode_record(&key, &bytes)
    }

    /// Replace an existing order
    ///
    /// Never creates: a missing id is [`RepoError::NotExist`]. The index is
    /// not touched since membership cannot change.
    pub async fn update(&self, order: &Order, cancel: &CancellationToken) -> RepoResult<()> {
        let id = order.order_id;
        let payload = codec::encode(order).map_err(RepoError::Encode)?;
        let key = order_key(id);

        if self.store.set_if_present(&key, payload, cancel).await? {
            tracing::debug!(order_id = id, "Order updated");
            Ok(())
        } else {
            Err(RepoError::NotExist(id))
        }
    }

    /// Replace `current` with `updated`, provided the stored record is still
    /// exactly `current`
    ///
    /// Compare-and-swap on the encoded record: a concurrent write between
    /// the caller's read and this call yields [`RepoError::Conflict`] and
    /// leaves the newer record in place. A missing record is
    /// [`RepoError::NotExist`].
    pub async fn update_if(
        &self,
        current: &Order,
        updated: &Order,
        cancel: &CancellationToken,
    ) -> RepoResult<()> {
        let id = current.order_id;
        if updated.order_id != id {
            return Err(RepoError::Conflict(id));
        }

        let expected = codec::encode(current).map_err(RepoError::Encode)?;
        let payload = codec::encode(updated).map_err(RepoError::Encode)?;
        let key = order_key(id);

        let tx = Transaction::new().set_if_equals(key.clone(), expected, payload);

        match self.store.exec(tx, cancel).await? {
            TxOutcome::Committed(_) => {
                tracing::debug!(order_id = id, "Order updated");
                Ok(())
            }
            TxOutcome::Aborted { index: 0, .. } => {
                // Tell a lost race apart from a deleted record
                match cancellable(cancel, self.store.get(&key)).await? {
                    Some(_) => Err(RepoError::Conflict(id)),
                    None => Err(RepoError::NotExist(id)),
                }
            }
            TxOutcome::Aborted { index, command } => Err(unexpected_abort(index, command)),
        }
    }

    /// Remove an order and its index entry
    pub async fn delete_by_id(&self, id: u64, cancel: &CancellationToken) -> RepoResult<()> {
        let key = order_key(id);

        let tx = Transaction::new()
            .delete(key.clone())
            .set_remove(ORDERS_INDEX, key);

        match self.store.exec(tx, cancel).await? {
            TxOutcome::Committed(replies) => {
                if replies.get(1) == Some(&false) {
                    tracing::warn!(order_id = id, "Deleted order had no index entry");
                }
                tracing::debug!(order_id = id, "Order deleted");
                Ok(())
            }
            TxOutcome::Aborted { index: 0, .. } => Err(RepoError::NotExist(id)),
            TxOutcome::Aborted { index, command } => Err(unexpected_abort(index, command)),
        }
    }

    /// One step of a listing walk over the index
    ///
    /// Orders come back in whatever order the scan yields them. Pass the
    /// returned cursor to the next call; the walk is over when the cursor
    /// is back at [`ScanCursor::START`].
    pub async fn find_all(
        &self,
        page: &FindAllPage,
        cancel: &CancellationToken,
    ) -> RepoResult<FindResult> {
        let size = if page.size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            page.size
        };
        let options = ScanOptions::new(size as usize).with_pattern("*");

        let scan = cancellable(
            cancel,
            self.store.scan_set(ORDERS_INDEX, &page.offset, &options),
        )
        .await?;

        if scan.members.is_empty() {
            return Ok(FindResult {
                orders: Vec::new(),
                cursor: scan.cursor,
            });
        }

        let values = cancellable(cancel, self.store.multi_get(&scan.members)).await?;

        let mut orders = Vec::with_capacity(values.len());
        for (key, value) in scan.members.iter().zip(values) {
            match value {
                Some(bytes) => orders.push(decode_record(key, &bytes)?),
                // Deleted between the scan and the fetch
                None => tracing::debug!(key = %key, "Indexed order vanished before fetch"),
            }
        }

        Ok(FindResult {
            orders,
            cursor: scan.cursor,
        })
    }
}

fn decode_record(key: &str, bytes: &[u8]) -> RepoResult<Order> {
    codec::decode(bytes).map_err(|source| RepoError::Decode {
        key: key.to_string(),
        source,
    })
}

fn unexpected_abort(index: usize, command: Command) -> RepoError {
    RepoError::Store(StoreError::Aborted {
        index,
        command: command.to_string(),
    })
}

/// Race a read against the caller's token
async fn cancellable<T>(
    cancel: &CancellationToken,
    op: impl Future<Output = StoreResult<T>>,
) -> RepoResult<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RepoError::Cancelled),
        result = op => Ok(result?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{RedbStore, ScanPage};
    use async_trait::async_trait;
    use chrono::Utc;
    use shared::LineItem;
    use std::time::Duration;
    use uuid::Uuid;

    fn create_test_order(id: u64) -> Order {
        Order::new(
            id,
            Uuid::new_v4(),
            vec![LineItem {
                item_id: Uuid::new_v4(),
                quantity: 1,
                price: 500,
            }],
            Utc::now(),
        )
    }

    fn repo_with_store() -> (OrderRepository, RedbStore) {
        let store = RedbStore::open_in_memory().unwrap();
        (OrderRepository::new(Arc::new(store.clone())), store)
    }

    /// Store whose reads never complete and whose writes always fail
    struct StalledStore;

    #[async_trait]
    impl KvStore for StalledStore {
        async fn get(&self, _key: &str) -> StoreResult<Option<Vec<u8>>> {
            std::future::pending().await
        }

        async fn multi_get(&self, _keys: &[String]) -> StoreResult<Vec<Option<Vec<u8>>>> {
            std::future::pending().await
        }

        async fn scan_set(
            &self,
            _set: &str,
            _cursor: &ScanCursor,
            _options: &ScanOptions,
        ) -> StoreResult<ScanPage> {
            std::future::pending().await
        }

        async fn exec(
            &self,
            _tx: Transaction,
            _cancel: &CancellationToken,
        ) -> StoreResult<TxOutcome> {
            Err(StoreError::Closed)
        }

        async fn ping(&self) -> StoreResult<()> {
            Err(StoreError::Closed)
        }

        async fn close(&self) -> StoreResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_insert_writes_record_and_index() {
        let (repo, store) = repo_with_store();
        let token = CancellationToken::new();
        let order = create_test_order(9);

        repo.insert(&order, &token).await.unwrap();

        let stored = store.get("order:9").await.unwrap().unwrap();
        assert_eq!(codec::decode(&stored).unwrap(), order);
        let page = store
            .scan_set(ORDERS_INDEX, &ScanCursor::START, &ScanOptions::default())
            .await
            .unwrap();
        assert_eq!(page.members, vec!["order:9".to_string()]);
    }

    #[tokio::test]
    async fn test_duplicate_insert_keeps_first_payload() {
        let (repo, _store) = repo_with_store();
        let token = CancellationToken::new();
        let first = create_test_order(5);
        let second = create_test_order(5);

        repo.insert(&first, &token).await.unwrap();
        let err = repo.insert(&second, &token).await.unwrap_err();

        assert!(matches!(err, RepoError::AlreadyExists(5)));
        assert_eq!(repo.find_by_id(5, &token).await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_find_missing_is_not_exist() {
        let (repo, _store) = repo_with_store();
        let err = repo
            .find_by_id(404, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::NotExist(404)));
    }

    #[tokio::test]
    async fn test_update_never_creates() {
        let (repo, store) = repo_with_store();
        let token = CancellationToken::new();

        let err = repo.update(&create_test_order(3), &token).await.unwrap_err();
        assert!(matches!(err, RepoError::NotExist(3)));
        assert_eq!(store.get("order:3").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_if_rejects_stale_read() {
        let (repo, _store) = repo_with_store();
        let token = CancellationToken::new();
        let original = create_test_order(5);
        repo.insert(&original, &token).await.unwrap();

        let mut first = original.clone();
        first.ship(Utc::now()).unwrap();
        repo.update_if(&original, &first, &token).await.unwrap();

        // A second writer still holding the original read loses
        let mut second = original.clone();
        second.ship(Utc::now() + chrono::Duration::seconds(5)).unwrap();
        let err = repo.update_if(&original, &second, &token).await.unwrap_err();
        assert!(matches!(err, RepoError::Conflict(5)));

        let stored = repo.find_by_id(5, &token).await.unwrap();
        assert_eq!(stored, first);
    }

    #[tokio::test]
    async fn test_update_if_missing_is_not_exist() {
        let (repo, store) = repo_with_store();
        let token = CancellationToken::new();
        let order = create_test_order(6);

        let err = repo.update_if(&order, &order, &token).await.unwrap_err();
        assert!(matches!(err, RepoError::NotExist(6)));
        assert_eq!(store.get("order:6").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_missing_leaves_index_alone() {
        let (repo, store) = repo_with_store();
        let token = CancellationToken::new();
        repo.insert(&create_test_order(1), &token).await.unwrap();

        let err = repo.delete_by_id(2, &token).await.unwrap_err();
        assert!(matches!(err, RepoError::NotExist(2)));

        let page = store
            .scan_set(ORDERS_INDEX, &ScanCursor::START, &ScanOptions::default())
            .await
            .unwrap();
        assert_eq!(page.members, vec!["order:1".to_string()]);
    }

    #[tokio::test]
    async fn test_corrupt_record_is_decode_error() {
        let (repo, store) = repo_with_store();
        let token = CancellationToken::new();
        let tx = Transaction::new()
            .set("order:7", b"{\"order_id\":7".to_vec())
            .set_add(ORDERS_INDEX, "order:7");
        store.exec(tx, &token).await.unwrap();

        let err = repo.find_by_id(7, &token).await.unwrap_err();
        assert!(matches!(err, RepoError::Decode { ref key, .. } if key == "order:7"));

        let err = repo
            .find_all(&FindAllPage::new(ScanCursor::START, 10), &token)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_find_all_skips_record_missing_behind_index() {
        let (repo, store) = repo_with_store();
        let token = CancellationToken::new();
        repo.insert(&create_test_order(1), &token).await.unwrap();
        // Simulate a delete landing between the scan and the fetch
        store.set_add(ORDERS_INDEX, "order:2", &token).await.unwrap();

        let result = repo
            .find_all(&FindAllPage::new(ScanCursor::START, 10), &token)
            .await
            .unwrap();
        assert_eq!(result.orders.len(), 1);
        assert_eq!(result.orders[0].order_id, 1);
        assert!(result.is_last_page());
    }

    #[tokio::test]
    async fn test_zero_page_size_uses_default() {
        let (repo, _store) = repo_with_store();
        let token = CancellationToken::new();
        for id in 0..(DEFAULT_PAGE_SIZE as u64 + 2) {
            repo.insert(&create_test_order(id), &token).await.unwrap();
        }

        let result = repo
            .find_all(&FindAllPage::new(ScanCursor::START, 0), &token)
            .await
            .unwrap();
        assert_eq!(result.orders.len(), DEFAULT_PAGE_SIZE as usize);
        assert!(!result.is_last_page());
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_as_store_error() {
        let repo = OrderRepository::new(Arc::new(StalledStore));
        let token = CancellationToken::new();

        let err = repo.insert(&create_test_order(1), &token).await.unwrap_err();
        assert!(matches!(err, RepoError::Store(StoreError::Closed)));

        let err = repo.delete_by_id(1, &token).await.unwrap_err();
        assert!(err.is_store_failure());
    }

    #[tokio::test]
    async fn test_cancel_aborts_stalled_reads() {
        let repo = OrderRepository::new(Arc::new(StalledStore));
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let err = tokio::time::timeout(Duration::from_secs(5), repo.find_by_id(1, &token))
            .await
            .expect("find_by_id should return once cancelled")
            .unwrap_err();
        assert!(matches!(err, RepoError::Cancelled));

        let err = repo
            .find_all(&FindAllPage::default(), &token)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancelled_insert_leaves_nothing_behind() {
        let (repo, store) = repo_with_store();
        let token = CancellationToken::new();
        token.cancel();

        let err = repo.insert(&create_test_order(8), &token).await.unwrap_err();
        assert!(matches!(err, RepoError::Cancelled));

        assert_eq!(store.get("order:8").await.unwrap(), None);
        let page = store
            .scan_set(ORDERS_INDEX, &ScanCursor::START, &ScanOptions::default())
            .await
            .unwrap();
        assert!(page.members.is_empty());
    }
}
