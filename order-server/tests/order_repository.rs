//! Order repository against a real redb backend

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use order_server::orders::codec;
use order_server::{FindAllPage, KvStore, OrderRepository, RedbStore, RepoError, ScanCursor};
use shared::{LineItem, Order};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

fn order(id: u64) -> Order {
    Order::new(
        id,
        Uuid::new_v4(),
        vec![LineItem {
            item_id: Uuid::new_v4(),
            quantity: 3,
            price: 250,
        }],
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    )
}

fn in_memory() -> (OrderRepository, RedbStore) {
    let store = RedbStore::open_in_memory().unwrap();
    (OrderRepository::new(Arc::new(store.clone())), store)
}

/// Walk the whole index, returning every id and the number of pages taken
async fn walk(repo: &OrderRepository, size: u32) -> (Vec<u64>, usize) {
    let cancel = CancellationToken::new();
    let mut page = FindAllPage::new(ScanCursor::START, size);
    let mut ids = Vec::new();
    let mut pages = 0;

    loop {
        let result = repo.find_all(&page, &cancel).await.unwrap();
        pages += 1;
        assert!(result.orders.len() <= size as usize);
        ids.extend(result.orders.iter().map(|o| o.order_id));
        if result.is_last_page() {
            return (ids, pages);
        }
        page.offset = result.cursor;
        assert!(pages < 100, "listing never terminated");
    }
}

#[tokio::test]
async fn test_paged_listing_yields_each_order_once() {
    let (repo, _store) = in_memory();
    let cancel = CancellationToken::new();
    for id in [1, 2, 3] {
        repo.insert(&order(id), &cancel).await.unwrap();
    }

    let (ids, pages) = walk(&repo, 2).await;

    assert_eq!(ids.iter().copied().collect::<BTreeSet<_>>(), BTreeSet::from([1, 2, 3]));
    assert_eq!(ids.len(), 3);
    assert!(pages >= 2);
}

#[tokio::test]
async fn test_empty_listing_starts_and_ends_at_start() {
    let (repo, _store) = in_memory();
    let result = repo
        .find_all(&FindAllPage::default(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(result.orders.is_empty());
    assert!(result.cursor.is_start());
}

#[tokio::test]
async fn test_insert_then_update_shipment() {
    let (repo, _store) = in_memory();
    let cancel = CancellationToken::new();
    let mut original = order(42);
    repo.insert(&original, &cancel).await.unwrap();

    let shipped_at = Utc.with_ymd_and_hms(2024, 5, 2, 9, 30, 0).unwrap();
    original.ship(shipped_at).unwrap();
    repo.update(&original, &cancel).await.unwrap();

    let found = repo.find_by_id(42, &cancel).await.unwrap();
    assert_eq!(found.shipped_at, Some(shipped_at));
    assert_eq!(found, original);
}

#[tokio::test]
async fn test_delete_removes_from_listing() {
    let (repo, _store) = in_memory();
    let cancel = CancellationToken::new();
    for id in 1..=5 {
        repo.insert(&order(id), &cancel).await.unwrap();
    }

    repo.delete_by_id(3, &cancel).await.unwrap();

    let (ids, _) = walk(&repo, 2).await;
    assert_eq!(ids.len(), 4);
    assert!(!ids.contains(&3));
    assert!(matches!(
        repo.find_by_id(3, &cancel).await,
        Err(RepoError::NotExist(3))
    ));
    assert!(matches!(
        repo.delete_by_id(3, &cancel).await,
        Err(RepoError::NotExist(3))
    ));
}

#[tokio::test]
async fn test_concurrent_inserts_of_one_id_admit_one_winner() {
    let (repo, store) = in_memory();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let repo = repo.clone();
            tokio::spawn(async move { repo.insert(&order(7), &CancellationToken::new()).await })
        })
        .collect();

    let mut created = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => created += 1,
            Err(RepoError::AlreadyExists(7)) => rejected += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!((created, rejected), (1, 7));

    let stored = store.get("order:7").await.unwrap().unwrap();
    assert_eq!(codec::decode(&stored).unwrap().order_id, 7);
}

#[tokio::test]
async fn test_orders_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orders.redb");
    let cancel = CancellationToken::new();

    {
        let store = RedbStore::open(&path).unwrap();
        let repo = OrderRepository::new(Arc::new(store.clone()));
        repo.insert(&order(11), &cancel).await.unwrap();
        repo.insert(&order(12), &cancel).await.unwrap();
        store.close().await.unwrap();
    }

    let store = RedbStore::open(&path).unwrap();
    let repo = OrderRepository::new(Arc::new(store));
    let (ids, _) = walk(&repo, 10).await;

    assert_eq!(ids.into_iter().collect::<BTreeSet<_>>(), BTreeSet::from([11, 12]));
}

#[tokio::test]
async fn test_operations_after_close_fail_as_store_errors() {
    let (repo, store) = in_memory();
    store.close().await.unwrap();

    let err = repo
        .find_by_id(1, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.is_store_failure());
}
