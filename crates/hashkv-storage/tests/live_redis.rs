//! Round trips against a real Redis server.
//!
//! Ignored by default. Run with:
//!
//! ```text
//! HASHKV_TEST_REDIS_URL=redis://127.0.0.1:6379 cargo test -p hashkv-storage -- --ignored
//! ```

#![cfg(feature = "redis")]

use std::time::Duration;

use hashkv_storage::redis::{open, open_pooled};
use hashkv_storage::{EntryStore, Namespace, StorageError};
use hashkv_test::{live_redis_url, setup_test_logging_default, unique_namespace};

async fn exercise(store: &dyn EntryStore) {
    for (key, value) in [("inst-1", "a"), ("inst-2", "b"), ("other", "c")] {
        store.insert_entry(key, value).await.unwrap();
    }

    let mut keys = store.read_keys().await.unwrap();
    keys.sort();
    assert_eq!(keys, vec!["inst-1", "inst-2", "other"]);

    assert_eq!(store.read_entry("inst-1").await.unwrap(), "a");
    store.insert_entry("inst-1", "a2").await.unwrap();
    assert_eq!(store.read_entry("inst-1").await.unwrap(), "a2");

    let all = store.read_all_entries().await.unwrap();
    let matching = store.read_all_matching_entries("inst-*").await.unwrap();
    assert_eq!(matching.len(), 2);
    for (key, value) in &matching {
        assert_eq!(all.get(key), Some(value));
    }
    assert_eq!(
        store.read_all_matching_entries("inst-*").await.unwrap(),
        matching
    );

    for key in ["inst-1", "inst-2", "other"] {
        assert_eq!(store.delete_entry(key).await.unwrap(), 1);
    }
    assert_eq!(store.delete_entry("inst-1").await.unwrap(), 0);
    assert!(matches!(
        store.read_entry("inst-1").await,
        Err(StorageError::NotFound(_))
    ));
}

#[tokio::test]
#[ignore = "requires HASHKV_TEST_REDIS_URL"]
async fn test_live_direct() {
    setup_test_logging_default();
    let Some(url) = live_redis_url() else {
        return;
    };
    let namespace = Namespace::new(unique_namespace("direct")).unwrap();
    let store = open(namespace, &url, None).unwrap();
    exercise(&store).await;
}

#[tokio::test]
#[ignore = "requires HASHKV_TEST_REDIS_URL"]
async fn test_live_pooled() {
    setup_test_logging_default();
    let Some(url) = live_redis_url() else {
        return;
    };
    let namespace = Namespace::new(unique_namespace("pooled")).unwrap();
    let store = open_pooled(namespace, &url, None, 4, Some(Duration::from_secs(2))).unwrap();
    exercise(&store).await;
}

#[tokio::test]
#[ignore = "requires HASHKV_TEST_REDIS_URL"]
async fn test_live_single_slot_pool_survives_failed_operation() {
    setup_test_logging_default();
    let Some(url) = live_redis_url() else {
        return;
    };
    let namespace = Namespace::new(unique_namespace("single-slot")).unwrap();
    let store = open_pooled(namespace, &url, None, 1, Some(Duration::from_millis(500))).unwrap();

    assert!(matches!(
        store.read_entry("missing").await,
        Err(StorageError::NotFound(_))
    ));
    store.insert_entry("present", "v").await.unwrap();
    assert_eq!(store.read_entry("present").await.unwrap(), "v");
    assert_eq!(store.delete_entry("present").await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires HASHKV_TEST_REDIS_URL"]
async fn test_live_unreachable_is_connection_error() {
    setup_test_logging_default();
    if live_redis_url().is_none() {
        return;
    }
    let store = open(Namespace::new("unreachable").unwrap(), "127.0.0.1:1", None).unwrap();
    assert!(matches!(
        store.read_keys().await,
        Err(StorageError::Connection { .. })
    ));
}
