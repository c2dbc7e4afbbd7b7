//! Connection acquire/release against a local scripted RESP server.

#![cfg(feature = "redis")]

use std::time::Duration;

use hashkv_storage::redis::{open, open_pooled};
use hashkv_storage::{EntryStore, Namespace, StorageError};
use hashkv_test::{FAILING_FIELD, FakeRedisServer, setup_test_logging};

const NS: &str = "lifecycle";

fn namespace() -> Namespace {
    setup_test_logging("hashkv_storage=debug");
    Namespace::new(NS).unwrap()
}

#[tokio::test]
async fn test_dial_authenticates_before_first_command() {
    let server = FakeRedisServer::start(Some("pw")).await.unwrap();
    let store = open(namespace(), &server.address(), Some("pw".into())).unwrap();

    assert_eq!(store.read_keys().await.unwrap(), vec!["key1"]);

    let commands = server.commands();
    let auth = commands
        .iter()
        .position(|args| args.first().is_some_and(|c| c.eq_ignore_ascii_case("AUTH")))
        .expect("AUTH sent");
    let hkeys = commands
        .iter()
        .position(|args| args.first().is_some_and(|c| c.eq_ignore_ascii_case("HKEYS")))
        .expect("HKEYS sent");
    assert!(auth < hkeys, "AUTH must precede HKEYS: {commands:?}");
    assert_eq!(commands[auth], vec!["AUTH", "pw"]);
    assert_eq!(commands[hkeys], vec!["HKEYS", NS]);
}

#[tokio::test]
async fn test_dial_opens_connection_per_operation() {
    let server = FakeRedisServer::start(None).await.unwrap();
    let store = open(namespace(), &server.address(), None).unwrap();

    store.read_keys().await.unwrap();
    store.insert_entry("key1", "value1").await.unwrap();

    assert_eq!(server.connections(), 2);
    assert!(!server.command_names().contains(&"AUTH".to_owned()));
}

#[tokio::test]
async fn test_dial_rejected_auth_is_connection_error() {
    let server = FakeRedisServer::start(Some("pw")).await.unwrap();
    let store = open(namespace(), &server.address(), Some("wrong".into())).unwrap();

    let err = store.read_keys().await.unwrap_err();
    let StorageError::Connection { ref message, ref source } = err else {
        panic!("expected connection error, got {err:?}");
    };
    assert!(!message.is_empty());
    let source = source.as_ref().expect("redis error kept as source");
    assert!(source.downcast_ref::<redis::RedisError>().is_some());
    assert!(!server.command_names().contains(&"HKEYS".to_owned()));
}

#[tokio::test]
async fn test_pool_rejected_auth_is_connection_error() {
    let server = FakeRedisServer::start(Some("pw")).await.unwrap();
    let store = open_pooled(
        namespace(),
        &server.address(),
        Some("wrong".into()),
        1,
        Some(Duration::from_millis(500)),
    )
    .unwrap();

    assert!(matches!(
        store.read_keys().await,
        Err(StorageError::Connection { .. })
    ));
    assert!(!server.command_names().contains(&"HKEYS".to_owned()));
}

#[tokio::test]
async fn test_pool_connection_returned_after_failed_command() {
    let server = FakeRedisServer::start(Some("pw")).await.unwrap();
    let store = open_pooled(
        namespace(),
        &server.address(),
        Some("pw".into()),
        1,
        Some(Duration::from_millis(500)),
    )
    .unwrap();

    let err = store.read_entry(FAILING_FIELD).await.unwrap_err();
    let StorageError::Command { ref message, .. } = err else {
        panic!("expected command error, got {err:?}");
    };
    assert!(message.contains("forced failure"), "{message}");

    // A leaked checkout would exhaust the single slot and time out here.
    assert_eq!(store.read_keys().await.unwrap(), vec!["key1"]);
    assert!(matches!(
        store.read_entry("absent").await,
        Err(StorageError::NotFound(_))
    ));

    assert_eq!(server.connections(), 1);
    let names = server.command_names();
    assert_eq!(names.iter().filter(|c| *c == "AUTH").count(), 1);
    let auth = names.iter().position(|c| c == "AUTH").unwrap();
    let hget = names.iter().position(|c| c == "HGET").unwrap();
    assert!(auth < hget, "{names:?}");
}
