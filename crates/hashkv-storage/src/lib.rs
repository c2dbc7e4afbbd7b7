//! Namespaced key-value storage over hash-table stores.
//!
//! Every store is bound to one [`Namespace`], which names a single hash
//! bucket in the backing store. The [`EntryStore`] trait is the contract
//! callers program against; [`HashStore`] implements it for any
//! [`HashBackend`].
//!
//! # Backends
//!
//! - [`redis`]: Redis hashes, over a per-operation dialed connection, a
//!   shared connection, or a `deadpool-redis` pool (feature `redis`, on by
//!   default).
//! - [`MemoryBackend`]: in-process buckets for tests and embedding.
//!
//! With the `config` feature, [`open_store`] builds either from a
//! `hashkv-config` store section.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod backend;
mod error;
mod json;
mod memory;
mod namespace;
mod store;

#[cfg(feature = "config")]
mod factory;
#[cfg(feature = "redis")]
pub mod redis;

pub use backend::{HashBackend, HashSession, SCAN_START, ScanPage};
pub use error::{StorageError, StorageResult};
#[cfg(feature = "config")]
pub use factory::open_store;
pub use json::EntryStoreExt;
pub use memory::{DEFAULT_PAGE_SIZE, MemoryBackend, MemorySession};
pub use namespace::Namespace;
pub use store::{EntryStore, HashStore};
