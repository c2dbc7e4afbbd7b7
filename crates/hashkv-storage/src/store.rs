//! The store interface and the generic hash-store adapter.
//!
//! [`EntryStore`] is the technology-independent contract: six CRUD
//! operations, each implicitly scoped to one namespace. [`HashStore`]
//! implements it on top of any [`HashBackend`], one session per operation.
//!
//! # Example
//!
//! ```rust
//! use hashkv_storage::{EntryStore, HashStore, MemoryBackend, Namespace};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> hashkv_storage::StorageResult<()> {
//! let store = HashStore::new(Namespace::new("registry")?, MemoryBackend::new());
//!
//! store.insert_entry("key1", "value1").await?;
//! assert_eq!(store.read_entry("key1").await?, "value1");
//! assert_eq!(store.delete_entry("key1").await?, 1);
//! assert_eq!(store.delete_entry("key1").await?, 0);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{Instrument, Span, debug, debug_span, warn};

use crate::backend::{HashBackend, HashSession, SCAN_START};
use crate::error::{StorageError, StorageResult};
use crate::namespace::Namespace;

/// Namespaced key-value CRUD contract.
///
/// No ordering is guaranteed for key listings or mappings, and multi-entry
/// reads are not atomic with respect to concurrent writers.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// The namespace every operation is scoped to.
    fn namespace(&self) -> &Namespace;

    /// List all keys in the namespace.
    async fn read_keys(&self) -> StorageResult<Vec<String>>;

    /// Read the value stored under `key`.
    ///
    /// Returns [`StorageError::NotFound`] if the key is absent.
    async fn read_entry(&self, key: &str) -> StorageResult<String>;

    /// Read the whole namespace as a mapping.
    async fn read_all_entries(&self) -> StorageResult<HashMap<String, String>>;

    /// Read every entry whose key matches the glob-style `pattern`.
    async fn read_all_matching_entries(
        &self,
        pattern: &str,
    ) -> StorageResult<HashMap<String, String>>;

    /// Create or overwrite the entry for `key`.
    async fn insert_entry(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove `key`, returning how many entries were removed (0 or 1).
    ///
    /// Removing an absent key is not an error.
    async fn delete_entry(&self, key: &str) -> StorageResult<u64>;
}

/// [`EntryStore`] adapter over a hash-table backend.
///
/// The namespace names the backend bucket and is fixed for the lifetime of
/// the store. Each operation acquires its own session from the backend and
/// drops it before returning.
pub struct HashStore<B> {
    namespace: Namespace,
    backend: B,
    span: Span,
}

impl<B> std::fmt::Debug for HashStore<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashStore")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl<B: HashBackend> HashStore<B> {
    /// Create a store for `namespace` over `backend`.
    ///
    /// Operations are traced under a `hash_store` span carrying the
    /// namespace; use [`with_span`](Self::with_span) to attach them to a
    /// caller-owned span instead.
    ///
    /// The `hash_store` span is created here, so a store built before a
    /// subscriber is installed keeps a disabled parent span and its
    /// operation spans become roots. Each operation span also records the
    /// namespace, so log lines stay attributable either way.
    #[must_use]
    pub fn new(namespace: Namespace, backend: B) -> Self {
        let span = tracing::info_span!(
            "hash_store",
            namespace = %namespace,
            backend = backend.name()
        );
        Self {
            namespace,
            backend,
            span,
        }
    }

    /// Trace every operation as a child of `span`.
    ///
    /// `span` must be enabled when the operations run for the nesting to
    /// show; a disabled span behaves like no parent.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// The backend this store issues commands through.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn op_span(&self, op: &'static str) -> Span {
        debug_span!(parent: &self.span, "op", op, namespace = %self.namespace)
    }

    async fn scan_matching(&self, pattern: &str) -> StorageResult<HashMap<String, String>> {
        let mut session = self.backend.session().await?;
        let bucket = self.namespace.as_str();
        let mut matches = HashMap::new();
        let mut cursor = SCAN_START;

        loop {
            let Some(page) = session.scan_fields(bucket, cursor, pattern).await? else {
                debug!(cursor, "scan returned an empty reply; stopping");
                break;
            };

            let pairs = page.items.chunks_exact(2);
            if let [dangling] = pairs.remainder() {
                warn!(
                    cursor = page.cursor,
                    field = %dangling,
                    "scan page has an odd item count; dropping trailing field"
                );
            }
            for pair in pairs {
                if let [field, value] = pair {
                    matches.insert(field.clone(), value.clone());
                }
            }

            if page.is_last() {
                break;
            }
            cursor = page.cursor;
        }

        debug!(pattern, count = matches.len(), "scan complete");
        Ok(matches)
    }
}

#[async_trait]
impl<B: HashBackend> EntryStore for HashStore<B> {
    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    async fn read_keys(&self) -> StorageResult<Vec<String>> {
        async {
            let mut session = self.backend.session().await?;
            let keys = session.field_names(self.namespace.as_str()).await?;
            debug!(count = keys.len(), "read keys");
            Ok::<_, StorageError>(keys)
        }
        .instrument(self.op_span("read_keys"))
        .await
    }

    async fn read_entry(&self, key: &str) -> StorageResult<String> {
        async {
            let mut session = self.backend.session().await?;
            session
                .field(self.namespace.as_str(), key)
                .await?
                .ok_or_else(|| StorageError::NotFound(key.to_owned()))
        }
        .instrument(self.op_span("read_entry"))
        .await
    }

    async fn read_all_entries(&self) -> StorageResult<HashMap<String, String>> {
        async {
            let mut session = self.backend.session().await?;
            let entries = session.all_fields(self.namespace.as_str()).await?;
            debug!(count = entries.len(), "read all entries");
            Ok::<_, StorageError>(entries)
        }
        .instrument(self.op_span("read_all_entries"))
        .await
    }

    async fn read_all_matching_entries(
        &self,
        pattern: &str,
    ) -> StorageResult<HashMap<String, String>> {
        self.scan_matching(pattern)
            .instrument(self.op_span("read_all_matching_entries"))
            .await
    }

    async fn insert_entry(&self, key: &str, value: &str) -> StorageResult<()> {
        async {
            let mut session = self.backend.session().await?;
            session
                .set_field(self.namespace.as_str(), key, value)
                .await?;
            debug!(key, "inserted entry");
            Ok::<_, StorageError>(())
        }
        .instrument(self.op_span("insert_entry"))
        .await
    }

    async fn delete_entry(&self, key: &str) -> StorageResult<u64> {
        async {
            let mut session = self.backend.session().await?;
            let removed = session
                .delete_field(self.namespace.as_str(), key)
                .await?;
            debug!(key, removed, "deleted entry");
            Ok::<_, StorageError>(removed)
        }
        .instrument(self.op_span("delete_entry"))
        .await
    }
}
