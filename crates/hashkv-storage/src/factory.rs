//! Build a store from a `hashkv-config` store section.

use std::sync::Arc;
#[cfg(feature = "redis")]
use std::time::Duration;

#[cfg(feature = "redis")]
use hashkv_config::ConnectionMode;
use hashkv_config::{BackendKind, StoreSection};
use tracing::info;

use crate::error::StorageResult;
use crate::memory::MemoryBackend;
use crate::namespace::Namespace;
use crate::store::{EntryStore, HashStore};

/// Open the store described by `section`.
///
/// Redis stores are created lazily: no connection is made until the first
/// operation, so an unreachable server surfaces as a
/// [`StorageError::Connection`](crate::StorageError::Connection) from that
/// operation rather than from here.
///
/// # Errors
///
/// Returns [`StorageError::InvalidKey`](crate::StorageError::InvalidKey) for
/// an invalid namespace and
/// [`StorageError::Connection`](crate::StorageError::Connection) for an
/// unusable Redis address, or when the `redis` feature is disabled and the
/// section selects Redis.
pub fn open_store(section: &StoreSection) -> StorageResult<Arc<dyn EntryStore>> {
    let namespace = Namespace::new(section.namespace.clone())?;

    match section.backend {
        BackendKind::Memory => {
            info!(namespace = %namespace, "opening in-memory store");
            let backend = MemoryBackend::new().with_page_size(section.memory.page_size);
            Ok(Arc::new(HashStore::new(namespace, backend)))
        },
        #[cfg(feature = "redis")]
        BackendKind::Redis => {
            let redis = &section.redis;
            info!(
                namespace = %namespace,
                address = %redis.address,
                mode = ?redis.mode,
                "opening redis store"
            );
            match redis.mode {
                ConnectionMode::Direct => Ok(Arc::new(crate::redis::open(
                    namespace,
                    &redis.address,
                    redis.password.clone(),
                )?)),
                ConnectionMode::Pooled => Ok(Arc::new(crate::redis::open_pooled(
                    namespace,
                    &redis.address,
                    redis.password.clone(),
                    redis.pool.max_size,
                    redis.pool.wait_timeout_ms.map(Duration::from_millis),
                )?)),
            }
        },
        #[cfg(not(feature = "redis"))]
        BackendKind::Redis => Err(crate::StorageError::connection(
            "redis backend requested but the `redis` feature is disabled",
        )),
    }
}
