//! Typed JSON access on top of any [`EntryStore`].

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{StorageError, StorageResult};
use crate::store::EntryStore;

/// JSON convenience methods, available on every [`EntryStore`].
#[async_trait]
pub trait EntryStoreExt: EntryStore {
    /// Read `key` and deserialize it from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the key is absent and
    /// [`StorageError::Serialization`] if the value is not valid JSON for `T`.
    async fn read_json<T: DeserializeOwned + Send>(&self, key: &str) -> StorageResult<T> {
        let raw = self.read_entry(key).await?;
        serde_json::from_str(&raw).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    /// Serialize `value` as JSON and store it under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if serialization fails.
    async fn insert_json<T: Serialize + Sync>(&self, key: &str, value: &T) -> StorageResult<()> {
        let raw =
            serde_json::to_string(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.insert_entry(key, &raw).await
    }

    /// Read every entry matching `pattern` and deserialize each value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] naming the first key whose
    /// value does not decode.
    async fn read_all_matching_json<T: DeserializeOwned + Send>(
        &self,
        pattern: &str,
    ) -> StorageResult<HashMap<String, T>> {
        self.read_all_matching_entries(pattern)
            .await?
            .into_iter()
            .map(|(key, raw)| match serde_json::from_str(&raw) {
                Ok(value) => Ok((key, value)),
                Err(e) => Err(StorageError::Serialization(format!("{key}: {e}"))),
            })
            .collect()
    }
}

impl<S: EntryStore + ?Sized> EntryStoreExt for S {}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::memory::MemoryBackend;
    use crate::namespace::Namespace;
    use crate::store::HashStore;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Endpoint {
        kind: String,
        value: String,
    }

    fn store() -> HashStore<MemoryBackend> {
        HashStore::new(Namespace::new("json").unwrap(), MemoryBackend::new())
    }

    #[tokio::test]
    async fn test_json_round_trip() {
        let store = store();
        let ep = Endpoint {
            kind: "tcp".into(),
            value: "192.168.0.1".into(),
        };
        store.insert_json("ep", &ep).await.unwrap();
        let loaded: Endpoint = store.read_json("ep").await.unwrap();
        assert_eq!(loaded, ep);
    }

    #[tokio::test]
    async fn test_json_invalid_value_is_serialization_error() {
        let store = store();
        store.insert_entry("ep", "not json").await.unwrap();
        let err = store.read_json::<Endpoint>("ep").await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_json_matching_names_bad_key() {
        let store = store();
        store.insert_entry("ep-bad", "{").await.unwrap();
        let err = store
            .read_all_matching_json::<Endpoint>("ep-*")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Serialization(msg) if msg.starts_with("ep-bad")));
    }

    #[tokio::test]
    async fn test_json_through_trait_object() {
        let store: std::sync::Arc<dyn EntryStore> = std::sync::Arc::new(store());
        store.insert_json("n", &7_u32).await.unwrap();
        assert_eq!(store.read_json::<u32>("n").await.unwrap(), 7);
    }
}
