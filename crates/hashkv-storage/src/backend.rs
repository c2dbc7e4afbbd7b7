//! Backend capability interface.
//!
//! A [`HashBackend`] is one supported store technology. It hands out a
//! [`HashSession`] per operation; the session owns whatever connection the
//! backend acquired and releases it when dropped, so every exit path of an
//! operation (including `?` early returns) gives the connection back.
//!
//! Backends only speak in terms of a hash *bucket* and its *fields*. Mapping
//! a namespace to a bucket, pairing scan pages and turning a missing field
//! into [`StorageError::NotFound`](crate::StorageError::NotFound) is the job of
//! [`HashStore`](crate::HashStore).

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::StorageResult;

/// Cursor value that starts a scan and, when returned, ends it.
pub const SCAN_START: u64 = 0;

/// One page of an incremental field scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Cursor to resume from. [`SCAN_START`] means the scan is complete.
    pub cursor: u64,
    /// Flat alternating sequence: field, value, field, value, ...
    pub items: Vec<String>,
}

impl ScanPage {
    /// Build a page from a cursor and flat field/value items.
    #[must_use]
    pub fn new(cursor: u64, items: Vec<String>) -> Self {
        Self { cursor, items }
    }

    /// Whether the server signalled the end of the scan.
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.cursor == SCAN_START
    }
}

/// A store technology able to open per-operation sessions.
#[async_trait]
pub trait HashBackend: Send + Sync {
    /// Session type handed out per operation.
    type Session: HashSession;

    /// Acquire a session (dial, pool checkout, or reuse of a held handle).
    async fn session(&self) -> StorageResult<Self::Session>;

    /// Short backend name used in log fields.
    fn name(&self) -> &'static str;
}

/// Hash-table commands issued over one acquired connection.
#[async_trait]
pub trait HashSession: Send {
    /// List every field name of `bucket`.
    async fn field_names(&mut self, bucket: &str) -> StorageResult<Vec<String>>;

    /// Fetch one field value. `None` when the field is absent.
    async fn field(&mut self, bucket: &str, field: &str) -> StorageResult<Option<String>>;

    /// Fetch the entire bucket as a mapping.
    async fn all_fields(&mut self, bucket: &str) -> StorageResult<HashMap<String, String>>;

    /// Fetch one scan page starting at `cursor`, filtered server-side by the
    /// glob `pattern`.
    ///
    /// `None` means the store replied with nothing at all (nil or empty
    /// reply), which callers treat as the end of the scan.
    async fn scan_fields(
        &mut self,
        bucket: &str,
        cursor: u64,
        pattern: &str,
    ) -> StorageResult<Option<ScanPage>>;

    /// Create or overwrite a field.
    async fn set_field(&mut self, bucket: &str, field: &str, value: &str) -> StorageResult<()>;

    /// Remove a field, returning the number of fields removed (0 or 1).
    async fn delete_field(&mut self, bucket: &str, field: &str) -> StorageResult<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_page_is_last() {
        assert!(ScanPage::new(SCAN_START, vec![]).is_last());
        assert!(!ScanPage::new(17, vec!["a".into(), "1".into()]).is_last());
    }
}
