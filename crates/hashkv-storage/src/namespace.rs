//! Namespace identifiers.

use std::fmt;

use crate::error::{StorageError, StorageResult};

/// Name of the hash bucket that scopes every operation of one store.
///
/// Namespaces are opaque to the store. They must be non-empty and must not
/// contain the null byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace(String);

impl Namespace {
    /// Validate and wrap a namespace name.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] if the name is empty or contains
    /// null bytes.
    pub fn new(name: impl Into<String>) -> StorageResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(StorageError::InvalidKey(
                "namespace must not be empty".into(),
            ));
        }
        if name.contains('\0') {
            return Err(StorageError::InvalidKey(
                "namespace must not contain null bytes".into(),
            ));
        }
        Ok(Self(name))
    }

    /// The namespace as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Namespace {
    type Error = StorageError;

    fn try_from(name: &str) -> StorageResult<Self> {
        Self::new(name)
    }
}

impl TryFrom<String> for Namespace {
    type Error = StorageError;

    fn try_from(name: String) -> StorageResult<Self> {
        Self::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_accepts_plain_name() {
        let ns = Namespace::new("registry:tenant-a").unwrap();
        assert_eq!(ns.as_str(), "registry:tenant-a");
        assert_eq!(ns.to_string(), "registry:tenant-a");
    }

    #[test]
    fn test_namespace_rejects_empty() {
        assert!(matches!(
            Namespace::new(""),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_namespace_rejects_null_byte() {
        assert!(Namespace::try_from("ns\0bad").is_err());
    }
}
