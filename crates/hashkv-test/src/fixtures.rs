//! Structured values stored as JSON entries.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Network endpoint of a registered service instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Transport (`tcp`, `http`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Address in transport-specific form.
    pub value: String,
}

/// A service-registry record, the typical value kept in a namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInstance {
    /// Instance identifier, also used as the entry key.
    pub id: String,
    /// Logical service name.
    pub service_name: String,
    /// Where the instance listens.
    pub endpoint: Option<Endpoint>,
    /// Health status.
    pub status: String,
    /// Time-to-live in seconds.
    pub ttl_secs: u64,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Arbitrary extension data.
    #[serde(default)]
    pub extension: HashMap<String, serde_json::Value>,
}

impl ServiceInstance {
    /// Serialize to the JSON string stored as an entry value.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// A `Calc` service instance on `tcp://192.168.0.1`.
#[must_use]
pub fn test_service_instance(id: &str) -> ServiceInstance {
    ServiceInstance {
        id: id.to_owned(),
        service_name: "Calc".to_owned(),
        endpoint: Some(Endpoint {
            kind: "tcp".to_owned(),
            value: "192.168.0.1".to_owned(),
        }),
        status: "UP".to_owned(),
        ttl_secs: 30,
        tags: vec!["v1".to_owned()],
        extension: HashMap::new(),
    }
}

/// The three-entry namespace snapshot used across adapter tests.
#[must_use]
pub fn test_entries() -> HashMap<String, String> {
    [("key1", "value1"), ("key2", "value2"), ("key3", "value3")]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect()
}
