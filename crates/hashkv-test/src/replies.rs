//! Builders for raw Redis replies fed to mock connections.

use std::collections::HashMap;

use redis::Value;

/// A bulk string reply.
#[must_use]
pub fn bulk(s: &str) -> Value {
    Value::BulkString(s.as_bytes().to_vec())
}

/// An array of bulk strings, as returned by `HKEYS`.
#[must_use]
pub fn bulk_array(items: &[&str]) -> Value {
    Value::Array(items.iter().map(|s| bulk(s)).collect())
}

/// A flat field/value array, as returned by `HGETALL` over RESP2.
///
/// Fields are sorted so the reply is deterministic.
#[must_use]
pub fn hash_reply<S: std::hash::BuildHasher>(entries: &HashMap<String, String, S>) -> Value {
    let mut pairs: Vec<_> = entries.iter().collect();
    pairs.sort();
    Value::Array(
        pairs
            .into_iter()
            .flat_map(|(k, v)| [bulk(k), bulk(v)])
            .collect(),
    )
}

/// One `HSCAN` page: `[cursor, [field, value, ...]]`.
#[must_use]
pub fn scan_page(cursor: u64, pairs: &[(&str, &str)]) -> Value {
    let items = pairs.iter().flat_map(|(k, v)| [bulk(k), bulk(v)]).collect();
    Value::Array(vec![bulk(&cursor.to_string()), Value::Array(items)])
}

/// An `HSCAN` page whose item list is exactly `items`, which may have an odd
/// length.
#[must_use]
pub fn raw_scan_page(cursor: u64, items: &[&str]) -> Value {
    Value::Array(vec![bulk(&cursor.to_string()), bulk_array(items)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_page_shape() {
        let page = scan_page(7, &[("a", "1")]);
        let Value::Array(parts) = page else {
            panic!("expected array");
        };
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], bulk("7"));
        assert_eq!(parts[1], bulk_array(&["a", "1"]));
    }

    #[test]
    fn test_hash_reply_sorted() {
        let entries: HashMap<String, String> =
            [("b".to_owned(), "2".to_owned()), ("a".to_owned(), "1".to_owned())]
                .into_iter()
                .collect();
        assert_eq!(hash_reply(&entries), bulk_array(&["a", "1", "b", "2"]));
    }
}
