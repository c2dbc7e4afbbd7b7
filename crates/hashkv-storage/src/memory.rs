//! In-process hash backend for tests and ephemeral data.
//!
//! Buckets live in a shared `HashMap` behind an `RwLock`; cloning the
//! backend shares the same data. Scans are paginated over the sorted field
//! names so callers exercise the same cursor loop they would against Redis.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use globset::{GlobBuilder, GlobMatcher};

use crate::backend::{HashBackend, HashSession, SCAN_START, ScanPage};
use crate::error::{StorageError, StorageResult};

/// Fields returned per scan page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 10;

type Buckets = HashMap<String, HashMap<String, String>>;

/// In-memory [`HashBackend`].
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    data: Arc<RwLock<Buckets>>,
    page_size: usize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Create an empty backend with the default scan page size.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set how many fields one scan page examines. Zero is treated as one.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

#[async_trait]
impl HashBackend for MemoryBackend {
    type Session = MemorySession;

    async fn session(&self) -> StorageResult<MemorySession> {
        Ok(MemorySession {
            data: Arc::clone(&self.data),
            page_size: self.page_size,
        })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Session over a [`MemoryBackend`]. Holds no connection.
#[derive(Debug)]
pub struct MemorySession {
    data: Arc<RwLock<Buckets>>,
    page_size: usize,
}

impl MemorySession {
    fn read<T>(&self, f: impl FnOnce(&Buckets) -> T) -> StorageResult<T> {
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::connection(e.to_string()))?;
        Ok(f(&data))
    }

    fn write<T>(&self, f: impl FnOnce(&mut Buckets) -> T) -> StorageResult<T> {
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::connection(e.to_string()))?;
        Ok(f(&mut data))
    }
}

/// Compile a Redis-style glob (`*`, `?`, `[...]`, `\` escapes).
fn compile_pattern(pattern: &str) -> StorageResult<GlobMatcher> {
    GlobBuilder::new(&escape_alternation(pattern))
        .literal_separator(false)
        .backslash_escape(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|e| {
            StorageError::command(format!("invalid match pattern: {e}")).with_source(e)
        })
}

/// Redis `MATCH` has no `{a,b}` alternation, so braces and commas outside a
/// character class are escaped to match literally.
fn escape_alternation(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut in_class = false;
    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push(c);
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            },
            '[' if !in_class => {
                in_class = true;
                out.push(c);
            },
            ']' if in_class => {
                in_class = false;
                out.push(c);
            },
            '{' | '}' | ',' if !in_class => {
                out.push('\\');
                out.push(c);
            },
            _ => out.push(c),
        }
    }

    out
}

#[async_trait]
impl HashSession for MemorySession {
    async fn field_names(&mut self, bucket: &str) -> StorageResult<Vec<String>> {
        self.read(|data| {
            data.get(bucket)
                .map(|fields| fields.keys().cloned().collect())
                .unwrap_or_default()
        })
    }

    async fn field(&mut self, bucket: &str, field: &str) -> StorageResult<Option<String>> {
        self.read(|data| data.get(bucket).and_then(|fields| fields.get(field).cloned()))
    }

    async fn all_fields(&mut self, bucket: &str) -> StorageResult<HashMap<String, String>> {
        self.read(|data| data.get(bucket).cloned().unwrap_or_default())
    }

    async fn scan_fields(
        &mut self,
        bucket: &str,
        cursor: u64,
        pattern: &str,
    ) -> StorageResult<Option<ScanPage>> {
        let matcher = compile_pattern(pattern)?;
        let start = usize::try_from(cursor)
            .map_err(|e| {
                StorageError::command(format!("invalid cursor: {cursor}")).with_source(e)
            })?;
        let page_size = self.page_size;

        self.read(|data| {
            let Some(fields) = data.get(bucket) else {
                return Some(ScanPage::new(SCAN_START, Vec::new()));
            };

            let mut names: Vec<&String> = fields.keys().collect();
            names.sort();

            let end = start.saturating_add(page_size).min(names.len());
            let mut items = Vec::new();
            for name in names.get(start..end).unwrap_or_default() {
                if matcher.is_match(name.as_str()) {
                    items.push((*name).clone());
                    items.push(fields[*name].clone());
                }
            }

            let next = if end >= names.len() {
                SCAN_START
            } else {
                u64::try_from(end).unwrap_or(SCAN_START)
            };
            Some(ScanPage::new(next, items))
        })
    }

    async fn set_field(&mut self, bucket: &str, field: &str, value: &str) -> StorageResult<()> {
        self.write(|data| {
            data.entry(bucket.to_owned())
                .or_default()
                .insert(field.to_owned(), value.to_owned());
        })
    }

    async fn delete_field(&mut self, bucket: &str, field: &str) -> StorageResult<u64> {
        self.write(|data| {
            let Some(fields) = data.get_mut(bucket) else {
                return 0;
            };
            let removed = u64::from(fields.remove(field).is_some());
            if fields.is_empty() {
                data.remove(bucket);
            }
            removed
        })
    }
}
