//! Storage Backends
//!
//! The byte-level storage contract every backend implements, plus the
//! compiled-in adapters and the factory that selects one at startup.

mod entry;
mod memory;
mod null;

#[cfg(test)]
mod property_tests;

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{CacheError, Result};

// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use memory::InMemoryBackend;
pub use null::NullBackend;

// == Clear Scope ==
/// What a `clear` call removes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearScope {
    /// Every entry (implementation-defined flush)
    All,
    /// Every entry whose key starts with the given prefix
    Namespace(String),
    /// A single entry
    Key(String),
}

impl ClearScope {
    /// Maps the optional namespace/key pair onto a scope. A namespace takes
    /// precedence over a key; empty strings count as absent.
    pub fn from_parts(namespace: Option<&str>, key: Option<&str>) -> Self {
        match (namespace.filter(|n| !n.is_empty()), key.filter(|k| !k.is_empty())) {
            (Some(namespace), _) => ClearScope::Namespace(namespace.to_string()),
            (None, Some(key)) => ClearScope::Key(key.to_string()),
            (None, None) => ClearScope::All,
        }
    }
}

// == Backend Trait ==
/// Storage contract: byte values under string keys.
///
/// Backends know nothing about coders or key building. Expirations are in
/// seconds; `None` or `Some(0)` means the backend's default persistence.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Returns the stored bytes, if any.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Returns the remaining TTL in seconds alongside the stored bytes.
    ///
    /// `(0, None)` means no entry. Backends that cannot introspect TTLs may
    /// report a fixed placeholder, so callers treat the TTL as advisory.
    async fn get_with_ttl(&self, key: &str) -> Result<(u64, Option<Vec<u8>>)>;

    /// Stores bytes under a key, replacing any previous entry.
    async fn set(&self, key: &str, value: Vec<u8>, expire: Option<u64>) -> Result<()>;

    /// Removes entries and returns how many were removed.
    ///
    /// Backends that cannot enumerate keys fail namespace clears with
    /// [`CacheError::UnsupportedOperation`].
    async fn clear(&self, scope: ClearScope) -> Result<usize>;
}

// == Backend Factory ==
/// Backends compiled into this crate, selectable by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    #[default]
    Memory,
    Null,
}

impl BackendKind {
    /// Constructs a fresh backend of this kind.
    pub fn build(self) -> Arc<dyn Backend> {
        match self {
            BackendKind::Memory => Arc::new(InMemoryBackend::new()),
            BackendKind::Null => Arc::new(NullBackend),
        }
    }
}

impl FromStr for BackendKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" => Ok(BackendKind::Memory),
            "null" | "none" => Ok(BackendKind::Null),
            other => Err(CacheError::InvalidRequest(format!(
                "Unknown cache backend '{}'",
                other
            ))),
        }
    }
}
