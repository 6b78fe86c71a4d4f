//! In-Memory Backend
//!
//! Reference backend keeping entries in process memory behind one lock.
//!
//! Expiry is lazy: an entry is only removed when a read observes it expired,
//! so entries that are never read again stay resident past their TTL.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::{current_timestamp_ms, Backend, CacheEntry, ClearScope};
use crate::error::Result;

// == In-Memory Backend ==
/// HashMap storage guarded by a single mutex for every operation.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl InMemoryBackend {
    // == Constructor ==
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    // == Length ==
    /// Returns the number of resident entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    // == Is Empty ==
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Looks up a live entry, dropping it if the read finds it expired.
    fn lookup<'a>(
        entries: &'a mut HashMap<String, CacheEntry>,
        key: &str,
        now: u64,
    ) -> Option<&'a CacheEntry> {
        let live = entries.get_mut(key)?.observe(now);
        if !live {
            entries.remove(key);
            debug!(key, "Dropped expired entry on access");
            return None;
        }
        entries.get(key)
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut entries = self.entries.lock().await;
        let now = current_timestamp_ms();
        Ok(Self::lookup(&mut entries, key, now).map(|entry| entry.data.clone()))
    }

    async fn get_with_ttl(&self, key: &str) -> Result<(u64, Option<Vec<u8>>)> {
        let mut entries = self.entries.lock().await;
        let now = current_timestamp_ms();
        Ok(match Self::lookup(&mut entries, key, now) {
            Some(entry) => (entry.ttl_remaining_at(now), Some(entry.data.clone())),
            None => (0, None),
        })
    }

    async fn set(&self, key: &str, value: Vec<u8>, expire: Option<u64>) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), CacheEntry::new(value, expire));
        Ok(())
    }

    async fn clear(&self, scope: ClearScope) -> Result<usize> {
        let mut entries = self.entries.lock().await;
        let removed = match scope {
            ClearScope::Namespace(namespace) => {
                let before = entries.len();
                entries.retain(|k, _| !k.starts_with(&namespace));
                before - entries.len()
            }
            ClearScope::Key(key) => usize::from(entries.remove(&key).is_some()),
            ClearScope::All => {
                let count = entries.len();
                entries.clear();
                count
            }
        };
        Ok(removed)
    }
}
