//! Cache Manager
//!
//! Holds one cache configuration (backend, coder, key builder, prefix,
//! default expiration, enable flag) and the registry that tracks which
//! manager is currently active.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tracing::info;

use crate::backend::{Backend, ClearScope};
use crate::coder::{Coder, JsonCoder};
use crate::error::Result;
use crate::key_builder::{DefaultKeyBuilder, KeyBuilder};
use crate::stats::{CacheStats, StatsRecorder};

// == Defaults ==
/// Prefix applied when none is configured
pub const DEFAULT_PREFIX: &str = "use-cache:";

/// Default expiration in seconds
pub const DEFAULT_EXPIRE: u64 = 600;

// == Manager Config ==
/// Everything needed to construct a [`CacheManager`].
#[derive(Clone)]
pub struct CacheManagerConfig {
    pub backend: Arc<dyn Backend>,
    pub prefix: String,
    /// Seconds; 0 means no expiration
    pub default_expire: u64,
    pub coder: Arc<dyn Coder>,
    pub key_builder: Arc<dyn KeyBuilder>,
    pub enabled: bool,
}

impl CacheManagerConfig {
    /// Configuration with the default prefix, expiration, JSON coder and
    /// hashing key builder.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            prefix: DEFAULT_PREFIX.to_string(),
            default_expire: DEFAULT_EXPIRE,
            coder: Arc::new(JsonCoder),
            key_builder: Arc::new(DefaultKeyBuilder),
            enabled: true,
        }
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn expire(mut self, seconds: u64) -> Self {
        self.default_expire = seconds;
        self
    }

    pub fn coder(mut self, coder: Arc<dyn Coder>) -> Self {
        self.coder = coder;
        self
    }

    pub fn key_builder(mut self, key_builder: Arc<dyn KeyBuilder>) -> Self {
        self.key_builder = key_builder;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

// == Cache Manager ==
/// An immutable cache configuration plus the counters of calls served by it.
pub struct CacheManager {
    backend: Arc<dyn Backend>,
    prefix: String,
    default_expire: u64,
    coder: Arc<dyn Coder>,
    key_builder: Arc<dyn KeyBuilder>,
    enabled: bool,
    stats: StatsRecorder,
}

impl CacheManager {
    // == Constructor ==
    pub fn new(config: CacheManagerConfig) -> Self {
        Self {
            backend: config.backend,
            prefix: config.prefix,
            default_expire: config.default_expire,
            coder: config.coder,
            key_builder: config.key_builder,
            enabled: config.enabled,
            stats: StatsRecorder::new(),
        }
    }

    // == Accessors ==
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn default_expire(&self) -> u64 {
        self.default_expire
    }

    pub fn coder(&self) -> &Arc<dyn Coder> {
        &self.coder
    }

    pub fn key_builder(&self) -> &Arc<dyn KeyBuilder> {
        &self.key_builder
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    pub(crate) fn recorder(&self) -> &StatsRecorder {
        &self.stats
    }

    /// Resolves an expiration override: zero or absent falls back to the
    /// manager default.
    pub fn effective_expire(&self, expire: Option<u64>) -> u64 {
        expire.filter(|e| *e > 0).unwrap_or(self.default_expire)
    }

    /// Joins the prefix with a call-site namespace.
    pub fn namespace_for(&self, namespace: &str) -> String {
        if namespace.is_empty() {
            self.prefix.clone()
        } else {
            format!("{}:{}", self.prefix, namespace)
        }
    }

    // == Manual Operations ==
    /// Clears by namespace, by key, or everything when neither is given.
    pub async fn clear(&self, namespace: Option<&str>, key: Option<&str>) -> Result<usize> {
        let scope = ClearScope::from_parts(namespace, key);
        let removed = self.backend.clear(scope.clone()).await?;
        info!(?scope, removed, "Cleared cache entries");
        Ok(removed)
    }

    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.backend.get(key).await
    }

    pub async fn set(&self, key: &str, value: Vec<u8>, expire: Option<u64>) -> Result<()> {
        let expire = self.effective_expire(expire);
        self.backend.set(key, value, Some(expire)).await
    }
}

impl fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheManager")
            .field("prefix", &self.prefix)
            .field("default_expire", &self.default_expire)
            .field("coder", &self.coder)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

// == Cache Registry ==
/// Holder of the active manager, owned by the composition root and passed to
/// whatever needs it.
///
/// Installing or resetting swaps the whole manager atomically: readers see
/// either the old or the new one.
#[derive(Debug, Default)]
pub struct CacheRegistry {
    active: ArcSwapOption<CacheManager>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a manager from `config`, makes it the active one and returns it.
    pub fn init(&self, config: CacheManagerConfig) -> Arc<CacheManager> {
        let manager = Arc::new(CacheManager::new(config));
        self.install(manager.clone());
        manager
    }

    /// Makes an existing manager the active one.
    pub fn install(&self, manager: Arc<CacheManager>) {
        info!(
            prefix = manager.prefix(),
            default_expire = manager.default_expire(),
            enabled = manager.is_enabled(),
            "Cache manager installed"
        );
        self.active.store(Some(manager));
    }

    /// The active manager, if any. Never blocks.
    pub fn active(&self) -> Option<Arc<CacheManager>> {
        self.active.load_full()
    }

    pub fn reset(&self) {
        if self.active.swap(None).is_some() {
            info!("Cache manager reset");
        }
    }
}
