//! Cache-Aside Decorator
//!
//! Wraps a callable with the get-or-compute-and-store protocol:
//!
//! 1. resolve the manager (explicit one, else the registry's active one)
//! 2. build the key from the call's identity, namespace and arguments
//! 3. on hit, decode the stored bytes and return them
//! 4. on miss, call through, encode the result and store it
//!
//! Backend and coder failures are logged and degrade to calling through.
//! Errors of the wrapped callable are returned untouched as [`CallError::Call`].
//!
//! Sync callables are adapted into the same async call path at wrap time.
//! Concurrent misses on one key are not deduplicated: both compute and the
//! last write wins.

use std::future::{ready, Future};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::coder::{decode_typed, encode_typed, Coder};
use crate::error::{CacheError, CallError, Result};
use crate::key_builder::{KeyBuilder, KeyContext};
use crate::manager::{CacheManager, CacheRegistry};

type BoxedCall<A, R, E> =
    Arc<dyn Fn(A) -> BoxFuture<'static, std::result::Result<R, E>> + Send + Sync>;

// == Cache Options ==
/// Call-site configuration for a cached callable. Every unset override
/// falls back to the manager's default.
#[derive(Clone, Default)]
pub struct Cache {
    registry: Option<Arc<CacheRegistry>>,
    manager: Option<Arc<CacheManager>>,
    expire: Option<u64>,
    coder: Option<Arc<dyn Coder>>,
    key_builder: Option<Arc<dyn KeyBuilder>>,
    namespace: String,
}

/// Options resolving the manager through `registry`.
pub fn cache(registry: Arc<CacheRegistry>) -> Cache {
    Cache::new().registry(registry)
}

/// One-minute expiration preset.
pub fn cache_one_minute(registry: Arc<CacheRegistry>) -> Cache {
    cache(registry).expire(60)
}

/// One-hour expiration preset.
pub fn cache_one_hour(registry: Arc<CacheRegistry>) -> Cache {
    cache(registry).expire(3600)
}

/// One-day expiration preset.
pub fn cache_one_day(registry: Arc<CacheRegistry>) -> Cache {
    cache(registry).expire(86400)
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose active manager is used when no explicit manager is set.
    pub fn registry(mut self, registry: Arc<CacheRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Explicit manager; takes precedence over the registry.
    pub fn manager(mut self, manager: Arc<CacheManager>) -> Self {
        self.manager = Some(manager);
        self
    }

    /// Expiration in seconds. Zero falls back to the manager default.
    pub fn expire(mut self, seconds: u64) -> Self {
        self.expire = Some(seconds);
        self
    }

    pub fn coder(mut self, coder: Arc<dyn Coder>) -> Self {
        self.coder = Some(coder);
        self
    }

    pub fn key_builder(mut self, key_builder: Arc<dyn KeyBuilder>) -> Self {
        self.key_builder = Some(key_builder);
        self
    }

    /// Namespace appended to the manager prefix as `prefix:namespace`.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    // == Wrap ==
    /// Wraps an async callable.
    ///
    /// `identity` must be stable and distinct per callable (a module-qualified
    /// name such as `module_path!()` plus the function name); it is part of
    /// every key.
    pub fn wrap<A, R, E, F, Fut>(self, identity: impl Into<String>, f: F) -> Cached<A, R, E>
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
        A: 'static,
        R: 'static,
        E: 'static,
    {
        Cached {
            identity: identity.into(),
            options: self,
            func: Arc::new(move |args| f(args).boxed()),
        }
    }

    /// Wraps a sync callable, adapting it to the async call path once.
    pub fn wrap_sync<A, R, E, F>(self, identity: impl Into<String>, f: F) -> Cached<A, R, E>
    where
        F: Fn(A) -> std::result::Result<R, E> + Send + Sync + 'static,
        A: 'static,
        R: Send + 'static,
        E: Send + 'static,
    {
        self.wrap(identity, move |args| ready(f(args)))
    }
}

// == Call Options ==
/// Per-invocation knobs.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Opaque context forwarded to the key builder
    pub extra: Map<String, Value>,
    /// Skip the read and recompute, still storing the fresh result
    pub force_refresh: bool,
}

// == Cache Status ==
/// How a cached call was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from the backend; `ttl` is the backend-reported remaining TTL
    Hit { ttl: u64 },
    /// Computed by the wrapped callable
    Miss,
    /// Caching disabled on the manager; computed without touching the backend
    Bypass,
}

/// Result of a cached call with its provenance.
#[derive(Debug, Clone)]
pub struct CachedOutcome<R> {
    pub value: R,
    pub status: CacheStatus,
    /// Effective expiration that applied to the call, in seconds
    pub expire: u64,
    /// Stored bytes on a hit, encoded bytes on a miss
    pub encoded: Option<Vec<u8>>,
}

// == Cached Callable ==
/// A callable wrapped with cache-aside behavior.
pub struct Cached<A, R, E> {
    identity: String,
    options: Cache,
    func: BoxedCall<A, R, E>,
}

impl<A, R, E> Clone for Cached<A, R, E> {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            options: self.options.clone(),
            func: self.func.clone(),
        }
    }
}

impl<A, R, E> Cached<A, R, E>
where
    A: Serialize + Send + 'static,
    R: Serialize + DeserializeOwned + Send + 'static,
    E: Send + 'static,
{
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// The manager this call would use right now.
    pub fn resolve_manager(&self) -> Result<Arc<CacheManager>> {
        if let Some(manager) = &self.options.manager {
            return Ok(manager.clone());
        }
        self.options
            .registry
            .as_ref()
            .and_then(|registry| registry.active())
            .ok_or(CacheError::NotConfigured)
    }

    /// Runs the wrapped callable directly, bypassing the cache.
    pub async fn call_uncached(&self, args: A) -> std::result::Result<R, E> {
        (self.func)(args).await
    }

    // == Call ==
    /// Cached invocation.
    pub async fn call(&self, args: A) -> std::result::Result<R, CallError<E>> {
        self.call_detailed(args, CallOptions::default())
            .await
            .map(|outcome| outcome.value)
    }

    /// Cached invocation reporting how the value was obtained.
    pub async fn call_detailed(
        &self,
        args: A,
        options: CallOptions,
    ) -> std::result::Result<CachedOutcome<R>, CallError<E>> {
        let manager = self.resolve_manager()?;
        let expire = manager.effective_expire(self.options.expire);

        if !manager.is_enabled() {
            let value = self.call_uncached(args).await.map_err(CallError::Call)?;
            return Ok(CachedOutcome {
                value,
                status: CacheStatus::Bypass,
                expire,
                encoded: None,
            });
        }

        let coder = self.options.coder.as_ref().unwrap_or(manager.coder()).clone();
        let key = self.build_key(&manager, &args, options.extra).await?;
        let backend = manager.backend();

        if !options.force_refresh {
            match backend.get_with_ttl(&key).await {
                Ok((ttl, Some(bytes))) => match decode_typed::<R>(coder.as_ref(), &bytes) {
                    Ok(value) => {
                        manager.recorder().record_hit();
                        debug!(key = %key, ttl, "Cache hit");
                        return Ok(CachedOutcome {
                            value,
                            status: CacheStatus::Hit { ttl },
                            expire,
                            encoded: Some(bytes),
                        });
                    }
                    Err(err) => {
                        warn!(key = %key, error = %err, "Cached value could not be decoded");
                    }
                },
                Ok((_, None)) => {}
                Err(err) => {
                    manager.recorder().record_backend_error();
                    warn!(key = %key, error = %err, "Error retrieving cache key from backend");
                }
            }
        }

        manager.recorder().record_miss();
        debug!(key = %key, "Cache miss");
        let value = self.call_uncached(args).await.map_err(CallError::Call)?;

        let encoded = match encode_typed(coder.as_ref(), &value) {
            Ok(bytes) => {
                if let Err(err) = backend.set(&key, bytes.clone(), Some(expire)).await {
                    manager.recorder().record_backend_error();
                    warn!(key = %key, error = %err, "Error setting cache key in backend");
                }
                Some(bytes)
            }
            Err(err) => {
                warn!(key = %key, error = %err, "Result could not be encoded; not cached");
                None
            }
        };

        Ok(CachedOutcome {
            value,
            status: CacheStatus::Miss,
            expire,
            encoded,
        })
    }

    // == Key Building ==
    /// Builds and validates the key for one call.
    pub async fn build_key(
        &self,
        manager: &CacheManager,
        args: &A,
        extra: Map<String, Value>,
    ) -> Result<String> {
        let arguments = serde_json::to_value(args).map_err(|e| {
            CacheError::KeyBuilderContract(format!("arguments are not serializable: {}", e))
        })?;
        let ctx = KeyContext::new(
            self.identity.clone(),
            manager.namespace_for(&self.options.namespace),
        )
        .with_arguments(arguments)
        .with_extra(extra);

        let builder = self
            .options
            .key_builder
            .as_ref()
            .unwrap_or(manager.key_builder());

        match builder.build(&ctx).await {
            Ok(key) if !key.is_empty() => Ok(key),
            Ok(_) => Err(CacheError::KeyBuilderContract(
                "key builder returned an empty key".to_string(),
            )),
            Err(err @ CacheError::KeyBuilderContract(_)) => Err(err),
            Err(err) => Err(CacheError::KeyBuilderContract(err.to_string())),
        }
    }
}
