//! use_cache - A framework-agnostic cache-aside layer
//!
//! Wraps callables with get-or-compute-and-store caching over pluggable
//! backends, coders and key builders.

pub mod api;
pub mod backend;
pub mod coder;
pub mod config;
pub mod decorator;
pub mod error;
pub mod http;
pub mod key_builder;
pub mod manager;
pub mod models;
pub mod stats;

pub use api::AppState;
pub use backend::{Backend, BackendKind, ClearScope, InMemoryBackend, NullBackend};
pub use coder::{BinaryCoder, Coder, JsonCoder, StringCoder};
pub use config::Config;
pub use decorator::{
    cache, cache_one_day, cache_one_hour, cache_one_minute, Cache, CacheStatus, Cached,
    CachedOutcome, CallOptions,
};
pub use error::{CacheError, CallError, Result};
pub use key_builder::{key_builder_fn, DefaultKeyBuilder, KeyBuilder, KeyContext, SimpleKeyBuilder};
pub use manager::{CacheManager, CacheManagerConfig, CacheRegistry};
pub use stats::CacheStats;
