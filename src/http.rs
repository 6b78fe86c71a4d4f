//! HTTP Integration
//!
//! Request-aware caching for axum handlers. A cached callable is served
//! through [`respond`], which decides whether the request may use the cache,
//! forwards the request shape to the key builder and decorates the response
//! with cache headers.
//!
//! Rules:
//! - no active manager, a disabled manager, a non-GET method or
//!   `Cache-Control: no-store` skip the cache entirely
//! - `Cache-Control: no-cache` skips the read but stores the fresh result
//! - responses carry `Cache-Control: max-age`, a weak `ETag` and
//!   `X-Cache-Status: HIT|MISS`
//! - a hit whose ETag matches `If-None-Match` answers `304 Not Modified`

use std::convert::Infallible;

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::decorator::{CacheStatus, CallOptions, Cached};
use crate::error::{CallError, Result};
use crate::key_builder::{KeyBuilder, KeyContext};
use crate::manager::CacheManager;

/// Header reporting whether a response came from the cache
pub const CACHE_STATUS_HEADER: &str = "x-cache-status";

// == Request Meta ==
/// The parts of a request that matter for caching.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
}

impl RequestMeta {
    pub fn new(method: Method, uri: &Uri, headers: HeaderMap) -> Self {
        Self {
            method,
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            headers,
        }
    }

    /// True when `Cache-Control` carries `directive`.
    pub fn has_cache_directive(&self, directive: &str) -> bool {
        self.headers
            .get_all(header::CACHE_CONTROL)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .any(|d| d.trim().eq_ignore_ascii_case(directive))
    }

    /// Opaque key-builder context describing this request.
    pub fn extra(&self) -> Map<String, Value> {
        let mut extra = Map::new();
        extra.insert("method".into(), Value::String(self.method.to_string()));
        extra.insert("path".into(), Value::String(self.path.clone()));
        if let Some(query) = &self.query {
            extra.insert("query".into(), Value::String(query.clone()));
        }
        extra
    }

    fn if_none_match(&self) -> Option<&str> {
        self.headers
            .get(header::IF_NONE_MATCH)
            .and_then(|value| value.to_str().ok())
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequestMeta {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        Ok(Self::new(parts.method.clone(), &parts.uri, parts.headers.clone()))
    }
}

// == Cacheability ==
/// Whether a request must bypass the cache.
pub fn is_uncacheable(manager: Option<&CacheManager>, request: &RequestMeta) -> bool {
    match manager {
        Some(manager) if manager.is_enabled() => {
            request.method != Method::GET || request.has_cache_directive("no-store")
        }
        _ => true,
    }
}

/// Weak validator derived from the stored bytes.
pub fn etag_for(bytes: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(bytes));
    format!("W/\"{}\"", &digest[..32])
}

// == Request Key Builder ==
/// Keys on the request line as well as the call arguments, so different
/// paths or query strings never share an entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestKeyBuilder;

#[async_trait]
impl KeyBuilder for RequestKeyBuilder {
    async fn build(&self, ctx: &KeyContext) -> Result<String> {
        let field = |name: &str| ctx.extra.get(name).and_then(Value::as_str).unwrap_or("");
        let material = format!(
            "{}:{} {}?{}:{}:{}",
            ctx.identity,
            field("method"),
            field("path"),
            field("query"),
            Value::Array(ctx.args.clone()),
            serde_json::to_string(&ctx.kwargs).unwrap_or_default(),
        );
        let digest = hex::encode(Sha256::digest(material.as_bytes()));
        Ok(format!("{}:{}", ctx.namespace, digest))
    }
}

// == Respond ==
/// Serves a cached callable as a JSON response.
pub async fn respond<A, R, E>(cached: &Cached<A, R, E>, args: A, request: &RequestMeta) -> Response
where
    A: Serialize + Send + 'static,
    R: Serialize + DeserializeOwned + Send + 'static,
    E: IntoResponse + Send + 'static,
{
    let manager = cached.resolve_manager().ok();
    if is_uncacheable(manager.as_deref(), request) {
        debug!(identity = cached.identity(), "Request is uncacheable");
        return match cached.call_uncached(args).await {
            Ok(value) => Json(value).into_response(),
            Err(err) => err.into_response(),
        };
    }

    let options = CallOptions {
        extra: request.extra(),
        force_refresh: request.has_cache_directive("no-cache"),
    };
    let outcome = match cached.call_detailed(args, options).await {
        Ok(outcome) => outcome,
        Err(CallError::Cache(err)) => return err.into_response(),
        Err(CallError::Call(err)) => return err.into_response(),
    };

    let etag = outcome.encoded.as_deref().map(etag_for);
    let (max_age, status_label) = match outcome.status {
        CacheStatus::Hit { ttl } => (ttl, "HIT"),
        CacheStatus::Miss | CacheStatus::Bypass => (outcome.expire, "MISS"),
    };

    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&format!("max-age={}", max_age)) {
        headers.insert(header::CACHE_CONTROL, value);
    }
    if let Some(value) = etag.as_deref().and_then(|tag| HeaderValue::from_str(tag).ok()) {
        headers.insert(header::ETAG, value);
    }
    headers.insert(CACHE_STATUS_HEADER, HeaderValue::from_static(status_label));

    let not_modified = matches!(outcome.status, CacheStatus::Hit { .. })
        && etag.is_some()
        && request.if_none_match() == etag.as_deref();
    if not_modified {
        return (StatusCode::NOT_MODIFIED, headers).into_response();
    }

    (headers, Json(outcome.value)).into_response()
}
