//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror.

use std::convert::Infallible;
use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the cache layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// No cache manager is available to a decorated call
    #[error("No cache manager configured; initialize one before use")]
    NotConfigured,

    /// Key builder produced something that is not a usable key
    #[error("Key builder contract violated: {0}")]
    KeyBuilderContract(String),

    /// Backend could not serve a read or write
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Backend declared it cannot perform the operation
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Value could not be encoded for storage
    #[error("Encode failed: {0}")]
    Encode(String),

    /// Stored bytes could not be decoded
    #[error("Decode failed: {0}")]
    Decode(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::UnsupportedOperation(_) => StatusCode::NOT_IMPLEMENTED,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Call Error ==
/// Failure of a cached call.
///
/// `Cache` carries the configuration failures the cache layer surfaces;
/// `Call` carries the wrapped callable's own error, untouched.
#[derive(Debug)]
pub enum CallError<E> {
    Cache(CacheError),
    Call(E),
}

impl<E> CallError<E> {
    /// Returns the cache-layer error, if that is what failed.
    pub fn as_cache(&self) -> Option<&CacheError> {
        match self {
            CallError::Cache(err) => Some(err),
            CallError::Call(_) => None,
        }
    }

    /// Returns the wrapped callable's error, if that is what failed.
    pub fn into_call(self) -> Option<E> {
        match self {
            CallError::Call(err) => Some(err),
            CallError::Cache(_) => None,
        }
    }
}

impl<E> From<CacheError> for CallError<E> {
    fn from(err: CacheError) -> Self {
        CallError::Cache(err)
    }
}

impl<E: fmt::Display> fmt::Display for CallError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallError::Cache(err) => write!(f, "{err}"),
            CallError::Call(err) => write!(f, "{err}"),
        }
    }
}

impl<E> std::error::Error for CallError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CallError::Cache(err) => Some(err),
            CallError::Call(err) => Some(err),
        }
    }
}

impl From<CallError<Infallible>> for CacheError {
    fn from(err: CallError<Infallible>) -> Self {
        match err {
            CallError::Cache(err) => err,
            CallError::Call(never) => match never {},
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;
