//! Request DTOs for the demo service API
//!
//! Defines the structure of incoming HTTP request bodies and queries.

use serde::{Deserialize, Serialize};

/// Request body for POST /cache/clear
///
/// # Fields
/// - `namespace`: Remove every key starting with this prefix
/// - `key`: Remove a single key
///
/// Sending neither flushes everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClearRequest {
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
}

impl ClearRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.namespace.is_some() && self.key.is_some() {
            return Some("Specify either namespace or key, not both".to_string());
        }
        None
    }
}

/// Query for GET /calc. Also the cached call's keyword arguments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalcQuery {
    #[serde(default = "default_base")]
    pub x: u64,
    #[serde(default = "default_exponent")]
    pub y: u32,
}

fn default_base() -> u64 {
    10
}

fn default_exponent() -> u32 {
    3
}
