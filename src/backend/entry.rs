//! Cache Entry Module
//!
//! Stored bytes plus their absolute expiry, as kept by the in-memory backend.

use std::time::{SystemTime, UNIX_EPOCH};

// == Cache Entry ==
/// A stored value and the instant it stops being served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// The stored bytes
    pub data: Vec<u8>,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
    /// Whether the single read granted to a zero-expiration entry was used
    last_read_served: bool,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry expiring `expire_seconds` from now.
    ///
    /// `None` and `Some(0)` both give `expires_at == created_at`: the entry
    /// is served by exactly one read and expires on the access after that.
    pub fn new(data: Vec<u8>, expire_seconds: Option<u64>) -> Self {
        Self::new_at(data, expire_seconds, current_timestamp_ms())
    }

    /// Creates an entry relative to a given clock reading.
    pub fn new_at(data: Vec<u8>, expire_seconds: Option<u64>, now: u64) -> Self {
        let ttl_ms = expire_seconds.unwrap_or(0).saturating_mul(1000);
        Self {
            data,
            created_at: now,
            expires_at: now.saturating_add(ttl_ms),
            last_read_served: false,
        }
    }

    /// True when the entry was stored without an expiration.
    pub fn is_zero_expire(&self) -> bool {
        self.expires_at == self.created_at
    }

    // == Is Expired ==
    /// Checks expiry without consuming anything.
    ///
    /// Boundary condition: expired once `now >= expires_at`. A zero-expiration
    /// entry whose single read has not been served yet is not expired.
    pub fn is_expired_at(&self, now: u64) -> bool {
        if now < self.expires_at {
            return false;
        }
        !(self.is_zero_expire() && !self.last_read_served)
    }

    // == Observe ==
    /// Records a read at `now`. Returns false when the entry must be dropped.
    pub fn observe(&mut self, now: u64) -> bool {
        if self.is_expired_at(now) {
            return false;
        }
        if now >= self.expires_at {
            self.last_read_served = true;
        }
        true
    }

    // == Time To Live ==
    /// Remaining TTL in whole seconds, rounded up so a live entry reports at
    /// least 1. Returns 0 once the expiry instant is reached.
    pub fn ttl_remaining_at(&self, now: u64) -> u64 {
        self.expires_at.saturating_sub(now).div_ceil(1000)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
