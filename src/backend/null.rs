//! Null Backend
//!
//! Accepts writes and forgets them. Every read misses, so cached calls always
//! compute fresh.

use async_trait::async_trait;

use super::{Backend, ClearScope};
use crate::error::Result;

#[derive(Debug, Clone, Copy, Default)]
pub struct NullBackend;

#[async_trait]
impl Backend for NullBackend {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn get_with_ttl(&self, _key: &str) -> Result<(u64, Option<Vec<u8>>)> {
        Ok((0, None))
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _expire: Option<u64>) -> Result<()> {
        Ok(())
    }

    async fn clear(&self, _scope: ClearScope) -> Result<usize> {
        Ok(0)
    }
}
