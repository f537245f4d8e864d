//! Blob storage extension interface.
//!
//! Providers that can store arbitrary data outside of the entity schema
//! expose it through their `Extensions` type by implementing [`BlobStore`].

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Data handed to [`BlobStore::store_raw`].
#[derive(Debug, Clone, PartialEq)]
pub enum RawData {
    /// Stored as JSON text.
    Json(Value),
    /// Stored as base64 text.
    Binary(Vec<u8>),
}

impl From<Value> for RawData {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<Vec<u8>> for RawData {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(bytes)
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `data` under `key` (a fresh key when `None`) and returns
    /// `"{prefix}/{key}"`, the address the data will be served from.
    async fn store_raw(&self, data: RawData, key: Option<&str>, prefix: &str) -> Result<String>;

    /// Retrieves previously stored JSON data from its address.
    async fn get_raw(&self, url: &str) -> Result<Value>;
}

/// Joins a serving prefix and a key.
pub fn blob_address(prefix: &str, key: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), key)
}
