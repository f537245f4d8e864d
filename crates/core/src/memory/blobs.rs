use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::blob::{blob_address, BlobStore, RawData};
use crate::error::{RepositoryError, Result};

/// In-memory [`BlobStore`], the blob extension of the in-memory provider.
#[derive(Debug, Default)]
pub struct MemoryBlobs {
    objects: RwLock<HashMap<String, RawData>>,
}

impl MemoryBlobs {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobs {
    async fn store_raw(&self, data: RawData, key: Option<&str>, prefix: &str) -> Result<String> {
        let key = key
            .map(str::to_owned)
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        let address = blob_address(prefix, &key);
        self.objects.write().await.insert(address.clone(), data);
        tracing::debug!(address = %address, "Stored blob in memory");
        Ok(address)
    }

    async fn get_raw(&self, url: &str) -> Result<Value> {
        match self.objects.read().await.get(url) {
            Some(RawData::Json(value)) => Ok(value.clone()),
            Some(RawData::Binary(_)) => Err(RepositoryError::Blob(format!(
                "Error getting or parsing raw data at URL \"{url}\": binary data is not JSON"
            ))),
            None => Err(RepositoryError::Blob(format!(
                "Error getting or parsing raw data at URL \"{url}\": not found"
            ))),
        }
    }
}
