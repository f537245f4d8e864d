//! S3 blob storage through presigned upload URLs.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use repokit_core::blob::{blob_address, BlobStore, RawData};
use repokit_core::{RepositoryError, Result};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ClientError;
use crate::transport::{check_status, HttpBody, HttpRequest, HttpTransport, ReqwestTransport};

/// Blob extension of [`super::ApiProvider`].
///
/// Uploads go to a presigned S3 URL obtained from
/// `{base}/presigned_s3_url?key=K`. Stored data is served from
/// `{prefix}/{key}`; JSON is uploaded as its text, binary data as base64.
#[derive(Debug)]
pub struct S3Blobs<T = ReqwestTransport> {
    transport: Arc<T>,
    base_url: String,
}

impl<T: HttpTransport> S3Blobs<T> {
    pub(crate) fn new(transport: Arc<T>, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
        }
    }

    async fn presigned_url(&self, key: &str) -> std::result::Result<String, ClientError> {
        let request =
            HttpRequest::get(format!("{}/presigned_s3_url", self.base_url)).with_query("key", key);
        let response = self.transport.send(request).await?;
        check_status(&response, "Error getting presigned URL")?;

        // The URL may come back bare or as a JSON string.
        let body = response.body.trim();
        let url = match serde_json::from_str::<Value>(body) {
            Ok(Value::String(url)) => url,
            _ => body.to_string(),
        };
        if url.is_empty() {
            return Err(ClientError::InvalidResponse("empty presigned URL".into()));
        }
        Ok(url)
    }

    async fn upload(&self, data: RawData, key: &str) -> std::result::Result<(), ClientError> {
        let body = match data {
            RawData::Json(value) => serde_json::to_string(&value)?,
            RawData::Binary(bytes) => STANDARD.encode(bytes),
        };
        let url = self.presigned_url(key).await?;
        tracing::debug!(key, bytes = body.len(), "Uploading blob");

        let response = self.transport.send(HttpRequest::put(url, HttpBody::Text(body))).await?;
        check_status(&response, "Upload rejected")
    }

    async fn download(&self, url: &str) -> std::result::Result<Value, ClientError> {
        let response = self.transport.send(HttpRequest::get(url)).await?;
        check_status(&response, "Download rejected")?;
        Ok(serde_json::from_str(&response.body)?)
    }
}

#[async_trait]
impl<T: HttpTransport> BlobStore for S3Blobs<T> {
    async fn store_raw(&self, data: RawData, key: Option<&str>, prefix: &str) -> Result<String> {
        let key = match key {
            Some(key) => key.to_string(),
            None => Uuid::new_v4().simple().to_string(),
        };
        self.upload(data, &key)
            .await
            .map_err(|err| RepositoryError::Blob(format!("Error uploading data: {}", err)))?;
        Ok(blob_address(prefix, &key))
    }

    async fn get_raw(&self, url: &str) -> Result<Value> {
        self.download(url).await.map_err(|err| {
            RepositoryError::Blob(format!(
                "Error getting or parsing raw data at URL \"{}\": {}",
                url, err
            ))
        })
    }
}
