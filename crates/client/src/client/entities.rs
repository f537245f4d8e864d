//! Entity operations over the REST API.

use std::sync::Arc;

use async_trait::async_trait;
use repokit_core::naming::pluralize;
use repokit_core::provider::{DeleteRequest, FindRequest, GetRequest, SaveMode, SaveRequest};
use repokit_core::{BoxError, IoProvider, ProviderContext, RepositoryError, Result};
use serde_json::Value;
use url::Url;

use super::{parse_body, ApiProvider, S3Blobs};
use crate::config::ApiConfig;
use crate::error::ClientError;
use crate::transport::{check_status, HttpBody, HttpRequest, HttpTransport};

#[async_trait]
impl<T: HttpTransport + 'static> IoProvider for ApiProvider<T> {
    type Config = ApiConfig<T>;
    type Extensions = S3Blobs<T>;

    fn connect(config: ApiConfig<T>, ctx: ProviderContext) -> std::result::Result<Self, BoxError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let base = Url::parse(&base_url).map_err(|err| {
            ClientError::InvalidInput(format!("invalid base URL '{}': {}", config.base_url, err))
        })?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidInput(format!(
                "invalid base URL '{}': no path",
                config.base_url
            ))
            .into());
        }

        tracing::info!(
            base_url = %base_url,
            parents = config.parents.len(),
            cached = ctx.cache.is_some(),
            "Connected to API"
        );

        let transport = Arc::new(config.transport);
        Ok(Self {
            blobs: S3Blobs::new(Arc::clone(&transport), base_url.clone()),
            transport,
            base,
            base_url,
            parents: config.parents,
        })
    }

    async fn find(&self, request: FindRequest) -> Result<Value> {
        let url = self.object_url(&request.entity, &request.id);
        let context = format!(
            "Error finding {} with id {} data",
            request.entity, request.id
        );
        let response = self.send(HttpRequest::get(url), &context).await?;

        if response.status == 404 {
            return Err(RepositoryError::not_found(request.entity, request.id));
        }
        check_status(&response, &context)?;
        parse_body(&response.body, &context)
    }

    async fn get(&self, request: GetRequest) -> Result<Vec<Value>> {
        let url = self.collection_url(&request.entity, request.parent_id.as_deref());
        let context = format!("Error retrieving {} data", request.entity);
        let mut http = HttpRequest::get(url);
        if let Some(filters) = &request.filters {
            let filter = filters.to_json().map_err(|err| {
                RepositoryError::Serialization(format!("{}: {}", context, err))
            })?;
            http = http.with_query("filter", filter);
        }

        let response = self.send(http, &context).await?;
        check_status(&response, &context)?;

        match parse_body(&response.body, &context)? {
            Value::Array(objects) => Ok(objects),
            other => Err(RepositoryError::Serialization(format!(
                "{}: expected a list, got {}",
                context, other
            ))),
        }
    }

    async fn save(&self, request: SaveRequest) -> Result<Vec<Value>> {
        let plural = pluralize(&request.entity);
        let url = self.endpoint(&[&plural]);
        let body = HttpBody::Json(Value::Array(request.objects));
        let (http, context) = match request.mode {
            SaveMode::Insert => (
                HttpRequest::post(url, body),
                format!("Error inserting {} data", plural),
            ),
            SaveMode::Update => (
                HttpRequest::put(url, body),
                format!("Error updating {} data", plural),
            ),
        };

        let response = self.send(http, &context).await?;
        check_status(&response, &context)?;

        match parse_body(&response.body, &context)? {
            Value::Array(objects) => Ok(objects),
            object @ Value::Object(_) => Ok(vec![object]),
            other => Err(RepositoryError::Serialization(format!(
                "{}: unexpected response {}",
                context, other
            ))),
        }
    }

    async fn delete(&self, request: DeleteRequest) -> Result<Value> {
        let url = self.object_url(&request.entity, &request.id);
        let context = format!(
            "Error deleting {} with id {} data",
            request.entity, request.id
        );
        let response = self.send(HttpRequest::delete(url), &context).await?;

        if response.status == 404 {
            return Err(RepositoryError::not_found(request.entity, request.id));
        }
        check_status(&response, &context)?;

        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        parse_body(&response.body, &context)
    }

    fn extensions(&self) -> &S3Blobs<T> {
        &self.blobs
    }
}
