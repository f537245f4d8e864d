//! HTTP transport.
//!
//! The provider only needs "send a request, get a status and a body back".
//! [`HttpTransport`] captures that so the provider can be driven by
//! [`ReqwestTransport`] in production and by a stub in tests.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

use crate::error::{ClientError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// Request body.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpBody {
    Json(Value),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub uri: String,
    pub query: Vec<(String, String)>,
    pub body: Option<HttpBody>,
}

impl HttpRequest {
    fn new(method: Method, uri: impl Into<String>, body: Option<HttpBody>) -> Self {
        Self {
            method,
            uri: uri.into(),
            query: Vec::new(),
            body,
        }
    }

    pub fn get(uri: impl Into<String>) -> Self {
        Self::new(Method::Get, uri, None)
    }

    pub fn post(uri: impl Into<String>, body: HttpBody) -> Self {
        Self::new(Method::Post, uri, Some(body))
    }

    pub fn put(uri: impl Into<String>, body: HttpBody) -> Self {
        Self::new(Method::Put, uri, Some(body))
    }

    pub fn delete(uri: impl Into<String>) -> Self {
        Self::new(Method::Delete, uri, None)
    }

    /// Appends a query parameter.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// 2xx and 3xx count as success.
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

/// Fails with [`ClientError::ServerError`] unless the response is a
/// success; the message is `context` followed by the response body.
pub fn check_status(response: &HttpResponse, context: &str) -> Result<()> {
    if response.is_success() {
        return Ok(());
    }
    Err(ClientError::ServerError {
        status: response.status,
        message: format!("{}: {}", context, response.body),
    })
}

/// Sends HTTP requests on behalf of the API provider.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// [`HttpTransport`] backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a preconfigured client (timeouts, proxies, default headers).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };
        tracing::trace!(method = %method, uri = %request.uri, "Sending request");

        let mut builder = self.client.request(method, &request.uri);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = match request.body {
            Some(HttpBody::Json(value)) => builder.json(&value),
            Some(HttpBody::Text(text)) => builder.header(CONTENT_TYPE, "text/plain").body(text),
            None => builder,
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}
