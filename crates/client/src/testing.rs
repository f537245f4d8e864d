//! Test helpers.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{ClientError, Result};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Method};

/// Transport that answers from canned responses and records every request.
///
/// Unregistered routes answer `404` with an empty body.
#[derive(Debug, Default)]
pub struct StubTransport {
    responses: Mutex<HashMap<(Method, String), HttpResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
    failure: Option<String>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose every request fails before reaching a server.
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_response(
        self,
        method: Method,
        uri: impl Into<String>,
        status: u16,
        body: impl Into<String>,
    ) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method, uri.into()), HttpResponse::new(status, body));
        self
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests received for a method and URI.
    pub fn calls(&self, method: Method, uri: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.uri == uri)
            .count()
    }
}

#[async_trait]
impl HttpTransport for StubTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        if let Some(message) = &self.failure {
            self.requests.lock().unwrap().push(request);
            return Err(ClientError::Connection(message.clone()));
        }
        let response = self
            .responses
            .lock()
            .unwrap()
            .get(&(request.method, request.uri.clone()))
            .cloned()
            .unwrap_or_else(|| HttpResponse::new(404, ""));
        self.requests.lock().unwrap().push(request);
        Ok(response)
    }
}
