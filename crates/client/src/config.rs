use std::collections::BTreeMap;
use std::env;

use crate::error::{ClientError, Result};
use crate::transport::ReqwestTransport;

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Configuration of the API provider.
///
/// `parents` maps an entity to its parent entity (in the relational sense);
/// collection reads of a child entity are addressed under its parent.
#[derive(Debug, Clone)]
pub struct ApiConfig<T = ReqwestTransport> {
    pub base_url: String,
    pub parents: BTreeMap<String, String>,
    pub transport: T,
}

impl ApiConfig<ReqwestTransport> {
    /// Creates a configuration using the `reqwest` transport.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            parents: BTreeMap::new(),
            transport: ReqwestTransport::new(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `REPOKIT_URL` - API base URL (default: "http://localhost:3000")
    /// - `REPOKIT_PARENTS` - comma separated `entity=parent` pairs
    ///   (default: none)
    pub fn from_env() -> Result<Self> {
        let base_url = env::var("REPOKIT_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Ok(Self::new(base_url).with_parents(parents_from_env()?))
    }
}

impl<T> ApiConfig<T> {
    /// Declares `parent` as the parent entity of `entity`.
    pub fn with_parent(mut self, entity: impl Into<String>, parent: impl Into<String>) -> Self {
        self.parents.insert(entity.into(), parent.into());
        self
    }

    /// Declares several `(entity, parent)` pairs.
    pub fn with_parents<I>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        pairs
            .into_iter()
            .fold(self, |config, (entity, parent)| config.with_parent(entity, parent))
    }

    /// Swaps the transport, keeping the rest of the configuration.
    pub fn with_transport<U>(self, transport: U) -> ApiConfig<U> {
        ApiConfig {
            base_url: self.base_url,
            parents: self.parents,
            transport,
        }
    }
}

impl Default for ApiConfig<ReqwestTransport> {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Parent declarations from `REPOKIT_PARENTS` (none when unset).
pub fn parents_from_env() -> Result<Vec<(String, String)>> {
    match env::var("REPOKIT_PARENTS") {
        Ok(spec) => parse_parents(&spec),
        Err(_) => Ok(Vec::new()),
    }
}

/// Parses `entity=parent` pairs separated by commas.
pub fn parse_parents(spec: &str) -> Result<Vec<(String, String)>> {
    spec.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(parse_parent)
        .collect()
}

/// Parses a single `entity=parent` pair.
pub fn parse_parent(pair: &str) -> Result<(String, String)> {
    match pair.split_once('=') {
        Some((entity, parent)) if !entity.trim().is_empty() && !parent.trim().is_empty() => {
            Ok((entity.trim().to_string(), parent.trim().to_string()))
        }
        _ => Err(ClientError::InvalidInput(format!(
            "expected entity=parent, got '{}'",
            pair
        ))),
    }
}
