//! HTTP I/O provider for the repokit API.

pub mod blobs;
pub mod entities;

use std::collections::BTreeMap;
use std::sync::Arc;

use repokit_core::naming::pluralize;
use repokit_core::{RepositoryError, RepositoryGroup};
use serde_json::Value;
use url::Url;

use crate::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

pub use blobs::S3Blobs;

/// Repository group over the HTTP API.
pub type ApiRepositoryGroup<T = ReqwestTransport> = RepositoryGroup<ApiProvider<T>>;

/// I/O provider that stores entities behind a REST API.
///
/// Collections live at `{base}/{parentPlural}/{parentId}/{plural}/` (parent
/// segments only for entities with a declared parent) and objects at
/// `{base}/{plural}/{id}/`. Ids and other path segments are
/// percent-encoded.
#[derive(Debug)]
pub struct ApiProvider<T = ReqwestTransport> {
    transport: Arc<T>,
    base: Url,
    base_url: String,
    parents: BTreeMap<String, String>,
    blobs: S3Blobs<T>,
}

impl<T: HttpTransport> ApiProvider<T> {
    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Parent entity of `entity`, if one is declared.
    pub fn parent_of(&self, entity: &str) -> Option<&str> {
        self.parents.get(entity).map(String::as_str)
    }

    /// Build a URL from path segments; empty segments are skipped, each
    /// segment is percent-encoded and the result ends with a slash.
    fn endpoint(&self, segments: &[&str]) -> String {
        let mut url = self.base.clone();
        // `connect` rejects bases that cannot carry a path.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(segments.iter().filter(|s| !s.is_empty()))
                .push("");
        }
        url.into()
    }

    fn object_url(&self, entity: &str, id: &str) -> String {
        self.endpoint(&[&pluralize(entity), id])
    }

    fn collection_url(&self, entity: &str, parent_id: Option<&str>) -> String {
        let plural = pluralize(entity);
        match (self.parent_of(entity), parent_id) {
            (Some(parent), Some(parent_id)) => {
                self.endpoint(&[&pluralize(parent), parent_id, &plural])
            }
            (None, Some(parent_id)) => {
                tracing::debug!(entity, parent_id, "No parent declared, ignoring parent id");
                self.endpoint(&[&plural])
            }
            _ => self.endpoint(&[&plural]),
        }
    }

    /// Sends a request; transport failures are prefixed with `context`.
    async fn send(
        &self,
        request: HttpRequest,
        context: &str,
    ) -> Result<HttpResponse, RepositoryError> {
        self.transport
            .send(request)
            .await
            .map_err(|err| err.into_repository_error(context))
    }
}

/// Parses a response body as JSON; `context` names the failed operation.
fn parse_body(body: &str, context: &str) -> Result<Value, RepositoryError> {
    serde_json::from_str(body)
        .map_err(|err| RepositoryError::Serialization(format!("{}: {}", context, err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use repokit_core::{IoProvider, ProviderContext};

    use crate::config::ApiConfig;
    use crate::testing::StubTransport;

    fn provider() -> ApiProvider<StubTransport> {
        let config = ApiConfig::new("http://api.test/")
            .with_parent("project", "user")
            .with_parent("analysis", "project")
            .with_transport(StubTransport::new());
        ApiProvider::connect(config, ProviderContext::default()).unwrap()
    }

    #[test]
    fn test_base_url_is_trimmed() {
        assert_eq!(provider().base_url(), "http://api.test");
    }

    #[test]
    fn test_object_url() {
        assert_eq!(provider().object_url("user", "u1"), "http://api.test/users/u1/");
        assert_eq!(
            provider().object_url("analysis", "a1"),
            "http://api.test/analyses/a1/"
        );
    }

    #[test]
    fn test_object_url_encodes_ids() {
        let provider = provider();
        assert_eq!(
            provider.object_url("user", "a/b"),
            "http://api.test/users/a%2Fb/"
        );
        assert_eq!(
            provider.object_url("user", "x?y"),
            "http://api.test/users/x%3Fy/"
        );
        assert_eq!(
            provider.collection_url("project", Some("u 1")),
            "http://api.test/users/u%201/projects/"
        );
    }

    #[test]
    fn test_base_path_is_kept() {
        let config = ApiConfig::new("http://api.test/v1/").with_transport(StubTransport::new());
        let provider = ApiProvider::connect(config, ProviderContext::default()).unwrap();
        assert_eq!(provider.object_url("user", "u1"), "http://api.test/v1/users/u1/");
    }

    #[test]
    fn test_base_without_path_is_rejected() {
        let config = ApiConfig::new("mailto:ops@api.test").with_transport(StubTransport::new());
        assert!(ApiProvider::connect(config, ProviderContext::default()).is_err());
    }

    #[test]
    fn test_collection_url() {
        let provider = provider();
        assert_eq!(provider.collection_url("user", None), "http://api.test/users/");
        assert_eq!(
            provider.collection_url("project", Some("u1")),
            "http://api.test/users/u1/projects/"
        );
        assert_eq!(
            provider.collection_url("project", None),
            "http://api.test/projects/"
        );
        assert_eq!(
            provider.collection_url("user", Some("ignored")),
            "http://api.test/users/"
        );
    }

    #[test]
    fn test_invalid_base_url_fails_to_connect() {
        let config = ApiConfig::new("not a url").with_transport(StubTransport::new());
        let err = ApiProvider::connect(config, ProviderContext::default()).unwrap_err();
        assert!(err.to_string().contains("not a url"));
    }
}
