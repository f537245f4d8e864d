//! The I/O provider interface consumed by repository groups.
//!
//! A provider performs the primitive storage operations for every entity of
//! a schema. Payloads cross this boundary as JSON values; typed conversion
//! happens in [`crate::repository::Repository`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::Cache;
use crate::error::{BoxError, RepositoryError, Result};
use crate::filters::FilterGroup;

/// Whether a save creates new objects or updates existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveMode {
    Insert,
    Update,
}

impl SaveMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
        }
    }
}

/// Selector for bulk deletion. Exactly one shape is used per call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeleteSelector {
    /// Every object under a parent.
    ParentId(String),
    /// An explicit list of ids.
    Ids(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindRequest {
    pub entity: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetRequest {
    pub entity: String,
    pub parent_id: Option<String>,
    pub filters: Option<FilterGroup>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    pub entity: String,
    pub objects: Vec<Value>,
    pub mode: SaveMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    pub entity: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteManyRequest {
    pub entity: String,
    pub selector: DeleteSelector,
}

/// Context handed to a provider when its repository group is built.
#[derive(Debug, Clone, Default)]
pub struct ProviderContext {
    /// The group's cache, if caching is enabled.
    pub cache: Option<Cache>,
}

/// Performs storage operations for all entities of a repository group.
#[async_trait]
pub trait IoProvider: Send + Sync + Sized + 'static {
    /// Provider-specific configuration.
    type Config: Send;

    /// Provider-specific capabilities, exposed as `extensions()` on the group.
    type Extensions: Send + Sync;

    /// Builds the provider. Called exactly once per repository group.
    fn connect(config: Self::Config, ctx: ProviderContext) -> std::result::Result<Self, BoxError>;

    /// Finds one object by id; fails with `NotFound` if it does not exist.
    async fn find(&self, request: FindRequest) -> Result<Value>;

    /// Gets the objects matching an optional parent and filters.
    async fn get(&self, request: GetRequest) -> Result<Vec<Value>>;

    /// Inserts or updates a batch of objects, returning their stored form in
    /// request order.
    async fn save(&self, request: SaveRequest) -> Result<Vec<Value>>;

    /// Deletes one object by id, returning the deleted object.
    async fn delete(&self, request: DeleteRequest) -> Result<Value>;

    /// Deletes a set of objects. Optional; unsupported by default.
    async fn delete_many(&self, request: DeleteManyRequest) -> Result<Vec<Value>> {
        Err(RepositoryError::unsupported(request.entity, "delete_many"))
    }

    fn extensions(&self) -> &Self::Extensions;
}
