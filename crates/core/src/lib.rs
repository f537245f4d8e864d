//! repokit_core - typed repository groups over pluggable I/O providers.
//!
//! A [`RepositoryGroup`] is generated from an [`IoProvider`] implementation
//! and a list of entity names. It exposes a uniform CRUD surface per entity
//! and can memoize reads in a shared [`Cache`] that holds in-flight requests,
//! so concurrent identical reads reach the provider once.

pub mod blob;
pub mod cache;
pub mod error;
pub mod filters;
pub mod group;
#[cfg(feature = "memory")]
pub mod memory;
pub mod naming;
pub mod provider;
pub mod repository;
pub mod schema;

pub use cache::{Cache, CacheKey, InvalidationScope};
pub use error::{BoxError, RepositoryError, Result};
pub use filters::{Filter, FilterGroup, Operator};
pub use group::RepositoryGroup;
pub use provider::{DeleteSelector, IoProvider, ProviderContext, SaveMode};
pub use repository::{GetQuery, RawRepository, Repository};
pub use schema::{Entity, Schema, WritableEntity};
