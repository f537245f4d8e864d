use std::fmt;

use crate::filters::{canonicalize, FilterGroup};

/// Key of a cache entry: the shape of the operation whose result it holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Result of `find` for one object.
    Single { entity: String, id: String },
    /// Result of `get` for a parent/filter combination.
    Multiple {
        entity: String,
        parent_id: Option<String>,
        filters: String,
    },
}

/// Which entries of an entity to drop on invalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationScope {
    /// The single entry for one object id.
    Object(String),
    /// The collection entries scoped to one parent id.
    Parent(String),
    /// Every collection entry, whatever its parent and filters.
    Collections,
}

impl CacheKey {
    /// Returns the key for a `find` call.
    pub fn single(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Single {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Returns the key for a `get` call. Filters are stored in canonical form.
    pub fn multiple(
        entity: impl Into<String>,
        parent_id: Option<&str>,
        filters: Option<&FilterGroup>,
    ) -> Self {
        Self::Multiple {
            entity: entity.into(),
            parent_id: parent_id.map(str::to_owned),
            filters: canonicalize(filters),
        }
    }

    pub fn entity(&self) -> &str {
        match self {
            Self::Single { entity, .. } | Self::Multiple { entity, .. } => entity,
        }
    }

    /// Returns true when this key falls under an invalidation of `entity`.
    ///
    /// Without a scope every entry of the entity matches.
    pub fn is_covered_by(&self, entity: &str, scope: Option<&InvalidationScope>) -> bool {
        if self.entity() != entity {
            return false;
        }
        match (scope, self) {
            (None, _) => true,
            (Some(InvalidationScope::Object(target)), Self::Single { id, .. }) => id == target,
            (Some(InvalidationScope::Parent(target)), Self::Multiple { parent_id, .. }) => {
                parent_id.as_deref() == Some(target.as_str())
            }
            (Some(InvalidationScope::Collections), Self::Multiple { .. }) => true,
            _ => false,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single { entity, id } => write!(f, "single:{}:{}", entity, id),
            Self::Multiple {
                entity,
                parent_id,
                filters,
            } => write!(
                f,
                "multiple:{}:{}:{}",
                entity,
                parent_id.as_deref().unwrap_or("*"),
                filters
            ),
        }
    }
}
