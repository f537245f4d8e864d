//! Per-entity repositories.
//!
//! A repository is a view bound to one entity name that shares its group's
//! I/O provider and cache. [`RawRepository`] speaks JSON and is what the
//! group synthesizes for every declared entity; [`Repository`] adds the
//! typed surface for a schema [`Entity`].

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cache::{Cache, CacheKey, InvalidationScope};
use crate::error::{RepositoryError, Result};
use crate::filters::FilterGroup;
use crate::provider::{
    DeleteManyRequest, DeleteRequest, DeleteSelector, FindRequest, GetRequest, IoProvider,
    SaveMode, SaveRequest,
};
use crate::schema::{has_identifier, identifier_of, Entity, WritableEntity};

/// Parent scope and filters of a `get` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetQuery {
    pub parent_id: Option<String>,
    pub filters: Option<FilterGroup>,
}

impl GetQuery {
    /// Every object of the entity.
    pub fn all() -> Self {
        Self::default()
    }

    /// Objects under one parent.
    pub fn under(parent_id: impl Into<String>) -> Self {
        Self {
            parent_id: Some(parent_id.into()),
            filters: None,
        }
    }

    pub fn with_filters(mut self, filters: FilterGroup) -> Self {
        self.filters = Some(filters);
        self
    }
}

/// Untyped repository for one entity.
pub struct RawRepository<P> {
    entity: Arc<str>,
    id_field: &'static str,
    read_only: bool,
    io: Arc<P>,
    cache: Option<Cache>,
}

impl<P> Clone for RawRepository<P> {
    fn clone(&self) -> Self {
        Self {
            entity: Arc::clone(&self.entity),
            id_field: self.id_field,
            read_only: self.read_only,
            io: Arc::clone(&self.io),
            cache: self.cache.clone(),
        }
    }
}

impl<P> fmt::Debug for RawRepository<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawRepository")
            .field("entity", &self.entity)
            .field("id_field", &self.id_field)
            .field("read_only", &self.read_only)
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

impl<P: IoProvider> RawRepository<P> {
    pub(crate) fn new(entity: &str, io: Arc<P>, cache: Option<Cache>) -> Self {
        Self {
            entity: Arc::from(entity),
            id_field: "id",
            read_only: false,
            io,
            cache,
        }
    }

    /// Returns a copy of this repository that reads identifiers from
    /// `id_field` when inferring the save mode.
    pub fn with_id_field(mut self, id_field: &'static str) -> Self {
        self.id_field = id_field;
        self
    }

    pub(crate) fn into_read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// True when writes through this repository are rejected.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn ensure_writable(&self, operation: &'static str) -> Result<()> {
        if self.read_only {
            return Err(RepositoryError::unsupported(self.entity(), operation));
        }
        Ok(())
    }

    /// Finds one object by id.
    ///
    /// With a cache, the call joins any in-flight or resolved `find` for the
    /// same entity and id.
    pub async fn find(&self, id: &str) -> Result<Value> {
        let request = FindRequest {
            entity: self.entity.to_string(),
            id: id.to_string(),
        };
        let result = match &self.cache {
            Some(cache) => {
                let io = Arc::clone(&self.io);
                cache
                    .get_or_insert_with(CacheKey::single(self.entity(), id), move || async move {
                        io.find(request).await
                    })
                    .await
            }
            None => self.io.find(request).await,
        };
        result.inspect_err(|err| {
            tracing::debug!(entity = %self.entity, id, error = %err, "find failed");
        })
    }

    /// Gets the objects matching a parent scope and filters. No match is an
    /// empty list, not an error.
    pub async fn get(&self, query: GetQuery) -> Result<Vec<Value>> {
        let request = GetRequest {
            entity: self.entity.to_string(),
            parent_id: query.parent_id,
            filters: query.filters,
        };
        let result = match &self.cache {
            Some(cache) => {
                let key = CacheKey::multiple(
                    self.entity(),
                    request.parent_id.as_deref(),
                    request.filters.as_ref(),
                );
                let io = Arc::clone(&self.io);
                cache
                    .get_or_insert_with(key, move || async move { io.get(request).await })
                    .await
            }
            None => self.io.get(request).await,
        };
        result.inspect_err(|err| {
            tracing::debug!(entity = %self.entity, error = %err, "get failed");
        })
    }

    /// Saves a batch, inferring the mode from the first object: a non-empty
    /// identifier means update, anything else insert.
    pub async fn save(&self, objects: Vec<Value>) -> Result<Vec<Value>> {
        self.ensure_writable("save")?;
        let Some(first) = objects.first() else {
            return Ok(Vec::new());
        };
        let mode = if has_identifier(first, self.id_field) {
            SaveMode::Update
        } else {
            SaveMode::Insert
        };
        self.save_as(objects, mode).await
    }

    /// Saves a batch with an explicit mode. Never cached.
    pub async fn save_as(&self, objects: Vec<Value>, mode: SaveMode) -> Result<Vec<Value>> {
        self.ensure_writable("save")?;
        if objects.is_empty() {
            return Ok(Vec::new());
        }
        let count = objects.len();
        let mut touched: Vec<String> = objects
            .iter()
            .filter_map(|o| identifier_of(o, self.id_field))
            .collect();

        let saved = self
            .io
            .save(SaveRequest {
                entity: self.entity.to_string(),
                objects,
                mode,
            })
            .await
            .inspect_err(|err| {
                tracing::debug!(entity = %self.entity, mode = mode.as_str(), error = %err, "save failed");
            })?;

        touched.extend(saved.iter().filter_map(|o| identifier_of(o, self.id_field)));
        self.invalidate_written(&touched);
        tracing::debug!(entity = %self.entity, mode = mode.as_str(), count, "Saved objects");
        Ok(saved)
    }

    /// Deletes one object by id. Never cached.
    pub async fn delete(&self, id: &str) -> Result<Value> {
        self.ensure_writable("delete")?;
        let deleted = self
            .io
            .delete(DeleteRequest {
                entity: self.entity.to_string(),
                id: id.to_string(),
            })
            .await
            .inspect_err(|err| {
                tracing::debug!(entity = %self.entity, id, error = %err, "delete failed");
            })?;

        self.invalidate_written(&[id.to_string()]);
        tracing::debug!(entity = %self.entity, id, "Deleted object");
        Ok(deleted)
    }

    /// Deletes every object selected by `selector`. Fails with
    /// `UnsupportedOperation` when the provider lacks bulk deletion.
    pub async fn delete_many(&self, selector: DeleteSelector) -> Result<Vec<Value>> {
        self.ensure_writable("delete_many")?;
        let deleted = self
            .io
            .delete_many(DeleteManyRequest {
                entity: self.entity.to_string(),
                selector,
            })
            .await
            .inspect_err(|err| {
                tracing::debug!(entity = %self.entity, error = %err, "delete_many failed");
            })?;

        if let Some(cache) = &self.cache {
            cache.invalidate(self.entity(), None);
        }
        tracing::debug!(entity = %self.entity, count = deleted.len(), "Deleted objects");
        Ok(deleted)
    }

    /// Drops cached results of this entity. See [`Cache::invalidate`].
    pub fn invalidate_cache(&self, scope: Option<&InvalidationScope>) -> usize {
        self.cache
            .as_ref()
            .map_or(0, |cache| cache.invalidate(self.entity(), scope))
    }

    fn invalidate_written(&self, ids: &[String]) {
        let Some(cache) = &self.cache else {
            return;
        };
        for id in ids {
            cache.invalidate(self.entity(), Some(&InvalidationScope::Object(id.clone())));
        }
        cache.invalidate(self.entity(), Some(&InvalidationScope::Collections));
    }
}

/// Typed repository for a schema entity.
///
/// Read operations are always available; write operations require
/// [`WritableEntity`].
pub struct Repository<E, P> {
    raw: RawRepository<P>,
    _entity: PhantomData<fn() -> E>,
}

impl<E, P> Clone for Repository<E, P> {
    fn clone(&self) -> Self {
        Self {
            raw: self.raw.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E, P> fmt::Debug for Repository<E, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Repository").field(&self.raw).finish()
    }
}

impl<E: Entity, P: IoProvider> Repository<E, P> {
    pub(crate) fn new(raw: RawRepository<P>) -> Self {
        Self {
            raw: raw.with_id_field(E::ID_FIELD),
            _entity: PhantomData,
        }
    }

    /// The untyped repository underneath.
    pub fn raw(&self) -> &RawRepository<P> {
        &self.raw
    }

    /// Finds one object by id; fails with `NotFound` if it does not exist.
    pub async fn find(&self, id: &str) -> Result<E::FromStorage> {
        decode::<E, _>(self.raw.find(id).await?, "find")
    }

    /// Gets the objects matching `query`.
    pub async fn get(&self, query: GetQuery) -> Result<Vec<E::FromStorage>> {
        decode_all::<E>(self.raw.get(query).await?, "get")
    }

    pub fn invalidate_cache(&self, scope: Option<&InvalidationScope>) -> usize {
        self.raw.invalidate_cache(scope)
    }
}

impl<E: WritableEntity, P: IoProvider> Repository<E, P> {
    /// Inserts or updates a batch; see [`RawRepository::save`] for the mode
    /// rule. Results come back in request order.
    pub async fn save(&self, objects: &[E::ToStorage]) -> Result<Vec<E::FromStorage>> {
        let values = encode_all::<E>(objects)?;
        decode_all::<E>(self.raw.save(values).await?, "save")
    }

    /// Saves a batch with an explicit mode.
    pub async fn save_as(
        &self,
        objects: &[E::ToStorage],
        mode: SaveMode,
    ) -> Result<Vec<E::FromStorage>> {
        let values = encode_all::<E>(objects)?;
        decode_all::<E>(self.raw.save_as(values, mode).await?, "save")
    }

    /// Deletes one object. Returns the deleted object when the provider
    /// reports it.
    pub async fn delete(&self, id: &str) -> Result<Option<E::FromStorage>> {
        match self.raw.delete(id).await? {
            Value::Null => Ok(None),
            value => decode::<E, _>(value, "delete").map(Some),
        }
    }

    pub async fn delete_many(&self, selector: DeleteSelector) -> Result<Vec<E::FromStorage>> {
        decode_all::<E>(self.raw.delete_many(selector).await?, "delete_many")
    }
}

fn decode<E: Entity, T: DeserializeOwned>(value: Value, operation: &str) -> Result<T> {
    serde_json::from_value(value).map_err(|err| {
        RepositoryError::Serialization(format!("{} {}: {}", E::NAME, operation, err))
    })
}

fn decode_all<E: Entity>(values: Vec<Value>, operation: &str) -> Result<Vec<E::FromStorage>> {
    values
        .into_iter()
        .map(|value| decode::<E, E::FromStorage>(value, operation))
        .collect()
}

fn encode_all<E: WritableEntity>(objects: &[E::ToStorage]) -> Result<Vec<Value>> {
    objects
        .iter()
        .map(|object| {
            serde_json::to_value(object).map_err(|err| {
                RepositoryError::Serialization(format!("{} save: {}", E::NAME, err))
            })
        })
        .collect()
}
