//! In-memory I/O provider.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::blobs::MemoryBlobs;
use crate::error::{BoxError, RepositoryError, Result};
use crate::provider::{
    DeleteManyRequest, DeleteRequest, DeleteSelector, FindRequest, GetRequest, IoProvider,
    ProviderContext, SaveMode, SaveRequest,
};
use crate::schema::identifier_of;

type Table = BTreeMap<String, Value>;

/// Configuration of a [`MemoryProvider`].
#[derive(Debug, Clone, Default)]
pub struct MemoryConfig {
    parent_fields: HashMap<String, String>,
    seed: Vec<(String, Value)>,
}

impl MemoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares which field of `entity` holds its parent's id, enabling
    /// parent-scoped `get` and `delete_many`.
    pub fn with_parent_field(mut self, entity: impl Into<String>, field: impl Into<String>) -> Self {
        self.parent_fields.insert(entity.into(), field.into());
        self
    }

    /// Adds an object present from the start. Objects without an `id` get a
    /// generated one.
    pub fn with_object(mut self, entity: impl Into<String>, object: Value) -> Self {
        self.seed.push((entity.into(), object));
        self
    }
}

/// In-memory storage backend for testing.
///
/// Objects are kept per entity, keyed by their `id` field. Data is not
/// persisted and will be lost when the provider is dropped.
#[derive(Debug)]
pub struct MemoryProvider {
    tables: RwLock<HashMap<String, Table>>,
    parent_fields: HashMap<String, String>,
    blobs: MemoryBlobs,
}

impl MemoryProvider {
    fn parent_field(&self, entity: &str) -> Option<&str> {
        self.parent_fields.get(entity).map(String::as_str)
    }

    fn belongs_to(&self, entity: &str, object: &Value, parent_id: &str) -> bool {
        self.parent_field(entity)
            .and_then(|field| identifier_of(object, field))
            .is_some_and(|id| id == parent_id)
    }
}

fn into_object(entity: &str, value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(RepositoryError::InvalidInput(format!(
            "{entity} objects must be JSON objects, got {other}"
        ))),
    }
}

fn assign_id(mut object: Map<String, Value>) -> (String, Value) {
    let id = identifier_of(&Value::Object(object.clone()), "id")
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    object.insert("id".to_string(), Value::String(id.clone()));
    (id, Value::Object(object))
}

#[async_trait]
impl IoProvider for MemoryProvider {
    type Config = MemoryConfig;
    type Extensions = MemoryBlobs;

    fn connect(config: MemoryConfig, ctx: ProviderContext) -> std::result::Result<Self, BoxError> {
        let mut tables: HashMap<String, Table> = HashMap::new();
        for (entity, object) in config.seed {
            let (id, object) = assign_id(into_object(&entity, object)?);
            tables.entry(entity).or_default().insert(id, object);
        }
        tracing::debug!(
            entities = tables.len(),
            cached = ctx.cache.is_some(),
            "In-memory provider ready"
        );
        Ok(Self {
            tables: RwLock::new(tables),
            parent_fields: config.parent_fields,
            blobs: MemoryBlobs::new(),
        })
    }

    async fn find(&self, request: FindRequest) -> Result<Value> {
        let tables = self.tables.read().await;
        tables
            .get(&request.entity)
            .and_then(|table| table.get(&request.id))
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(request.entity, request.id))
    }

    async fn get(&self, request: GetRequest) -> Result<Vec<Value>> {
        let tables = self.tables.read().await;
        let Some(table) = tables.get(&request.entity) else {
            return Ok(Vec::new());
        };
        Ok(table
            .values()
            .filter(|object| match (&request.parent_id, self.parent_field(&request.entity)) {
                (Some(parent_id), Some(_)) => self.belongs_to(&request.entity, object, parent_id),
                _ => true,
            })
            .filter(|object| request.filters.as_ref().is_none_or(|f| f.matches(object)))
            .cloned()
            .collect())
    }

    async fn save(&self, request: SaveRequest) -> Result<Vec<Value>> {
        let entity = request.entity;
        let mut objects = Vec::with_capacity(request.objects.len());
        for object in request.objects {
            objects.push(into_object(&entity, object)?);
        }

        let mut tables = self.tables.write().await;
        let table = tables.entry(entity.clone()).or_default();

        // Validate the whole batch before touching the table.
        match request.mode {
            SaveMode::Insert => {
                for object in &objects {
                    if let Some(id) = identifier_of(&Value::Object(object.clone()), "id") {
                        if table.contains_key(&id) {
                            return Err(RepositoryError::AlreadyExists { entity, id });
                        }
                    }
                }
            }
            SaveMode::Update => {
                for object in &objects {
                    match identifier_of(&Value::Object(object.clone()), "id") {
                        Some(id) if table.contains_key(&id) => {}
                        Some(id) => return Err(RepositoryError::not_found(entity, id)),
                        None => {
                            return Err(RepositoryError::InvalidInput(format!(
                                "{entity} update requires an id"
                            )))
                        }
                    }
                }
            }
        }

        let mut saved = Vec::with_capacity(objects.len());
        for object in objects {
            let (id, object) = assign_id(object);
            let stored = match (request.mode, table.get(&id)) {
                (SaveMode::Update, Some(Value::Object(existing))) => {
                    let mut merged = existing.clone();
                    if let Value::Object(fields) = object {
                        merged.extend(fields);
                    }
                    Value::Object(merged)
                }
                _ => object,
            };
            table.insert(id, stored.clone());
            saved.push(stored);
        }
        Ok(saved)
    }

    async fn delete(&self, request: DeleteRequest) -> Result<Value> {
        let mut tables = self.tables.write().await;
        tables
            .get_mut(&request.entity)
            .and_then(|table| table.remove(&request.id))
            .ok_or_else(|| RepositoryError::not_found(request.entity, request.id))
    }

    async fn delete_many(&self, request: DeleteManyRequest) -> Result<Vec<Value>> {
        if let DeleteSelector::ParentId(_) = &request.selector {
            if self.parent_field(&request.entity).is_none() {
                return Err(RepositoryError::InvalidInput(format!(
                    "{} has no parent field configured",
                    request.entity
                )));
            }
        }

        let mut tables = self.tables.write().await;
        let Some(table) = tables.get_mut(&request.entity) else {
            return Ok(Vec::new());
        };
        let ids: Vec<String> = match &request.selector {
            DeleteSelector::Ids(ids) => ids.clone(),
            DeleteSelector::ParentId(parent_id) => table
                .iter()
                .filter(|(_, object)| self.belongs_to(&request.entity, object, parent_id))
                .map(|(id, _)| id.clone())
                .collect(),
        };
        Ok(ids.iter().filter_map(|id| table.remove(id)).collect())
    }

    fn extensions(&self) -> &MemoryBlobs {
        &self.blobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::filters::{Filter, FilterGroup};

    fn provider() -> MemoryProvider {
        let config = MemoryConfig::new()
            .with_parent_field("project", "userId")
            .with_object("user", json!({"id": "u1", "name": "Alice"}))
            .with_object("project", json!({"id": "p1", "userId": "u1", "name": "Atlas"}))
            .with_object("project", json!({"id": "p2", "userId": "u1", "name": "Borealis"}))
            .with_object("project", json!({"id": "p3", "userId": "u2", "name": "Cirrus"}));
        MemoryProvider::connect(config, ProviderContext::default()).unwrap()
    }

    #[tokio::test]
    async fn test_find_existing_and_missing() {
        let provider = provider();
        let user = provider
            .find(FindRequest {
                entity: "user".into(),
                id: "u1".into(),
            })
            .await
            .unwrap();
        assert_eq!(user["name"], "Alice");

        let err = provider
            .find(FindRequest {
                entity: "user".into(),
                id: "nope".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, RepositoryError::not_found("user", "nope"));
    }

    #[tokio::test]
    async fn test_get_by_parent_and_filters() {
        let provider = provider();
        let projects = provider
            .get(GetRequest {
                entity: "project".into(),
                parent_id: Some("u1".into()),
                filters: None,
            })
            .await
            .unwrap();
        assert_eq!(projects.len(), 2);

        let projects = provider
            .get(GetRequest {
                entity: "project".into(),
                parent_id: Some("u1".into()),
                filters: Some(FilterGroup::all([Filter::eq("name", "Borealis")])),
            })
            .await
            .unwrap();
        assert_eq!(projects, vec![json!({"id": "p2", "userId": "u1", "name": "Borealis"})]);

        let none = provider
            .get(GetRequest {
                entity: "table".into(),
                parent_id: None,
                filters: None,
            })
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_insert_assigns_ids() {
        let provider = provider();
        let saved = provider
            .save(SaveRequest {
                entity: "user".into(),
                objects: vec![json!({"name": "Bob"}), json!({"name": "Carol"})],
                mode: SaveMode::Insert,
            })
            .await
            .unwrap();

        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0]["name"], "Bob");
        assert_eq!(saved[1]["name"], "Carol");
        assert!(saved.iter().all(|o| o["id"].as_str().is_some_and(|id| !id.is_empty())));
    }

    #[tokio::test]
    async fn test_insert_existing_id_fails() {
        let provider = provider();
        let err = provider
            .save(SaveRequest {
                entity: "user".into(),
                objects: vec![json!({"id": "u1", "name": "Again"})],
                mode: SaveMode::Insert,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let provider = provider();
        let saved = provider
            .save(SaveRequest {
                entity: "project".into(),
                objects: vec![json!({"id": "p1", "name": "Atlas II"})],
                mode: SaveMode::Update,
            })
            .await
            .unwrap();
        assert_eq!(saved, vec![json!({"id": "p1", "userId": "u1", "name": "Atlas II"})]);

        let err = provider
            .save(SaveRequest {
                entity: "project".into(),
                objects: vec![json!({"id": "p9", "name": "Ghost"})],
                mode: SaveMode::Update,
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_and_delete_many() {
        let provider = provider();
        let deleted = provider
            .delete(DeleteRequest {
                entity: "project".into(),
                id: "p3".into(),
            })
            .await
            .unwrap();
        assert_eq!(deleted["name"], "Cirrus");

        let removed = provider
            .delete_many(DeleteManyRequest {
                entity: "project".into(),
                selector: DeleteSelector::ParentId("u1".into()),
            })
            .await
            .unwrap();
        assert_eq!(removed.len(), 2);

        let err = provider
            .delete(DeleteRequest {
                entity: "project".into(),
                id: "p1".into(),
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_many_by_parent_requires_parent_field() {
        let provider = provider();
        let err = provider
            .delete_many(DeleteManyRequest {
                entity: "user".into(),
                selector: DeleteSelector::ParentId("x".into()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidInput(_)));
    }

    #[test]
    fn test_seed_must_be_objects() {
        let config = MemoryConfig::new().with_object("user", json!("not an object"));
        assert!(MemoryProvider::connect(config, ProviderContext::default()).is_err());
    }
}
