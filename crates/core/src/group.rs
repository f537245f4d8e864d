//! Repository groups.
//!
//! A [`RepositoryGroup`] is built once from an I/O provider type, its
//! configuration and a list of entity names. It owns the provider and the
//! optional cache and synthesizes one [`RawRepository`] per entity, kept in a
//! lookup table keyed by entity name.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::cache::{Cache, InvalidationScope};
use crate::error::{RepositoryError, Result};
use crate::provider::{IoProvider, ProviderContext};
use crate::repository::{RawRepository, Repository};
use crate::schema::{Entity, Schema};

/// One I/O provider, one optional cache, and a repository per entity.
pub struct RepositoryGroup<P> {
    io: Arc<P>,
    cache: Option<Cache>,
    names: Vec<String>,
    repositories: HashMap<String, RawRepository<P>>,
}

impl<P: IoProvider> RepositoryGroup<P> {
    /// Builds the provider and one repository per entity name.
    ///
    /// Without a cache every `find`/`get` goes straight to the provider.
    /// Duplicate names are declared once. No I/O happens here beyond what
    /// the provider's `connect` does.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Construction`] wrapping the provider's
    /// error if it fails to build, and [`RepositoryError::InvalidInput`] for
    /// an empty entity name.
    pub fn new<I, S>(config: P::Config, entity_names: I, cache: Option<Cache>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let io = P::connect(
            config,
            ProviderContext {
                cache: cache.clone(),
            },
        )
        .map_err(|err| {
            tracing::error!(error = %err, "I/O provider failed to initialize");
            RepositoryError::Construction(err.to_string())
        })?;
        let io = Arc::new(io);

        let mut names = Vec::new();
        let mut repositories = HashMap::new();
        for name in entity_names {
            let name = name.as_ref();
            if name.is_empty() {
                return Err(RepositoryError::InvalidInput(
                    "entity names must not be empty".to_string(),
                ));
            }
            if repositories.contains_key(name) {
                continue;
            }
            repositories.insert(
                name.to_string(),
                RawRepository::new(name, Arc::clone(&io), cache.clone()),
            );
            names.push(name.to_string());
        }

        tracing::debug!(entities = ?names, cached = cache.is_some(), "Repository group created");
        Ok(Self {
            io,
            cache,
            names,
            repositories,
        })
    }

    /// Builds a group for every entity of a schema, marking the schema's
    /// `READ_ONLY` entities read-only.
    pub fn for_schema<S: Schema>(config: P::Config, cache: Option<Cache>) -> Result<Self> {
        Self::new(config, S::ENTITIES.iter().copied(), cache)?
            .with_read_only(S::READ_ONLY.iter().copied())
    }

    /// Marks declared entities read-only: `save`, `delete` and `delete_many`
    /// on their repositories fail with `UnsupportedOperation`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::UnknownEntity`] for an undeclared name.
    pub fn with_read_only<I, S>(mut self, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            let name = name.as_ref();
            let repository = self
                .repositories
                .remove(name)
                .ok_or_else(|| RepositoryError::UnknownEntity(name.to_string()))?;
            self.repositories
                .insert(name.to_string(), repository.into_read_only());
        }
        Ok(self)
    }

    /// Looks up the repository of an entity by name.
    ///
    /// The untyped repository exposes every operation. Write protection is
    /// only what [`RepositoryGroup::with_read_only`] (or a schema's
    /// `READ_ONLY` list) declares; an entity's missing `WritableEntity` impl
    /// is not visible at this level.
    pub fn entity(&self, name: &str) -> Result<&RawRepository<P>> {
        self.repositories
            .get(name)
            .ok_or_else(|| RepositoryError::UnknownEntity(name.to_string()))
    }

    /// Returns the typed repository of `E`, which must have been declared.
    pub fn repository<E: Entity>(&self) -> Result<Repository<E, P>> {
        self.entity(E::NAME).cloned().map(Repository::new)
    }

    /// Declared entity names, in declaration order.
    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Provider-specific capabilities, e.g. blob storage.
    pub fn extensions(&self) -> &P::Extensions {
        self.io.extensions()
    }

    pub fn provider(&self) -> &P {
        &self.io
    }

    pub fn cache(&self) -> Option<&Cache> {
        self.cache.as_ref()
    }

    /// Drops cached results of one entity, optionally narrowed to an object
    /// or a parent. Returns the number of entries removed; always zero when
    /// caching is disabled.
    pub fn invalidate_cache(
        &self,
        entity: &str,
        scope: Option<InvalidationScope>,
    ) -> Result<usize> {
        Ok(self.entity(entity)?.invalidate_cache(scope.as_ref()))
    }
}

impl<P> fmt::Debug for RepositoryGroup<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryGroup")
            .field("entities", &self.names)
            .field("cache", &self.cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};
    use serde_json::{json, Value};

    use crate::error::BoxError;
    use crate::filters::{Filter, FilterGroup};
    use crate::provider::{
        DeleteRequest, DeleteSelector, FindRequest, GetRequest, SaveMode, SaveRequest,
    };
    use crate::repository::GetQuery;
    use crate::schema::WritableEntity;

    // Mock provider that counts calls and records save modes
    #[derive(Default)]
    struct MockProvider {
        find_calls: AtomicUsize,
        get_calls: AtomicUsize,
        saves: Mutex<Vec<(String, SaveMode, usize)>>,
        fail_find: bool,
    }

    #[derive(Debug, Default)]
    struct MockConfig {
        fail_connect: bool,
        fail_find: bool,
    }

    #[async_trait]
    impl IoProvider for MockProvider {
        type Config = MockConfig;
        type Extensions = ();

        fn connect(config: MockConfig, _ctx: ProviderContext) -> std::result::Result<Self, BoxError> {
            if config.fail_connect {
                return Err("base url is not configured".into());
            }
            Ok(Self {
                fail_find: config.fail_find,
                ..Self::default()
            })
        }

        async fn find(&self, request: FindRequest) -> Result<Value> {
            self.find_calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if self.fail_find {
                return Err(RepositoryError::not_found(request.entity, request.id));
            }
            Ok(json!({"id": request.id, "name": "Alice", "entity": request.entity}))
        }

        async fn get(&self, request: GetRequest) -> Result<Vec<Value>> {
            self.get_calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(vec![json!({"id": "1", "parent": request.parent_id})])
        }

        async fn save(&self, request: SaveRequest) -> Result<Vec<Value>> {
            self.saves
                .lock()
                .unwrap()
                .push((request.entity, request.mode, request.objects.len()));
            Ok(request
                .objects
                .into_iter()
                .map(|mut o| {
                    o["id"] = o.get("id").cloned().unwrap_or_else(|| json!("new"));
                    o
                })
                .collect())
        }

        async fn delete(&self, request: DeleteRequest) -> Result<Value> {
            Ok(json!({"id": request.id, "name": "gone"}))
        }

        fn extensions(&self) -> &() {
            &()
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct UserRecord {
        id: String,
        name: String,
    }

    #[derive(Debug, Serialize)]
    struct UserInput {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        name: String,
    }

    struct User;

    impl Entity for User {
        const NAME: &'static str = "user";
        type FromStorage = UserRecord;
    }

    impl WritableEntity for User {
        type ToStorage = UserInput;
    }

    struct Project;

    impl Entity for Project {
        const NAME: &'static str = "project";
        type FromStorage = Value;
    }

    struct TestSchema;

    impl Schema for TestSchema {
        const ENTITIES: &'static [&'static str] = &["user", "project"];
        const READ_ONLY: &'static [&'static str] = &["project"];
    }

    fn cached_group() -> RepositoryGroup<MockProvider> {
        RepositoryGroup::for_schema::<TestSchema>(MockConfig::default(), Some(Cache::new()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_concurrent_gets_share_one_provider_call() {
        let group = cached_group();
        let users = group.entity("user").unwrap();
        let query = GetQuery::under("p1").with_filters(FilterGroup::all([Filter::eq("a", 1)]));

        let (a, b) = tokio::join!(users.get(query.clone()), users.get(query.clone()));

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(group.provider().get_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_filters_are_distinct_entries() {
        let group = cached_group();
        let users = group.entity("user").unwrap();

        users
            .get(GetQuery::under("p1").with_filters(FilterGroup::all([Filter::eq("a", 1)])))
            .await
            .unwrap();
        users
            .get(GetQuery::under("p1").with_filters(FilterGroup::all([Filter::eq("a", 2)])))
            .await
            .unwrap();

        assert_eq!(group.provider().get_calls.load(Ordering::SeqCst), 2);
        assert_eq!(group.cache().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_save_infers_mode_from_identifier() {
        let group = cached_group();
        let users = group.repository::<User>().unwrap();

        users
            .save(&[UserInput {
                id: None,
                name: "x".to_string(),
            }])
            .await
            .unwrap();
        let updated = users
            .save(&[UserInput {
                id: Some("5".to_string()),
                name: "x".to_string(),
            }])
            .await
            .unwrap();

        let saves = group.provider().saves.lock().unwrap().clone();
        assert_eq!(
            saves,
            vec![
                ("user".to_string(), SaveMode::Insert, 1),
                ("user".to_string(), SaveMode::Update, 1),
            ]
        );
        assert_eq!(
            updated,
            vec![UserRecord {
                id: "5".to_string(),
                name: "x".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_empty_save_skips_provider() {
        let group = cached_group();
        let saved = group.entity("user").unwrap().save(vec![]).await.unwrap();
        assert!(saved.is_empty());
        assert!(group.provider().saves.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_without_cache_every_call_reaches_provider() {
        let group: RepositoryGroup<MockProvider> =
            RepositoryGroup::new(MockConfig::default(), ["user"], None).unwrap();
        let users = group.entity("user").unwrap();

        users.find("u1").await.unwrap();
        users.find("u1").await.unwrap();
        users.get(GetQuery::all()).await.unwrap();
        users.get(GetQuery::all()).await.unwrap();

        assert_eq!(group.provider().find_calls.load(Ordering::SeqCst), 2);
        assert_eq!(group.provider().get_calls.load(Ordering::SeqCst), 2);
        assert!(group.cache().is_none());
    }

    #[tokio::test]
    async fn test_repeated_find_is_served_from_cache() {
        let group = cached_group();
        let users = group.repository::<User>().unwrap();

        let first = users.find("u1").await.unwrap();
        let second = users.find("u1").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(group.provider().find_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_find_entries_are_namespaced_by_entity() {
        let group = cached_group();

        let user = group.entity("user").unwrap().find("1").await.unwrap();
        let project = group.entity("project").unwrap().find("1").await.unwrap();

        assert_eq!(user["entity"], "user");
        assert_eq!(project["entity"], "project");
        assert_eq!(group.provider().find_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_construction_failure_includes_cause() {
        let err = RepositoryGroup::<MockProvider>::new(
            MockConfig {
                fail_connect: true,
                ..MockConfig::default()
            },
            ["user"],
            None,
        )
        .unwrap_err();

        assert!(matches!(err, RepositoryError::Construction(_)));
        assert!(err.to_string().contains("base url is not configured"));
    }

    #[test]
    fn test_empty_entity_name_is_rejected() {
        let err = RepositoryGroup::<MockProvider>::new(MockConfig::default(), ["user", ""], None)
            .unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_delete_many_unsupported() {
        let group = cached_group();
        let err = group
            .entity("user")
            .unwrap()
            .delete_many(DeleteSelector::Ids(vec!["1".to_string()]))
            .await
            .unwrap_err();

        assert_eq!(err, RepositoryError::unsupported("user", "delete_many"));
    }

    #[test]
    fn test_unknown_entity() {
        let group = cached_group();
        assert_eq!(
            group.entity("table").unwrap_err(),
            RepositoryError::UnknownEntity("table".to_string())
        );
        assert!(group.invalidate_cache("table", None).is_err());
    }

    #[test]
    fn test_entity_names_keep_declaration_order() {
        let group = RepositoryGroup::<MockProvider>::new(
            MockConfig::default(),
            ["project", "user", "project"],
            None,
        )
        .unwrap();
        assert_eq!(group.entity_names().collect::<Vec<_>>(), vec!["project", "user"]);
    }

    #[tokio::test]
    async fn test_write_invalidates_cached_reads() {
        let group = cached_group();
        let users = group.entity("user").unwrap();

        users.find("5").await.unwrap();
        users.get(GetQuery::all()).await.unwrap();
        users.save(vec![json!({"id": "5", "name": "y"})]).await.unwrap();
        users.find("5").await.unwrap();
        users.get(GetQuery::all()).await.unwrap();

        assert_eq!(group.provider().find_calls.load(Ordering::SeqCst), 2);
        assert_eq!(group.provider().get_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_explicit_invalidation() {
        let group = cached_group();
        let users = group.entity("user").unwrap();

        users.find("u1").await.unwrap();
        let removed = group
            .invalidate_cache("user", Some(InvalidationScope::Object("u1".to_string())))
            .unwrap();
        users.find("u1").await.unwrap();

        assert_eq!(removed, 1);
        assert_eq!(group.provider().find_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_find_is_not_memoized() {
        let group = RepositoryGroup::<MockProvider>::new(
            MockConfig {
                fail_find: true,
                ..MockConfig::default()
            },
            ["user"],
            Some(Cache::new()),
        )
        .unwrap();
        let users = group.repository::<User>().unwrap();

        assert!(users.find("u1").await.unwrap_err().is_not_found());
        assert!(users.find("u1").await.unwrap_err().is_not_found());
        assert_eq!(group.provider().find_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_typed_delete_decodes_deleted_object() {
        let group = cached_group();
        let deleted = group.repository::<User>().unwrap().delete("u9").await.unwrap();
        assert_eq!(
            deleted,
            Some(UserRecord {
                id: "u9".to_string(),
                name: "gone".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_read_only_entity_reads() {
        let group = cached_group();
        let projects = group.repository::<Project>().unwrap();
        let found = projects.find("p1").await.unwrap();
        assert_eq!(found["id"], "p1");
    }

    #[tokio::test]
    async fn test_read_only_entity_rejects_untyped_writes() {
        let group = cached_group();
        let projects = group.entity("project").unwrap();
        assert!(projects.is_read_only());

        let err = projects.save(vec![json!({"name": "Atlas"})]).await.unwrap_err();
        assert_eq!(err, RepositoryError::unsupported("project", "save"));
        let err = projects.delete("p1").await.unwrap_err();
        assert_eq!(err, RepositoryError::unsupported("project", "delete"));
        let err = projects
            .delete_many(DeleteSelector::Ids(vec!["p1".into()]))
            .await
            .unwrap_err();
        assert_eq!(err, RepositoryError::unsupported("project", "delete_many"));
        assert!(group.provider().saves.lock().unwrap().is_empty());

        let users = group.entity("user").unwrap();
        assert!(!users.is_read_only());
        users.save(vec![json!({"name": "Bob"})]).await.unwrap();
    }

    #[test]
    fn test_with_read_only_rejects_undeclared_entity() {
        let err = RepositoryGroup::<MockProvider>::new(MockConfig::default(), ["user"], None)
            .unwrap()
            .with_read_only(["ghost"])
            .unwrap_err();
        assert_eq!(err, RepositoryError::UnknownEntity("ghost".into()));
    }
}
