use std::any::Any;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};
use trail_changelog::ChangeProcessor;
use trail_diff::{Change, Diff, Differ, SnapshotSet};
use trail_graph::{ObjectGraph, ObjectGraphBuilder};
use trail_ledger::{CommitLog, HistoryValidator, ValidationReport};
use trail_meta::{
    Inspect, Live, ManagedClassRegistry, MappingStyle, MetaError, PropertyScanner, TypeMapper,
};
use trail_store::{InMemoryRepository, SnapshotRepository};
use trail_types::{CdoSnapshot, Commit, GlobalId};

use crate::config::TrailConfig;
use crate::error::{TrailError, TrailResult};
use crate::id::IdBuilder;
use crate::json::JsonConverter;

/// Entry point: compares object graphs, commits them and answers history
/// queries.
///
/// ```ignore
/// let trail = Trail::builder().register_entity::<Person>(Some("id")).build()?;
/// let diff = trail.compare(&old_bob, &new_bob)?;
/// trail.commit("alice", &new_bob)?;
/// ```
pub struct Trail {
    registry: ManagedClassRegistry,
    config: TrailConfig,
    differ: Differ,
    log: CommitLog,
}

impl Trail {
    pub fn builder() -> TrailBuilder {
        TrailBuilder::new()
    }

    // ---- Diff operations ----

    /// Changes turning the graph of `left` into the graph of `right`.
    pub fn compare<L: Inspect, R: Inspect>(&self, left: &L, right: &R) -> TrailResult<Diff> {
        let left = self.snapshot_set(self.graph(left)?);
        let right = self.snapshot_set(self.graph(right)?);
        let diff = self.differ.compare(&left, &right);
        debug!(changes = diff.len(), "compared object graphs");
        Ok(diff)
    }

    /// Changes from nothing to the graph of `object`.
    pub fn initial<T: Inspect>(&self, object: &T) -> TrailResult<Diff> {
        let right = self.snapshot_set(self.graph(object)?);
        Ok(self.differ.compare(&SnapshotSet::new(), &right))
    }

    // ---- Commit operations ----

    pub fn commit<T: Inspect>(&self, author: &str, object: &T) -> TrailResult<Commit> {
        let graph = self.graph(object)?;
        Ok(self.log.commit(author, &graph)?)
    }

    /// Mark `object` as deleted without touching the objects it references.
    pub fn commit_shallow_delete<T: Inspect>(&self, author: &str, object: &T) -> TrailResult<Commit> {
        let not_managed = || TrailError::NotInstanceNorId(std::any::type_name::<T>().to_string());
        match self.registry.mapper().map(&T::declared_type()) {
            Ok(_) => {}
            Err(MetaError::TypeNotMapped { .. }) => return Err(not_managed()),
            Err(e) => return Err(e.into()),
        }
        match object.inspect() {
            Live::Object(target) => self.shallow_delete_object(author, target),
            _ => Err(not_managed()),
        }
    }

    pub fn commit_shallow_delete_by_id(&self, author: &str, global_id: &GlobalId) -> TrailResult<Commit> {
        Ok(self.log.commit_shallow_delete(author, global_id, None)?)
    }

    /// Shallow delete of either a [`GlobalId`] or a managed object whose
    /// class the engine has already seen.
    pub fn commit_shallow_delete_any(&self, author: &str, target: &dyn Any) -> TrailResult<Commit> {
        match target.downcast_ref::<GlobalId>() {
            Some(global_id) => self.commit_shallow_delete_by_id(author, global_id),
            None => self.shallow_delete_object(author, target),
        }
    }

    fn shallow_delete_object(&self, author: &str, target: &dyn Any) -> TrailResult<Commit> {
        let class = match self.registry.managed_class_at_runtime(target.type_id()) {
            Ok(Some(class)) => class,
            Ok(None) | Err(MetaError::TypeNotMapped { .. }) => {
                return Err(TrailError::NotInstanceNorId(format!("{:?}", target.type_id())))
            }
            Err(e) => return Err(e.into()),
        };
        let global_id = self.graph_builder().global_id_of(target)?;
        Ok(self
            .log
            .commit_shallow_delete(author, &global_id, Some(class.managed_type().clone()))?)
    }

    // ---- History queries ----

    /// Up to `limit` snapshots of `global_id`, newest first.
    pub fn get_state_history(&self, global_id: &GlobalId, limit: usize) -> TrailResult<Vec<CdoSnapshot>> {
        Ok(self.log.get_state_history(global_id, limit)?)
    }

    pub fn get_latest_snapshot(&self, global_id: &GlobalId) -> TrailResult<Option<CdoSnapshot>> {
        Ok(self.log.get_latest_snapshot(global_id)?)
    }

    /// Changes between consecutive snapshots of `global_id`, newest first.
    pub fn get_change_history(&self, global_id: &GlobalId, limit: usize) -> TrailResult<Vec<Change>> {
        Ok(self.log.get_change_history(global_id, limit)?)
    }

    pub fn validate_history(&self, global_id: &GlobalId) -> TrailResult<ValidationReport> {
        Ok(HistoryValidator::validate_history(
            self.log.repository().as_ref(),
            global_id,
        )?)
    }

    pub fn process_change_list<P: ChangeProcessor>(&self, changes: &[Change], processor: P) -> P::Output {
        trail_changelog::process_change_list(changes, processor)
    }

    // ---- Helpers and accessors ----

    pub fn global_id_of<T: Inspect>(&self, object: &T) -> TrailResult<GlobalId> {
        Ok(self.graph(object)?.root().global_id.clone())
    }

    pub fn id_builder(&self) -> IdBuilder<'_> {
        IdBuilder::new(&self.registry, &self.config.map_key_dot_replacement)
    }

    pub fn json(&self) -> JsonConverter {
        JsonConverter
    }

    pub fn config(&self) -> &TrailConfig {
        &self.config
    }

    pub fn registry(&self) -> &ManagedClassRegistry {
        &self.registry
    }

    pub fn repository(&self) -> &Arc<dyn SnapshotRepository> {
        self.log.repository()
    }

    fn graph_builder(&self) -> ObjectGraphBuilder<'_> {
        ObjectGraphBuilder::new(&self.registry).with_dot_replacement(&self.config.map_key_dot_replacement)
    }

    fn graph<T: Inspect>(&self, root: &T) -> TrailResult<ObjectGraph> {
        Ok(self.graph_builder().build(root)?)
    }

    fn snapshot_set(&self, graph: ObjectGraph) -> SnapshotSet {
        graph
            .into_nodes()
            .into_iter()
            .map(|node| (node.global_id, node.state))
            .collect()
    }
}

impl std::fmt::Debug for Trail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trail")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Collects registrations and settings for a [`Trail`].
///
/// Registrations must happen here: the class registry is read-only once
/// the engine is built.
pub struct TrailBuilder {
    mapper: TypeMapper,
    config: TrailConfig,
    repository: Option<Arc<dyn SnapshotRepository>>,
}

impl TrailBuilder {
    pub fn new() -> Self {
        Self {
            mapper: TypeMapper::new(),
            config: TrailConfig::default(),
            repository: None,
        }
    }

    /// Register `T` as an entity; without `id_property` the id is the member
    /// marked as id or matched by the id predicate.
    pub fn register_entity<T: Inspect>(mut self, id_property: Option<&str>) -> Self {
        self.mapper.register_entity::<T>(id_property);
        self
    }

    pub fn register_value_object<T: Inspect>(mut self) -> Self {
        self.mapper.register_value_object::<T>();
        self
    }

    /// Register `T` as an opaque value, compared through its serde form.
    pub fn register_value<T: Inspect + Serialize>(mut self) -> Self {
        self.mapper.register_value::<T>();
        self
    }

    /// Replace all settings at once, e.g. with a config loaded from TOML.
    pub fn config(mut self, config: TrailConfig) -> Self {
        self.config = config;
        self
    }

    pub fn mapping_style(mut self, style: MappingStyle) -> Self {
        self.config.mapping_style = style;
        self
    }

    pub fn new_object_snapshot(mut self, enabled: bool) -> Self {
        self.config.new_object_snapshot = enabled;
        self
    }

    pub fn map_key_dot_replacement(mut self, replacement: impl Into<String>) -> Self {
        self.config.map_key_dot_replacement = replacement.into();
        self
    }

    pub fn strict_mapping(mut self, strict: bool) -> Self {
        self.config.strict_mapping = strict;
        self
    }

    /// Id detection for classes without an explicit id: called with the
    /// class name and a property name.
    pub fn id_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str, &str) -> bool + Send + Sync + 'static,
    {
        self.mapper = self.mapper.with_id_predicate(predicate);
        self
    }

    /// Storage port for commits; an in-memory repository by default.
    pub fn repository(mut self, repository: Arc<dyn SnapshotRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn build(self) -> TrailResult<Trail> {
        self.config.validate()?;
        let config = self.config;
        let mapper = self.mapper.with_strict_mapping(config.strict_mapping);
        let registry = ManagedClassRegistry::new(mapper, PropertyScanner::new(config.mapping_style));
        let differ = Differ::new().with_new_object_snapshot(config.new_object_snapshot);
        let repository = self
            .repository
            .unwrap_or_else(|| Arc::new(InMemoryRepository::new()));
        let log = CommitLog::new(repository).with_differ(differ);

        info!(
            mapping_style = ?config.mapping_style,
            new_object_snapshot = config.new_object_snapshot,
            strict_mapping = config.strict_mapping,
            "trail engine ready"
        );
        Ok(Trail {
            registry,
            config,
            differ,
            log,
        })
    }
}

impl Default for TrailBuilder {
    fn default() -> Self {
        Self::new()
    }
}
