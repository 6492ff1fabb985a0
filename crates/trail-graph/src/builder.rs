//! Live object graph traversal.
//!
//! The builder walks a graph depth-first from its root and flattens it into
//! an arena of [`ObjectNode`]s indexed by [`GlobalId`]. Edges are stored as
//! references to global ids, so cycles in the live graph become plain ids.

use std::any::Any;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use trail_meta::{Inspect, Live, ManagedClass, ManagedClassRegistry};
use trail_types::{canonical_key, FragmentPath, GlobalId, ManagedType, PropertyValue, SnapshotState};

use crate::error::{GraphError, GraphResult};

/// Default substitute for `.` inside map keys used as path fragments.
pub const DEFAULT_DOT_REPLACEMENT: &str = "-";

/// One entity or value object reached from the root.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectNode {
    pub global_id: GlobalId,
    pub managed_type: ManagedType,
    /// Supported properties in declaration order.
    pub state: SnapshotState,
}

/// A reference from one node's property to another node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edge {
    pub from: GlobalId,
    pub property: String,
    pub to: GlobalId,
}

/// A flattened object graph, nodes in traversal order, root first.
#[derive(Clone, Debug)]
pub struct ObjectGraph {
    nodes: Vec<ObjectNode>,
    index: HashMap<GlobalId, usize>,
}

impl ObjectGraph {
    /// The node the traversal started from.
    pub fn root(&self) -> &ObjectNode {
        &self.nodes[0]
    }

    pub fn nodes(&self) -> &[ObjectNode] {
        &self.nodes
    }

    pub fn node(&self, global_id: &GlobalId) -> Option<&ObjectNode> {
        self.index.get(global_id).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, global_id: &GlobalId) -> bool {
        self.index.contains_key(global_id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn global_ids(&self) -> impl Iterator<Item = &GlobalId> {
        self.nodes.iter().map(|n| &n.global_id)
    }

    /// All references between nodes, in traversal order.
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges = Vec::new();
        for node in &self.nodes {
            for (property, value) in node.state.iter() {
                for target in value.references() {
                    edges.push(Edge {
                        from: node.global_id.clone(),
                        property: property.to_string(),
                        to: target.clone(),
                    });
                }
            }
        }
        edges
    }

    /// Consume the graph, yielding its nodes in traversal order.
    pub fn into_nodes(self) -> Vec<ObjectNode> {
        self.nodes
    }
}

/// Traversal state of one build.
#[derive(Default)]
struct Arena {
    nodes: Vec<ObjectNode>,
    index: HashMap<GlobalId, usize>,
    /// Stop at entities, only value objects are walked.
    shallow: bool,
}

impl Arena {
    /// Reserve a slot for `global_id`, `None` if it was already visited.
    fn claim(&mut self, global_id: &GlobalId, managed_type: &ManagedType) -> Option<usize> {
        if self.index.contains_key(global_id) {
            return None;
        }
        let slot = self.nodes.len();
        self.nodes.push(ObjectNode {
            global_id: global_id.clone(),
            managed_type: managed_type.clone(),
            state: SnapshotState::new(),
        });
        self.index.insert(global_id.clone(), slot);
        Some(slot)
    }
}

/// Builds [`ObjectGraph`]s from live values using a class registry.
pub struct ObjectGraphBuilder<'r> {
    registry: &'r ManagedClassRegistry,
    dot_replacement: String,
}

impl<'r> ObjectGraphBuilder<'r> {
    pub fn new(registry: &'r ManagedClassRegistry) -> Self {
        Self {
            registry,
            dot_replacement: DEFAULT_DOT_REPLACEMENT.to_string(),
        }
    }

    /// Substitute for `.` inside map keys used as path fragments.
    pub fn with_dot_replacement(mut self, replacement: impl Into<String>) -> Self {
        self.dot_replacement = replacement.into();
        self
    }

    /// Walk the graph reachable from `root`.
    pub fn build<T: Inspect>(&self, root: &T) -> GraphResult<ObjectGraph> {
        self.registry.mapper().map(&T::declared_type())?;
        match root.inspect() {
            Live::Object(object) => self.build_dyn(object),
            _ => Err(GraphError::RootNotManaged {
                type_name: std::any::type_name::<T>().to_string(),
            }),
        }
    }

    /// Walk the graph reachable from a type-erased root.
    ///
    /// The root's class must already be known to the registry's mapper.
    pub fn build_dyn(&self, root: &dyn Any) -> GraphResult<ObjectGraph> {
        let class = self.runtime_class(root)?;
        let global_id = self.global_id_with(root, &class)?;

        let mut arena = Arena::default();
        self.visit(&mut arena, root, &class, &global_id)?;
        debug!(root = %global_id, nodes = arena.nodes.len(), "built object graph");
        Ok(ObjectGraph {
            nodes: arena.nodes,
            index: arena.index,
        })
    }

    /// Global id of a managed object, without walking its properties.
    pub fn global_id_of(&self, object: &dyn Any) -> GraphResult<GlobalId> {
        let class = self.runtime_class(object)?;
        self.global_id_with(object, &class)
    }

    fn runtime_class(&self, object: &dyn Any) -> GraphResult<Arc<ManagedClass>> {
        let not_managed = || GraphError::RootNotManaged {
            type_name: format!("{:?}", object.type_id()),
        };
        match self.registry.managed_class_at_runtime(object.type_id()) {
            Ok(Some(class)) => Ok(class),
            Ok(None) | Err(trail_meta::MetaError::TypeNotMapped { .. }) => Err(not_managed()),
            Err(e) => Err(e.into()),
        }
    }

    fn global_id_with(&self, object: &dyn Any, class: &ManagedClass) -> GraphResult<GlobalId> {
        if class.is_entity() {
            self.instance_id(object, class)
        } else {
            Ok(GlobalId::unbounded(class.name()))
        }
    }

    fn visit(
        &self,
        arena: &mut Arena,
        object: &dyn Any,
        class: &ManagedClass,
        global_id: &GlobalId,
    ) -> GraphResult<()> {
        let Some(slot) = arena.claim(global_id, class.managed_type()) else {
            return Ok(());
        };
        for property in class.properties() {
            let live = class.read(property, object)?;
            let path = FragmentPath::new(property.name());
            let value = self.resolve(arena, class, property.name(), global_id, &path, live)?;
            arena.nodes[slot].state.insert(property.name(), value);
        }
        Ok(())
    }

    /// Turn a live value into a property value, visiting managed objects.
    fn resolve(
        &self,
        arena: &mut Arena,
        class: &ManagedClass,
        property: &str,
        owner: &GlobalId,
        path: &FragmentPath,
        live: Live<'_>,
    ) -> GraphResult<PropertyValue> {
        match live {
            Live::Null | Live::Value(Value::Null) => Ok(PropertyValue::Null),
            Live::Value(value) => Ok(PropertyValue::Value(value)),
            Live::Object(object) => {
                match self.registry.managed_class_at_runtime(object.type_id())? {
                    Some(target) => {
                        let target_id = if target.is_entity() {
                            self.instance_id(object, &target)?
                        } else {
                            owner.child(path)
                        };
                        if !(arena.shallow && target.is_entity()) {
                            self.visit(arena, object, &target, &target_id)?;
                        }
                        Ok(PropertyValue::Reference(target_id))
                    }
                    None => Ok(PropertyValue::Value(
                        self.registry.mapper().encode_value(object)?,
                    )),
                }
            }
            Live::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for (i, item) in items.into_iter().enumerate() {
                    values.push(self.resolve(arena, class, property, owner, &path.index(i), item)?);
                }
                Ok(PropertyValue::List(values))
            }
            Live::Set(items) => {
                // Value objects inside a set are addressed by position, so the
                // position must follow content and not iteration order.
                let mut keyed = Vec::with_capacity(items.len());
                for item in items {
                    let key = self.content_key(class, property, owner, path, item.clone())?;
                    keyed.push((key, item));
                }
                keyed.sort_by(|a, b| a.0.cmp(&b.0));

                let mut values = Vec::with_capacity(keyed.len());
                for (i, (_, item)) in keyed.into_iter().enumerate() {
                    values.push(self.resolve(arena, class, property, owner, &path.index(i), item)?);
                }
                Ok(PropertyValue::Set(values))
            }
            Live::Map(entries) => {
                let mut values = std::collections::BTreeMap::new();
                for (key, value) in entries {
                    let key = self.map_key(class, property, key)?;
                    let entry_path = path.map_key(&key, &self.dot_replacement);
                    let value = self.resolve(arena, class, property, owner, &entry_path, value)?;
                    values.insert(key, value);
                }
                Ok(PropertyValue::Map(values))
            }
        }
    }

    /// Sort key of a set element that does not depend on where it sits.
    ///
    /// The element is resolved into a scratch arena at a fixed position and
    /// keyed by its value plus the state of every value object below it.
    /// Entities are not walked, their ids already identify them.
    fn content_key(
        &self,
        class: &ManagedClass,
        property: &str,
        owner: &GlobalId,
        path: &FragmentPath,
        item: Live<'_>,
    ) -> GraphResult<String> {
        let mut scratch = Arena {
            shallow: true,
            ..Arena::default()
        };
        let value = self.resolve(&mut scratch, class, property, owner, &path.index(0), item)?;
        let mut key = value.to_string();
        for node in scratch.nodes.iter().filter(|n| n.global_id.is_value_object()) {
            let _ = write!(key, "\u{1f}{}", node.global_id);
            for (name, value) in node.state.iter() {
                let _ = write!(key, "\u{1e}{name}={value}");
            }
        }
        Ok(key)
    }

    fn map_key(&self, class: &ManagedClass, property: &str, key: Live<'_>) -> GraphResult<String> {
        let unsupported = || GraphError::UnsupportedMapKey {
            class: class.name().to_string(),
            property: property.to_string(),
        };
        match key {
            Live::Value(value) if !value.is_null() => Ok(canonical_key(&value)),
            Live::Object(object) => {
                if self.registry.managed_class_at_runtime(object.type_id())?.is_some() {
                    return Err(unsupported());
                }
                let encoded = self
                    .registry
                    .mapper()
                    .encode_value(object)
                    .map_err(|_| unsupported())?;
                Ok(canonical_key(&encoded))
            }
            _ => Err(unsupported()),
        }
    }

    /// `InstanceId` of an entity, from its id property.
    fn instance_id(&self, object: &dyn Any, class: &ManagedClass) -> GraphResult<GlobalId> {
        let class_name = class.name().to_string();
        let id_property = class.id_property().ok_or_else(|| GraphError::UnsupportedId {
            class: class_name.clone(),
            reason: "entity has no id property".into(),
        })?;

        let raw = match class.read(id_property, object)? {
            Live::Null | Live::Value(Value::Null) => {
                return Err(GraphError::EntityIdIsNull { class: class_name })
            }
            Live::Value(value) => canonical_key(&value),
            Live::Object(id) => match self.registry.managed_class_at_runtime(id.type_id())? {
                Some(id_class) if id_class.is_entity() => {
                    self.instance_id(id, &id_class)?.to_string()
                }
                Some(_) => {
                    return Err(GraphError::UnsupportedId {
                        class: class_name,
                        reason: "value object used as id".into(),
                    })
                }
                None => canonical_key(&self.registry.mapper().encode_value(id)?),
            },
            Live::List(_) | Live::Set(_) | Live::Map(_) => {
                return Err(GraphError::UnsupportedId {
                    class: class_name,
                    reason: "container used as id".into(),
                })
            }
        };
        if raw.is_empty() {
            return Err(GraphError::EntityIdIsNull { class: class_name });
        }
        Ok(GlobalId::instance(class.name(), raw))
    }
}

impl std::fmt::Debug for ObjectGraphBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectGraphBuilder")
            .field("dot_replacement", &self.dot_replacement)
            .finish()
    }
}
