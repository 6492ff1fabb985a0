use std::fmt::Display;

use trail_meta::{Inspect, ManagedClassRegistry};
use trail_types::{FragmentPath, GlobalId};

use crate::error::{TrailError, TrailResult};

/// Builds global ids for history queries from Rust types.
///
/// Class names come from the registry, so `instance::<Person>("bob")` is
/// `Person/bob` whatever the Rust path of `Person` is.
pub struct IdBuilder<'t> {
    registry: &'t ManagedClassRegistry,
    dot_replacement: &'t str,
}

impl<'t> IdBuilder<'t> {
    pub(crate) fn new(registry: &'t ManagedClassRegistry, dot_replacement: &'t str) -> Self {
        Self {
            registry,
            dot_replacement,
        }
    }

    /// `InstanceId` of the entity `T` with the given id value.
    pub fn instance<T: Inspect>(&self, id: impl Display) -> TrailResult<GlobalId> {
        let class = self.registry.managed_class_of::<T>()?;
        if !class.is_entity() {
            return Err(TrailError::WrongManagedKind {
                class: class.name().to_string(),
                expected: "an entity",
            });
        }
        Ok(GlobalId::instance(class.name(), id.to_string()))
    }

    /// Id of a standalone value object of type `T`.
    pub fn unbounded_value_object<T: Inspect>(&self) -> TrailResult<GlobalId> {
        let class = self.registry.managed_class_of::<T>()?;
        if class.is_entity() {
            return Err(TrailError::WrongManagedKind {
                class: class.name().to_string(),
                expected: "a value object",
            });
        }
        Ok(GlobalId::unbounded(class.name()))
    }

    /// Id of the value object found at `path` under `owner`, e.g.
    /// `address` or `lines[2]`.
    pub fn value_object(&self, owner: GlobalId, path: &str) -> GlobalId {
        GlobalId::value_object(owner, FragmentPath::from_normalized(path))
    }

    /// Id of the value object stored under `key` in the map property `property`.
    pub fn map_entry(&self, owner: GlobalId, property: &str, key: &str) -> GlobalId {
        let path = FragmentPath::new(property).map_key(key, self.dot_replacement);
        GlobalId::value_object(owner, path)
    }
}
