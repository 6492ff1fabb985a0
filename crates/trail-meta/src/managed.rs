//! Entities and value objects with their resolved property lists.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::debug;
use trail_types::{ManagedKind, ManagedType};

use crate::class_def::{MemberKind, Reader};
use crate::error::{MetaError, MetaResult};
use crate::inspect::{Inspect, Live};
use crate::mapper::{MappedType, Registration, TypeMapper};
use crate::scanner::PropertyScanner;
use crate::type_ref::ClassRef;

/// A supported property of a managed class.
#[derive(Clone)]
pub struct Property {
    name: String,
    member: MemberKind,
    mapped: MappedType,
    is_id: bool,
    reader: Arc<dyn Reader>,
}

impl Property {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the property comes from a field or a getter.
    pub fn member_kind(&self) -> MemberKind {
        self.member
    }

    pub fn mapped_type(&self) -> &MappedType {
        &self.mapped
    }

    pub fn is_id(&self) -> bool {
        self.is_id
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("member", &self.member)
            .field("mapped", &self.mapped)
            .field("is_id", &self.is_id)
            .finish()
    }
}

/// An entity or value object known to the engine.
#[derive(Debug)]
pub struct ManagedClass {
    class: ClassRef,
    managed_type: ManagedType,
    properties: Vec<Property>,
    id_index: Option<usize>,
}

impl ManagedClass {
    pub fn class(&self) -> ClassRef {
        self.class
    }

    pub fn name(&self) -> &str {
        &self.managed_type.name
    }

    pub fn kind(&self) -> ManagedKind {
        self.managed_type.kind
    }

    pub fn managed_type(&self) -> &ManagedType {
        &self.managed_type
    }

    pub fn is_entity(&self) -> bool {
        self.managed_type.kind == ManagedKind::Entity
    }

    /// Supported properties, in declaration order.
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// The id property of an entity.
    pub fn id_property(&self) -> Option<&Property> {
        self.id_index.map(|i| &self.properties[i])
    }

    /// Read `property` from `target`, which must be an instance of this class.
    pub fn read<'a>(&self, property: &Property, target: &'a dyn Any) -> MetaResult<Live<'a>> {
        property
            .reader
            .read(target)
            .ok_or_else(|| MetaError::TargetMismatch {
                class: self.name().to_string(),
                property: property.name.clone(),
            })
    }
}

/// Cache of managed classes, built on first demand.
///
/// Concurrent first requests for the same class may both build it; the first
/// one to insert wins and the other result is dropped.
pub struct ManagedClassRegistry {
    mapper: TypeMapper,
    scanner: PropertyScanner,
    cache: RwLock<HashMap<TypeId, Arc<ManagedClass>>>,
}

impl ManagedClassRegistry {
    pub fn new(mapper: TypeMapper, scanner: PropertyScanner) -> Self {
        Self {
            mapper,
            scanner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn mapper(&self) -> &TypeMapper {
        &self.mapper
    }

    pub fn scanner(&self) -> &PropertyScanner {
        &self.scanner
    }

    /// The managed class of `T`.
    pub fn managed_class_of<T: Inspect>(&self) -> MetaResult<Arc<ManagedClass>> {
        self.managed_class(&ClassRef::of::<T>())
    }

    /// The managed class of `class`. Fails if it maps to anything other than
    /// an entity or a value object.
    pub fn managed_class(&self, class: &ClassRef) -> MetaResult<Arc<ManagedClass>> {
        if let Some(cached) = self.cached(class.type_id()) {
            return Ok(cached);
        }
        let kind = match self.mapper.map_class(class)? {
            MappedType::Entity(_) => ManagedKind::Entity,
            MappedType::ValueObject(_) => ManagedKind::ValueObject,
            _ => {
                return Err(MetaError::TypeNotMapped {
                    type_name: class.rust_name().to_string(),
                })
            }
        };
        let built = Arc::new(self.build(class, kind)?);
        match self.cache.write() {
            Ok(mut cache) => Ok(Arc::clone(cache.entry(class.type_id()).or_insert(built))),
            Err(_) => Ok(built),
        }
    }

    /// Managed class of a live object, if its runtime type is managed.
    pub fn managed_class_at_runtime(&self, type_id: TypeId) -> MetaResult<Option<Arc<ManagedClass>>> {
        if let Some(cached) = self.cached(type_id) {
            return Ok(Some(cached));
        }
        match self.mapper.map_runtime(type_id)? {
            MappedType::Entity(class) | MappedType::ValueObject(class) => {
                self.managed_class(&class).map(Some)
            }
            _ => Ok(None),
        }
    }

    fn cached(&self, type_id: TypeId) -> Option<Arc<ManagedClass>> {
        self.cache
            .read()
            .ok()
            .and_then(|cache| cache.get(&type_id).cloned())
    }

    fn build(&self, class: &ClassRef, kind: ManagedKind) -> MetaResult<ManagedClass> {
        let def = self.mapper.class_def(class)?;
        let name = def.name();
        if name.is_empty() || name.contains('/') || name.contains('#') {
            return Err(MetaError::InvalidClassName(name.to_string()));
        }

        let mut properties = Vec::new();
        let mut flagged = Vec::new();
        for scanned in self.scanner.scan(&def) {
            let mapped = self.mapper.map(scanned.member.declared_type())?;
            if let MappedType::Map { key, .. } = &mapped {
                if !key.is_scalar() {
                    debug!(class = name, property = %scanned.name, "skipping map property with non-scalar keys");
                    continue;
                }
            }
            flagged.push(scanned.member.is_id());
            properties.push(Property {
                name: scanned.name,
                member: scanned.member.kind(),
                mapped,
                is_id: false,
                reader: scanned.member.reader(),
            });
        }

        let id_index = match kind {
            ManagedKind::Entity => Some(self.resolve_id(class, name, &properties, &flagged)?),
            ManagedKind::ValueObject => None,
        };
        if let Some(index) = id_index {
            properties[index].is_id = true;
        }

        debug!(
            class = name,
            %kind,
            properties = properties.len(),
            "built managed class"
        );
        Ok(ManagedClass {
            class: *class,
            managed_type: ManagedType {
                kind,
                name: name.to_string(),
            },
            properties,
            id_index,
        })
    }

    fn resolve_id(
        &self,
        class: &ClassRef,
        name: &str,
        properties: &[Property],
        flagged: &[bool],
    ) -> MetaResult<usize> {
        if let Some(Registration::Entity {
            id_property: Some(id_name),
        }) = self.mapper.registration(class.type_id())
        {
            return properties
                .iter()
                .position(|p| p.name == *id_name)
                .ok_or_else(|| MetaError::PropertyNotFound {
                    class: name.to_string(),
                    property: id_name.clone(),
                });
        }

        let predicate = self.mapper.id_predicate();
        let candidates: Vec<usize> = properties
            .iter()
            .zip(flagged)
            .enumerate()
            .filter(|(_, (property, is_flagged))| {
                **is_flagged || predicate.is_some_and(|p| p(name, &property.name))
            })
            .map(|(i, _)| i)
            .collect();

        match candidates.as_slice() {
            [single] => Ok(*single),
            _ => Err(MetaError::EntityWithoutId {
                class: name.to_string(),
                found: candidates.len(),
            }),
        }
    }
}

impl fmt::Debug for ManagedClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cached = self.cache.read().map(|c| c.len()).unwrap_or(0);
        f.debug_struct("ManagedClassRegistry")
            .field("mapper", &self.mapper)
            .field("scanner", &self.scanner)
            .field("cached", &cached)
            .finish()
    }
}
