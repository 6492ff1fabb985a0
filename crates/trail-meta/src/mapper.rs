//! Classification of declared types into managed, value, primitive and
//! container types.

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::{debug, warn};

use crate::class_def::ClassDef;
use crate::error::{MetaError, MetaResult};
use crate::inspect::Inspect;
use crate::type_ref::{ClassRef, PrimitiveKind, TypeRef};

/// Decides whether a property identifies its class, given
/// `(class name, property name)`.
pub type IdPredicate = Arc<dyn Fn(&str, &str) -> bool + Send + Sync>;

/// Shape of an ordered or unordered container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    List,
    Array,
    Set,
}

/// A declared type after classification.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MappedType {
    Entity(ClassRef),
    ValueObject(ClassRef),
    /// Opaque leaf compared by equality.
    Value(ClassRef),
    Primitive(PrimitiveKind),
    Container {
        kind: ContainerKind,
        element: Box<MappedType>,
    },
    Map {
        key: Box<MappedType>,
        value: Box<MappedType>,
    },
}

impl MappedType {
    pub fn is_managed(&self) -> bool {
        matches!(self, Self::Entity(_) | Self::ValueObject(_))
    }

    /// Primitives and values, the only types allowed as map keys.
    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Primitive(_) | Self::Value(_))
    }

    /// Element type of a container, the value type of a map.
    pub fn element(&self) -> Option<&MappedType> {
        match self {
            Self::Container { element, .. } => Some(element),
            Self::Map { value, .. } => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for MappedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity(c) => write!(f, "Entity({})", c.rust_name()),
            Self::ValueObject(c) => write!(f, "ValueObject({})", c.rust_name()),
            Self::Value(c) => write!(f, "Value({})", c.rust_name()),
            Self::Primitive(kind) => write!(f, "Primitive({kind})"),
            Self::Container { kind, element } => write!(f, "{kind:?}<{element}>"),
            Self::Map { key, value } => write!(f, "Map<{key}, {value}>"),
        }
    }
}

/// Converts instances of a registered value type to an opaque JSON value.
pub trait ValueCodec: Send + Sync {
    fn encode(&self, target: &dyn Any) -> MetaResult<serde_json::Value>;
}

struct SerdeCodec<T>(PhantomData<fn() -> T>);

impl<T: Serialize + Any> ValueCodec for SerdeCodec<T> {
    fn encode(&self, target: &dyn Any) -> MetaResult<serde_json::Value> {
        let value = target
            .downcast_ref::<T>()
            .ok_or_else(|| MetaError::TargetMismatch {
                class: std::any::type_name::<T>().to_string(),
                property: "<value>".into(),
            })?;
        serde_json::to_value(value).map_err(|e| MetaError::Serialization(e.to_string()))
    }
}

/// How a class was explicitly registered.
#[derive(Clone)]
pub enum Registration {
    Entity { id_property: Option<String> },
    ValueObject,
    Value(Arc<dyn ValueCodec>),
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity { id_property } => f
                .debug_struct("Entity")
                .field("id_property", id_property)
                .finish(),
            Self::ValueObject => f.write_str("ValueObject"),
            Self::Value(_) => f.write_str("Value"),
        }
    }
}

/// Maps declared types to [`MappedType`]s.
///
/// Classification order:
/// 1. explicit registration (entity, value object, value),
/// 2. primitives,
/// 3. containers and maps (their element types are mapped too),
/// 4. described classes: an entity if a member is marked as id (or matches
///    the id predicate), otherwise a value object, with a warning,
/// 5. anything else is not mapped.
///
/// Class descriptions are fetched once and cached. Registration happens
/// before the mapper is shared; the caches are safe for concurrent use.
pub struct TypeMapper {
    registrations: HashMap<TypeId, (ClassRef, Registration)>,
    id_predicate: Option<IdPredicate>,
    strict: bool,
    defs: RwLock<HashMap<TypeId, Arc<ClassDef>>>,
    seen: RwLock<HashMap<TypeId, ClassRef>>,
    warned: RwLock<HashSet<TypeId>>,
}

impl TypeMapper {
    pub fn new() -> Self {
        Self {
            registrations: HashMap::new(),
            id_predicate: None,
            strict: false,
            defs: RwLock::new(HashMap::new()),
            seen: RwLock::new(HashMap::new()),
            warned: RwLock::new(HashSet::new()),
        }
    }

    /// Fail instead of defaulting unregistered classes to value objects.
    pub fn with_strict_mapping(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_id_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str, &str) -> bool + Send + Sync + 'static,
    {
        self.id_predicate = Some(Arc::new(predicate));
        self
    }

    pub fn register_entity<T: Inspect>(&mut self, id_property: Option<&str>) {
        self.register(
            ClassRef::of::<T>(),
            Registration::Entity {
                id_property: id_property.map(str::to_string),
            },
        );
    }

    pub fn register_value_object<T: Inspect>(&mut self) {
        self.register(ClassRef::of::<T>(), Registration::ValueObject);
    }

    pub fn register_value<T: Inspect + Serialize>(&mut self) {
        self.register(
            ClassRef::of::<T>(),
            Registration::Value(Arc::new(SerdeCodec::<T>(PhantomData))),
        );
    }

    pub fn register(&mut self, class: ClassRef, registration: Registration) {
        debug!(class = class.rust_name(), ?registration, "registering class");
        self.registrations
            .insert(class.type_id(), (class, registration));
    }

    pub fn registration(&self, type_id: TypeId) -> Option<&Registration> {
        self.registrations.get(&type_id).map(|(_, r)| r)
    }

    pub fn id_predicate(&self) -> Option<&IdPredicate> {
        self.id_predicate.as_ref()
    }

    /// Map a declared type.
    pub fn map(&self, declared: &TypeRef) -> MetaResult<MappedType> {
        match declared {
            TypeRef::Primitive(kind) => Ok(MappedType::Primitive(*kind)),
            TypeRef::Class(class) => self.map_class(class),
            TypeRef::List(element) => self.container(ContainerKind::List, element),
            TypeRef::Array(element) => self.container(ContainerKind::Array, element),
            TypeRef::Set(element) => self.container(ContainerKind::Set, element),
            TypeRef::Map(key, value) => Ok(MappedType::Map {
                key: Box::new(self.map(key)?),
                value: Box::new(self.map(value)?),
            }),
            TypeRef::Unknown => Err(MetaError::TypeNotMapped {
                type_name: declared.to_string(),
            }),
        }
    }

    fn container(&self, kind: ContainerKind, element: &TypeRef) -> MetaResult<MappedType> {
        let element = self.map(element).map_err(|e| match e {
            MetaError::TypeNotMapped { type_name } => MetaError::TypeNotMapped {
                type_name: format!("{kind:?}<{type_name}>"),
            },
            other => other,
        })?;
        Ok(MappedType::Container {
            kind,
            element: Box::new(element),
        })
    }

    /// Map a class, by registration first and by its description otherwise.
    pub fn map_class(&self, class: &ClassRef) -> MetaResult<MappedType> {
        self.remember(class);
        if let Some((_, registration)) = self.registrations.get(&class.type_id()) {
            return Ok(match registration {
                Registration::Entity { .. } => MappedType::Entity(*class),
                Registration::ValueObject => MappedType::ValueObject(*class),
                Registration::Value(_) => MappedType::Value(*class),
            });
        }

        let def = self.class_def(class).map_err(|_| MetaError::TypeNotMapped {
            type_name: class.rust_name().to_string(),
        })?;
        if self.has_id_member(&def) {
            return Ok(MappedType::Entity(*class));
        }
        if self.strict {
            return Err(MetaError::TypeNotMapped {
                type_name: class.rust_name().to_string(),
            });
        }
        self.warn_default(class, def.name());
        Ok(MappedType::ValueObject(*class))
    }

    /// Classify a live object by its runtime type.
    ///
    /// Only classes that were registered or reached through a declared type
    /// are known at runtime.
    pub fn map_runtime(&self, type_id: TypeId) -> MetaResult<MappedType> {
        let class = self.lookup(type_id).ok_or_else(|| MetaError::TypeNotMapped {
            type_name: format!("{type_id:?}"),
        })?;
        self.map_class(&class)
    }

    pub fn lookup(&self, type_id: TypeId) -> Option<ClassRef> {
        if let Some((class, _)) = self.registrations.get(&type_id) {
            return Some(*class);
        }
        self.seen
            .read()
            .ok()
            .and_then(|seen| seen.get(&type_id).copied())
    }

    /// The description of `class`, fetched once and then cached.
    pub fn class_def(&self, class: &ClassRef) -> MetaResult<Arc<ClassDef>> {
        if let Some(def) = self
            .defs
            .read()
            .ok()
            .and_then(|defs| defs.get(&class.type_id()).cloned())
        {
            return Ok(def);
        }
        let def = class.describe().ok_or_else(|| MetaError::ClassNotDescribed {
            type_name: class.rust_name().to_string(),
        })?;
        let def = Arc::new(def);
        match self.defs.write() {
            Ok(mut defs) => Ok(Arc::clone(defs.entry(class.type_id()).or_insert(def))),
            Err(_) => Ok(def),
        }
    }

    /// Encode an instance of a registered value type.
    pub fn encode_value(&self, target: &dyn Any) -> MetaResult<serde_json::Value> {
        match self.registrations.get(&target.type_id()) {
            Some((_, Registration::Value(codec))) => codec.encode(target),
            _ => Err(MetaError::TypeNotMapped {
                type_name: format!("{:?}", target.type_id()),
            }),
        }
    }

    fn has_id_member(&self, def: &ClassDef) -> bool {
        def.members().iter().any(|m| {
            m.is_id()
                || self
                    .id_predicate
                    .as_ref()
                    .is_some_and(|p| p(def.name(), m.name()))
        })
    }

    fn remember(&self, class: &ClassRef) {
        let known = self
            .seen
            .read()
            .map(|seen| seen.contains_key(&class.type_id()))
            .unwrap_or(false);
        if !known {
            if let Ok(mut seen) = self.seen.write() {
                seen.entry(class.type_id()).or_insert(*class);
            }
        }
    }

    fn warn_default(&self, class: &ClassRef, name: &str) {
        let first = self
            .warned
            .write()
            .map(|mut warned| warned.insert(class.type_id()))
            .unwrap_or(false);
        if first {
            warn!(
                class = class.rust_name(),
                name,
                "class is not registered, mapping it as a value object"
            );
        }
    }
}

impl Default for TypeMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeMapper")
            .field("registrations", &self.registrations.len())
            .field("strict", &self.strict)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Money {
        cents: i64,
    }

    impl Inspect for Money {}

    struct Person {
        id: String,
    }

    impl Inspect for Person {
        fn describe() -> Option<ClassDef> {
            Some(
                ClassDef::of::<Self>("Person")
                    .field("id", |p: &Person| &p.id)
                    .build(),
            )
        }
    }

    struct Address {
        city: String,
    }

    impl Inspect for Address {
        fn describe() -> Option<ClassDef> {
            Some(
                ClassDef::of::<Self>("Address")
                    .field("city", |a: &Address| &a.city)
                    .build(),
            )
        }
    }

    struct Tagged {
        key: u32,
    }

    impl Inspect for Tagged {
        fn describe() -> Option<ClassDef> {
            Some(
                ClassDef::of::<Self>("Tagged")
                    .id_field("key", |t: &Tagged| &t.key)
                    .build(),
            )
        }
    }

    struct Undescribed;

    impl Inspect for Undescribed {}

    #[test]
    fn registration_wins() {
        let mut mapper = TypeMapper::new();
        mapper.register_entity::<Person>(Some("id"));
        mapper.register_value::<Money>();
        assert_eq!(
            mapper.map(&TypeRef::class::<Person>()).unwrap(),
            MappedType::Entity(ClassRef::of::<Person>())
        );
        assert_eq!(
            mapper.map(&TypeRef::class::<Money>()).unwrap(),
            MappedType::Value(ClassRef::of::<Money>())
        );
    }

    #[test]
    fn primitives_and_containers() {
        let mapper = TypeMapper::new();
        let mapped = mapper.map(&Vec::<String>::declared_type()).unwrap();
        assert_eq!(
            mapped,
            MappedType::Container {
                kind: ContainerKind::List,
                element: Box::new(MappedType::Primitive(PrimitiveKind::String)),
            }
        );
        assert_eq!(mapped.element(), Some(&MappedType::Primitive(PrimitiveKind::String)));
    }

    #[test]
    fn described_class_defaults_to_value_object() {
        let mapper = TypeMapper::new();
        assert_eq!(
            mapper.map(&TypeRef::class::<Address>()).unwrap(),
            MappedType::ValueObject(ClassRef::of::<Address>())
        );
    }

    #[test]
    fn strict_mapping_rejects_the_default() {
        let mapper = TypeMapper::new().with_strict_mapping(true);
        assert!(matches!(
            mapper.map(&TypeRef::class::<Address>()),
            Err(MetaError::TypeNotMapped { .. })
        ));
    }

    #[test]
    fn id_marked_member_infers_entity() {
        let mapper = TypeMapper::new();
        assert_eq!(
            mapper.map(&TypeRef::class::<Tagged>()).unwrap(),
            MappedType::Entity(ClassRef::of::<Tagged>())
        );
    }

    #[test]
    fn id_predicate_infers_entity() {
        let mapper = TypeMapper::new().with_id_predicate(|_, property| property == "id");
        assert_eq!(
            mapper.map(&TypeRef::class::<Person>()).unwrap(),
            MappedType::Entity(ClassRef::of::<Person>())
        );
    }

    #[test]
    fn undescribed_class_is_not_mapped() {
        let mapper = TypeMapper::new();
        let err = mapper.map(&TypeRef::class::<Undescribed>()).unwrap_err();
        assert!(matches!(err, MetaError::TypeNotMapped { .. }));
    }

    #[test]
    fn unknown_container_element_is_not_mapped() {
        let mapper = TypeMapper::new();
        match mapper.map(&TypeRef::list(TypeRef::Unknown)) {
            Err(MetaError::TypeNotMapped { type_name }) => assert_eq!(type_name, "List<?>"),
            other => panic!("expected TypeNotMapped, got {other:?}"),
        }
    }

    #[test]
    fn runtime_lookup_needs_a_declared_or_registered_class() {
        let mapper = TypeMapper::new();
        let address = Address { city: "NY".into() };
        assert!(mapper.map_runtime(Any::type_id(&address)).is_err());
        mapper.map(&TypeRef::class::<Address>()).unwrap();
        assert_eq!(
            mapper.map_runtime(Any::type_id(&address)).unwrap(),
            MappedType::ValueObject(ClassRef::of::<Address>())
        );
        assert_eq!(address.city, "NY");
    }

    #[test]
    fn values_are_encoded_with_serde() {
        let mut mapper = TypeMapper::new();
        mapper.register_value::<Money>();
        let money = Money { cents: 150 };
        assert_eq!(mapper.encode_value(&money).unwrap(), json!({ "cents": 150 }));
        assert!(mapper.encode_value(&Undescribed).is_err());
    }
}
