//! Domain meta-model for Trail.
//!
//! Rust has no runtime reflection, so user classes describe themselves:
//! every type reachable from a managed graph implements [`Inspect`], and
//! classes hand out an explicit [`ClassDef`] listing their members with typed
//! read accessors. On top of that this crate provides:
//!
//! - [`TypeMapper`] - classifies declared types as entity, value object,
//!   value, primitive, container or map
//! - [`PropertyScanner`] - picks the members that become properties
//!   (fields or `getX`/`isX` getters)
//! - [`ManagedClassRegistry`] - cached [`ManagedClass`]es with their id
//!   property and supported properties

pub mod class_def;
pub mod error;
pub mod inspect;
pub mod managed;
pub mod mapper;
pub mod scanner;
pub mod type_ref;

pub use class_def::{ClassDef, ClassDefBuilder, Member, MemberKind, Modifiers};
pub use error::{MetaError, MetaResult};
pub use inspect::{Inspect, Live};
pub use managed::{ManagedClass, ManagedClassRegistry, Property};
pub use mapper::{ContainerKind, IdPredicate, MappedType, Registration, TypeMapper, ValueCodec};
pub use scanner::{MappingStyle, PropertyScanner, ScannedProperty};
pub use type_ref::{ClassRef, PrimitiveKind, TypeRef};
