use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::class_def::ClassDef;
use crate::inspect::Inspect;

/// Built-in scalar families.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Boolean,
    Integer,
    Float,
    Char,
    String,
    Temporal,
    /// Unit-like enums that expose themselves as a plain value.
    Enum,
    /// Raw JSON carried as an opaque scalar.
    Json,
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Char => "char",
            Self::String => "string",
            Self::Temporal => "temporal",
            Self::Enum => "enum",
            Self::Json => "json",
        };
        f.write_str(name)
    }
}

/// Runtime handle to a user class.
///
/// Equality and hashing use the `TypeId` only.
#[derive(Clone, Copy)]
pub struct ClassRef {
    id: TypeId,
    rust_name: &'static str,
    describe: fn() -> Option<ClassDef>,
}

impl ClassRef {
    pub fn of<T: Inspect>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            rust_name: type_name::<T>(),
            describe: T::describe,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified Rust type name, used in diagnostics.
    pub fn rust_name(&self) -> &'static str {
        self.rust_name
    }

    /// Class description provided by the type, if any.
    pub fn describe(&self) -> Option<ClassDef> {
        (self.describe)()
    }
}

impl PartialEq for ClassRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ClassRef {}

impl Hash for ClassRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassRef({})", self.rust_name)
    }
}

/// Declared (static) type of a property, before mapping.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Primitive(PrimitiveKind),
    Class(ClassRef),
    List(Box<TypeRef>),
    Array(Box<TypeRef>),
    Set(Box<TypeRef>),
    Map(Box<TypeRef>, Box<TypeRef>),
    /// Type information was erased and no hint was supplied.
    Unknown,
}

impl TypeRef {
    pub fn class<T: Inspect>() -> Self {
        Self::Class(ClassRef::of::<T>())
    }

    pub fn list(element: TypeRef) -> Self {
        Self::List(Box::new(element))
    }

    pub fn set(element: TypeRef) -> Self {
        Self::Set(Box::new(element))
    }

    pub fn map(key: TypeRef, value: TypeRef) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(kind) => write!(f, "{kind}"),
            Self::Class(class) => f.write_str(class.rust_name()),
            Self::List(e) => write!(f, "List<{e}>"),
            Self::Array(e) => write!(f, "Array<{e}>"),
            Self::Set(e) => write!(f, "Set<{e}>"),
            Self::Map(k, v) => write!(f, "Map<{k}, {v}>"),
            Self::Unknown => f.write_str("?"),
        }
    }
}
