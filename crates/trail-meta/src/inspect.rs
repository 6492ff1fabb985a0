//! How live values expose themselves to the engine.
//!
//! Every type that appears in a managed graph implements [`Inspect`]. The
//! crate covers scalars, smart pointers and the standard containers; a user
//! struct opts in with an empty impl (it then inspects as an opaque class
//! instance) and usually overrides [`Inspect::describe`]:
//!
//! ```
//! use trail_meta::{ClassDef, Inspect};
//!
//! struct Address {
//!     city: String,
//! }
//!
//! impl Inspect for Address {
//!     fn describe() -> Option<ClassDef> {
//!         Some(
//!             ClassDef::of::<Self>("Address")
//!                 .field("city", |a: &Address| &a.city)
//!                 .build(),
//!         )
//!     }
//! }
//! ```

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::class_def::ClassDef;
use crate::type_ref::{PrimitiveKind, TypeRef};

/// A value as seen while walking a graph.
///
/// Scalars are copied out, class instances are borrowed so that the graph
/// builder can classify them by their runtime type.
#[derive(Clone)]
pub enum Live<'a> {
    Null,
    Value(Value),
    Object(&'a dyn Any),
    /// Ordered container (lists and arrays).
    List(Vec<Live<'a>>),
    Set(Vec<Live<'a>>),
    Map(Vec<(Live<'a>, Live<'a>)>),
}

impl Live<'_> {
    /// Serialize `value` into an opaque scalar. Unserializable input is null.
    pub fn serialized<T: Serialize>(value: &T) -> Live<'static> {
        serde_json::to_value(value).map_or(Live::Null, Live::Value)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Live::Null)
    }
}

impl std::fmt::Debug for Live<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Live::Null => f.write_str("Null"),
            Live::Value(v) => write!(f, "Value({v})"),
            Live::Object(o) => write!(f, "Object({:?})", (**o).type_id()),
            Live::List(items) => f.debug_tuple("List").field(items).finish(),
            Live::Set(items) => f.debug_tuple("Set").field(items).finish(),
            Live::Map(entries) => f.debug_tuple("Map").field(entries).finish(),
        }
    }
}

/// Exposes a value's declared type, class description and live shape.
pub trait Inspect: Any + Send + Sync {
    /// Static type of the implementing type.
    fn declared_type() -> TypeRef
    where
        Self: Sized,
    {
        TypeRef::class::<Self>()
    }

    /// Class description used when the type is mapped as an entity or a
    /// value object.
    fn describe() -> Option<ClassDef>
    where
        Self: Sized,
    {
        None
    }

    fn inspect(&self) -> Live<'_>
    where
        Self: Sized,
    {
        Live::Object(self)
    }
}

macro_rules! inspect_number {
    ($kind:ident => $($t:ty),* $(,)?) => {
        $(
            impl Inspect for $t {
                fn declared_type() -> TypeRef {
                    TypeRef::Primitive(PrimitiveKind::$kind)
                }

                fn inspect(&self) -> Live<'_> {
                    Live::Value(Value::from(*self))
                }
            }
        )*
    };
}

inspect_number!(Boolean => bool);
inspect_number!(Integer => i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
inspect_number!(Float => f32, f64);

impl Inspect for char {
    fn declared_type() -> TypeRef {
        TypeRef::Primitive(PrimitiveKind::Char)
    }

    fn inspect(&self) -> Live<'_> {
        Live::Value(Value::String(self.to_string()))
    }
}

impl Inspect for String {
    fn declared_type() -> TypeRef {
        TypeRef::Primitive(PrimitiveKind::String)
    }

    fn inspect(&self) -> Live<'_> {
        Live::Value(Value::String(self.clone()))
    }
}

impl Inspect for &'static str {
    fn declared_type() -> TypeRef {
        TypeRef::Primitive(PrimitiveKind::String)
    }

    fn inspect(&self) -> Live<'_> {
        Live::Value(Value::String((*self).to_string()))
    }
}

impl Inspect for DateTime<Utc> {
    fn declared_type() -> TypeRef {
        TypeRef::Primitive(PrimitiveKind::Temporal)
    }

    fn inspect(&self) -> Live<'_> {
        Live::Value(Value::String(self.to_rfc3339()))
    }
}

impl Inspect for NaiveDate {
    fn declared_type() -> TypeRef {
        TypeRef::Primitive(PrimitiveKind::Temporal)
    }

    fn inspect(&self) -> Live<'_> {
        Live::Value(Value::String(self.to_string()))
    }
}

impl Inspect for NaiveDateTime {
    fn declared_type() -> TypeRef {
        TypeRef::Primitive(PrimitiveKind::Temporal)
    }

    fn inspect(&self) -> Live<'_> {
        Live::Value(Value::String(
            self.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
        ))
    }
}

impl Inspect for Value {
    fn declared_type() -> TypeRef {
        TypeRef::Primitive(PrimitiveKind::Json)
    }

    fn inspect(&self) -> Live<'_> {
        match self {
            Value::Null => Live::Null,
            other => Live::Value(other.clone()),
        }
    }
}

impl<T: Inspect> Inspect for Option<T> {
    fn declared_type() -> TypeRef {
        T::declared_type()
    }

    fn inspect(&self) -> Live<'_> {
        self.as_ref().map_or(Live::Null, T::inspect)
    }
}

impl<T: Inspect> Inspect for Box<T> {
    fn declared_type() -> TypeRef {
        T::declared_type()
    }

    fn inspect(&self) -> Live<'_> {
        (**self).inspect()
    }
}

impl<T: Inspect> Inspect for Arc<T> {
    fn declared_type() -> TypeRef {
        T::declared_type()
    }

    fn inspect(&self) -> Live<'_> {
        (**self).inspect()
    }
}

/// A lazily set slot, which is also how cyclic graphs are tied.
impl<T: Inspect> Inspect for OnceLock<T> {
    fn declared_type() -> TypeRef {
        T::declared_type()
    }

    fn inspect(&self) -> Live<'_> {
        self.get().map_or(Live::Null, T::inspect)
    }
}

impl<T: Inspect> Inspect for Vec<T> {
    fn declared_type() -> TypeRef {
        TypeRef::List(Box::new(T::declared_type()))
    }

    fn inspect(&self) -> Live<'_> {
        Live::List(self.iter().map(T::inspect).collect())
    }
}

impl<T: Inspect> Inspect for VecDeque<T> {
    fn declared_type() -> TypeRef {
        TypeRef::List(Box::new(T::declared_type()))
    }

    fn inspect(&self) -> Live<'_> {
        Live::List(self.iter().map(T::inspect).collect())
    }
}

impl<T: Inspect, const N: usize> Inspect for [T; N] {
    fn declared_type() -> TypeRef {
        TypeRef::Array(Box::new(T::declared_type()))
    }

    fn inspect(&self) -> Live<'_> {
        Live::List(self.iter().map(T::inspect).collect())
    }
}

impl<T: Inspect> Inspect for HashSet<T> {
    fn declared_type() -> TypeRef {
        TypeRef::Set(Box::new(T::declared_type()))
    }

    fn inspect(&self) -> Live<'_> {
        Live::Set(self.iter().map(T::inspect).collect())
    }
}

impl<T: Inspect> Inspect for BTreeSet<T> {
    fn declared_type() -> TypeRef {
        TypeRef::Set(Box::new(T::declared_type()))
    }

    fn inspect(&self) -> Live<'_> {
        Live::Set(self.iter().map(T::inspect).collect())
    }
}

impl<K: Inspect, V: Inspect> Inspect for HashMap<K, V> {
    fn declared_type() -> TypeRef {
        TypeRef::Map(Box::new(K::declared_type()), Box::new(V::declared_type()))
    }

    fn inspect(&self) -> Live<'_> {
        Live::Map(self.iter().map(|(k, v)| (k.inspect(), v.inspect())).collect())
    }
}

impl<K: Inspect, V: Inspect> Inspect for BTreeMap<K, V> {
    fn declared_type() -> TypeRef {
        TypeRef::Map(Box::new(K::declared_type()), Box::new(V::declared_type()))
    }

    fn inspect(&self) -> Live<'_> {
        Live::Map(self.iter().map(|(k, v)| (k.inspect(), v.inspect())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Opaque;

    impl Inspect for Opaque {}

    #[test]
    fn primitives_copy_their_value() {
        assert!(matches!(42i32.inspect(), Live::Value(v) if v == json!(42)));
        assert!(matches!(true.inspect(), Live::Value(v) if v == json!(true)));
        assert!(matches!("x".to_string().inspect(), Live::Value(v) if v == json!("x")));
        assert!(matches!('c'.inspect(), Live::Value(v) if v == json!("c")));
    }

    #[test]
    fn none_is_null() {
        let missing: Option<String> = None;
        assert!(Inspect::inspect(&missing).is_null());
        assert_eq!(Option::<String>::declared_type(), String::declared_type());
    }

    #[test]
    fn user_types_are_borrowed_objects() {
        let value = Opaque;
        match value.inspect() {
            Live::Object(obj) => assert!(obj.downcast_ref::<Opaque>().is_some()),
            other => panic!("expected object, got {other:?}"),
        }
        assert_eq!(Opaque::declared_type(), TypeRef::class::<Opaque>());
    }

    #[test]
    fn containers_declare_element_types() {
        assert_eq!(
            Vec::<i64>::declared_type(),
            TypeRef::list(TypeRef::Primitive(PrimitiveKind::Integer))
        );
        assert_eq!(
            <[bool; 3]>::declared_type(),
            TypeRef::Array(Box::new(TypeRef::Primitive(PrimitiveKind::Boolean)))
        );
        assert_eq!(
            BTreeMap::<String, Opaque>::declared_type(),
            TypeRef::map(TypeRef::Primitive(PrimitiveKind::String), TypeRef::class::<Opaque>())
        );
    }

    #[test]
    fn list_inspection_keeps_order() {
        let items = vec![3u8, 1, 2];
        match items.inspect() {
            Live::List(live) => {
                let values: Vec<_> = live
                    .into_iter()
                    .map(|l| match l {
                        Live::Value(v) => v,
                        _ => Value::Null,
                    })
                    .collect();
                assert_eq!(values, vec![json!(3), json!(1), json!(2)]);
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn once_lock_inspects_its_content() {
        let slot: OnceLock<String> = OnceLock::new();
        assert!(slot.inspect().is_null());
        slot.set("set".into()).unwrap();
        assert!(matches!(slot.inspect(), Live::Value(v) if v == json!("set")));
    }

    #[test]
    fn serialized_helper_wraps_json() {
        #[derive(Serialize)]
        enum Status {
            Active,
        }
        assert!(matches!(Live::serialized(&Status::Active), Live::Value(v) if v == json!("Active")));
    }
}
