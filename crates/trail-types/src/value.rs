use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::global_id::GlobalId;

/// A property value as recorded in a snapshot.
///
/// Primitives and registered value types are copied as JSON values;
/// references to entities and value objects are stored as [`GlobalId`]s,
/// never as live pointers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyValue {
    #[default]
    Null,
    /// A primitive or an opaque value, compared by equality.
    Value(serde_json::Value),
    /// Reference to another node of the graph.
    Reference(GlobalId),
    /// Ordered container (list or array).
    List(Vec<PropertyValue>),
    /// Unordered container.
    Set(Vec<PropertyValue>),
    /// Keyed container. Keys are canonical strings of primitive or value keys.
    Map(BTreeMap<String, PropertyValue>),
}

impl PropertyValue {
    pub fn value(value: impl Into<serde_json::Value>) -> Self {
        Self::Value(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_reference(&self) -> Option<&GlobalId> {
        match self {
            Self::Reference(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Self::List(_) | Self::Set(_) | Self::Map(_))
    }

    /// All global ids referenced by this value, containers included.
    pub fn references(&self) -> Vec<&GlobalId> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a GlobalId>) {
        match self {
            Self::Reference(id) => out.push(id),
            Self::List(items) | Self::Set(items) => {
                for item in items {
                    item.collect_references(out);
                }
            }
            Self::Map(entries) => {
                for value in entries.values() {
                    value.collect_references(out);
                }
            }
            Self::Null | Self::Value(_) => {}
        }
    }
}

impl From<GlobalId> for PropertyValue {
    fn from(id: GlobalId) -> Self {
        Self::Reference(id)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::Value(serde_json::Value::String(s.to_string()))
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::Value(serde_json::Value::String(s))
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        Self::Value(n.into())
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        Self::Value(b.into())
    }
}

/// Canonical string of a map key or entity id value.
///
/// Strings are used verbatim; other JSON values use their compact JSON text.
pub fn canonical_key(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Value(v) => f.write_str(&canonical_key(v)),
            Self::Reference(id) => write!(f, "{id}"),
            Self::List(items) => write_items(f, "[", items.iter(), "]"),
            Self::Set(items) => write_items(f, "{", items.iter(), "}"),
            Self::Map(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

fn write_items<'a>(
    f: &mut fmt::Formatter<'_>,
    open: &str,
    items: impl Iterator<Item = &'a PropertyValue>,
    close: &str,
) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(close)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_is_default() {
        assert!(PropertyValue::default().is_null());
    }

    #[test]
    fn references_are_collected_from_containers() {
        let bob = GlobalId::instance("Person", "bob");
        let alice = GlobalId::instance("Person", "alice");
        let mut map = BTreeMap::new();
        map.insert("boss".to_string(), PropertyValue::from(alice.clone()));
        let value = PropertyValue::List(vec![
            PropertyValue::from(bob.clone()),
            PropertyValue::Map(map),
            PropertyValue::from("text"),
        ]);
        assert_eq!(value.references(), vec![&bob, &alice]);
    }

    #[test]
    fn display_is_human_readable() {
        let value = PropertyValue::List(vec![
            PropertyValue::from("a"),
            PropertyValue::from(2),
            PropertyValue::Null,
        ]);
        assert_eq!(value.to_string(), "[a, 2, null]");
    }

    #[test]
    fn canonical_key_of_numbers_and_strings() {
        assert_eq!(canonical_key(&json!("x")), "x");
        assert_eq!(canonical_key(&json!(12)), "12");
        assert_eq!(canonical_key(&json!(true)), "true");
    }

    #[test]
    fn serde_roundtrip() {
        let mut map = BTreeMap::new();
        map.insert("k".to_string(), PropertyValue::value(json!(1.5)));
        let value = PropertyValue::Set(vec![
            PropertyValue::Map(map),
            PropertyValue::Reference(GlobalId::unbounded("Address")),
            PropertyValue::Null,
        ]);
        let json = serde_json::to_string(&value).unwrap();
        let parsed: PropertyValue = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, value);
    }
}
