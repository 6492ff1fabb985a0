use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::commit::CommitMetadata;
use crate::global_id::GlobalId;
use crate::value::PropertyValue;

/// Whether a managed type is an entity or a value object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ManagedKind {
    Entity,
    ValueObject,
}

impl fmt::Display for ManagedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity => write!(f, "Entity"),
            Self::ValueObject => write!(f, "ValueObject"),
        }
    }
}

/// The managed type recorded with every snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManagedType {
    pub kind: ManagedKind,
    pub name: String,
}

impl ManagedType {
    pub fn entity(name: impl Into<String>) -> Self {
        Self {
            kind: ManagedKind::Entity,
            name: name.into(),
        }
    }

    pub fn value_object(name: impl Into<String>) -> Self {
        Self {
            kind: ManagedKind::ValueObject,
            name: name.into(),
        }
    }
}

impl fmt::Display for ManagedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

/// Property values of one object, in property declaration order.
///
/// Serialized as a JSON object whose key order is the declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SnapshotState {
    entries: Vec<(String, PropertyValue)>,
}

impl SnapshotState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property, replacing an earlier value in place.
    pub fn insert(&mut self, property: impl Into<String>, value: PropertyValue) {
        let property = property.into();
        match self.entries.iter_mut().find(|(name, _)| *name == property) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((property, value)),
        }
    }

    /// Value of `property`, or `None` if the state has no such property.
    pub fn get(&self, property: &str) -> Option<&PropertyValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value)
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A state with the same properties, all set to null.
    pub fn nulled(&self) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .map(|(name, _)| (name.clone(), PropertyValue::Null))
                .collect(),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, PropertyValue)> for SnapshotState {
    fn from_iter<I: IntoIterator<Item = (K, PropertyValue)>>(iter: I) -> Self {
        let mut state = Self::new();
        for (name, value) in iter {
            state.insert(name, value);
        }
        state
    }
}

impl Serialize for SnapshotState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SnapshotState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StateVisitor;

        impl<'de> Visitor<'de> for StateVisitor {
            type Value = SnapshotState;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of property names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut state = SnapshotState::new();
                while let Some((name, value)) = access.next_entry::<String, PropertyValue>()? {
                    state.insert(name, value);
                }
                Ok(state)
            }
        }

        deserializer.deserialize_map(StateVisitor)
    }
}

/// Lifecycle position of a snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnapshotKind {
    /// First snapshot of a global id.
    Initial,
    /// Any later, non-terminal snapshot.
    Update,
    /// Deletion marker; state is empty.
    Terminal,
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial => write!(f, "Initial"),
            Self::Update => write!(f, "Update"),
            Self::Terminal => write!(f, "Terminal"),
        }
    }
}

/// Immutable record of one object's properties at one commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdoSnapshot {
    pub global_id: GlobalId,
    pub managed_type: ManagedType,
    /// Per global id, starting at 1 without gaps.
    pub version: u64,
    pub kind: SnapshotKind,
    pub commit: CommitMetadata,
    pub state: SnapshotState,
}

impl CdoSnapshot {
    pub fn is_terminal(&self) -> bool {
        self.kind == SnapshotKind::Terminal
    }

    pub fn is_initial(&self) -> bool {
        self.kind == SnapshotKind::Initial
    }
}

impl fmt::Display for CdoSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} v{} ({}, commit {})",
            self.global_id, self.version, self.kind, self.commit.id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::CommitId;
    use chrono::{TimeZone, Utc};

    fn sample_state() -> SnapshotState {
        [
            ("id", PropertyValue::from("bob")),
            ("name", PropertyValue::from("Bob")),
            ("boss", PropertyValue::Null),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn state_keeps_declaration_order() {
        let state = sample_state();
        let names: Vec<_> = state.property_names().collect();
        assert_eq!(names, vec!["id", "name", "boss"]);
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut state = sample_state();
        state.insert("id", PropertyValue::from("alice"));
        assert_eq!(state.len(), 3);
        assert_eq!(state.get("id"), Some(&PropertyValue::from("alice")));
        assert_eq!(state.property_names().next(), Some("id"));
    }

    #[test]
    fn state_serializes_as_ordered_object() {
        let json = serde_json::to_string(&sample_state()).unwrap();
        assert_eq!(
            json,
            r#"{"id":{"Value":"bob"},"name":{"Value":"Bob"},"boss":"Null"}"#
        );
        let parsed: SnapshotState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sample_state());
    }

    #[test]
    fn nulled_state_keeps_properties() {
        let nulled = sample_state().nulled();
        assert_eq!(nulled.len(), 3);
        assert!(nulled.iter().all(|(_, v)| v.is_null()));
    }

    #[test]
    fn snapshot_serde_roundtrip() {
        let snapshot = CdoSnapshot {
            global_id: GlobalId::instance("Person", "bob"),
            managed_type: ManagedType::entity("Person"),
            version: 1,
            kind: SnapshotKind::Initial,
            commit: CommitMetadata {
                id: CommitId(1),
                author: "author".into(),
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            },
            state: sample_state(),
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: CdoSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snapshot);
        assert!(parsed.is_initial());
        assert!(!parsed.is_terminal());
    }
}
