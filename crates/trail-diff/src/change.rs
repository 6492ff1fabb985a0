//! The structured description of a diff.

use std::fmt;

use serde::{Deserialize, Serialize};
use trail_types::{CommitMetadata, GlobalId, PropertyValue};

/// One element of a diff: what happened to which object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// The object the change belongs to.
    pub affected: GlobalId,
    /// Commit that introduced the change, when it comes from history.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<CommitMetadata>,
    pub kind: ChangeKind,
}

impl Change {
    pub fn new(affected: GlobalId, kind: ChangeKind) -> Self {
        Self {
            affected,
            commit: None,
            kind,
        }
    }

    pub fn with_commit(mut self, commit: CommitMetadata) -> Self {
        self.commit = Some(commit);
        self
    }

    /// The changed property, `None` for object appearance and removal.
    pub fn property(&self) -> Option<&str> {
        self.kind.property()
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ChangeKind::NewObject => write!(f, "new object {}", self.affected),
            ChangeKind::ObjectRemoved => write!(f, "object removed {}", self.affected),
            other => write!(f, "{} on {}", other, self.affected),
        }
    }
}

/// Closed set of change kinds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    NewObject,
    ObjectRemoved,
    /// A scalar or opaque value changed, including to or from null.
    ValueChange {
        property: String,
        left: PropertyValue,
        right: PropertyValue,
    },
    /// A reference points to a different object.
    ReferenceChange {
        property: String,
        left: Option<GlobalId>,
        right: Option<GlobalId>,
    },
    /// Element-level edit script of a list or array.
    ListChange {
        property: String,
        changes: Vec<ElementChange>,
    },
    SetChange {
        property: String,
        added: Vec<PropertyValue>,
        removed: Vec<PropertyValue>,
    },
    /// Entry changes of a map, keys ascending.
    MapChange {
        property: String,
        entries: Vec<EntryChange>,
    },
}

impl ChangeKind {
    pub fn property(&self) -> Option<&str> {
        match self {
            Self::NewObject | Self::ObjectRemoved => None,
            Self::ValueChange { property, .. }
            | Self::ReferenceChange { property, .. }
            | Self::ListChange { property, .. }
            | Self::SetChange { property, .. }
            | Self::MapChange { property, .. } => Some(property),
        }
    }

    pub fn is_property_change(&self) -> bool {
        self.property().is_some()
    }

    /// Short name of the variant, as used in change logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NewObject => "NewObject",
            Self::ObjectRemoved => "ObjectRemoved",
            Self::ValueChange { .. } => "ValueChange",
            Self::ReferenceChange { .. } => "ReferenceChange",
            Self::ListChange { .. } => "ListChange",
            Self::SetChange { .. } => "SetChange",
            Self::MapChange { .. } => "MapChange",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NewObject | Self::ObjectRemoved => f.write_str(self.name()),
            Self::ValueChange {
                property,
                left,
                right,
            } => write!(f, "{property}: {left} -> {right}"),
            Self::ReferenceChange {
                property,
                left,
                right,
            } => write!(f, "{property}: {} -> {}", id_or_null(left), id_or_null(right)),
            Self::ListChange { property, changes } => {
                write!(f, "{property}: ")?;
                write_joined(f, changes)
            }
            Self::SetChange {
                property,
                added,
                removed,
            } => {
                write!(f, "{property}: added ")?;
                write_joined(f, added)?;
                f.write_str(", removed ")?;
                write_joined(f, removed)
            }
            Self::MapChange { property, entries } => {
                write!(f, "{property}: ")?;
                write_joined(f, entries)
            }
        }
    }
}

fn id_or_null(id: &Option<GlobalId>) -> String {
    id.as_ref().map_or_else(|| "null".to_string(), GlobalId::to_string)
}

fn write_joined<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    f.write_str("[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str("]")
}

/// One step of a list edit script.
///
/// Indexes refer to the list as it stands when the step is applied, so
/// applying the steps in order turns the left list into the right one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementChange {
    ValueAdded {
        index: usize,
        value: PropertyValue,
    },
    ValueRemoved {
        index: usize,
        value: PropertyValue,
    },
    ElementValueChanged {
        index: usize,
        left: PropertyValue,
        right: PropertyValue,
    },
}

impl ElementChange {
    pub fn index(&self) -> usize {
        match self {
            Self::ValueAdded { index, .. }
            | Self::ValueRemoved { index, .. }
            | Self::ElementValueChanged { index, .. } => *index,
        }
    }
}

impl fmt::Display for ElementChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValueAdded { index, value } => write!(f, "+{index}:{value}"),
            Self::ValueRemoved { index, value } => write!(f, "-{index}:{value}"),
            Self::ElementValueChanged { index, left, right } => {
                write!(f, "~{index}:{left}->{right}")
            }
        }
    }
}

/// One entry of a map diff.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryChange {
    EntryAdded {
        key: String,
        value: PropertyValue,
    },
    EntryRemoved {
        key: String,
        value: PropertyValue,
    },
    EntryValueChanged {
        key: String,
        left: PropertyValue,
        right: PropertyValue,
    },
}

impl EntryChange {
    pub fn key(&self) -> &str {
        match self {
            Self::EntryAdded { key, .. }
            | Self::EntryRemoved { key, .. }
            | Self::EntryValueChanged { key, .. } => key,
        }
    }
}

impl fmt::Display for EntryChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EntryAdded { key, value } => write!(f, "+{key}:{value}"),
            Self::EntryRemoved { key, value } => write!(f, "-{key}:{value}"),
            Self::EntryValueChanged { key, left, right } => write!(f, "~{key}:{left}->{right}"),
        }
    }
}

/// The result of comparing two object graphs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
    pub changes: Vec<Change>,
}

impl Diff {
    pub fn new(changes: Vec<Change>) -> Self {
        Self { changes }
    }

    /// Returns `true` if the graphs are equal.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.changes.iter()
    }

    pub fn into_changes(self) -> Vec<Change> {
        self.changes
    }

    /// Number of objects that appeared.
    pub fn new_objects(&self) -> usize {
        self.count(|k| matches!(k, ChangeKind::NewObject))
    }

    /// Number of objects that disappeared.
    pub fn removed_objects(&self) -> usize {
        self.count(|k| matches!(k, ChangeKind::ObjectRemoved))
    }

    /// Number of property-level changes.
    pub fn property_changes(&self) -> usize {
        self.count(ChangeKind::is_property_change)
    }

    /// Changes affecting `global_id`, in diff order.
    pub fn changes_of<'a>(&'a self, global_id: &'a GlobalId) -> impl Iterator<Item = &'a Change> {
        self.changes.iter().filter(move |c| &c.affected == global_id)
    }

    fn count(&self, predicate: impl Fn(&ChangeKind) -> bool) -> usize {
        self.changes.iter().filter(|c| predicate(&c.kind)).count()
    }
}

impl<'a> IntoIterator for &'a Diff {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("no changes");
        }
        for (i, change) in self.changes.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "* {change}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bob() -> GlobalId {
        GlobalId::instance("Person", "bob")
    }

    #[test]
    fn property_of_object_changes_is_none() {
        assert_eq!(Change::new(bob(), ChangeKind::NewObject).property(), None);
        let change = Change::new(
            bob(),
            ChangeKind::ValueChange {
                property: "name".into(),
                left: "Bob".into(),
                right: "Robert".into(),
            },
        );
        assert_eq!(change.property(), Some("name"));
    }

    #[test]
    fn display_is_readable() {
        let change = Change::new(
            bob(),
            ChangeKind::ReferenceChange {
                property: "boss".into(),
                left: None,
                right: Some(GlobalId::instance("Person", "alice")),
            },
        );
        assert_eq!(change.to_string(), "boss: null -> Person/alice on Person/bob");

        let list = ChangeKind::ListChange {
            property: "names".into(),
            changes: vec![ElementChange::ValueAdded {
                index: 1,
                value: "x".into(),
            }],
        };
        assert_eq!(list.to_string(), "names: [+1:x]");
    }

    #[test]
    fn diff_counts_by_kind() {
        let diff = Diff::new(vec![
            Change::new(bob(), ChangeKind::NewObject),
            Change::new(
                bob(),
                ChangeKind::ValueChange {
                    property: "name".into(),
                    left: PropertyValue::Null,
                    right: "Bob".into(),
                },
            ),
            Change::new(GlobalId::instance("Person", "eve"), ChangeKind::ObjectRemoved),
        ]);
        assert_eq!(diff.len(), 3);
        assert_eq!(diff.new_objects(), 1);
        assert_eq!(diff.removed_objects(), 1);
        assert_eq!(diff.property_changes(), 1);
        assert_eq!(diff.changes_of(&bob()).count(), 2);
    }

    #[test]
    fn json_round_trip() {
        let change = Change::new(
            bob(),
            ChangeKind::MapChange {
                property: "phones".into(),
                entries: vec![EntryChange::EntryValueChanged {
                    key: "home".into(),
                    left: PropertyValue::from(1i64),
                    right: PropertyValue::from(2i64),
                }],
            },
        )
        .with_commit(CommitMetadata::new(trail_types::CommitId(4), "alice"));
        let diff = Diff::new(vec![change]);
        let json = serde_json::to_string(&diff).unwrap();
        assert!(json.contains("\"affected\":\"Person/bob\""));
        let back: Diff = serde_json::from_str(&json).unwrap();
        assert_eq!(back, diff);
    }

    #[test]
    fn commit_is_omitted_when_absent() {
        let json = serde_json::to_value(Change::new(bob(), ChangeKind::NewObject)).unwrap();
        assert!(json.get("commit").is_none());
    }
}
