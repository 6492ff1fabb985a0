//! Comparison of snapshot sets.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;
use trail_types::{CdoSnapshot, CommitMetadata, GlobalId, PropertyValue, SnapshotState};

use crate::change::{Change, ChangeKind, Diff, EntryChange};
use crate::list_diff::diff_lists;

/// Object states indexed by global id, in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SnapshotSet {
    order: Vec<GlobalId>,
    states: HashMap<GlobalId, SnapshotState>,
}

impl SnapshotSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the state of `global_id`. A replaced id keeps its position.
    pub fn insert(&mut self, global_id: GlobalId, state: SnapshotState) {
        if self.states.insert(global_id.clone(), state).is_none() {
            self.order.push(global_id);
        }
    }

    /// States of the live objects among `snapshots`; terminal ones are skipped.
    pub fn from_snapshots<'a>(snapshots: impl IntoIterator<Item = &'a CdoSnapshot>) -> Self {
        snapshots
            .into_iter()
            .filter(|s| !s.is_terminal())
            .map(|s| (s.global_id.clone(), s.state.clone()))
            .collect()
    }

    pub fn get(&self, global_id: &GlobalId) -> Option<&SnapshotState> {
        self.states.get(global_id)
    }

    pub fn contains(&self, global_id: &GlobalId) -> bool {
        self.states.contains_key(global_id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn global_ids(&self) -> impl Iterator<Item = &GlobalId> {
        self.order.iter()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GlobalId, &SnapshotState)> {
        self.order
            .iter()
            .filter_map(|id| self.states.get(id).map(|state| (id, state)))
    }
}

impl FromIterator<(GlobalId, SnapshotState)> for SnapshotSet {
    fn from_iter<I: IntoIterator<Item = (GlobalId, SnapshotState)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (global_id, state) in iter {
            set.insert(global_id, state);
        }
        set
    }
}

/// Compares snapshot sets and emits changes in canonical order.
///
/// Objects are visited in the order of the right-hand set, objects that only
/// exist on the left follow. Within an object, properties come in the right
/// state's declaration order, then properties only the left state has.
#[derive(Clone, Copy, Debug, Default)]
pub struct Differ {
    new_object_snapshot: bool,
}

impl Differ {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit the property values of new objects as changes from null.
    pub fn with_new_object_snapshot(mut self, enabled: bool) -> Self {
        self.new_object_snapshot = enabled;
        self
    }

    pub fn new_object_snapshot(&self) -> bool {
        self.new_object_snapshot
    }

    pub fn compare(&self, left: &SnapshotSet, right: &SnapshotSet) -> Diff {
        let mut changes = Vec::new();
        for (global_id, right_state) in right.iter() {
            match left.get(global_id) {
                Some(left_state) => {
                    changes.extend(self.compare_states(global_id, left_state, right_state));
                }
                None => changes.extend(self.appeared(global_id, right_state)),
            }
        }
        for (global_id, _) in left.iter() {
            if !right.contains(global_id) {
                changes.push(Change::new(global_id.clone(), ChangeKind::ObjectRemoved));
            }
        }
        debug!(
            left = left.len(),
            right = right.len(),
            changes = changes.len(),
            "compared snapshot sets"
        );
        Diff::new(changes)
    }

    /// Property changes between two states of the same object.
    pub fn compare_states(
        &self,
        global_id: &GlobalId,
        left: &SnapshotState,
        right: &SnapshotState,
    ) -> Vec<Change> {
        let null = PropertyValue::Null;
        let right_names = right.property_names();
        let left_only = left
            .property_names()
            .filter(|name| right.get(name).is_none());

        right_names
            .chain(left_only)
            .filter_map(|name| {
                let l = left.get(name).unwrap_or(&null);
                let r = right.get(name).unwrap_or(&null);
                property_change(name, l, r).map(|kind| Change::new(global_id.clone(), kind))
            })
            .collect()
    }

    /// Changes between two consecutive snapshots of one global id, stamped
    /// with the newer snapshot's commit.
    pub fn compare_snapshots(&self, older: &CdoSnapshot, newer: &CdoSnapshot) -> Vec<Change> {
        let changes = if newer.is_terminal() {
            vec![Change::new(newer.global_id.clone(), ChangeKind::ObjectRemoved)]
        } else if older.is_terminal() {
            self.appeared(&newer.global_id, &newer.state)
        } else {
            self.compare_states(&newer.global_id, &older.state, &newer.state)
        };
        stamp(changes, &newer.commit)
    }

    fn appeared(&self, global_id: &GlobalId, state: &SnapshotState) -> Vec<Change> {
        let mut changes = vec![Change::new(global_id.clone(), ChangeKind::NewObject)];
        if self.new_object_snapshot {
            changes.extend(self.compare_states(global_id, &state.nulled(), state));
        }
        changes
    }
}

fn stamp(changes: Vec<Change>, commit: &CommitMetadata) -> Vec<Change> {
    changes
        .into_iter()
        .map(|c| c.with_commit(commit.clone()))
        .collect()
}

/// Compare one property. Null on one side of a container counts as empty.
fn property_change(property: &str, left: &PropertyValue, right: &PropertyValue) -> Option<ChangeKind> {
    use PropertyValue as V;

    if left == right {
        return None;
    }
    let property = property.to_string();
    match (left, right) {
        (V::List(_) | V::Null, V::List(_) | V::Null) => {
            let changes = diff_lists(as_items(left), as_items(right));
            (!changes.is_empty()).then_some(ChangeKind::ListChange { property, changes })
        }
        (V::Set(_) | V::Null, V::Set(_) | V::Null) => {
            let (l, r) = (as_items(left), as_items(right));
            let added: Vec<_> = r.iter().filter(|v| !l.contains(v)).cloned().collect();
            let removed: Vec<_> = l.iter().filter(|v| !r.contains(v)).cloned().collect();
            (!added.is_empty() || !removed.is_empty()).then_some(ChangeKind::SetChange {
                property,
                added,
                removed,
            })
        }
        (V::Map(_) | V::Null, V::Map(_) | V::Null) => {
            let entries = diff_maps(left, right);
            (!entries.is_empty()).then_some(ChangeKind::MapChange { property, entries })
        }
        (V::Reference(_) | V::Null, V::Reference(_) | V::Null) => Some(ChangeKind::ReferenceChange {
            property,
            left: left.as_reference().cloned(),
            right: right.as_reference().cloned(),
        }),
        _ => Some(ChangeKind::ValueChange {
            property,
            left: left.clone(),
            right: right.clone(),
        }),
    }
}

fn as_items(value: &PropertyValue) -> &[PropertyValue] {
    match value {
        PropertyValue::List(items) | PropertyValue::Set(items) => items,
        _ => &[],
    }
}

fn diff_maps(left: &PropertyValue, right: &PropertyValue) -> Vec<EntryChange> {
    let empty = BTreeMap::new();
    let (l, r) = match (left, right) {
        (PropertyValue::Map(l), PropertyValue::Map(r)) => (l, r),
        (PropertyValue::Map(l), _) => (l, &empty),
        (_, PropertyValue::Map(r)) => (&empty, r),
        _ => return Vec::new(),
    };
    let keys: BTreeSet<&String> = l.keys().chain(r.keys()).collect();
    keys.into_iter()
        .filter_map(|key| match (l.get(key), r.get(key)) {
            (None, Some(value)) => Some(EntryChange::EntryAdded {
                key: key.clone(),
                value: value.clone(),
            }),
            (Some(value), None) => Some(EntryChange::EntryRemoved {
                key: key.clone(),
                value: value.clone(),
            }),
            (Some(lv), Some(rv)) if lv != rv => Some(EntryChange::EntryValueChanged {
                key: key.clone(),
                left: lv.clone(),
                right: rv.clone(),
            }),
            _ => None,
        })
        .collect()
}
