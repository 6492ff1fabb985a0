use std::fmt::Write as _;

use trail_diff::{Change, ChangeKind, ElementChange, EntryChange};
use trail_types::{CommitMetadata, GlobalId};

use crate::processor::ChangeProcessor;

/// Renders a change list as a human-readable log.
///
/// ```text
/// commit 2, author: alice, 2024-01-02 03:04:05 UTC
///   changed object: Person/bob
///     value changed on 'name' property: 'Bob' -> 'Robert'
/// ```
#[derive(Debug, Default)]
pub struct SimpleTextChangeLog {
    out: String,
}

impl SimpleTextChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn line(&mut self, indent: usize, text: &str) {
        let _ = writeln!(self.out, "{:indent$}{text}", "", indent = indent * 2);
    }
}

impl ChangeProcessor for SimpleTextChangeLog {
    type Output = String;

    fn on_commit(&mut self, commit: &CommitMetadata) {
        let header = format!(
            "commit {}, author: {}, {}",
            commit.id,
            commit.author,
            commit.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        );
        self.line(0, &header);
    }

    fn on_affected_object(&mut self, global_id: &GlobalId) {
        self.line(1, &format!("changed object: {global_id}"));
    }

    fn on_new_object(&mut self, change: &Change) {
        self.line(2, &format!("new object: {}", change.affected));
    }

    fn on_object_removed(&mut self, change: &Change) {
        self.line(2, &format!("object removed: {}", change.affected));
    }

    fn on_value_change(&mut self, change: &Change) {
        if let ChangeKind::ValueChange {
            property,
            left,
            right,
        } = &change.kind
        {
            self.line(
                2,
                &format!("value changed on '{property}' property: '{left}' -> '{right}'"),
            );
        }
    }

    fn on_reference_change(&mut self, change: &Change) {
        if let ChangeKind::ReferenceChange {
            property,
            left,
            right,
        } = &change.kind
        {
            self.line(
                2,
                &format!(
                    "reference changed on '{property}' property: '{}' -> '{}'",
                    or_null(left),
                    or_null(right)
                ),
            );
        }
    }

    fn on_list_change(&mut self, change: &Change) {
        if let ChangeKind::ListChange { property, changes } = &change.kind {
            self.line(2, &format!("list changed on '{property}' property"));
            for element in changes {
                let text = match element {
                    ElementChange::ValueAdded { index, value } => {
                        format!("added at [{index}]: '{value}'")
                    }
                    ElementChange::ValueRemoved { index, value } => {
                        format!("removed at [{index}]: '{value}'")
                    }
                    ElementChange::ElementValueChanged { index, left, right } => {
                        format!("changed at [{index}]: '{left}' -> '{right}'")
                    }
                };
                self.line(3, &text);
            }
        }
    }

    fn on_set_change(&mut self, change: &Change) {
        if let ChangeKind::SetChange {
            property,
            added,
            removed,
        } = &change.kind
        {
            self.line(2, &format!("set changed on '{property}' property"));
            for value in added {
                self.line(3, &format!("added: '{value}'"));
            }
            for value in removed {
                self.line(3, &format!("removed: '{value}'"));
            }
        }
    }

    fn on_map_change(&mut self, change: &Change) {
        if let ChangeKind::MapChange { property, entries } = &change.kind {
            self.line(2, &format!("map changed on '{property}' property"));
            for entry in entries {
                let text = match entry {
                    EntryChange::EntryAdded { key, value } => format!("added '{key}': '{value}'"),
                    EntryChange::EntryRemoved { key, value } => {
                        format!("removed '{key}': '{value}'")
                    }
                    EntryChange::EntryValueChanged { key, left, right } => {
                        format!("changed '{key}': '{left}' -> '{right}'")
                    }
                };
                self.line(3, &text);
            }
        }
    }

    fn result(self) -> String {
        self.out
    }
}

fn or_null(id: &Option<GlobalId>) -> String {
    id.as_ref().map_or_else(|| "null".to_string(), ToString::to_string)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use trail_types::{CommitId, PropertyValue};

    use super::*;
    use crate::processor::process_change_list;

    fn bob() -> GlobalId {
        GlobalId::instance("Person", "bob")
    }

    #[test]
    fn renders_commit_object_and_values() {
        let commit = CommitMetadata {
            id: CommitId(2),
            author: "alice".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        };
        let changes = vec![Change::new(
            bob(),
            ChangeKind::ValueChange {
                property: "name".into(),
                left: "Bob".into(),
                right: "Robert".into(),
            },
        )
        .with_commit(commit)];

        let log = process_change_list(&changes, SimpleTextChangeLog::new());
        assert_eq!(
            log,
            "commit 2, author: alice, 2024-01-02 03:04:05 UTC\n  changed object: Person/bob\n    value changed on 'name' property: 'Bob' -> 'Robert'\n"
        );
    }

    #[test]
    fn renders_list_elements() {
        let changes = vec![Change::new(
            bob(),
            ChangeKind::ListChange {
                property: "names".into(),
                changes: vec![
                    ElementChange::ValueAdded {
                        index: 1,
                        value: "x".into(),
                    },
                    ElementChange::ValueRemoved {
                        index: 3,
                        value: PropertyValue::Null,
                    },
                ],
            },
        )];
        let log = process_change_list(&changes, SimpleTextChangeLog::new());
        assert!(log.contains("list changed on 'names' property"));
        assert!(log.contains("      added at [1]: 'x'"));
        assert!(log.contains("removed at [3]: 'null'"));
    }

    #[test]
    fn renders_reference_to_null() {
        let changes = vec![Change::new(
            bob(),
            ChangeKind::ReferenceChange {
                property: "boss".into(),
                left: Some(GlobalId::instance("Person", "alice")),
                right: None,
            },
        )];
        let log = process_change_list(&changes, SimpleTextChangeLog::new());
        assert!(log.contains("reference changed on 'boss' property: 'Person/alice' -> 'null'"));
    }
}
