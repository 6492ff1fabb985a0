use tracing::debug;
use trail_diff::{Change, ChangeKind};
use trail_types::{CommitMetadata, CommitId, GlobalId};

/// Callbacks invoked while walking an ordered change list.
///
/// Every hook has an empty default, so a processor only implements the
/// ones it cares about plus [`ChangeProcessor::result`].
pub trait ChangeProcessor {
    type Output;

    fn before_change_list(&mut self) {}

    fn after_change_list(&mut self) {}

    /// A change from a commit other than the previous change's one.
    fn on_commit(&mut self, _commit: &CommitMetadata) {}

    /// A change to an object other than the previous change's one, or the
    /// first change under a new commit header.
    fn on_affected_object(&mut self, _global_id: &GlobalId) {}

    fn before_change(&mut self, _change: &Change) {}

    fn after_change(&mut self, _change: &Change) {}

    /// Any change that concerns a single property.
    fn on_property_change(&mut self, _change: &Change) {}

    fn on_new_object(&mut self, _change: &Change) {}

    fn on_object_removed(&mut self, _change: &Change) {}

    fn on_value_change(&mut self, _change: &Change) {}

    fn on_reference_change(&mut self, _change: &Change) {}

    fn on_list_change(&mut self, _change: &Change) {}

    fn on_set_change(&mut self, _change: &Change) {}

    fn on_map_change(&mut self, _change: &Change) {}

    fn result(self) -> Self::Output;
}

/// Walk `changes` in order, driving `processor`, and return its result.
pub fn process_change_list<P: ChangeProcessor>(changes: &[Change], mut processor: P) -> P::Output {
    let mut last_commit: Option<CommitId> = None;
    let mut last_object: Option<&GlobalId> = None;

    processor.before_change_list();
    for change in changes {
        processor.before_change(change);

        if let Some(commit) = &change.commit {
            if last_commit != Some(commit.id) {
                processor.on_commit(commit);
                last_commit = Some(commit.id);
                last_object = None;
            }
        }
        if last_object != Some(&change.affected) {
            processor.on_affected_object(&change.affected);
            last_object = Some(&change.affected);
        }

        if change.kind.is_property_change() {
            processor.on_property_change(change);
        }
        match &change.kind {
            ChangeKind::NewObject => processor.on_new_object(change),
            ChangeKind::ObjectRemoved => processor.on_object_removed(change),
            ChangeKind::ValueChange { .. } => processor.on_value_change(change),
            ChangeKind::ReferenceChange { .. } => processor.on_reference_change(change),
            ChangeKind::ListChange { .. } => processor.on_list_change(change),
            ChangeKind::SetChange { .. } => processor.on_set_change(change),
            ChangeKind::MapChange { .. } => processor.on_map_change(change),
        }

        processor.after_change(change);
    }
    processor.after_change_list();
    debug!(changes = changes.len(), "processed change list");
    processor.result()
}
