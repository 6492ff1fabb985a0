//! Change list processing for Trail.
//!
//! [`process_change_list`] walks an ordered change list and drives a
//! [`ChangeProcessor`], announcing each commit and each affected object once
//! per run of consecutive changes. [`SimpleTextChangeLog`] is a processor that
//! renders a readable log.

pub mod processor;
pub mod text;

pub use processor::{process_change_list, ChangeProcessor};
pub use text::SimpleTextChangeLog;
