//! Element-level diff of ordered containers.
//!
//! Uses the `similar` crate (LCS algorithm) to find the longest common
//! subsequence and turns the resulting ops into an edit script whose
//! indexes are positions in the list being edited.

use similar::{capture_diff_slices, Algorithm, DiffOp};
use trail_types::PropertyValue;

use crate::change::ElementChange;
use crate::error::{DiffError, DiffResult};

/// Compute the edit script turning `left` into `right`.
///
/// Within one replaced run, overlapping positions become value changes;
/// surplus left elements are removed before surplus right elements are
/// inserted.
pub fn diff_lists(left: &[PropertyValue], right: &[PropertyValue]) -> Vec<ElementChange> {
    if left == right {
        return Vec::new();
    }
    let (left_keys, right_keys) = intern(left, right);
    let ops = capture_diff_slices(Algorithm::Lcs, &left_keys, &right_keys);

    let mut changes = Vec::new();
    let mut pos = 0usize;
    for op in ops {
        match op {
            DiffOp::Equal { len, .. } => pos += len,
            DiffOp::Delete {
                old_index, old_len, ..
            } => {
                for value in &left[old_index..old_index + old_len] {
                    changes.push(ElementChange::ValueRemoved {
                        index: pos,
                        value: value.clone(),
                    });
                }
            }
            DiffOp::Insert {
                new_index, new_len, ..
            } => {
                for value in &right[new_index..new_index + new_len] {
                    changes.push(ElementChange::ValueAdded {
                        index: pos,
                        value: value.clone(),
                    });
                    pos += 1;
                }
            }
            DiffOp::Replace {
                old_index,
                old_len,
                new_index,
                new_len,
            } => {
                let overlap = old_len.min(new_len);
                for k in 0..overlap {
                    changes.push(ElementChange::ElementValueChanged {
                        index: pos,
                        left: left[old_index + k].clone(),
                        right: right[new_index + k].clone(),
                    });
                    pos += 1;
                }
                for value in &left[old_index + overlap..old_index + old_len] {
                    changes.push(ElementChange::ValueRemoved {
                        index: pos,
                        value: value.clone(),
                    });
                }
                for value in &right[new_index + overlap..new_index + new_len] {
                    changes.push(ElementChange::ValueAdded {
                        index: pos,
                        value: value.clone(),
                    });
                    pos += 1;
                }
            }
        }
    }
    changes
}

/// Apply an edit script produced by [`diff_lists`] to `left`.
pub fn apply_list_changes(
    left: &[PropertyValue],
    changes: &[ElementChange],
) -> DiffResult<Vec<PropertyValue>> {
    let mut list = left.to_vec();
    for change in changes {
        let len = list.len();
        let out_of_range = |index| DiffError::IndexOutOfRange { index, len };
        match change {
            ElementChange::ValueAdded { index, value } => {
                if *index > len {
                    return Err(out_of_range(*index));
                }
                list.insert(*index, value.clone());
            }
            ElementChange::ValueRemoved { index, .. } => {
                if *index >= len {
                    return Err(out_of_range(*index));
                }
                list.remove(*index);
            }
            ElementChange::ElementValueChanged { index, right, .. } => {
                let slot = list.get_mut(*index).ok_or_else(|| out_of_range(*index))?;
                *slot = right.clone();
            }
        }
    }
    Ok(list)
}

/// Map elements to small integer keys, equal elements sharing a key.
///
/// Property values are not hashable, so distinct values are found by a
/// linear scan.
fn intern<'a>(left: &'a [PropertyValue], right: &'a [PropertyValue]) -> (Vec<u32>, Vec<u32>) {
    let mut distinct: Vec<&'a PropertyValue> = Vec::new();
    let mut key_of = |value: &'a PropertyValue| -> u32 {
        let position = distinct.iter().position(|d| *d == value).unwrap_or_else(|| {
            distinct.push(value);
            distinct.len() - 1
        });
        position as u32
    };
    let left_keys = left.iter().map(&mut key_of).collect();
    let right_keys = right.iter().map(&mut key_of).collect();
    (left_keys, right_keys)
}
