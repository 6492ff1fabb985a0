use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::TrailResult;

/// JSON codec for diffs, changes, snapshots, commits and global ids.
///
/// Global ids are written as their canonical string.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonConverter;

impl JsonConverter {
    pub fn to_json<T: Serialize + ?Sized>(&self, value: &T) -> TrailResult<String> {
        Ok(serde_json::to_string(value)?)
    }

    pub fn to_json_pretty<T: Serialize + ?Sized>(&self, value: &T) -> TrailResult<String> {
        Ok(serde_json::to_string_pretty(value)?)
    }

    pub fn from_json<T: DeserializeOwned>(&self, json: &str) -> TrailResult<T> {
        Ok(serde_json::from_str(json)?)
    }
}
