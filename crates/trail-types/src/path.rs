use std::fmt;

use serde::{Deserialize, Serialize};

/// Location of a value object inside its owner's graph.
///
/// Property names are joined with `.`, positions inside lists, arrays and
/// sets are written as `[i]`, and map keys are appended as `.key` with any
/// `.` inside the key replaced by the configured dot replacement.
///
/// ```
/// use trail_types::FragmentPath;
///
/// let path = FragmentPath::new("address").property("lines").index(2);
/// assert_eq!(path.as_str(), "address.lines[2]");
///
/// let keyed = FragmentPath::new("offices").map_key("eu.west", "-");
/// assert_eq!(keyed.as_str(), "offices.eu-west");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FragmentPath(String);

impl FragmentPath {
    /// Path made of a single property name.
    pub fn new(property: &str) -> Self {
        Self(property.to_string())
    }

    /// Wrap an already normalized path (e.g. one parsed from a global id).
    pub fn from_normalized(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Extend the path with a nested property.
    pub fn property(&self, name: &str) -> Self {
        if self.0.is_empty() {
            Self(name.to_string())
        } else {
            Self(format!("{}.{}", self.0, name))
        }
    }

    /// Extend the path with a container position.
    pub fn index(&self, index: usize) -> Self {
        Self(format!("{}[{}]", self.0, index))
    }

    /// Extend the path with a map key.
    pub fn map_key(&self, key: &str, dot_replacement: &str) -> Self {
        let key = crate::global_id::escape(&key.replace('.', dot_replacement));
        self.property(&key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FragmentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_properties_are_dotted() {
        let path = FragmentPath::new("a").property("b").property("c");
        assert_eq!(path.as_str(), "a.b.c");
    }

    #[test]
    fn property_on_empty_path_has_no_leading_dot() {
        assert_eq!(FragmentPath::default().property("x").as_str(), "x");
    }

    #[test]
    fn indexes_follow_the_property() {
        let path = FragmentPath::new("lines").index(0).property("text");
        assert_eq!(path.as_str(), "lines[0].text");
    }

    #[test]
    fn map_keys_replace_dots_and_escape_hashes() {
        let path = FragmentPath::new("tags").map_key("v1.2#beta", "_");
        assert_eq!(path.as_str(), "tags.v1_2%23beta");
    }
}
