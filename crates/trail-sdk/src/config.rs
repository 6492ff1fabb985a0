use std::path::Path;

use serde::{Deserialize, Serialize};
use trail_graph::DEFAULT_DOT_REPLACEMENT;
use trail_meta::MappingStyle;

use crate::error::{TrailError, TrailResult};

/// Engine settings. Missing keys in a TOML file take their default.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailConfig {
    pub mapping_style: MappingStyle,
    /// Follow every `NewObject` change with the new object's property values.
    pub new_object_snapshot: bool,
    /// Substitute for `.` inside map keys used as path fragments.
    pub map_key_dot_replacement: String,
    /// Reject unregistered classes instead of mapping them as value objects.
    pub strict_mapping: bool,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            mapping_style: MappingStyle::Fields,
            new_object_snapshot: false,
            map_key_dot_replacement: DEFAULT_DOT_REPLACEMENT.to_string(),
            strict_mapping: false,
        }
    }
}

impl TrailConfig {
    pub fn from_toml_str(source: &str) -> TrailResult<Self> {
        let config: Self = toml::from_str(source).map_err(|e| TrailError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> TrailResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn to_toml_string(&self) -> TrailResult<String> {
        toml::to_string(self).map_err(|e| TrailError::Config(e.to_string()))
    }

    /// A replacement containing `.` would make map key fragments ambiguous.
    pub fn validate(&self) -> TrailResult<()> {
        if self.map_key_dot_replacement.contains('.') {
            return Err(TrailError::Config(format!(
                "map_key_dot_replacement {:?} must not contain '.'",
                self.map_key_dot_replacement
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn default_config() {
        let c = TrailConfig::default();
        assert_eq!(c.mapping_style, MappingStyle::Fields);
        assert!(!c.new_object_snapshot);
        assert_eq!(c.map_key_dot_replacement, "-");
        assert!(!c.strict_mapping);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = TrailConfig::from_toml_str("mapping_style = \"getters\"\nnew_object_snapshot = true\n")
            .unwrap();
        assert_eq!(c.mapping_style, MappingStyle::Getters);
        assert!(c.new_object_snapshot);
        assert_eq!(c.map_key_dot_replacement, "-");
    }

    #[test]
    fn toml_string_round_trips() {
        let c = TrailConfig {
            strict_mapping: true,
            map_key_dot_replacement: "_".into(),
            ..TrailConfig::default()
        };
        let text = c.to_toml_string().unwrap();
        assert_eq!(TrailConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn bad_values_are_config_errors() {
        assert!(matches!(
            TrailConfig::from_toml_str("mapping_style = \"methods\""),
            Err(TrailError::Config(_))
        ));
        assert!(matches!(
            TrailConfig::from_toml_str("map_key_dot_replacement = \"a.b\""),
            Err(TrailError::Config(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "strict_mapping = true").unwrap();
        let c = TrailConfig::from_toml_file(file.path()).unwrap();
        assert!(c.strict_mapping);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = TrailConfig::from_toml_file(dir.path().join("trail.toml")).unwrap_err();
        assert!(matches!(err, TrailError::Io(_)));
    }
}
