//! Configuration: craft type definitions and registry settings.
//!
//! Craft types live one per file (`*.craft.yml`, `*.craft.yaml` or
//! `*.craft.json`). Settings are a single optional file; a missing file
//! means defaults.
//!
//! # Invariants
//! - A loaded `CraftType` always has a non-empty name, a non-trivial
//!   `allowed` predicate and ordered size and height ranges.
//! - Type names are unique within one loaded directory.

mod craft_type;
mod error;
mod settings;

pub use craft_type::{CraftTypeDef, load_craft_type, load_craft_types};
pub use error::ConfigError;
pub use settings::Settings;

use serde::de::DeserializeOwned;
use std::path::Path;

/// On-disk encodings, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yml" | "yaml") => Ok(Format::Yaml),
            Some("json") => Ok(Format::Json),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

pub(crate) fn read_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let format = Format::from_path(path)?;
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    match format {
        Format::Yaml => serde_yaml::from_str(&text).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        }),
        Format::Json => serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_extension() {
        assert_eq!(Format::from_path(Path::new("a.craft.yml")).unwrap(), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("settings.yaml")).unwrap(), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("a.craft.json")).unwrap(), Format::Json);
        assert!(matches!(
            Format::from_path(Path::new("a.toml")),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }
}
