use craftspace_kernel::CraftType;
use craftspace_material::MaterialPredicate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::{ConfigError, read_file};

const SUFFIXES: [&str; 3] = [".craft.yml", ".craft.yaml", ".craft.json"];

/// Serialized form of a [`CraftType`].
///
/// ```yaml
/// name: Ship
/// allowed: [WOOD, WOOL, "WOOL:14"]
/// max_size: 500
/// smoke_on_cruise: true
/// smoke_sources: [FURNACE]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CraftTypeDef {
    pub name: String,
    pub allowed: MaterialPredicate,
    #[serde(default)]
    pub forbidden: MaterialPredicate,
    #[serde(default = "default_min_size")]
    pub min_size: usize,
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    #[serde(default)]
    pub min_height: i32,
    #[serde(default = "default_max_height")]
    pub max_height: i32,
    #[serde(default)]
    pub cruise_on_pilot: bool,
    #[serde(default)]
    pub smoke_on_cruise: bool,
    #[serde(default)]
    pub smoke_sources: MaterialPredicate,
}

fn default_min_size() -> usize {
    1
}

fn default_max_size() -> usize {
    10_000
}

fn default_max_height() -> i32 {
    255
}

impl CraftTypeDef {
    /// Validate and convert into the runtime type.
    pub fn into_craft_type(self) -> Result<CraftType, ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid {
            name: self.name.clone(),
            reason,
        };
        if self.name.trim().is_empty() {
            return Err(invalid("name is empty".into()));
        }
        if self.allowed.is_trivial() {
            return Err(invalid("allowed matches nothing".into()));
        }
        if self.min_size == 0 || self.min_size > self.max_size {
            return Err(invalid(format!(
                "size range {}..={} is empty",
                self.min_size, self.max_size
            )));
        }
        if self.min_height > self.max_height {
            return Err(invalid(format!(
                "height range {}..={} is empty",
                self.min_height, self.max_height
            )));
        }

        let mut craft_type = CraftType::new(self.name, self.allowed);
        craft_type.forbidden = self.forbidden;
        craft_type.min_size = self.min_size;
        craft_type.max_size = self.max_size;
        craft_type.min_height = self.min_height;
        craft_type.max_height = self.max_height;
        craft_type.cruise_on_pilot = self.cruise_on_pilot;
        craft_type.smoke_on_cruise = self.smoke_on_cruise;
        craft_type.smoke_sources = self.smoke_sources;
        Ok(craft_type)
    }
}

impl From<&CraftType> for CraftTypeDef {
    fn from(t: &CraftType) -> Self {
        Self {
            name: t.name.clone(),
            allowed: t.allowed.clone(),
            forbidden: t.forbidden.clone(),
            min_size: t.min_size,
            max_size: t.max_size,
            min_height: t.min_height,
            max_height: t.max_height,
            cruise_on_pilot: t.cruise_on_pilot,
            smoke_on_cruise: t.smoke_on_cruise,
            smoke_sources: t.smoke_sources.clone(),
        }
    }
}

/// Load one craft type file (YAML or JSON by extension).
pub fn load_craft_type(path: impl AsRef<Path>) -> Result<CraftType, ConfigError> {
    let path = path.as_ref();
    let def: CraftTypeDef = read_file(path)?;
    let craft_type = def.into_craft_type()?;
    tracing::debug!(path = %path.display(), name = %craft_type.name, "loaded craft type");
    Ok(craft_type)
}

fn is_definition(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| SUFFIXES.iter().any(|s| name.ends_with(s)))
}

/// Load every craft type definition in `dir`, ordered by file name.
///
/// Other files are ignored. Two files defining the same name is an error.
pub fn load_craft_types(dir: impl AsRef<Path>) -> Result<Vec<CraftType>, ConfigError> {
    let dir = dir.as_ref();
    let io = |source| ConfigError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io)? {
        let path = entry.map_err(io)?.path();
        if path.is_file() && is_definition(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    let mut seen: HashMap<String, PathBuf> = HashMap::new();
    let mut types = Vec::with_capacity(paths.len());
    for path in paths {
        let craft_type = load_craft_type(&path)?;
        if seen.contains_key(&craft_type.name) {
            return Err(ConfigError::Duplicate {
                name: craft_type.name,
                path,
            });
        }
        seen.insert(craft_type.name.clone(), path);
        types.push(craft_type);
    }
    tracing::info!(dir = %dir.display(), count = types.len(), "loaded craft types");
    Ok(types)
}
