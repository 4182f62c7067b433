use craftspace_common::Material;
use craftspace_kernel::{RegistryConfig, StaticCatalog};
use craftspace_material::MaterialPredicate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::{ConfigError, read_file};

/// Server-wide registry settings.
///
/// ```yaml
/// release_delay_secs: 30
/// covering: [SNOW_LAYER, "WOOL:0"]
/// messages:
///   release.done: "Craft released"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub release_delay_secs: u64,
    pub covering: MaterialPredicate,
    /// Overrides for the built-in English message templates.
    pub messages: StaticCatalog,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            release_delay_secs: 15,
            covering: MaterialPredicate::of(Material::SNOW_LAYER),
            messages: StaticCatalog::new(),
        }
    }
}

impl Settings {
    /// Load settings from `path`; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }
        read_file(path)
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            release_delay: Duration::from_secs(self.release_delay_secs),
            covering: self.covering.clone(),
        }
    }

    /// English templates with this file's overrides applied.
    pub fn catalog(&self) -> StaticCatalog {
        let mut catalog = StaticCatalog::english();
        catalog.merge(self.messages.clone());
        catalog
    }
}
