//! Host-provided, read-only enumeration of loaded plugins and their commands.
//!
//! The host framework owns plugin lifecycle; this crate only reads. Embedders
//! implement [`PluginCatalog`] over their live handler registry. The bundled
//! [`StaticCatalog`] loads a TOML snapshot so the standalone binary and tests
//! can run without a host.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A single command (or command-group root) a plugin registers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDescriptor {
    pub name: String,
    /// Command groups are counted once, under their root token.
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub commands: Vec<CommandDescriptor>,
}

fn default_true() -> bool {
    true
}

/// Capability interface the registry reads. Implementations return only
/// enabled plugins, in the host's registration order.
pub trait PluginCatalog: Send + Sync {
    fn enabled_plugins(&self) -> Vec<PluginDescriptor>;
}

/// Catalog backed by an in-memory snapshot, loadable from a TOML file of
/// `[[plugins]]` tables.
pub struct StaticCatalog {
    plugins: Vec<PluginDescriptor>,
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    plugins: Vec<PluginDescriptor>,
}

impl StaticCatalog {
    pub fn new(plugins: Vec<PluginDescriptor>) -> Self {
        Self { plugins }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let file: CatalogFile = toml::from_str(&contents).map_err(|err| {
            ConfigError::Load(format!("catalog {}: {err}", path.display()))
        })?;
        Ok(Self::new(file.plugins))
    }
}

impl PluginCatalog for StaticCatalog {
    fn enabled_plugins(&self) -> Vec<PluginDescriptor> {
        self.plugins
            .iter()
            .filter(|plugin| plugin.enabled)
            .cloned()
            .collect()
    }
}
