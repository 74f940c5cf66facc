//! The only component that understands the plugin/command join.
//!
//! Joins the read-only [`PluginCatalog`] with the durable [`PermissionStore`]
//! to answer "what is plugin X's command list with current permissions" and
//! to perform validated single/batch mutations. Validation always happens
//! against the catalog before any write: a batch with an unknown plugin
//! leaves the store byte-identical.

use crate::catalog::{PluginCatalog, PluginDescriptor};
use crate::error::RegistryError;
use crate::store::{CommandIdentity, PermissionLevel, PermissionStore};
use serde::Serialize;
use std::sync::Arc;

/// One row of `list_plugins`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginSummary {
    pub name: String,
    /// Every command descriptor of the plugin, group roots counted once.
    pub command_count: usize,
    /// How many of those are command-group roots.
    pub group_count: usize,
}

/// One row of `list_commands`: a catalog descriptor joined with its
/// current override state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandStatus {
    /// Display name; the rename override when one exists.
    pub name: String,
    /// The invocation token the plugin registered.
    pub original_name: String,
    pub is_group: bool,
    pub level: PermissionLevel,
    /// Whether `level` comes from an explicit store entry rather than the
    /// implicit member default.
    pub explicit: bool,
    pub aliases: Vec<String>,
    pub description: String,
}

/// Outcome of a batch set, reported like the host does: applied/total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub applied: usize,
    pub total: usize,
}

pub struct PermissionRegistry {
    catalog: Arc<dyn PluginCatalog>,
    store: Arc<PermissionStore>,
}

impl PermissionRegistry {
    pub fn new(catalog: Arc<dyn PluginCatalog>, store: Arc<PermissionStore>) -> Self {
        Self { catalog, store }
    }

    pub fn store(&self) -> &PermissionStore {
        &self.store
    }

    /// Enabled plugins in catalog order with their command counts.
    pub fn list_plugins(&self) -> Vec<PluginSummary> {
        self.catalog
            .enabled_plugins()
            .into_iter()
            .map(|plugin| {
                let group_count = plugin
                    .commands
                    .iter()
                    .filter(|command| command.is_group)
                    .count();
                PluginSummary {
                    command_count: plugin.commands.len(),
                    group_count,
                    name: plugin.name,
                }
            })
            .collect()
    }

    /// Every command of `plugin` with its current level, in catalog order.
    /// Overrides come from one locked store read, so the listing is a
    /// consistent snapshot against concurrent batch writes.
    pub fn list_commands(&self, plugin: &str) -> Result<Vec<CommandStatus>, RegistryError> {
        let descriptor = self.find_plugin(plugin)?;
        let overrides = self.store.plugin_overrides(plugin)?;
        descriptor
            .commands
            .iter()
            .map(|command| {
                let record = overrides.get(&command.name).cloned().unwrap_or_default();
                Ok(CommandStatus {
                    name: record.name.clone().unwrap_or_else(|| command.name.clone()),
                    original_name: command.name.clone(),
                    is_group: command.is_group,
                    level: record.permission.unwrap_or_default(),
                    explicit: record.permission.is_some(),
                    aliases: record.aliases.unwrap_or_default(),
                    description: command.description.clone(),
                })
            })
            .collect()
    }

    /// Batch primitive: one level for every command of `plugin`, applied as
    /// a single atomic store write. Exists so an operator never has to issue
    /// O(n) single-command overrides by hand.
    pub fn set_plugin_level(
        &self,
        plugin: &str,
        level: PermissionLevel,
    ) -> Result<BatchOutcome, RegistryError> {
        let descriptor = self.find_plugin(plugin)?;
        let ids: Vec<CommandIdentity> = descriptor
            .commands
            .iter()
            .map(|command| CommandIdentity::new(plugin, &command.name))
            .collect();
        self.store.set_many(&ids, level)?;
        Ok(BatchOutcome {
            applied: ids.len(),
            total: ids.len(),
        })
    }

    /// Set one command's level after checking the pair exists in the catalog.
    pub fn set_command_level(
        &self,
        plugin: &str,
        command: &str,
        level: PermissionLevel,
    ) -> Result<(), RegistryError> {
        let id = self.resolve(plugin, command)?;
        self.store.set_one(&id, level)?;
        Ok(())
    }

    /// Current alias list for one command (empty when none are set).
    pub fn command_aliases(&self, plugin: &str, command: &str) -> Result<Vec<String>, RegistryError> {
        let id = self.resolve(plugin, command)?;
        Ok(self
            .store
            .override_for(&id)?
            .and_then(|record| record.aliases)
            .unwrap_or_default())
    }

    /// Replace one command's alias list.
    pub fn set_command_aliases(
        &self,
        plugin: &str,
        command: &str,
        aliases: Vec<String>,
    ) -> Result<(), RegistryError> {
        let id = self.resolve(plugin, command)?;
        self.store.set_aliases(&id, aliases)?;
        Ok(())
    }

    /// Record a display-name override. The identity keeps the registered
    /// token; only the rendered name changes.
    pub fn rename_command(
        &self,
        plugin: &str,
        command: &str,
        new_name: &str,
    ) -> Result<(), RegistryError> {
        let id = self.resolve(plugin, command)?;
        self.store.set_name(&id, new_name.to_string())?;
        Ok(())
    }

    fn find_plugin(&self, name: &str) -> Result<PluginDescriptor, RegistryError> {
        self.catalog
            .enabled_plugins()
            .into_iter()
            .find(|plugin| plugin.name == name)
            .ok_or_else(|| RegistryError::PluginNotFound(name.to_string()))
    }

    fn resolve(&self, plugin: &str, command: &str) -> Result<CommandIdentity, RegistryError> {
        let descriptor = self.find_plugin(plugin)?;
        if !descriptor.commands.iter().any(|c| c.name == command) {
            return Err(RegistryError::CommandNotFound {
                plugin: plugin.to_string(),
                command: command.to_string(),
            });
        }
        Ok(CommandIdentity::new(plugin, command))
    }
}
