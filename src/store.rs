//! Durable per-command permission override store.
//!
//! The store is the same physical file the host bot mutates through its own
//! single-command override mechanism, serialized as
//! `{plugin: {command: {"permission": "admin"|"member", ...}}}`. Because the
//! host may write the file at any time, nothing is cached between logical
//! operations: every read re-reads the file, every write is a
//! read-modify-write under the write lock with a durable temp-file + rename
//! before the call returns.

use crate::error::{RegistryError, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::RwLock;

/// Access level controlling who may invoke a command.
///
/// `Member` is the implicit default for any command without an explicit
/// override. There is deliberately no third value: parsing anything else
/// fails with `InvalidLevel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    Admin,
    #[default]
    Member,
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Member => write!(f, "member"),
        }
    }
}

impl FromStr for PermissionLevel {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "member" => Ok(Self::Member),
            other => Err(RegistryError::InvalidLevel(other.to_string())),
        }
    }
}

/// The `(plugin, command)` pair uniquely naming a permission target.
/// Case-sensitive, immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandIdentity {
    pub plugin: String,
    pub command: String,
}

impl CommandIdentity {
    pub fn new(plugin: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            command: command.into(),
        }
    }
}

impl fmt::Display for CommandIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.plugin, self.command)
    }
}

/// Persisted per-command override record.
///
/// Optional keys are omitted on serialization so a permission-only record
/// round-trips as exactly `{"permission": "admin"}`, the shape the host's
/// native override command reads and writes. Unknown keys written by the
/// host are dropped on rewrite of that record only; records this process
/// never touches are carried through verbatim at the map level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<PermissionLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliases: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl CommandOverride {
    fn is_empty(&self) -> bool {
        self.permission.is_none() && self.aliases.is_none() && self.name.is_none()
    }
}

type StoreData = BTreeMap<String, BTreeMap<String, CommandOverride>>;

/// One process-wide guarded handle over the override file.
///
/// All mutations to a given identity are totally ordered by the single
/// `RwLock`; `set_many` holds the write lock for the whole batch so a
/// concurrent reader observes either the fully-old or fully-new levels.
#[derive(Debug)]
pub struct PermissionStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl PermissionStore {
    /// Open the store at `path`. A missing file is an empty store; a file
    /// that exists but fails to parse is a fatal `Corrupt` error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            if let Err(err) = serde_json::from_str::<StoreData>(&contents) {
                return Err(StoreError::Corrupt {
                    path,
                    reason: err.to_string(),
                });
            }
        }
        Ok(Self {
            path,
            lock: RwLock::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored level for `id`, or `Member` when no explicit override exists.
    pub fn get(&self, id: &CommandIdentity) -> Result<PermissionLevel, StoreError> {
        Ok(self
            .override_for(id)?
            .and_then(|record| record.permission)
            .unwrap_or_default())
    }

    /// The full override record for `id`, if one is explicitly present.
    pub fn override_for(&self, id: &CommandIdentity) -> Result<Option<CommandOverride>, StoreError> {
        let _guard = self
            .lock
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let data = self.load()?;
        Ok(data
            .get(&id.plugin)
            .and_then(|plugin| plugin.get(&id.command))
            .cloned())
    }

    /// One plugin's override records in a single locked read, so a listing
    /// built from it is a consistent snapshot even against concurrent
    /// batch writes.
    pub fn plugin_overrides(
        &self,
        plugin: &str,
    ) -> Result<BTreeMap<String, CommandOverride>, StoreError> {
        let _guard = self
            .lock
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let data = self.load()?;
        Ok(data.get(plugin).cloned().unwrap_or_default())
    }

    /// Set the level for a single identity. Durable before return.
    pub fn set_one(&self, id: &CommandIdentity, level: PermissionLevel) -> Result<(), StoreError> {
        self.set_many(std::slice::from_ref(id), level)
    }

    /// Set the level for every identity in one critical section and one
    /// persisted write. A concurrent lister never observes a partial batch.
    pub fn set_many(
        &self,
        ids: &[CommandIdentity],
        level: PermissionLevel,
    ) -> Result<(), StoreError> {
        let _guard = self
            .lock
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut data = self.load()?;
        for id in ids {
            data.entry(id.plugin.clone())
                .or_default()
                .entry(id.command.clone())
                .or_default()
                .permission = Some(level);
        }
        self.persist(&data)
    }

    /// Replace the alias list for `id`. An empty list is stored explicitly,
    /// matching the host's behavior of recording cleared aliases.
    pub fn set_aliases(&self, id: &CommandIdentity, aliases: Vec<String>) -> Result<(), StoreError> {
        self.update(id, |record| record.aliases = Some(aliases))
    }

    /// Record a display-name override for `id`.
    pub fn set_name(&self, id: &CommandIdentity, name: String) -> Result<(), StoreError> {
        self.update(id, |record| record.name = Some(name))
    }

    /// Snapshot of explicitly-present permission entries only (no defaults).
    /// Diagnostics surface; the registry uses `get` for listings.
    pub fn list_all(&self) -> Result<Vec<(CommandIdentity, PermissionLevel)>, StoreError> {
        let _guard = self
            .lock
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let data = self.load()?;
        let mut entries = Vec::new();
        for (plugin, commands) in &data {
            for (command, record) in commands {
                if let Some(level) = record.permission {
                    entries.push((CommandIdentity::new(plugin, command), level));
                }
            }
        }
        Ok(entries)
    }

    fn update(
        &self,
        id: &CommandIdentity,
        apply: impl FnOnce(&mut CommandOverride),
    ) -> Result<(), StoreError> {
        let _guard = self
            .lock
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut data = self.load()?;
        let record = data
            .entry(id.plugin.clone())
            .or_default()
            .entry(id.command.clone())
            .or_default();
        apply(record);
        let emptied = record.is_empty();
        if emptied
            && let Some(plugin) = data.get_mut(&id.plugin)
        {
            plugin.remove(&id.command);
        }
        self.persist(&data)
    }

    /// Re-read the authoritative file. Callers must hold the lock. A file
    /// that disappears between operations reads as empty; a parse failure
    /// mid-run surfaces as `Unavailable` (the host may be rewriting it),
    /// never as a silent default.
    fn load(&self) -> Result<StoreData, StoreError> {
        if !self.path.exists() {
            return Ok(StoreData::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        serde_json::from_str(&contents)
            .map_err(|err| StoreError::Unavailable(format!("unreadable store: {err}")))
    }

    /// Durable write: temp file in the same directory, fsync, rename over
    /// the original. A crash immediately after return cannot lose the write.
    fn persist(&self, data: &StoreData) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(data)
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        let mut file = File::create(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> PermissionStore {
        PermissionStore::open(dir.path().join("alter_cmd.json")).unwrap()
    }

    #[test]
    fn unset_identity_defaults_to_member() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let id = CommandIdentity::new("astrbot", "help");
        assert_eq!(store.get(&id).unwrap(), PermissionLevel::Member);
    }

    #[test]
    fn set_then_get_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let id = CommandIdentity::new("astrbot", "ping");
        store.set_one(&id, PermissionLevel::Admin).unwrap();
        assert_eq!(store.get(&id).unwrap(), PermissionLevel::Admin);
        store.set_one(&id, PermissionLevel::Member).unwrap();
        assert_eq!(store.get(&id).unwrap(), PermissionLevel::Member);
    }

    #[test]
    fn overwrites_replace_never_append() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let id = CommandIdentity::new("astrbot", "stats");
        store.set_one(&id, PermissionLevel::Admin).unwrap();
        store.set_one(&id, PermissionLevel::Admin).unwrap();
        assert_eq!(store.list_all().unwrap().len(), 1);
    }

    #[test]
    fn list_all_reports_explicit_entries_only() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store
            .set_one(
                &CommandIdentity::new("astrbot", "help"),
                PermissionLevel::Admin,
            )
            .unwrap();
        let entries = store.list_all().unwrap();
        assert_eq!(
            entries,
            vec![(
                CommandIdentity::new("astrbot", "help"),
                PermissionLevel::Admin
            )]
        );
    }

    #[test]
    fn persisted_shape_matches_host_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alter_cmd.json");
        let store = PermissionStore::open(&path).unwrap();
        store
            .set_one(
                &CommandIdentity::new("astrbot", "help"),
                PermissionLevel::Admin,
            )
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["astrbot"]["help"], serde_json::json!({"permission": "admin"}));
    }

    #[test]
    fn reads_host_written_entries_without_restart() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alter_cmd.json");
        let store = PermissionStore::open(&path).unwrap();

        // The host's own override command writes the same file out-of-band.
        std::fs::write(&path, r#"{"astrbot": {"ping": {"permission": "admin"}}}"#).unwrap();
        assert_eq!(
            store.get(&CommandIdentity::new("astrbot", "ping")).unwrap(),
            PermissionLevel::Admin
        );
    }

    #[test]
    fn tolerates_alias_and_name_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alter_cmd.json");
        std::fs::write(
            &path,
            r#"{"astrbot": {"help": {"permission": "admin", "aliases": ["h"], "name": "manual"}}}"#,
        )
        .unwrap();
        let store = PermissionStore::open(&path).unwrap();
        let record = store
            .override_for(&CommandIdentity::new("astrbot", "help"))
            .unwrap()
            .unwrap();
        assert_eq!(record.permission, Some(PermissionLevel::Admin));
        assert_eq!(record.aliases.as_deref(), Some(&["h".to_string()][..]));
        assert_eq!(record.name.as_deref(), Some("manual"));
    }

    #[test]
    fn corrupt_file_is_fatal_at_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alter_cmd.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = PermissionStore::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn set_many_persists_every_identity_in_one_write() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let ids = vec![
            CommandIdentity::new("astrbot", "help"),
            CommandIdentity::new("astrbot", "ping"),
            CommandIdentity::new("astrbot", "stats"),
        ];
        store.set_many(&ids, PermissionLevel::Admin).unwrap();
        for id in &ids {
            assert_eq!(store.get(id).unwrap(), PermissionLevel::Admin);
        }
        assert_eq!(store.list_all().unwrap().len(), 3);
    }

    #[test]
    fn invalid_level_string_rejected() {
        let err = "owner".parse::<PermissionLevel>().unwrap_err();
        assert!(matches!(err, RegistryError::InvalidLevel(ref v) if v == "owner"));
    }

    #[test]
    fn level_parse_is_case_sensitive() {
        assert!("Admin".parse::<PermissionLevel>().is_err());
        assert_eq!(
            "admin".parse::<PermissionLevel>().unwrap(),
            PermissionLevel::Admin
        );
    }

    #[test]
    fn level_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&PermissionLevel::Admin).unwrap(),
            "\"admin\""
        );
        let level: PermissionLevel = serde_json::from_str("\"member\"").unwrap();
        assert_eq!(level, PermissionLevel::Member);
    }

    #[test]
    fn aliases_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let id = CommandIdentity::new("astrbot", "help");
        store
            .set_aliases(&id, vec!["h".into(), "manual".into()])
            .unwrap();
        let record = store.override_for(&id).unwrap().unwrap();
        assert_eq!(
            record.aliases,
            Some(vec!["h".to_string(), "manual".to_string()])
        );
        // Permission stays defaulted.
        assert_eq!(store.get(&id).unwrap(), PermissionLevel::Member);
    }
}
