use std::path::PathBuf;
use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `permgate`.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide recovery strategy; internal code continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum PermError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Permission store ────────────────────────────────────────────────
    #[error("store: {0}")]
    Store(#[from] StoreError),

    // ── Registry ────────────────────────────────────────────────────────
    #[error("registry: {0}")]
    Registry(#[from] RegistryError),

    // ── Admin web UI ────────────────────────────────────────────────────
    #[error("webui: {0}")]
    Web(#[from] WebError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Permission store errors ────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    /// The persisted store failed to parse at startup. Fatal: the process
    /// must not run with a half-parsed store.
    #[error("permission store {} is corrupt: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    /// The backing file could not be read or written. Surfaced to the
    /// caller for a retry decision; never interpreted as "member by default".
    #[error("permission store unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

// ─── Registry errors ────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("plugin not found: {0}")]
    PluginNotFound(String),

    #[error("command not found in plugin {plugin}: {command}")]
    CommandNotFound { plugin: String, command: String },

    #[error("invalid permission level {0:?}, expected \"admin\" or \"member\"")]
    InvalidLevel(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ─── Admin web UI errors ────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum WebError {
    #[error("failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("unauthorized")]
    Unauthorized,
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, PermError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plugin_not_found_names_the_plugin() {
        let err = PermError::Registry(RegistryError::PluginNotFound("astrbot".into()));
        assert!(err.to_string().contains("astrbot"));
    }

    #[test]
    fn command_not_found_names_both_parts() {
        let err = RegistryError::CommandNotFound {
            plugin: "astrbot".into(),
            command: "ping".into(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("astrbot"));
        assert!(rendered.contains("ping"));
    }

    #[test]
    fn invalid_level_names_the_offending_value() {
        let err = RegistryError::InvalidLevel("owner".into());
        assert!(err.to_string().contains("owner"));
        assert!(err.to_string().contains("admin"));
    }

    #[test]
    fn io_error_maps_to_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: StoreError = io.into();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn anyhow_interop() {
        let anyhow_err = anyhow::anyhow!("something went wrong");
        let perm_err: PermError = anyhow_err.into();
        assert!(perm_err.to_string().contains("something went wrong"));
    }
}
