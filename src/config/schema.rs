use crate::error::ConfigError;
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Admin web UI settings, the `[webui]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebUiConfig {
    /// Serve the admin UI (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Shared secret presented at login. Ships as a fixed placeholder the
    /// operator is expected to replace.
    #[serde(default = "default_secret_key")]
    pub secret_key: String,
    /// Web UI port (default: 8888)
    #[serde(default = "default_webui_port")]
    pub port: u16,
    /// Web UI bind host (default: 0.0.0.0)
    #[serde(default = "default_webui_host")]
    pub host: String,
}

fn default_true() -> bool {
    true
}

fn default_secret_key() -> String {
    "PermissionManager".into()
}

fn default_webui_port() -> u16 {
    8888
}

fn default_webui_host() -> String {
    "0.0.0.0".into()
}

impl Default for WebUiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            secret_key: default_secret_key(),
            port: default_webui_port(),
            host: default_webui_host(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip)]
    pub config_path: PathBuf,
    /// The override file shared with the host's native permission command.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    /// TOML snapshot of the plugin catalog, for running without a live host.
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
    /// Accept `perm …` chat commands (default: true)
    #[serde(default = "default_true")]
    pub command_enabled: bool,
    /// Log every permission mutation at info level (default: false)
    #[serde(default)]
    pub log_permission_changes: bool,
    #[serde(default)]
    pub webui: WebUiConfig,
}

fn permgate_dir() -> PathBuf {
    let home = UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());
    home.join(".permgate")
}

fn default_store_path() -> PathBuf {
    permgate_dir().join("alter_cmd.json")
}

impl Default for Config {
    fn default() -> Self {
        let dir = permgate_dir();
        Self {
            config_path: dir.join("config.toml"),
            store_path: dir.join("alter_cmd.json"),
            catalog_path: None,
            command_enabled: true,
            log_permission_changes: false,
            webui: WebUiConfig::default(),
        }
    }
}

impl Config {
    /// Load `~/.permgate/config.toml`, writing the defaults on first run.
    pub fn load_or_init() -> Result<Self, ConfigError> {
        let dir = permgate_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        Self::load_or_init_at(dir.join("config.toml"))
    }

    /// Same as [`Config::load_or_init`] with an explicit path.
    pub fn load_or_init_at(config_path: PathBuf) -> Result<Self, ConfigError> {
        if config_path.exists() {
            let contents = fs::read_to_string(&config_path)?;
            let mut config: Config = toml::from_str(&contents)
                .map_err(|err| ConfigError::Load(format!("{}: {err}", config_path.display())))?;
            config.config_path = config_path;
            config.validate()?;
            Ok(config)
        } else {
            let config = Self {
                config_path,
                ..Self::default()
            };
            config.save()?;
            Ok(config)
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.webui.enabled && self.webui.secret_key.trim().is_empty() {
            return Err(ConfigError::Validation(
                "webui.secret_key must not be empty while the web UI is enabled".into(),
            ));
        }
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("PERMGATE_STORE")
            && !path.is_empty()
        {
            self.store_path = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("PERMGATE_CATALOG")
            && !path.is_empty()
        {
            self.catalog_path = Some(PathBuf::from(path));
        }

        if let Ok(secret) = std::env::var("PERMGATE_SECRET_KEY")
            && !secret.is_empty()
        {
            self.webui.secret_key = secret;
        }

        if let Ok(port_str) = std::env::var("PERMGATE_WEBUI_PORT")
            && let Ok(port) = port_str.parse::<u16>()
        {
            self.webui.port = port;
        }

        if let Ok(host) = std::env::var("PERMGATE_WEBUI_HOST")
            && !host.is_empty()
        {
            self.webui.host = host;
        }
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let toml_str = toml::to_string_pretty(self)
            .map_err(|err| ConfigError::Load(format!("failed to serialize config: {err}")))?;
        fs::write(&self.config_path, toml_str)?;
        Ok(())
    }
}
