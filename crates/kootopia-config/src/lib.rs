use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub mod syntax_rules;

pub use syntax_rules::{ConfigLoadResult, SyntaxRules, load_syntax_rules_with_fallback};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to read rules file at {path}: {source}")]
    RulesReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse rules file {name}: {source}")]
    RulesParseError {
        name: String,
        source: serde_json::Error,
    },

    #[error("Invalid value in config file at {config_path}: {field} must be greater than zero")]
    ZeroTimeout {
        config_path: PathBuf,
        field: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding source files; tokenizer configs live in its
    /// `configs/` subdirectory
    pub files_path: PathBuf,
    #[serde(default = "default_server_address")]
    pub server_address: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
    #[serde(default = "default_autosave")]
    pub autosave: bool,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_extension")]
    pub default_extension: String,
}

fn default_server_address() -> String {
    "localhost:8080".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_read_timeout_ms() -> u64 {
    30_000
}

fn default_write_timeout_ms() -> u64 {
    10_000
}

fn default_autosave() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    2_000
}

fn default_extension() -> String {
    ".kt".to_string()
}

impl Config {
    /// Defaults for everything but the files directory
    pub fn with_files_path(files_path: impl Into<PathBuf>) -> Self {
        Self {
            files_path: files_path.into(),
            server_address: default_server_address(),
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
            autosave: default_autosave(),
            debounce_ms: default_debounce_ms(),
            default_extension: default_extension(),
        }
    }

    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Sockets reject a zero timeout outright
        if let Some(field) = config.zero_timeout() {
            return Err(ConfigError::ZeroTimeout {
                config_path: config_path.to_path_buf(),
                field,
            });
        }

        // Expand shell variables and tilde in the files directory
        config.files_path = Self::expand_path(&config.files_path).unwrap_or(config.files_path);

        Ok(Some(config))
    }

    /// Name of the first timeout field set to zero, if any
    fn zero_timeout(&self) -> Option<&'static str> {
        [
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("read_timeout_ms", self.read_timeout_ms),
            ("write_timeout_ms", self.write_timeout_ms),
        ]
        .into_iter()
        .find(|(_, ms)| *ms == 0)
        .map(|(field, _)| field)
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        log::info!("saved config to {}", config_path.display());
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/kootopia");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Where tokenizer rule files are kept
    pub fn configs_dir(&self) -> PathBuf {
        self.files_path.join("configs")
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}
