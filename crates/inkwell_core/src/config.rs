//! Client configuration loading.
//!
//! # Responsibility
//! - Describe every tunable of the chapter client in one TOML-backed struct.
//! - Resolve default file locations under the user's config/data dirs.
//!
//! # Invariants
//! - Every field has a default; an absent file yields `ClientConfig::default()`.
//! - A loaded config is validated before it is returned.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "inkwell";
const CONFIG_FILE_NAME: &str = "config.toml";
const SESSION_DB_FILE_NAME: &str = "session.sqlite3";

/// How a cascading unlock is sent to the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockMode {
    /// One `PUT {status: draft}` per reverted chapter, last chapter first.
    #[default]
    PerChapter,
    /// A single `POST /api/chapters/batch_update_status`.
    BatchEndpoint,
}

/// Logging section of the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `trace|debug|info|warn|error`; build-mode default when unset.
    #[serde(default)]
    pub level: Option<String>,
    /// Absolute directory for rolling log files; `<data_local_dir>/inkwell/logs` when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// Top-level client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(alias = "apiBaseUrl", default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(alias = "requestTimeoutSecs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(alias = "unlockMode", default)]
    pub unlock_mode: UnlockMode,
    #[serde(alias = "sessionDb", default)]
    pub session_db: Option<PathBuf>,
    #[serde(default)]
    pub log: LogConfig,
}

fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            unlock_mode: UnlockMode::default(),
            session_db: None,
            log: LogConfig::default(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: Option<PathBuf>, source: toml::de::Error },
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse {
                path: Some(path),
                source,
            } => write!(f, "failed to parse config `{}`: {source}", path.display()),
            Self::Parse { path: None, source } => write!(f, "failed to parse config: {source}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Invalid(_) => None,
        }
    }
}

impl ClientConfig {
    /// Parses and validates config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(text).map_err(|source| ConfigError::Parse { path: None, source })?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the HTTP client cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.api_base_url.trim();
        if base.is_empty() {
            return Err(ConfigError::Invalid("api_base_url must not be empty".to_string()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "api_base_url must start with http:// or https://, got `{base}`"
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if let Some(dir) = &self.log.dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "log.dir must be an absolute path, got `{}`",
                    dir.display()
                )));
            }
        }
        Ok(())
    }

    /// Session database path, falling back to the platform data dir.
    pub fn session_db_path(&self) -> Option<PathBuf> {
        self.session_db.clone().or_else(default_session_db_path)
    }
}

/// `<config_dir>/inkwell/config.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// `<data_dir>/inkwell/session.sqlite3`, when the platform has a data dir.
pub fn default_session_db_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(APP_DIR_NAME).join(SESSION_DB_FILE_NAME))
}

/// Loads config from `path`, or from the default location when `None`.
///
/// A missing file is not an error and yields defaults.
pub fn load_config(path: Option<&Path>) -> Result<ClientConfig, ConfigError> {
    let path = match path.map(Path::to_path_buf).or_else(default_config_path) {
        Some(path) => path,
        None => return Ok(ClientConfig::default()),
    };
    if !path.exists() {
        return Ok(ClientConfig::default());
    }

    let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    let config: ClientConfig = toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: Some(path.clone()),
        source,
    })?;
    config.validate()?;
    Ok(config)
}
