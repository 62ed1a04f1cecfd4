//! Debuglog Config - Pure configuration data structures
//!
//! This crate contains only data structures and loaders, no global state.
//! It serves as the shared configuration vocabulary across all Debuglog crates.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default upper bound for captured stack frames
pub const DEFAULT_STACK_CAP: usize = 15;

/// Directory name used when no log directory is configured
pub const DEFAULT_DIRECTORY_NAME: &str = "Logs";

/// Environment variable enabling console passthrough for debug records
pub const ENV_DEBUG: &str = "DEBUGLOG_DEBUG";
/// Environment variable overriding the log directory
pub const ENV_DIRECTORY: &str = "DEBUGLOG_DIR";
/// Environment variable overriding the stack frame cap
pub const ENV_STACK_CAP: &str = "DEBUGLOG_STACK_CAP";

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("cannot read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON for [`LoggerConfig`]
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    /// An environment override has an unusable value
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// Logger configuration
///
/// Recognised JSON keys: `debug`, `logDirectory`, `stackCap`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggerConfig {
    /// Forward debug records to the console adapter
    pub debug: bool,
    /// Output directory (None means [`default_log_directory`])
    pub log_directory: Option<PathBuf>,
    /// Maximum number of stack frames kept per error
    pub stack_cap: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            debug: false,
            log_directory: None,
            stack_cap: DEFAULT_STACK_CAP,
        }
    }
}

impl LoggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_log_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.log_directory = Some(directory.into());
        self
    }

    pub fn with_stack_cap(mut self, cap: usize) -> Self {
        self.stack_cap = cap;
        self
    }

    /// The directory records are written to
    pub fn resolved_directory(&self) -> PathBuf {
        self.log_directory
            .clone()
            .unwrap_or_else(default_log_directory)
    }

    /// Parse a JSON document; missing keys keep their defaults
    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(source)?)
    }

    /// Read and parse a JSON config file
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Defaults overlaid with `DEBUGLOG_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().merge_env()
    }

    /// Overlay `DEBUGLOG_*` environment variables on top of this config
    pub fn merge_env(self) -> Result<Self, ConfigError> {
        self.merge_with(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary key lookup
    pub fn merge_with<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_DEBUG) {
            self.debug = parse_flag(ENV_DEBUG, &value)?;
        }
        if let Some(value) = lookup(ENV_DIRECTORY) {
            if !value.trim().is_empty() {
                self.log_directory = Some(PathBuf::from(value));
            }
        }
        if let Some(value) = lookup(ENV_STACK_CAP) {
            self.stack_cap = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    key: ENV_STACK_CAP,
                    value,
                })?;
        }
        Ok(self)
    }
}

/// `Logs/` next to the running executable, or under the working directory
pub fn default_log_directory() -> PathBuf {
    let base = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_default();
    base.join(DEFAULT_DIRECTORY_NAME)
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}
