//! Configuration management for esexport
//!
//! This module handles loading, parsing, and managing configuration from:
//! - Configuration files (TOML format)
//! - Command-line arguments (applied by the CLI layer)
//!
//! Configuration precedence (highest to lowest):
//! 1. Command-line arguments
//! 2. Configuration file
//! 3. Default values

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend connection configuration
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Export layout configuration
    #[serde(default)]
    pub export: ExportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Base URL of the search backend
    #[serde(default = "default_host")]
    pub host: String,

    /// Index to search (empty searches every index)
    #[serde(default)]
    pub index: String,

    /// Document type appended to the search path
    #[serde(default)]
    pub doc_type: String,

    /// Routing value passed with the search request
    #[serde(default)]
    pub routing: String,

    /// How long the backend keeps each scroll context alive
    #[serde(default = "default_scroll_ttl")]
    pub scroll_ttl: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

/// Export layout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Number of slices (0 and 1 both mean unsliced)
    #[serde(default = "default_slices")]
    pub slices: usize,

    /// Field the backend slices on (backend default when unset)
    #[serde(default)]
    pub slice_field: Option<String>,

    /// Interval between progress polls in milliseconds
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,

    /// Show a progress bar while exporting
    #[serde(default = "default_show_progress")]
    pub show_progress: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,

    /// Log each slice's initial query and total
    #[serde(default)]
    pub trace_queries: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// Default value functions
fn default_host() -> String {
    "http://localhost:9200".to_string()
}

fn default_scroll_ttl() -> String {
    "1m".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_slices() -> usize {
    1
}

fn default_progress_interval_ms() -> u64 {
    500
}

fn default_show_progress() -> bool {
    true
}

fn default_log_level() -> LogLevel {
    LogLevel::Warn
}

fn default_log_timestamps() -> bool {
    true
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            index: String::new(),
            doc_type: String::new(),
            routing: String::new(),
            scroll_ttl: default_scroll_ttl(),
            timeout: default_timeout(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            slices: default_slices(),
            slice_field: None,
            progress_interval_ms: default_progress_interval_ms(),
            show_progress: default_show_progress(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
            trace_queries: false,
        }
    }
}

impl Config {
    /// Load configuration from a file
    ///
    /// With an explicit path the file must exist. Without one, the default
    /// path is tried and defaults are used when it is absent.
    ///
    /// # Arguments
    /// * `path` - Optional path to a TOML configuration file
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    pub fn load_from_file(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::FileNotFound(p.display().to_string()).into());
                }
                p.to_path_buf()
            }
            None => {
                let default = Self::default_path();
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Serialize configuration to TOML text
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".esexport")
            .join("config.toml")
    }

    /// Validate the configuration
    ///
    /// # Returns
    /// * `Result<()>` - Ok if valid, error otherwise
    pub fn validate(&self) -> Result<()> {
        self.connection.validate_host()?;

        if self.connection.timeout == 0 {
            return Err(ConfigError::InvalidValue {
                field: "connection.timeout".to_string(),
                value: "0".to_string(),
            }
            .into());
        }

        if self.export.progress_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "export.progress_interval_ms".to_string(),
                value: "0".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Get progress poll interval as Duration
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.export.progress_interval_ms)
    }
}

impl ConnectionConfig {
    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Check that the host is an absolute URL
    pub fn validate_host(&self) -> Result<()> {
        match reqwest::Url::parse(&self.host) {
            Ok(url) if url.has_host() => Ok(()),
            _ => Err(ConfigError::InvalidValue {
                field: "connection.host".to_string(),
                value: self.host.clone(),
            }
            .into()),
        }
    }
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}
