//! Configuration loading and root folder resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument / environment variable (handled by the binary's `clap` args)
//! 2. TOML config file
//! 3. OS-dependent compiled default (fallback)
//!
//! Everything not set explicitly is derived from the root folder:
//! `<root>/biophonie.db`, `<root>/public/geojson.json`, `<root>/public/assets`.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8080;

/// Default bind address
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";

/// Snapshot file name inside the public folder
pub const SNAPSHOT_FILE_NAME: &str = "geojson.json";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "biophonie.db";

/// Limits applied to submitted geopoints
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeopointLimits {
    /// Minimum title length in characters
    pub title_min_len: usize,
    /// Maximum title length in characters
    pub title_max_len: usize,
    /// Minimum number of amplitude samples
    pub amplitudes_min_len: usize,
    /// Maximum number of amplitude samples
    pub amplitudes_max_len: usize,
    /// How far in the future `created_on` may be, in seconds (clock drift allowance)
    pub max_future_secs: i64,
}

impl Default for GeopointLimits {
    fn default() -> Self {
        Self {
            title_min_len: 3,
            title_max_len: 30,
            amplitudes_min_len: 10,
            amplitudes_max_len: 1000,
            max_future_secs: 24 * 60 * 60,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log filter directive (trace, debug, info, warn, error or a full EnvFilter string)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Contents of the TOML config file. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub snapshot_path: Option<PathBuf>,
    pub assets_folder: Option<PathBuf>,
    pub bind_addr: Option<String>,
    pub port: Option<u16>,
    #[serde(default)]
    pub geopoint: GeopointLimits,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    /// Parse TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }
}

/// Values given on the command line or through environment variables
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub root_folder: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub snapshot_path: Option<PathBuf>,
    pub bind_addr: Option<String>,
    pub port: Option<u16>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub root_folder: PathBuf,
    pub database_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub assets_folder: PathBuf,
    pub bind_addr: String,
    pub port: u16,
    pub limits: GeopointLimits,
    pub logging: LoggingConfig,
}

impl Config {
    /// Configuration with every path derived from `root_folder`
    pub fn from_root(root_folder: impl Into<PathBuf>) -> Self {
        let root_folder = root_folder.into();
        let public = root_folder.join("public");
        Self {
            database_path: root_folder.join(DATABASE_FILE_NAME),
            snapshot_path: public.join(SNAPSHOT_FILE_NAME),
            assets_folder: public.join("assets"),
            root_folder,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            port: DEFAULT_PORT,
            limits: GeopointLimits::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Resolve configuration from overrides, an optional TOML file and defaults
    ///
    /// An explicitly named config file that cannot be read is an error; a missing
    /// default config file is not.
    pub fn resolve(overrides: &ConfigOverrides) -> Result<Self> {
        let toml_config = match &overrides.config_file {
            Some(path) => TomlConfig::load(path)?,
            None => match locate_config_file() {
                Some(path) => {
                    info!("Loading config file {}", path.display());
                    TomlConfig::load(&path)?
                }
                None => TomlConfig::default(),
            },
        };

        Ok(Self::merge(overrides, toml_config))
    }

    /// Apply priority order: overrides > TOML > defaults
    pub fn merge(overrides: &ConfigOverrides, toml_config: TomlConfig) -> Self {
        let root_folder = overrides
            .root_folder
            .clone()
            .or(toml_config.root_folder)
            .unwrap_or_else(default_root_folder);

        let mut config = Self::from_root(root_folder);

        if let Some(path) = overrides.database_path.clone().or(toml_config.database_path) {
            config.database_path = path;
        }
        if let Some(path) = overrides.snapshot_path.clone().or(toml_config.snapshot_path) {
            config.snapshot_path = path;
        }
        if let Some(path) = toml_config.assets_folder {
            config.assets_folder = path;
        }
        if let Some(addr) = overrides.bind_addr.clone().or(toml_config.bind_addr) {
            config.bind_addr = addr;
        }
        if let Some(port) = overrides.port.or(toml_config.port) {
            config.port = port;
        }
        config.limits = toml_config.geopoint;
        config.logging = toml_config.logging;

        if config.limits.amplitudes_min_len > config.limits.amplitudes_max_len {
            warn!(
                "amplitudes_min_len ({}) > amplitudes_max_len ({}), every submission will be rejected",
                config.limits.amplitudes_min_len, config.limits.amplitudes_max_len
            );
        }

        config
    }

    /// Create the folders the service writes into
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [
            Some(self.root_folder.as_path()),
            self.database_path.parent(),
            self.snapshot_path.parent(),
            Some(self.assets_folder.as_path()),
        ]
        .into_iter()
        .flatten()
        {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        Ok(())
    }
}

/// Find the default configuration file for the platform, if one exists
fn locate_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("biophonie").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/biophonie/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/biophonie (or /var/lib/biophonie for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("biophonie"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/biophonie"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("biophonie"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/biophonie"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("biophonie"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\biophonie"))
    } else {
        PathBuf::from("./biophonie_data")
    }
}
