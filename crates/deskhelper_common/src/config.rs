//! Configuration management for deskhelperd.
//!
//! Loads settings from a TOML file or uses defaults. Lookup order:
//! explicit path (`--config`), `DESKHELPER_CONFIG`, `./deskhelper.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::version::Version;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "DESKHELPER_CONFIG";

/// Config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "deskhelper.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host; the helper is meant for local callers only
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Paths that accept folder-open requests
    #[serde(default = "default_open_routes")]
    pub open_routes: Vec<String>,

    /// Attempts to bind before giving up, one second apart
    #[serde(default = "default_bind_retries")]
    pub bind_retries: u32,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5001
}

fn default_open_routes() -> Vec<String> {
    vec!["/open-deal-folder".to_string(), "/open-folder".to_string()]
}

fn default_bind_retries() -> u32 {
    5
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            open_routes: default_open_routes(),
            bind_retries: default_bind_retries(),
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Where the current version is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionSourceKind {
    /// Plain-text marker file, rewritten after each update
    Marker,
    /// The package version compiled into the binary
    Builtin,
}

impl Default for VersionSourceKind {
    fn default() -> Self {
        Self::Marker
    }
}

/// How a downloaded binary takes over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SwapStrategy {
    /// Move the running executable aside and install the new one in its place
    Replace,
    /// Leave the running executable alone and launch the staged download
    LaunchStaged,
}

impl Default for SwapStrategy {
    fn default() -> Self {
        Self::Replace
    }
}

/// Self-update configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateConfig {
    #[serde(default = "default_update_enabled")]
    pub enabled: bool,

    /// Manifest endpoint; empty disables the checker
    #[serde(default)]
    pub manifest_url: String,

    /// Seconds between update checks
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Seconds to wait before the first check
    #[serde(default)]
    pub initial_delay_secs: u64,

    /// Timeout for the manifest request and for connecting (0 = none)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Timeout for the whole binary download (0 = none)
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    #[serde(default)]
    pub version_source: VersionSourceKind,

    #[serde(default = "default_marker_path")]
    pub marker_path: PathBuf,

    /// Version assumed when the marker file does not exist
    #[serde(default = "default_baseline_version")]
    pub baseline_version: String,

    #[serde(default)]
    pub swap_strategy: SwapStrategy,

    /// Suffix appended to the executable when it is moved aside
    #[serde(default = "default_backup_suffix")]
    pub backup_suffix: String,

    /// Executable to replace; defaults to the running binary
    #[serde(default)]
    pub executable_path: Option<PathBuf>,

    /// Download directory; defaults to the executable's directory
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,
}

fn default_update_enabled() -> bool {
    true
}

fn default_interval() -> u64 {
    3600
}

fn default_request_timeout() -> u64 {
    30
}

fn default_download_timeout() -> u64 {
    600
}

fn default_marker_path() -> PathBuf {
    PathBuf::from("version.txt")
}

fn default_baseline_version() -> String {
    "1.0.0".to_string()
}

fn default_backup_suffix() -> String {
    "old".to_string()
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            enabled: default_update_enabled(),
            manifest_url: String::new(),
            interval_secs: default_interval(),
            initial_delay_secs: 0,
            request_timeout_secs: default_request_timeout(),
            download_timeout_secs: default_download_timeout(),
            version_source: VersionSourceKind::default(),
            marker_path: default_marker_path(),
            baseline_version: default_baseline_version(),
            swap_strategy: SwapStrategy::default(),
            backup_suffix: default_backup_suffix(),
            executable_path: None,
            staging_dir: None,
        }
    }
}

fn secs_or_none(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

impl UpdateConfig {
    /// Enabled and pointed at a manifest
    pub fn is_active(&self) -> bool {
        self.enabled && !self.manifest_url.trim().is_empty()
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        secs_or_none(self.request_timeout_secs)
    }

    pub fn download_timeout(&self) -> Option<Duration> {
        secs_or_none(self.download_timeout_secs)
    }
}

/// Full daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Default tracing filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub update: UpdateConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            server: ServerConfig::default(),
            update: UpdateConfig::default(),
        }
    }
}

impl Config {
    /// Locate and load the config file.
    ///
    /// Returns the config together with the file it came from, or `None`
    /// when no file was found and defaults are in use. A file that was
    /// named explicitly must exist.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let named = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        if let Some(path) = named {
            let config = Self::load_from_path(&path)?;
            return Ok((config, Some(path)));
        }

        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        if local.is_file() {
            let config = Self::load_from_path(&local)?;
            return Ok((config, Some(local)));
        }

        Ok((Config::default(), None))
    }

    /// Load config from specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.update.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "update.interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.update.backup_suffix.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "update.backup_suffix must not be empty".to_string(),
            ));
        }
        if Version::parse(&self.update.baseline_version).is_err() {
            return Err(ConfigError::Invalid(format!(
                "update.baseline_version {:?} is not a version",
                self.update.baseline_version
            )));
        }
        if self.server.open_routes.is_empty() {
            return Err(ConfigError::Invalid(
                "server.open_routes must list at least one path".to_string(),
            ));
        }
        for (i, route) in self.server.open_routes.iter().enumerate() {
            if !route.starts_with('/') {
                return Err(ConfigError::Invalid(format!(
                    "server.open_routes entry {:?} must start with '/'",
                    route
                )));
            }
            if route == "/health" || self.server.open_routes[..i].contains(route) {
                return Err(ConfigError::Invalid(format!(
                    "server.open_routes entry {:?} is registered twice",
                    route
                )));
            }
        }
        Ok(())
    }
}
