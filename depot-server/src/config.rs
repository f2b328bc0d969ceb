//! # Configuration Management
//!
//! Depot is configured from a single TOML file:
//!
//! ```toml
//! [depot]
//! listen_address = ":5000"
//! repository_listing = true
//! api_enabled = true
//! save_config_changes = false
//!
//! [logging]
//! verbose = false
//!
//! [repositories.releases]
//! path = "/srv/depot/releases"
//! credentials = ["alice:secret"]
//! deploy = true
//! deploy_credentials = ["bob:topsecret"]
//! max_artifact_size = 1048576
//! ```
//!
//! [`Config::load`] parses the file and [`Config::validate`] fills in defaults.
//! The validated config is turned into the immutable
//! [`Registry`](crate::registry::Registry) before any traffic is served.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use depot_logging::LogSettings;
use serde::{Deserialize, Serialize};

/// Default maximum deployable artifact size (32 MiB)
pub const DEFAULT_MAX_ARTIFACT_SIZE: u64 = 32 << 20;

/// Default listen address. A leading `:` binds all interfaces.
pub const DEFAULT_LISTEN_ADDRESS: &str = ":5000";

/// Errors raised while loading, validating or saving configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write configuration file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid repository name {name:?}: {reason}")]
    InvalidRepositoryName { name: String, reason: &'static str },

    #[error("repository {name:?} has no path configured")]
    MissingRepositoryPath { name: String },

    #[error("repository {name:?} is defined more than once")]
    DuplicateRepository { name: String },
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Application-wide settings
    #[serde(default)]
    pub depot: DepotConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LogSettings,
    /// Repository name to repository settings
    #[serde(default)]
    pub repositories: BTreeMap<String, RepositoryConfig>,
}

/// The `[depot]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepotConfig {
    /// Address the HTTP server listens on
    pub listen_address: String,
    /// Whether listing repositories is allowed
    pub repository_listing: bool,
    /// Whether the JSON API is served
    pub api_enabled: bool,
    /// Whether the configuration is written back to disk on exit
    pub save_config_changes: bool,
}

impl Default for DepotConfig {
    fn default() -> Self {
        Self {
            listen_address: DEFAULT_LISTEN_ADDRESS.to_string(),
            repository_listing: false,
            api_enabled: false,
            save_config_changes: false,
        }
    }
}

impl DepotConfig {
    /// Port of a `":port"` style address that binds every interface.
    fn any_interface_port(&self) -> Option<&str> {
        let address = self.listen_address.trim();
        if address.is_empty() {
            DEFAULT_LISTEN_ADDRESS.strip_prefix(':')
        } else {
            address.strip_prefix(':')
        }
    }
}

/// A `[repositories.<name>]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Repository location on the filesystem
    pub path: PathBuf,
    /// Read access credentials. Empty means the repository is public.
    /// These do not grant deployment access.
    #[serde(default)]
    pub credentials: Vec<String>,
    /// Whether deployment is allowed at all
    #[serde(default)]
    pub deploy: bool,
    /// Deployment credentials. These grant both read access and deployment.
    #[serde(default)]
    pub deploy_credentials: Vec<String>,
    /// Maximum deployable file size in bytes, 0 for the default
    #[serde(default)]
    pub max_artifact_size: u64,
}

impl Config {
    /// Load configuration from a TOML file and apply defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    /// Parse configuration from a TOML string and apply defaults.
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(raw)?;
        config.validate();
        Ok(config)
    }

    /// Listen address in a form accepted by `TcpListener::bind`.
    ///
    /// `":5000"` becomes the dual-stack `"[::]:5000"`; anything else is passed
    /// through.
    pub fn socket_addr(&self) -> String {
        match self.depot.any_interface_port() {
            Some(port) => format!("[::]:{port}"),
            None => self.depot.listen_address.trim().to_string(),
        }
    }

    /// IPv4-only address to retry with when [`Config::socket_addr`] cannot be
    /// bound because the host has no IPv6 support.
    pub fn ipv4_fallback_addr(&self) -> Option<String> {
        self.depot
            .any_interface_port()
            .map(|port| format!("0.0.0.0:{port}"))
    }

    /// Logging settings for this run. `verbose_override` (the `--verbose`
    /// flag) only applies to the returned value; the config itself is left
    /// as loaded so it can be saved back unchanged.
    pub fn log_settings(&self, verbose_override: bool) -> LogSettings {
        LogSettings {
            verbose: self.logging.verbose || verbose_override,
            ..self.logging.clone()
        }
    }

    /// Normalize values that were left empty or zero.
    pub fn validate(&mut self) {
        if self.depot.listen_address.trim().is_empty() {
            self.depot.listen_address = DEFAULT_LISTEN_ADDRESS.to_string();
        }

        for repository in self.repositories.values_mut() {
            if repository.max_artifact_size == 0 {
                repository.max_artifact_size = DEFAULT_MAX_ARTIFACT_SIZE;
            }
        }
    }

    /// Serialize the configuration as TOML.
    pub fn dump(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write the configuration to `path`, replacing its contents.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = self.dump()?;
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        let mut options = fs::OpenOptions::new();
        options.create(true).write(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path).map_err(write_err)?;
        file.write_all(contents.as_bytes()).map_err(write_err)?;
        file.flush().map_err(write_err)
    }
}
