//! Runtime configuration
//!
//! Everything operator-tunable lives in one TOML file, loaded with the
//! standard search order:
//!
//! 1. `$GARANTIAS_CONFIG` environment variable (path to TOML file)
//! 2. `./garantias.toml` in the current working directory
//! 3. Built-in defaults
//!
//! SMTP credentials and the admin address can additionally be supplied (or
//! overridden) via `GARANTIAS_SMTP_*` / `GARANTIAS_ADMIN_EMAIL` environment
//! variables so secrets stay out of the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::intake::DedupConfig;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub company: CompanyConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub dedup: DedupConfig,

    #[serde(default)]
    pub tracking: TrackingConfig,

    #[serde(default)]
    pub smtp: SmtpConfig,
}

/// Desk identity used in outgoing mail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyConfig {
    #[serde(default = "default_company_name")]
    pub name: String,
    /// Empty disables admin alerts and summaries.
    #[serde(default)]
    pub admin_email: String,
}

fn default_company_name() -> String {
    "Proffectiv".to_string()
}

impl Default for CompanyConfig {
    fn default() -> Self {
        Self {
            name: default_company_name(),
            admin_email: String::new(),
        }
    }
}

/// Store locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data/records")
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("./data/status_snapshot.json")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            snapshot_path: default_snapshot_path(),
        }
    }
}

/// Status-tracking window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Tickets older than this many days are not diffed; their snapshot
    /// entries are left untouched.
    #[serde(default = "default_window_days")]
    pub window_days: i64,
}

fn default_window_days() -> i64 {
    90
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
        }
    }
}

/// SMTPS relay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Sender address; falls back to `username` when empty.
    #[serde(default)]
    pub from: String,
}

fn default_smtp_port() -> u16 {
    465
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            from: String::new(),
        }
    }
}

impl Settings {
    /// Load configuration using the standard search order, then apply
    /// environment overrides.
    pub fn load() -> Self {
        let mut settings = Self::load_file_chain();
        settings.apply_env();
        settings
    }

    /// Load from an explicit path (CLI `--config`), then apply environment
    /// overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut settings = Self::load_from_file(path)?;
        settings.apply_env();
        Ok(settings)
    }

    fn load_file_chain() -> Self {
        if let Ok(path) = std::env::var("GARANTIAS_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(settings) => {
                        info!(path = %p.display(), "Loaded config from GARANTIAS_CONFIG");
                        return settings;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from GARANTIAS_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "GARANTIAS_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from("garantias.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(settings) => {
                    info!("Loaded config from ./garantias.toml");
                    return settings;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./garantias.toml, using defaults");
                }
            }
        }

        Self::default()
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("GARANTIAS_SMTP_HOST") {
            self.smtp.host = host;
        }
        if let Ok(port) = std::env::var("GARANTIAS_SMTP_PORT") {
            match port.parse() {
                Ok(port) => self.smtp.port = port,
                Err(_) => warn!(value = %port, "Ignoring unparseable GARANTIAS_SMTP_PORT"),
            }
        }
        if let Ok(username) = std::env::var("GARANTIAS_SMTP_USERNAME") {
            self.smtp.username = username;
        }
        if let Ok(password) = std::env::var("GARANTIAS_SMTP_PASSWORD") {
            self.smtp.password = password;
        }
        if let Ok(admin) = std::env::var("GARANTIAS_ADMIN_EMAIL") {
            self.company.admin_email = admin;
        }
    }
}
