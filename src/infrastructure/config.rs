//! Configuration management for poster-sync
//!
//! Layers, later wins: built-in defaults, an optional TOML file,
//! `POSTER_SYNC__*` environment variables, then command-line overrides
//! applied by the binary.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::domain::normalizer::{MissingCategoryPolicy, Normalizer};

pub const ENV_PREFIX: &str = "POSTER_SYNC";
pub const DEFAULT_CONFIG_FILE: &str = "config/default.toml";
pub const DEFAULT_DATABASE_URL: &str = "sqlite:data/products.db";
pub const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {source}")]
    FileLoad {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub source: SourceConfig,
    pub reconcile: ReconcileConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    File,
    Firestore,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Export file read when `kind = "file"`
    pub path: Option<PathBuf>,
    /// Field holding the document id in array-shaped exports
    pub id_field: String,
    pub firestore: FirestoreConfig,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::File,
            path: None,
            id_field: "id".to_string(),
            firestore: FirestoreConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub collection: String,
    pub api_key: Option<String>,
    /// OAuth bearer token, sent as `Authorization: Bearer ...` when set
    pub access_token: Option<String>,
    pub base_url: String,
    pub page_size: u32,
    pub timeout_secs: u64,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            collection: "products".to_string(),
            api_key: None,
            access_token: None,
            base_url: DEFAULT_FIRESTORE_BASE_URL.to_string(),
            page_size: 300,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub missing_category: MissingCategoryPolicy,
    pub dry_run: bool,
}

impl ReconcileConfig {
    #[must_use]
    pub const fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.missing_category)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base level or `EnvFilter` directive string; `RUST_LOG` takes precedence
    pub level: String,
    pub console_output: bool,
    pub file_output: bool,
    pub json_format: bool,
    pub directory: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_output: true,
            file_output: false,
            json_format: false,
            directory: PathBuf::from("logs"),
        }
    }
}

impl AppConfig {
    /// Loads configuration from `path`, or from the first default location
    /// that exists when no path is given, then applies the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path(),
        };

        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?);
        if let Some(file) = &file {
            builder = builder.add_source(config::File::from(file.as_path()).required(true));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(invalid("database.url must not be empty"));
        }
        if self.database.max_connections == 0 {
            return Err(invalid("database.max_connections must be greater than 0"));
        }

        match self.source.kind {
            SourceKind::File => {
                let missing = self
                    .source
                    .path
                    .as_ref()
                    .is_none_or(|p| p.as_os_str().is_empty());
                if missing {
                    return Err(invalid("source.path is required for file sources"));
                }
                if self.source.id_field.trim().is_empty() {
                    return Err(invalid("source.id_field must not be empty"));
                }
            }
            SourceKind::Firestore => {
                let firestore = &self.source.firestore;
                if firestore.project_id.trim().is_empty() {
                    return Err(invalid("source.firestore.project_id is required"));
                }
                if firestore.collection.trim().is_empty() {
                    return Err(invalid("source.firestore.collection is required"));
                }
                if firestore.page_size == 0 {
                    return Err(invalid("source.firestore.page_size must be greater than 0"));
                }
                if firestore.timeout_secs == 0 {
                    return Err(invalid("source.firestore.timeout_secs must be greater than 0"));
                }
                Url::parse(&firestore.base_url).map_err(|e| {
                    invalid(format!(
                        "source.firestore.base_url '{}' is not a valid URL: {e}",
                        firestore.base_url
                    ))
                })?;
            }
        }

        if self.logging.level.trim().is_empty() {
            return Err(invalid("logging.level must not be empty"));
        }
        Ok(())
    }
}

/// `config/default.toml` in the working directory, else the per-user
/// configuration file, whichever exists first
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("poster-sync").join("config.toml"))
        .filter(|p| p.is_file())
}
