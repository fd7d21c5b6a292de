/// CLI configuration
use rao_importer::SyncConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,

    #[serde(default)]
    pub sync: SyncConfig,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// `path` defaults to `rao.toml` in the working directory; a missing file
    /// is fine. `RAO_`-prefixed variables override the file, with `__`
    /// separating sections (`RAO_SYNC__CONCURRENCY=8`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        let config_path = path.map_or_else(|| PathBuf::from("rao.toml"), Path::to_path_buf);
        if config_path.exists() {
            settings = settings.add_source(config::File::from(config_path));
        } else if path.is_some() {
            return Err(ConfigError::Invalid(format!(
                "config file {} does not exist",
                config_path.display()
            )));
        }

        // Override with environment variables (prefixed with RAO_)
        settings = settings.add_source(
            config::Environment::with_prefix("RAO")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("sync.supported_extensions")
                .try_parsing(true),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "database_url is required (set RAO_DATABASE_URL)".to_string(),
            ));
        }

        self.sync
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

// Default values
fn default_database_url() -> String {
    "sqlite://./data/rao.db".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            sync: SyncConfig::default(),
        }
    }
}
