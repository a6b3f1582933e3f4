use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::dispatcher::DEFAULT_EXTENSION;
use crate::enrich::{parse_timezone, DEFAULT_TIMEZONE};
use crate::error::{EtlError, Result};
use crate::validation::InputValidator;

/// Prefix of environment overrides, e.g. `MAIL_ETL__PIPELINE__WORKERS=8`
pub const ENV_PREFIX: &str = "MAIL_ETL";

/// Application configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Input, output and parallelism
    pub pipeline: PipelineConfig,
    /// Load targets
    pub storage: StorageConfig,
    /// Log level, format and file
    pub logging: LoggingConfig,
}

/// `[pipeline]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory of `.eml` files
    pub input_dir: PathBuf,
    /// Directory for CSV files and the database
    pub output_dir: PathBuf,
    /// Concurrent parsers
    pub workers: usize,
    /// IANA zone name used for the batch date
    pub timezone: String,
    /// Extension without the dot
    pub file_extension: String,
}

/// `[storage]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file name, relative to the output directory
    pub database_file: String,
    /// Write CSV files
    pub write_csv: bool,
    /// Write SQLite tables
    pub write_sqlite: bool,
    /// Cloud upload settings
    pub cloud: CloudConfig,
}

/// Placeholder cloud target; nothing is uploaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    /// Log a cloud write after each load
    pub enabled: bool,
    /// Provider label, e.g. `s3`
    pub provider: String,
    /// Target bucket
    pub bucket: String,
}

/// `[logging]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// `json` or `text` on stderr
    pub format: String,
    /// Daily rotated JSON log file
    pub file_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data/input"),
            output_dir: PathBuf::from("data/output"),
            workers: 4,
            timezone: DEFAULT_TIMEZONE.to_string(),
            file_extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_file: "etl.db".to_string(),
            write_csv: true,
            write_sqlite: true,
            cloud: CloudConfig::default(),
        }
    }
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "gcs".to_string(),
            bucket: "mail-archive".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            file_path: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load() -> Result<Self> {
        let config = Config::builder()
            // Start with default values
            .add_source(Config::try_from(&Self::default())?)
            // Add config files if they exist
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with prefix
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::finish(config)
    }

    /// Load one explicit YAML or JSON file over the built-in defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(EtlError::InvalidConfig(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let supported = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| matches!(ext.to_ascii_lowercase().as_str(), "yaml" | "yml" | "json"));
        if !supported {
            return Err(EtlError::InvalidConfig(format!(
                "Unsupported config file format: {}",
                path.display()
            )));
        }

        let config = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(File::from(path))
            .build()?;

        Self::finish(config)
    }

    fn finish(config: Config) -> Result<Self> {
        let app_config: Self = config.try_deserialize()?;

        // Validate configuration
        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        InputValidator::validate_worker_count(self.pipeline.workers)
            .map_err(|e| EtlError::InvalidConfig(e.to_string()))?;
        InputValidator::validate_extension(&self.pipeline.file_extension)
            .map_err(|e| EtlError::InvalidConfig(e.to_string()))?;
        parse_timezone(&self.pipeline.timezone)?;

        if self.storage.database_file.trim().is_empty() {
            return Err(EtlError::InvalidConfig(
                "database_file cannot be empty".to_string(),
            ));
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(EtlError::InvalidConfig(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                self.logging.level
            )));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(EtlError::InvalidConfig(format!(
                "Invalid log format: {}. Must be one of: {valid_formats:?}",
                self.logging.format
            )));
        }

        Ok(())
    }

    /// Full path of the SQLite database
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.pipeline.output_dir.join(&self.storage.database_file)
    }

    /// Get log level from environment or config
    #[must_use]
    pub fn log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.pipeline.workers, 4);
        assert_eq!(config.pipeline.timezone, "Asia/Hong_Kong");
        assert_eq!(config.pipeline.file_extension, "eml");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.database_path(), PathBuf::from("data/output/etl.db"));
    }

    #[test]
    fn test_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let mut config = AppConfig::default();
        config.pipeline.workers = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.pipeline.timezone = "Nowhere/Special".to_string();
        assert!(matches!(
            config.validate(),
            Err(EtlError::InvalidTimezone(_))
        ));

        let mut config = AppConfig::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }
}
