//! # Application Configuration
//!
//! Loads database settings, pricing defaults and the log filter.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                            │
//! │     MILESDESK_DB_PATH=/srv/milesdesk/milesdesk.db                       │
//! │     MILESDESK_DB_MAX_CONNECTIONS=8                                      │
//! │     MILESDESK_DB_BUSY_TIMEOUT_MS=10000                                  │
//! │     MILESDESK_DEFAULT_MARKUP=25                                         │
//! │     MILESDESK_COST_PER_THOUSAND=27,50                                   │
//! │     MILESDESK_LOG=info,milesdesk_db=debug                               │
//! │                                                                         │
//! │  2. TOML Config File                                                    │
//! │     explicit path, or the platform config dir:                          │
//! │     ~/.config/milesdesk/milesdesk.toml (Linux)                          │
//! │     ~/Library/Application Support/com.milesdesk.milesdesk/ (macOS)      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # milesdesk.toml
//! log_filter = "info,sqlx=warn"
//!
//! [database]
//! path = "/srv/milesdesk/milesdesk.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//!
//! [pricing]
//! targetMarkupPercent = 20.0
//! costPerThousandMiles = 28.0
//! boardingFeePerPassenger = 35.0
//! ```
//!
//! Number overrides go through the same lenient parser as user input, so
//! `27,50` and `27.50` both mean 27.5.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::pool::DbConfig;
use milesdesk_core::number::try_parse_decimal;
use milesdesk_core::PricingDefaults;

const CONFIG_FILE_NAME: &str = "milesdesk.toml";
const DEFAULT_LOG_FILTER: &str = "info,milesdesk_db=debug,sqlx=warn";

// =============================================================================
// Errors
// =============================================================================

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`AppConfig`].
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A value passed parsing but makes no sense.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Settings
// =============================================================================

/// Where and how to open the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SQLite file path. Relative paths resolve against the working dir.
    pub path: PathBuf,

    /// Default: 5
    pub max_connections: u32,

    /// Default: 30 seconds
    pub connect_timeout_secs: u64,

    /// How long a conversion waits on another agent's write before
    /// giving up. Default: 5000
    pub busy_timeout_ms: u64,

    /// Default: true
    pub run_migrations: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: 5,
            connect_timeout_secs: 30,
            busy_timeout_ms: 5_000,
            run_migrations: true,
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseSettings,
    pub pricing: PricingDefaults,
    /// `tracing_subscriber::EnvFilter` directive. `RUST_LOG` wins over it.
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database: DatabaseSettings::default(),
            pricing: PricingDefaults::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`config_path`, else the platform config dir)
    /// 3. `MILESDESK_*` environment variables
    ///
    /// A missing file is not an error; an unreadable or malformed one is.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = match config_path.or_else(default_config_path) {
            Some(path) if path.exists() => Self::from_file(&path)?,
            Some(path) => {
                debug!(?path, "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML config file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        info!(?path, "Loading config from file");
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies `MILESDESK_*` overrides read through `lookup`.
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("MILESDESK_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(raw) = lookup("MILESDESK_DB_MAX_CONNECTIONS") {
            match raw.trim().parse::<u32>() {
                Ok(max) => self.database.max_connections = max,
                Err(_) => warn!(value = %raw, "Ignoring invalid MILESDESK_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(raw) = lookup("MILESDESK_DB_BUSY_TIMEOUT_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.database.busy_timeout_ms = ms,
                Err(_) => warn!(value = %raw, "Ignoring invalid MILESDESK_DB_BUSY_TIMEOUT_MS"),
            }
        }

        if let Some(raw) = lookup("MILESDESK_DEFAULT_MARKUP") {
            match try_parse_decimal(&raw) {
                Ok(markup) => self.pricing.target_markup_percent = markup,
                Err(_) => warn!(value = %raw, "Ignoring invalid MILESDESK_DEFAULT_MARKUP"),
            }
        }

        if let Some(raw) = lookup("MILESDESK_COST_PER_THOUSAND") {
            match try_parse_decimal(&raw) {
                Ok(cost) => self.pricing.cost_per_thousand_miles = cost,
                Err(_) => warn!(value = %raw, "Ignoring invalid MILESDESK_COST_PER_THOUSAND"),
            }
        }

        if let Some(filter) = lookup("MILESDESK_LOG") {
            self.log_filter = filter;
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        // Zero makes concurrent conversions fail with "database is locked".
        if self.database.busy_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "database.busy_timeout_ms must be greater than 0".into(),
            ));
        }

        let pricing = [
            ("pricing.targetMarkupPercent", self.pricing.target_markup_percent),
            ("pricing.costPerThousandMiles", self.pricing.cost_per_thousand_miles),
            ("pricing.boardingFeePerPassenger", self.pricing.boarding_fee_per_passenger),
        ];
        for (field, value) in pricing {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{field} must be a non-negative number, got {value}"
                )));
            }
        }

        Ok(())
    }

    /// Pool settings for [`crate::Database::new`].
    pub fn to_db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .connect_timeout(Duration::from_secs(self.database.connect_timeout_secs))
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
            .run_migrations(self.database.run_migrations)
    }
}

/// Installs the global tracing subscriber.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - overrides everything below
/// - `filter` - usually [`AppConfig::log_filter`]
///
/// Calling it twice is harmless; the second call is ignored.
pub fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "milesdesk", "milesdesk")
}

fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// `<data dir>/milesdesk.db`, or `milesdesk.db` in the working dir when the
/// platform has no home directory.
fn default_database_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("milesdesk.db"))
        .unwrap_or_else(|| PathBuf::from("milesdesk.db"))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pricing.target_markup_percent, 20.0);
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [database]
            path = "/tmp/agency.db"

            [pricing]
            costPerThousandMiles = 28.0
            "#,
        )
        .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/tmp/agency.db"));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.pricing.cost_per_thousand_miles, 28.0);
        assert_eq!(config.pricing.target_markup_percent, 20.0);
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config.apply_overrides(lookup_from(&[
            ("MILESDESK_DB_PATH", "/data/md.db"),
            ("MILESDESK_DB_MAX_CONNECTIONS", "8"),
            ("MILESDESK_DB_BUSY_TIMEOUT_MS", "12000"),
            ("MILESDESK_DEFAULT_MARKUP", "25"),
            ("MILESDESK_COST_PER_THOUSAND", "27,50"),
            ("MILESDESK_LOG", "warn"),
        ]));

        assert_eq!(config.database.path, PathBuf::from("/data/md.db"));
        assert_eq!(config.database.max_connections, 8);
        assert_eq!(config.database.busy_timeout_ms, 12_000);
        assert_eq!(config.pricing.target_markup_percent, 25.0);
        assert_eq!(config.pricing.cost_per_thousand_miles, 27.5);
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn test_invalid_env_values_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides(lookup_from(&[
            ("MILESDESK_DB_MAX_CONNECTIONS", "many"),
            ("MILESDESK_DEFAULT_MARKUP", "abc"),
        ]));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.pricing.target_markup_percent, 20.0);
    }

    #[test]
    fn test_validate_rejects_nonsense() {
        let mut config = AppConfig::default();
        config.database.max_connections = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::default();
        config.database.busy_timeout_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::default();
        config.pricing.cost_per_thousand_miles = -1.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let missing = std::env::temp_dir().join("milesdesk-does-not-exist.toml");
        let config = AppConfig::load(Some(missing)).unwrap();
        assert_eq!(config.database.connect_timeout_secs, 30);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("milesdesk-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[database\npath = ").unwrap();
        let result = AppConfig::from_file(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_to_db_config() {
        let mut config = AppConfig::default();
        config.database.path = PathBuf::from("/tmp/x.db");
        config.database.max_connections = 3;
        config.database.busy_timeout_ms = 750;
        let db = config.to_db_config();
        assert_eq!(db.database_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(db.max_connections, 3);
        assert_eq!(db.connect_timeout, Duration::from_secs(30));
        assert_eq!(db.busy_timeout, Duration::from_millis(750));
    }
}
