//! # Configuration State
//!
//! Application configuration loaded once at startup.
//!
//! ## Configuration Sources (later wins)
//! 1. Defaults (this file)
//! 2. Config file (`vetpos.toml` in the platform config dir, or `--config`)
//! 3. Environment variables (`VETPOS_*`)
//!
//! The result is validated before anything uses it.
//!
//! ## Thread Safety
//! Configuration is read-only after initialization, so no mutex needed.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use vetpos_core::{validation::validate_name, Money, DEFAULT_LOW_STOCK_THRESHOLD};

/// File name of the config file inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "vetpos.toml";

/// File name of the store inside the platform data directory.
pub const DATABASE_FILE_NAME: &str = "vetpos.db";

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Could not determine the application data directory")]
    NoDataDir,
}

/// Application configuration.
///
/// Every field has a default, so a config file only needs the keys it
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct AppConfig {
    /// Store location. `None` means the platform data directory.
    pub database_path: Option<PathBuf>,

    /// Clinic name (shown on receipts and reports)
    pub clinic_name: String,

    /// Address lines for receipts
    pub clinic_address: Vec<String>,

    /// Currency symbol (for display)
    pub currency_symbol: String,

    /// Reorder point given to new products that don't set one
    pub low_stock_threshold: i64,

    /// Default report window in days
    pub report_days: i64,

    /// How many best sellers a report lists
    pub top_products: usize,

    /// Where exported backups go when no path is given
    pub backup_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: None,
            clinic_name: "VetPOS Clinic".to_string(),
            clinic_address: Vec::new(),
            currency_symbol: "$".to_string(),
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            report_days: 30,
            top_products: 10,
            backup_dir: None,
        }
    }
}

impl AppConfig {
    /// Loads defaults, then the config file, then the process environment.
    ///
    /// An explicit `path` must exist. The default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_file() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => {
                    debug!("No config file, using defaults");
                    AppConfig::default()
                }
            },
        };

        config.apply_env_with(|key| std::env::var(key).ok())?;
        config.validate()?;

        info!(clinic = %config.clinic_name, "Configuration loaded");
        Ok(config)
    }

    /// Parses a TOML config file over the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Reading config file");
        Ok(toml::from_str(&text)?)
    }

    /// Applies `VETPOS_*` overrides read through `lookup`.
    ///
    /// - `VETPOS_DB_PATH`
    /// - `VETPOS_CLINIC_NAME`
    /// - `VETPOS_CURRENCY_SYMBOL`
    /// - `VETPOS_LOW_STOCK_THRESHOLD`
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("VETPOS_DB_PATH") {
            self.database_path = Some(PathBuf::from(path));
        }

        if let Some(name) = lookup("VETPOS_CLINIC_NAME") {
            self.clinic_name = name;
        }

        if let Some(symbol) = lookup("VETPOS_CURRENCY_SYMBOL") {
            self.currency_symbol = symbol;
        }

        if let Some(threshold) = lookup("VETPOS_LOW_STOCK_THRESHOLD") {
            self.low_stock_threshold = threshold.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!(
                    "VETPOS_LOW_STOCK_THRESHOLD must be a whole number, got '{}'",
                    threshold
                ))
            })?;
        }

        Ok(())
    }

    /// Checks every field's range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_name("clinic name", &self.clinic_name)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let symbol = self.currency_symbol.trim();
        if symbol.is_empty() || symbol.chars().count() > 5 {
            return Err(ConfigError::Invalid(
                "currency symbol must be 1 to 5 characters".to_string(),
            ));
        }
        if !(0..=9999).contains(&self.low_stock_threshold) {
            return Err(ConfigError::Invalid(
                "low stock threshold must be between 0 and 9999".to_string(),
            ));
        }
        if !(1..=366).contains(&self.report_days) {
            return Err(ConfigError::Invalid(
                "report days must be between 1 and 366".to_string(),
            ));
        }
        if !(1..=100).contains(&self.top_products) {
            return Err(ConfigError::Invalid(
                "top products must be between 1 and 100".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolves the store file, creating the data directory when needed.
    ///
    /// ## Platform-Specific Paths
    /// - **macOS**: `~/Library/Application Support/com.vetpos.vetpos/vetpos.db`
    /// - **Windows**: `%APPDATA%\vetpos\vetpos\data\vetpos.db`
    /// - **Linux**: `~/.local/share/vetpos/vetpos.db`
    pub fn resolve_database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }

        let dirs = project_dirs().ok_or(ConfigError::NoDataDir)?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir).map_err(|source| ConfigError::Io {
            path: data_dir.to_path_buf(),
            source,
        })?;
        Ok(data_dir.join(DATABASE_FILE_NAME))
    }

    /// File name for a backup taken on `date`, inside `backup_dir` if set.
    pub fn backup_file_for(&self, date: chrono::NaiveDate) -> PathBuf {
        let name = format!("vetpos-backup-{}.zip", date.format("%Y-%m-%d"));
        match &self.backup_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }

    /// Formats a cent amount as a currency string.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let config = AppConfig::default();
    /// assert_eq!(config.format_currency(1234), "$12.34");
    /// ```
    pub fn format_currency(&self, cents: i64) -> String {
        format!(
            "{}{}{}",
            if cents < 0 { "-" } else { "" },
            self.currency_symbol,
            Money::from_cents(cents.abs()).to_decimal_string()
        )
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "vetpos", "vetpos")
}

/// `vetpos.toml` in the platform config directory.
pub fn default_config_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_format_currency() {
        let config = AppConfig::default();
        assert_eq!(config.format_currency(1234), "$12.34");
        assert_eq!(config.format_currency(1), "$0.01");
        assert_eq!(config.format_currency(0), "$0.00");
        assert_eq!(config.format_currency(-1234), "-$12.34");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "clinic_name = \"Clínica San Roque\"").unwrap();
        writeln!(file, "report_days = 7").unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.clinic_name, "Clínica San Roque");
        assert_eq!(config.report_days, 7);
        assert_eq!(config.currency_symbol, "$");
        assert_eq!(config.low_stock_threshold, DEFAULT_LOW_STOCK_THRESHOLD);
    }

    #[test]
    fn test_env_overrides_file() {
        let env: HashMap<&str, &str> = [
            ("VETPOS_DB_PATH", "/tmp/clinic.db"),
            ("VETPOS_CURRENCY_SYMBOL", "€"),
            ("VETPOS_LOW_STOCK_THRESHOLD", "12"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config
            .apply_env_with(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/clinic.db")));
        assert_eq!(config.currency_symbol, "€");
        assert_eq!(config.low_stock_threshold, 12);
        assert_eq!(config.resolve_database_path().unwrap(), PathBuf::from("/tmp/clinic.db"));
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env_with(|key| (key == "VETPOS_LOW_STOCK_THRESHOLD").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let config = AppConfig {
            report_days: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AppConfig {
            clinic_name: "  ".to_string(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let err = AppConfig::load(Some(Path::new("/definitely/not/here/vetpos.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_backup_file_name() {
        let date = chrono::NaiveDate::from_ymd_opt(2026, 5, 4).unwrap();
        let config = AppConfig {
            backup_dir: Some(PathBuf::from("/backups")),
            ..AppConfig::default()
        };
        assert_eq!(
            config.backup_file_for(date),
            PathBuf::from("/backups/vetpos-backup-2026-05-04.zip")
        );
    }
}
