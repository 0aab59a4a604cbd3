//! Configuration types and loading.
//!
//! The main entry point is [`CalcsetupConfig`], which represents the contents
//! of `calcsetup.yaml`. Configuration is loaded with [`load_config`], which
//! layers defaults, the YAML file and `CALCSETUP_*` environment variables,
//! and saved with [`save_config`].

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use calcsetup_core::enums::DisplayType;

/// Prefix of environment variables that override file settings.
pub const ENV_PREFIX: &str = "CALCSETUP_";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read or written.
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// The configuration could not be serialized to YAML.
    #[error("failed to write config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// A layer contained invalid data.
    #[error("failed to load configuration: {0}")]
    Figment(#[from] Box<figment::Error>),

    /// A configuration value was invalid.
    #[error("invalid configuration value for key '{key}': {reason}")]
    InvalidValue {
        /// The configuration key that had an invalid value.
        key: String,
        /// A description of why the value is invalid.
        reason: String,
    },
}

/// A specialized `Result` type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Grade display settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Course default display type code (1 = real).
    #[serde(default = "default_display_type")]
    pub default_type: i64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            default_type: default_display_type(),
        }
    }
}

fn default_display_type() -> i64 {
    DisplayType::Real.code()
}

/// Number formatting settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatConfig {
    /// Decimals used for items that do not set their own.
    #[serde(default = "default_decimals")]
    pub default_decimals: i64,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            default_decimals: default_decimals(),
        }
    }
}

fn default_decimals() -> i64 {
    2
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing` filter directive used when `-v` is not given.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "calcsetup=info".to_string()
}

// ---------------------------------------------------------------------------
// Main config struct
// ---------------------------------------------------------------------------

/// The full configuration, corresponding to `calcsetup.yaml`.
///
/// All fields use `serde` defaults so that a partially-specified YAML file
/// will be deserialized correctly with sensible default values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalcsetupConfig {
    /// Path of the SQLite database.
    #[serde(default = "default_database")]
    pub database: PathBuf,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub format: FormatConfig,

    #[serde(default)]
    pub log: LogConfig,

    /// Seed the built-in rules when a database is initialised.
    #[serde(default = "default_true")]
    pub seed_rules: bool,
}

impl Default for CalcsetupConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            display: DisplayConfig::default(),
            format: FormatConfig::default(),
            log: LogConfig::default(),
            seed_rules: true,
        }
    }
}

fn default_database() -> PathBuf {
    PathBuf::from("calcsetup.db")
}

fn default_true() -> bool {
    true
}

impl CalcsetupConfig {
    /// The course default display type.
    pub fn default_display(&self) -> DisplayType {
        DisplayType::from_code(self.display.default_type)
    }

    /// Checks values that deserialize fine but make no sense.
    pub fn validate(&self) -> Result<()> {
        let code = self.display.default_type;
        if code == DisplayType::CourseDefault.code() || DisplayType::from_code(code).code() != code
        {
            return Err(ConfigError::InvalidValue {
                key: "display.default_type".into(),
                reason: format!("{code} is not a display type code"),
            });
        }
        if !(0..=5).contains(&self.format.default_decimals) {
            return Err(ConfigError::InvalidValue {
                key: "format.default_decimals".into(),
                reason: "must be between 0 and 5".into(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Builds the layered figment: defaults, then the YAML file (if any), then
/// environment variables.
pub fn figment(path: Option<&Path>) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(CalcsetupConfig::default()));
    if let Some(path) = path {
        figment = figment.merge(Yaml::file(path));
    }
    figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load configuration from `path`, with environment overrides.
///
/// A missing file yields the defaults.
///
/// # Errors
///
/// Returns [`ConfigError::Figment`] if a layer contains invalid data, or
/// [`ConfigError::InvalidValue`] if a value is out of range.
pub fn load_config(path: Option<&Path>) -> Result<CalcsetupConfig> {
    let config: CalcsetupConfig = figment(path).extract().map_err(Box::new)?;
    config.validate()?;
    Ok(config)
}

/// Save configuration as YAML. The parent directory is created if missing.
///
/// # Errors
///
/// Returns [`ConfigError::ReadError`] on I/O failure or
/// [`ConfigError::ParseError`] if serialization fails.
pub fn save_config(path: &Path, config: &CalcsetupConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(path, yaml)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let cfg = CalcsetupConfig::default();
        assert_eq!(cfg.database, PathBuf::from("calcsetup.db"));
        assert_eq!(cfg.default_display(), DisplayType::Real);
        assert_eq!(cfg.format.default_decimals, 2);
        assert!(cfg.seed_rules);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_load_missing_config_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(Some(&dir.path().join("absent.yaml"))).unwrap();
        assert_eq!(cfg.log.filter, "calcsetup=info");
    }

    #[test]
    fn test_roundtrip_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("calcsetup.yaml");

        let mut cfg = CalcsetupConfig::default();
        cfg.database = PathBuf::from("/tmp/grades.db");
        cfg.display.default_type = DisplayType::Letter.code();
        cfg.seed_rules = false;

        save_config(&path, &cfg).unwrap();
        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn test_partial_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calcsetup.yaml");
        std::fs::write(&path, "format:\n  default_decimals: 1\n").unwrap();

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.format.default_decimals, 1);
        assert_eq!(cfg.display.default_type, 1);
        assert!(cfg.seed_rules);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calcsetup.yaml");
        std::fs::write(&path, "display:\n  default_type: 7\n").unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::InvalidValue { .. })
        ));

        std::fs::write(&path, "format:\n  default_decimals: 9\n").unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_malformed_yaml_is_figment_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calcsetup.yaml");
        std::fs::write(&path, "seed_rules: [not, a, bool]\n").unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::Figment(_))
        ));
    }
}
