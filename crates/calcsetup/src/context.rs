//! Runtime context for command execution.
//!
//! The [`RuntimeContext`] holds what a command handler needs: the loaded
//! configuration, the resolved database path and the global flags.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use calcsetup_config::config::{CalcsetupConfig, load_config};
use calcsetup_config::discover::find_config_file;
use calcsetup_core::fields::{CoreFields, core_fields};
use calcsetup_storage::SqliteStore;

use crate::cli::GlobalArgs;

/// Runtime context passed to every command handler.
///
/// Constructed once in `main` after CLI parsing, before command dispatch.
#[derive(Debug)]
pub struct RuntimeContext {
    /// The configuration file in use, if one was given or discovered.
    pub config_path: Option<PathBuf>,

    pub config: CalcsetupConfig,

    /// Resolved SQLite database path.
    pub db_path: PathBuf,

    /// Whether to produce JSON output.
    pub json: bool,

    /// Verbose output.
    pub verbose: bool,

    /// Quiet mode: suppress non-essential output.
    pub quiet: bool,
}

impl RuntimeContext {
    /// Build a `RuntimeContext` from parsed global arguments.
    ///
    /// The database path is `--db` if given. Otherwise it is the configured
    /// `database`, taken relative to the configuration file's directory.
    pub fn from_global_args(global: &GlobalArgs) -> Result<Self> {
        let cwd = env::current_dir().context("failed to get current directory")?;

        let config_path = match &global.config {
            Some(path) => {
                if !path.is_file() {
                    bail!("config file not found: {}", path.display());
                }
                Some(path.clone())
            }
            None => find_config_file(&cwd),
        };

        let config = load_config(config_path.as_deref()).with_context(|| match &config_path {
            Some(path) => format!("failed to load config from {}", path.display()),
            None => "failed to load config".to_string(),
        })?;

        let db_path = match &global.db {
            Some(path) => path.clone(),
            None => {
                let base = config_path
                    .as_deref()
                    .and_then(Path::parent)
                    .unwrap_or(&cwd);
                base.join(&config.database)
            }
        };

        Ok(Self {
            config_path,
            config,
            db_path,
            json: global.json,
            verbose: global.verbose,
            quiet: global.quiet,
        })
    }

    /// Opens the existing database.
    pub fn open_store(&self) -> Result<SqliteStore> {
        if !self.db_path.exists() {
            bail!(
                "no calcsetup database found at {}\nHint: run 'calcsetup init' to create one",
                self.db_path.display()
            );
        }
        SqliteStore::open(&self.db_path)
            .with_context(|| format!("failed to open database: {}", self.db_path.display()))
    }

    /// The core field table for the configured course display type.
    pub fn fields(&self) -> CoreFields {
        core_fields(self.config.default_display())
    }

    /// Decimals used for items that do not set their own.
    pub fn default_decimals(&self) -> i64 {
        self.config.format.default_decimals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calcsetup_config::config::save_config;
    use pretty_assertions::assert_eq;

    fn global(db: Option<PathBuf>, config: Option<PathBuf>) -> GlobalArgs {
        GlobalArgs {
            db,
            config,
            json: false,
            verbose: false,
            quiet: false,
        }
    }

    #[test]
    fn database_relative_to_config_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("calcsetup.yaml");
        let config = CalcsetupConfig {
            database: PathBuf::from("grades.db"),
            ..CalcsetupConfig::default()
        };
        save_config(&config_path, &config).unwrap();

        let ctx = RuntimeContext::from_global_args(&global(None, Some(config_path))).unwrap();
        assert_eq!(ctx.db_path, tmp.path().join("grades.db"));
        assert_eq!(ctx.config.database, PathBuf::from("grades.db"));
    }

    #[test]
    fn db_flag_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("calcsetup.yaml");
        save_config(&config_path, &CalcsetupConfig::default()).unwrap();
        let db = tmp.path().join("other.db");

        let ctx =
            RuntimeContext::from_global_args(&global(Some(db.clone()), Some(config_path))).unwrap();
        assert_eq!(ctx.db_path, db);
    }

    #[test]
    fn missing_config_file_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err =
            RuntimeContext::from_global_args(&global(None, Some(tmp.path().join("nope.yaml"))))
                .unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn open_store_requires_init() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = RuntimeContext::from_global_args(&global(
            Some(tmp.path().join("missing.db")),
            Some({
                let path = tmp.path().join("calcsetup.yaml");
                save_config(&path, &CalcsetupConfig::default()).unwrap();
                path
            }),
        ))
        .unwrap();
        let err = ctx.open_store().unwrap_err();
        assert!(err.to_string().contains("calcsetup init"));
    }
}
