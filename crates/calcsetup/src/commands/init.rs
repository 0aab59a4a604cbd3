//! `calcsetup init` -- create the database and seed the built-in rules.

use std::env;
use std::fs;

use anyhow::{Context, Result};
use serde::Serialize;

use calcsetup_config::config::save_config;
use calcsetup_config::discover::CONFIG_FILE_NAME;
use calcsetup_storage::SqliteStore;

use crate::cli::InitArgs;
use crate::context::RuntimeContext;
use crate::output::output_json;
use crate::styles::{ICON_PASS, render_pass};

#[derive(Serialize)]
struct InitReport {
    database: String,
    created: bool,
    seeded_rules: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<String>,
}

/// Execute the `calcsetup init` command.
///
/// Running it on an existing database is harmless: the schema is brought up
/// to date and the built-in rules are only ever seeded once.
pub fn run(ctx: &RuntimeContext, args: &InitArgs) -> Result<()> {
    let db_path = &ctx.db_path;
    let created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }
    }

    let store = SqliteStore::open(db_path)
        .with_context(|| format!("failed to create database: {}", db_path.display()))?;

    let seeded_rules = if ctx.config.seed_rules && !args.no_seed {
        store
            .seed_default_rules()
            .context("failed to seed built-in rules")?
    } else {
        0
    };

    let config = if args.write_config {
        let cwd = env::current_dir().context("failed to get current directory")?;
        let path = cwd.join(CONFIG_FILE_NAME);
        if !path.exists() {
            save_config(&path, &ctx.config)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        Some(path.display().to_string())
    } else {
        None
    };

    let report = InitReport {
        database: db_path.display().to_string(),
        created,
        seeded_rules,
        config,
    };

    if ctx.json {
        output_json(&report);
    } else if !ctx.quiet {
        let verb = if report.created { "Created" } else { "Updated" };
        println!(
            "{} {} database {}",
            render_pass(ICON_PASS),
            verb,
            report.database
        );
        if report.seeded_rules > 0 {
            println!("  Seeded {} built-in rule(s)", report.seeded_rules);
        }
        if let Some(path) = &report.config {
            println!("  Config: {}", path);
        }
    }

    Ok(())
}
