//! `calcsetup gradebook` -- load course gradebooks.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use calcsetup_storage::Gradebook;

use crate::cli::{GradebookArgs, GradebookCommands};
use crate::context::RuntimeContext;
use crate::output::output_json;
use crate::styles::{ICON_PASS, render_pass};

/// Execute a `calcsetup gradebook` subcommand.
pub fn run(ctx: &RuntimeContext, args: &GradebookArgs) -> Result<()> {
    match &args.command {
        GradebookCommands::Import { file } => run_import(ctx, file),
    }
}

fn run_import(ctx: &RuntimeContext, file: &Path) -> Result<()> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let gradebook: Gradebook = serde_json::from_str(&text)
        .with_context(|| format!("invalid gradebook JSON in {}", file.display()))?;

    let store = ctx.open_store()?;
    store
        .import_gradebook(&gradebook)
        .with_context(|| format!("failed to import {}", file.display()))?;

    if ctx.json {
        output_json(&serde_json::json!({
            "courses": gradebook.courses.len(),
            "categories": gradebook.categories.len(),
            "items": gradebook.items.len(),
        }));
    } else if !ctx.quiet {
        println!(
            "{} Imported {} course(s), {} categories, {} item(s)",
            render_pass(ICON_PASS),
            gradebook.courses.len(),
            gradebook.categories.len(),
            gradebook.items.len()
        );
    }
    Ok(())
}
