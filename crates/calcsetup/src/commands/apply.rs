//! `calcsetup apply` -- attach a rule to a category and run its actions.

use anyhow::Result;
use tracing::debug;

use calcsetup_engine::RuleEngine;

use crate::cli::ApplyArgs;
use crate::commands::load_category;
use crate::context::RuntimeContext;
use crate::output::{output_json, print_notices};

/// Execute the `calcsetup apply` command.
pub fn run(ctx: &RuntimeContext, args: &ApplyArgs) -> Result<()> {
    let store = ctx.open_store()?;
    let mut category = load_category(&store, &args.selector)?;

    let mut engine = RuleEngine::new(&store, &store, ctx.fields());
    let result = engine.apply(&mut category, &args.rule)?;
    debug!(
        changed = result.changed,
        count_changed = result.count_changed,
        "apply finished"
    );

    if ctx.json {
        output_json(&result);
    } else if !ctx.quiet {
        print_notices(&result.notices);
    }
    Ok(())
}
