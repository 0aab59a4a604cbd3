//! `calcsetup update` -- edit item properties through the rule's columns.

use anyhow::Result;

use calcsetup_core::rule::ColumnDescriptor;
use calcsetup_engine::{RuleEngine, update_items};

use crate::cli::UpdateArgs;
use crate::commands::load_category;
use crate::context::RuntimeContext;
use crate::output::{output_json, print_notices};

/// Execute the `calcsetup update` command.
///
/// The accepted properties are the rule's columns followed by its fields.
/// A property listed in both is governed by its column descriptor.
pub fn run(ctx: &RuntimeContext, args: &UpdateArgs) -> Result<()> {
    let store = ctx.open_store()?;
    let mut category = load_category(&store, &args.selector)?;

    let mut engine = RuleEngine::new(&store, &store, ctx.fields());
    let rule = engine.resolve(&category, args.rule.as_deref())?;

    let descriptors: Vec<ColumnDescriptor> = rule
        .columns
        .iter()
        .chain(&rule.fields)
        .cloned()
        .collect();

    let outcome = update_items(
        &store,
        engine.fields(),
        &args.set,
        &descriptors,
        category.all_items_mut(),
    )?;

    if ctx.json {
        output_json(&outcome);
    } else if !ctx.quiet {
        print_notices(&outcome.notices);
    }
    Ok(())
}
