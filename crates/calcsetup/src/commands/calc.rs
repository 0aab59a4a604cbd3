//! `calcsetup calc` -- render the category calculation, optionally storing it.

use anyhow::{Result, bail};
use serde::Serialize;

use calcsetup_engine::RuleEngine;
use calcsetup_engine::calc::{render_category, save_calculation};
use calcsetup_formula::render::strip_whitespace;

use crate::cli::CalcArgs;
use crate::commands::load_category;
use crate::context::RuntimeContext;
use crate::output::output_json;
use crate::styles::{ICON_PASS, render_muted, render_pass};

#[derive(Serialize)]
struct CalcReport {
    rule: String,
    item_id: i64,
    preview: String,
    formula: String,
    saved: bool,
}

/// Execute the `calcsetup calc` command.
pub fn run(ctx: &RuntimeContext, args: &CalcArgs) -> Result<()> {
    let store = ctx.open_store()?;
    let category = load_category(&store, &args.selector)?;

    let mut engine = RuleEngine::new(&store, &store, ctx.fields());
    let rule = engine.resolve(&category, args.rule.as_deref())?;
    let preview = render_category(&rule, &category)?;
    let item_id = category.anchor().id;

    let mut formula = strip_whitespace(&preview);
    if args.save {
        if formula.is_empty() {
            bail!(
                "there is no calculation to save: rule '{}' has no formula",
                rule.idnumber
            );
        }
        formula = save_calculation(&store, category.course_id(), item_id, &preview)?;
    }

    let report = CalcReport {
        rule: rule.idnumber,
        item_id,
        preview,
        formula,
        saved: args.save,
    };

    if ctx.json {
        output_json(&report);
        return Ok(());
    }

    if report.formula.is_empty() {
        println!("{}", render_muted("No calculation for this rule."));
    } else if args.compact {
        println!("{}", report.formula);
    } else {
        println!("{}", report.preview);
    }
    if report.saved && !ctx.quiet {
        println!(
            "{} Calculation saved on item {}",
            render_pass(ICON_PASS),
            category.anchor().display_name()
        );
    }
    Ok(())
}
