//! `calcsetup validate` -- check a calculation formula for an item.

use anyhow::Result;

use calcsetup_engine::calc::validate_formula;

use crate::cli::ValidateArgs;
use crate::context::RuntimeContext;
use crate::output::output_json;
use crate::styles::{ICON_FAIL, ICON_PASS, render_pass, render_warn};

/// Execute the `calcsetup validate` command.
///
/// An invalid formula is a normal result, not an error: the exit code is
/// only non-zero when the item cannot be found or the store fails.
pub fn run(ctx: &RuntimeContext, args: &ValidateArgs) -> Result<()> {
    let store = ctx.open_store()?;
    let valid = validate_formula(&store, args.course, args.item, &args.formula)?;

    if ctx.json {
        output_json(&serde_json::json!({ "valid": valid }));
    } else if valid {
        println!("{} valid", render_pass(ICON_PASS));
    } else {
        println!("{} invalid", render_warn(ICON_FAIL));
    }
    Ok(())
}
