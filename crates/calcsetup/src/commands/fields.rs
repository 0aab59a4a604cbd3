//! `calcsetup fields` -- list the core property descriptors.

use anyhow::Result;

use calcsetup_core::fields::{FieldDescriptor, Validation};

use crate::cli::FieldsArgs;
use crate::context::RuntimeContext;
use crate::output::{output_json, output_table};

/// Execute the `calcsetup fields` command.
pub fn run(ctx: &RuntimeContext, args: &FieldsArgs) -> Result<()> {
    let fields = ctx.fields();
    let descriptors: Vec<&FieldDescriptor> = if args.editable_only {
        fields.editable_only()
    } else {
        fields.iter().collect()
    };

    if ctx.json {
        output_json(&descriptors);
        return Ok(());
    }

    let rows: Vec<Vec<String>> = descriptors
        .iter()
        .map(|f| {
            let options = f
                .options
                .iter()
                .map(|o| format!("{}={}", o.val, o.name))
                .collect::<Vec<_>>()
                .join(", ");
            vec![
                f.property.to_string(),
                if f.locked { "yes" } else { "" }.to_string(),
                match f.validation {
                    Validation::Number => "number",
                    Validation::None => "",
                }
                .to_string(),
                options,
            ]
        })
        .collect();
    output_table(&["PROPERTY", "LOCKED", "VALIDATION", "OPTIONS"], &rows);
    Ok(())
}
