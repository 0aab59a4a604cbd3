//! `calcsetup category` -- show a category as an editing front end sees it.

use anyhow::Result;
use serde::Serialize;
use serde_json::{Map, Value};

use calcsetup_core::item::Item;
use calcsetup_engine::columns::{ColumnView, column_views};
use calcsetup_engine::{RuleChoice, RuleEngine};

use crate::cli::CategoryArgs;
use crate::commands::load_category;
use crate::context::RuntimeContext;
use crate::output::{output_json, output_table};
use crate::styles::{render_accent, render_bold, render_muted};

#[derive(Serialize)]
struct FieldValue<'a> {
    #[serde(flatten)]
    column: &'a ColumnView,
    input_name: String,
    value: String,
}

#[derive(Serialize)]
struct ItemRow {
    id: i64,
    name: String,
    idnumber: String,
    values: Map<String, Value>,
}

#[derive(Serialize)]
struct CategoryReport<'a> {
    course_id: i64,
    category_id: i64,
    anchor_id: i64,
    name: &'a str,
    rule: &'a str,
    rule_name: &'a str,
    fields: Vec<FieldValue<'a>>,
    columns: &'a [ColumnView],
    items: Vec<ItemRow>,
    choices: &'a [RuleChoice],
}

fn item_row(item: &Item, columns: &[ColumnView]) -> ItemRow {
    let values = columns
        .iter()
        .map(|c| (c.property.clone(), Value::from(c.display_value(item))))
        .collect();
    ItemRow {
        id: item.id,
        name: item.display_name().to_string(),
        idnumber: item.idnumber.clone(),
        values,
    }
}

/// Execute the `calcsetup category` command.
pub fn run(ctx: &RuntimeContext, args: &CategoryArgs) -> Result<()> {
    let store = ctx.open_store()?;
    let category = load_category(&store, &args.selector)?;

    let mut engine = RuleEngine::new(&store, &store, ctx.fields());
    let rule = engine.resolve(&category, args.rule.as_deref())?;
    let choices = engine.rules().choices(&rule.idnumber)?;

    let fields = column_views(&rule.fields, engine.fields(), ctx.default_decimals());
    let columns = column_views(&rule.columns, engine.fields(), ctx.default_decimals());

    let anchor = category.anchor();
    let report = CategoryReport {
        course_id: category.course_id(),
        category_id: category.category_id(),
        anchor_id: anchor.id,
        name: anchor.display_name(),
        rule: &rule.idnumber,
        rule_name: &rule.name,
        fields: fields
            .iter()
            .map(|column| FieldValue {
                column,
                input_name: column.input_name(anchor.id),
                value: column.display_value(anchor),
            })
            .collect(),
        columns: &columns,
        items: category
            .items()
            .iter()
            .map(|item| item_row(item, &columns))
            .collect(),
        choices: &choices,
    };

    if ctx.json {
        output_json(&report);
        return Ok(());
    }

    println!(
        "{} {}",
        render_bold(report.name),
        render_muted(&format!(
            "(course {}, category {})",
            report.course_id, report.category_id
        ))
    );
    if rule.is_none() {
        println!("Rule: {}", render_muted(&rule.descr));
    } else {
        println!("Rule: {} ({})", render_accent(&rule.name), rule.idnumber);
    }

    if !report.fields.is_empty() {
        println!("\nFields:");
        for field in &report.fields {
            let lock = if field.column.locked { " (locked)" } else { "" };
            println!(
                "  {}: {}{}",
                field.column.label,
                field.value,
                render_muted(lock)
            );
        }
    }

    println!("\nItems:");
    if report.items.is_empty() {
        println!("  (none)");
    } else {
        let mut headers = vec!["ID", "NAME", "IDNUMBER"];
        headers.extend(columns.iter().map(|c| c.label.as_str()));
        let rows: Vec<Vec<String>> = category
            .items()
            .iter()
            .map(|item| {
                let mut cells = vec![
                    item.id.to_string(),
                    item.display_name().to_string(),
                    item.idnumber.clone(),
                ];
                cells.extend(columns.iter().map(|c| c.display_value(item)));
                cells
            })
            .collect();
        output_table(&headers, &rows);
    }

    println!("\nRules:");
    for choice in report.choices {
        let marker = if choice.selected { "*" } else { " " };
        println!("  {} {:<16} {}", marker, choice.idnumber, choice.name);
    }
    Ok(())
}
