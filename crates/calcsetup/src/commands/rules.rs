//! `calcsetup rules` -- list, show, import and administer rules.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use calcsetup_core::rule::{ColumnDescriptor, NO_RULE, Rule, RuleRecord};
use calcsetup_storage::{RuleRepository, SqliteStore};

use crate::cli::{RulesArgs, RulesCommands};
use crate::context::RuntimeContext;
use crate::output::{output_json, output_table};
use crate::styles::{ICON_PASS, render_bold, render_muted, render_pass};

/// Execute a `calcsetup rules` subcommand.
pub fn run(ctx: &RuntimeContext, args: &RulesArgs) -> Result<()> {
    let store = ctx.open_store()?;
    match &args.command {
        RulesCommands::List { all } => run_list(ctx, &store, *all),
        RulesCommands::Show { idnumber } => run_show(ctx, &store, idnumber),
        RulesCommands::Import { file } => run_import(ctx, &store, file),
        RulesCommands::Delete { id } => run_delete(ctx, &store, *id),
        RulesCommands::Hide { id } => run_set_visible(ctx, &store, *id, false),
        RulesCommands::Unhide { id } => run_set_visible(ctx, &store, *id, true),
    }
}

#[derive(Serialize)]
struct RuleSummary<'a> {
    id: i64,
    idnumber: &'a str,
    name: &'a str,
    visible: bool,
    #[serde(skip_serializing_if = "is_blank")]
    descr: &'a str,
}

fn is_blank(s: &&str) -> bool {
    s.is_empty()
}

impl<'a> From<&'a RuleRecord> for RuleSummary<'a> {
    fn from(record: &'a RuleRecord) -> Self {
        Self {
            id: record.id,
            idnumber: &record.idnumber,
            name: &record.name,
            visible: record.visible,
            descr: &record.descr,
        }
    }
}

fn run_list(ctx: &RuntimeContext, store: &SqliteStore, all: bool) -> Result<()> {
    let records = store.list_rules(all)?;

    if ctx.json {
        let summaries: Vec<RuleSummary<'_>> = records.iter().map(RuleSummary::from).collect();
        output_json(&summaries);
        return Ok(());
    }

    if records.is_empty() {
        println!("No rules found.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            vec![
                r.id.to_string(),
                r.idnumber.clone(),
                r.name.clone(),
                if r.visible { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();
    output_table(&["ID", "IDNUMBER", "NAME", "VISIBLE"], &rows);
    Ok(())
}

fn load_rule(store: &SqliteStore, idnumber: &str) -> Result<Rule> {
    let record = store.get_rule_by_idnumber(idnumber).map_err(|e| {
        if e.is_not_found() {
            anyhow::anyhow!("rule '{}' not found", idnumber)
        } else {
            anyhow::Error::new(e)
        }
    })?;
    Ok(Rule::from_record(&record)?)
}

fn run_show(ctx: &RuntimeContext, store: &SqliteStore, idnumber: &str) -> Result<()> {
    let rule = load_rule(store, idnumber)?;

    if ctx.json {
        output_json(&rule);
        return Ok(());
    }

    println!("{} ({})", render_bold(&rule.name), rule.idnumber);
    if !rule.descr.is_empty() {
        println!("  {}", rule.descr);
    }
    if !rule.visible {
        println!("  {}", render_muted("hidden"));
    }

    let descriptor_rows = |descriptors: &[ColumnDescriptor]| {
        descriptors
            .iter()
            .map(|d| {
                vec![
                    d.property.clone(),
                    d.label(),
                    if d.editable { "yes" } else { "no" }.to_string(),
                ]
            })
            .collect::<Vec<_>>()
    };
    if !rule.columns.is_empty() {
        println!("\nColumns:");
        output_table(&["PROPERTY", "TITLE", "EDITABLE"], &descriptor_rows(&rule.columns));
    }
    if !rule.fields.is_empty() {
        println!("\nFields:");
        output_table(&["PROPERTY", "TITLE", "EDITABLE"], &descriptor_rows(&rule.fields));
    }
    if !rule.actions.is_empty() {
        println!("\nActions:");
        let rows: Vec<Vec<String>> = rule
            .actions
            .iter()
            .map(|a| {
                vec![
                    a.set.clone(),
                    a.to.to_string(),
                    a.when.clone(),
                    if a.matches_all() {
                        String::new()
                    } else {
                        a.val.to_string()
                    },
                ]
            })
            .collect();
        output_table(&["SET", "TO", "WHEN", "VAL"], &rows);
    }
    if !rule.calc.is_empty() {
        println!("\nCalculation:\n{}", rule.calc);
    }
    Ok(())
}

/// A rule definition file holds either one rule or a `rules` list.
#[derive(Deserialize)]
#[serde(untagged)]
enum RuleFile {
    Many { rules: Vec<Rule> },
    One(Box<Rule>),
}

impl RuleFile {
    fn into_rules(self) -> Vec<Rule> {
        match self {
            Self::Many { rules } => rules,
            Self::One(rule) => vec![*rule],
        }
    }
}

/// Parses a `.json` or `.toml` rule definition file.
fn parse_rule_file(path: &Path, text: &str) -> Result<Vec<Rule>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let file: RuleFile = match extension.as_deref() {
        Some("json") => serde_json::from_str(text)
            .with_context(|| format!("invalid rule JSON in {}", path.display()))?,
        Some("toml") => toml::from_str(text)
            .with_context(|| format!("invalid rule TOML in {}", path.display()))?,
        _ => bail!(
            "unsupported rule file {}: expected a .json or .toml file",
            path.display()
        ),
    };

    let rules = file.into_rules();
    for rule in &rules {
        let idnumber = rule.idnumber.trim();
        if idnumber.is_empty() || idnumber == NO_RULE {
            bail!(
                "rule '{}' in {} needs an idnumber other than '{}'",
                rule.name,
                path.display(),
                NO_RULE
            );
        }
    }
    Ok(rules)
}

#[derive(Serialize)]
struct ImportedRule {
    id: i64,
    idnumber: String,
}

fn run_import(ctx: &RuntimeContext, store: &SqliteStore, file: &Path) -> Result<()> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let rules = parse_rule_file(file, &text)?;

    let mut imported = Vec::with_capacity(rules.len());
    for rule in rules {
        // Rules are matched by idnumber; ids in a file are ignored.
        let record = RuleRecord {
            id: 0,
            ..rule.to_record()?
        };
        let id = store
            .save_rule(&record)
            .with_context(|| format!("failed to save rule '{}'", record.idnumber))?;
        imported.push(ImportedRule {
            id,
            idnumber: record.idnumber,
        });
    }

    if ctx.json {
        output_json(&imported);
    } else if !ctx.quiet {
        println!(
            "{} Imported {} rule(s) from {}",
            render_pass(ICON_PASS),
            imported.len(),
            file.display()
        );
        for rule in &imported {
            println!("  {} (id {})", rule.idnumber, rule.id);
        }
    }
    Ok(())
}

fn run_delete(ctx: &RuntimeContext, store: &SqliteStore, id: i64) -> Result<()> {
    store
        .delete_rule(id)
        .with_context(|| format!("failed to delete rule {}", id))?;

    if ctx.json {
        output_json(&serde_json::json!({ "deleted": id }));
    } else if !ctx.quiet {
        println!("{} Deleted rule {}", render_pass(ICON_PASS), id);
    }
    Ok(())
}

fn run_set_visible(ctx: &RuntimeContext, store: &SqliteStore, id: i64, visible: bool) -> Result<()> {
    store
        .set_rule_visible(id, visible)
        .with_context(|| format!("failed to update rule {}", id))?;

    if ctx.json {
        output_json(&serde_json::json!({ "id": id, "visible": visible }));
    } else if !ctx.quiet {
        let state = if visible { "visible" } else { "hidden" };
        println!("{} Rule {} is now {}", render_pass(ICON_PASS), id, state);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn toml_rule_list() {
        let text = r#"
            [[rules]]
            idnumber = "quizpass"
            name = "Quiz pass"
            calc = "=SUM({{#items}}[[{{idnumber}}]]{{^last}},{{/last}}{{/items}})"

            [[rules.actions]]
            set = "gradepass"
            to = 5
            when = "itemmodule"
            val = "quiz"

            [[rules.cols]]
            property = "gradepass"
            editable = true
        "#;
        let rules = parse_rule_file(&PathBuf::from("rules.toml"), text).unwrap();
        assert_eq!(rules.len(), 1);
        let rule = &rules[0];
        assert_eq!(rule.idnumber, "quizpass");
        assert!(rule.visible);
        assert_eq!(rule.actions[0].to, serde_json::json!(5));
        assert_eq!(rule.actions[0].val, serde_json::json!("quiz"));
        assert_eq!(rule.columns[0].property, "gradepass");
    }

    #[test]
    fn single_json_rule() {
        let text = r#"{"idnumber":"min","name":"Minimum","calc":"=MIN(1)"}"#;
        let rules = parse_rule_file(&PathBuf::from("MIN.JSON"), text).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name, "Minimum");
        assert!(rules[0].actions.is_empty());
    }

    #[test]
    fn rejects_missing_idnumber_and_unknown_extension() {
        let err = parse_rule_file(&PathBuf::from("r.json"), r#"{"name":"x"}"#).unwrap_err();
        assert!(err.to_string().contains("needs an idnumber"));

        let err =
            parse_rule_file(&PathBuf::from("r.json"), r#"{"idnumber":"norule"}"#).unwrap_err();
        assert!(err.to_string().contains("needs an idnumber"));

        let err = parse_rule_file(&PathBuf::from("r.yaml"), "idnumber: x").unwrap_err();
        assert!(err.to_string().contains("unsupported rule file"));
    }
}
