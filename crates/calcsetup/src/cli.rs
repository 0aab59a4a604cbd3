//! Clap CLI definitions for the `calcsetup` command.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// calcsetup -- rule-driven grade calculation setup.
///
/// Attaches rules to grade categories, applies their property actions to
/// the category's items and generates the category calculation.
#[derive(Parser, Debug)]
#[command(
    name = "calcsetup",
    about = "Rule-driven grade calculation setup",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global flags available to all subcommands.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Database path (default: from calcsetup.yaml, else ./calcsetup.db).
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Configuration file (default: discover calcsetup.yaml upwards).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose/debug output.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output (errors only).
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,
}

/// All available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database and seed the built-in rules.
    Init(InitArgs),

    /// Manage rule definitions.
    Rules(RulesArgs),

    /// Load course gradebooks.
    Gradebook(GradebookArgs),

    /// Show a category with its rule, columns and rule choices.
    Category(CategoryArgs),

    /// Attach a rule to a category and run its actions.
    Apply(ApplyArgs),

    /// Render (and optionally store) the category calculation.
    Calc(CalcArgs),

    /// Edit item properties through the rule's columns.
    Update(UpdateArgs),

    /// Check a calculation formula for an item.
    Validate(ValidateArgs),

    /// List the core property descriptors.
    Fields(FieldsArgs),

    /// Generate shell completion scripts.
    Completion(CompletionArgs),
}

/// Selects a category of a course. The course's root category is used when
/// `--category` is omitted.
#[derive(Args, Debug, Clone)]
pub struct CategorySelector {
    /// Course id.
    #[arg(long)]
    pub course: i64,

    /// Grade category id (default: the course's root category).
    #[arg(long)]
    pub category: Option<i64>,
}

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------

/// Arguments for `calcsetup init`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Do not seed the built-in rules, whatever the configuration says.
    #[arg(long)]
    pub no_seed: bool,

    /// Also write calcsetup.yaml with the effective settings to the
    /// current directory.
    #[arg(long)]
    pub write_config: bool,
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Arguments for `calcsetup rules`.
#[derive(Args, Debug)]
pub struct RulesArgs {
    #[command(subcommand)]
    pub command: RulesCommands,
}

/// Rule subcommands.
#[derive(Subcommand, Debug)]
pub enum RulesCommands {
    /// List rules.
    List {
        /// Include hidden rules.
        #[arg(long)]
        all: bool,
    },

    /// Show one rule by idnumber.
    Show {
        /// Rule idnumber.
        idnumber: String,
    },

    /// Create or update rules from a .json or .toml file.
    Import {
        /// Rule definition file.
        file: PathBuf,
    },

    /// Delete a rule by id.
    Delete {
        /// Rule id.
        id: i64,
    },

    /// Hide a rule from the picker.
    Hide {
        /// Rule id.
        id: i64,
    },

    /// Show a hidden rule in the picker again.
    Unhide {
        /// Rule id.
        id: i64,
    },
}

// ---------------------------------------------------------------------------
// Gradebook
// ---------------------------------------------------------------------------

/// Arguments for `calcsetup gradebook`.
#[derive(Args, Debug)]
pub struct GradebookArgs {
    #[command(subcommand)]
    pub command: GradebookCommands,
}

/// Gradebook subcommands.
#[derive(Subcommand, Debug)]
pub enum GradebookCommands {
    /// Import courses, categories and items from a JSON export.
    Import {
        /// Gradebook JSON file.
        file: PathBuf,
    },
}

// ---------------------------------------------------------------------------
// Category / apply / calc / update
// ---------------------------------------------------------------------------

/// Arguments for `calcsetup category`.
#[derive(Args, Debug)]
pub struct CategoryArgs {
    #[command(flatten)]
    pub selector: CategorySelector,

    /// Show this rule instead of the one stored on the category.
    #[arg(long)]
    pub rule: Option<String>,
}

/// Arguments for `calcsetup apply`.
#[derive(Args, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub selector: CategorySelector,

    /// Rule idnumber; `norule` detaches the current rule.
    pub rule: String,
}

/// Arguments for `calcsetup calc`.
#[derive(Args, Debug)]
pub struct CalcArgs {
    #[command(flatten)]
    pub selector: CategorySelector,

    /// Render this rule instead of the one stored on the category.
    #[arg(long)]
    pub rule: Option<String>,

    /// Store the formula as the category item's calculation.
    #[arg(long)]
    pub save: bool,

    /// Print the formula with whitespace removed.
    #[arg(long)]
    pub compact: bool,
}

/// Arguments for `calcsetup update`.
#[derive(Args, Debug)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub selector: CategorySelector,

    /// Edit as `<property>_<itemId>=<value>`. Repeatable; applied in order.
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub set: Vec<(String, String)>,

    /// Use this rule's columns instead of the stored rule's.
    #[arg(long)]
    pub rule: Option<String>,
}

/// Splits `key=value` at the first `=`.
fn parse_assignment(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

// ---------------------------------------------------------------------------
// Validate / fields / completion
// ---------------------------------------------------------------------------

/// Arguments for `calcsetup validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Course id.
    #[arg(long)]
    pub course: i64,

    /// Grade item the formula is meant for.
    #[arg(long)]
    pub item: i64,

    /// The formula, e.g. "=SUM([[a1]],[[a2]])".
    pub formula: String,
}

/// Arguments for `calcsetup fields`.
#[derive(Args, Debug)]
pub struct FieldsArgs {
    /// Only list properties that may be written.
    #[arg(long)]
    pub editable_only: bool,
}

/// Arguments for `calcsetup completion`.
#[derive(Args, Debug)]
pub struct CompletionArgs {
    /// Target shell.
    #[arg(value_enum)]
    pub shell: Shell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn assignments_split_at_first_equals() {
        assert_eq!(
            parse_assignment("gradepass_12=4=5"),
            Ok(("gradepass_12".to_string(), "4=5".to_string()))
        );
        assert_eq!(
            parse_assignment("itemgroup_3="),
            Ok(("itemgroup_3".to_string(), String::new()))
        );
        assert!(parse_assignment("gradepass_12").is_err());
        assert!(parse_assignment("=4").is_err());
    }

    #[test]
    fn update_collects_repeated_sets() {
        let cli = Cli::try_parse_from([
            "calcsetup",
            "update",
            "--course",
            "2",
            "--set",
            "gradepass_2=40",
            "--set",
            "itemgroup_3=core",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Update(args)) => {
                assert_eq!(args.selector.course, 2);
                assert_eq!(args.selector.category, None);
                assert_eq!(args.set.len(), 2);
                assert_eq!(args.set[1].1, "core");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
