//! `calcsetup` -- rule-driven grade calculation setup CLI.
//!
//! Parses CLI arguments with clap, resolves the runtime context from the
//! configuration, and dispatches to command handlers.

mod cli;
mod commands;
mod context;
mod output;
mod styles;

use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;

use cli::{Cli, Commands};
use context::RuntimeContext;

/// Tracks whether a Ctrl+C has already been received.
static CTRLC_RECEIVED: AtomicBool = AtomicBool::new(false);

fn main() {
    // First Ctrl+C: exit cleanly. Second: force exit.
    let _ = ctrlc::set_handler(|| {
        if CTRLC_RECEIVED.swap(true, Ordering::SeqCst) {
            std::process::exit(1);
        }
        std::process::exit(0);
    });

    let cli = Cli::parse();

    let result = RuntimeContext::from_global_args(&cli.global).and_then(|ctx| {
        init_logging(&ctx);
        dispatch(&ctx, cli.command)
    });

    // Handle errors: print message and exit with code 1
    if let Err(e) = result {
        if cli.global.json {
            let err_json = serde_json::json!({
                "error": format!("{:#}", e),
            });
            if let Ok(s) = serde_json::to_string_pretty(&err_json) {
                eprintln!("{}", s);
            }
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

/// Installs the stderr subscriber. `-v` forces debug output for this
/// tool's crates; otherwise the configured filter applies. `-q` disables
/// logging.
fn init_logging(ctx: &RuntimeContext) {
    if ctx.quiet {
        return;
    }
    let filter = if ctx.verbose {
        "calcsetup=debug".to_string()
    } else {
        ctx.config.log.filter.clone()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn dispatch(ctx: &RuntimeContext, command: Option<Commands>) -> anyhow::Result<()> {
    match command {
        Some(Commands::Init(args)) => commands::init::run(ctx, &args),
        Some(Commands::Rules(args)) => commands::rules::run(ctx, &args),
        Some(Commands::Gradebook(args)) => commands::gradebook::run(ctx, &args),
        Some(Commands::Category(args)) => commands::category::run(ctx, &args),
        Some(Commands::Apply(args)) => commands::apply::run(ctx, &args),
        Some(Commands::Calc(args)) => commands::calc::run(ctx, &args),
        Some(Commands::Update(args)) => commands::update::run(ctx, &args),
        Some(Commands::Validate(args)) => commands::validate::run(ctx, &args),
        Some(Commands::Fields(args)) => commands::fields::run(ctx, &args),
        Some(Commands::Completion(args)) => commands::completion::run(ctx, &args),
        None => {
            // No subcommand -- print help
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
    }
}
