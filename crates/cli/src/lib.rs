pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "guardian",
    about = "Supply Chain Guardian operator CLI",
    long_about = "Set up the inventory database, inspect configuration, ask the agents questions, and run alert checks.",
    after_help = "Examples:\n  guardian migrate\n  guardian seed\n  guardian ask \"What are the current stock levels?\"\n  guardian alerts --summary"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Reset inventory tables to the deterministic demo dataset and verify it")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, database connectivity, and external source readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Route a question to the operations, strategy, or market agent")]
    Ask {
        #[arg(required = true, num_args = 1.., help = "Question text")]
        query: Vec<String>,
    },
    #[command(about = "Scan inventory and shipments and record new alerts")]
    Alerts {
        #[arg(long, help = "Only report active alerts grouped by severity")]
        summary: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Ask { query } => commands::ask::run(&query.join(" ")),
        Command::Alerts { summary } => commands::alerts::run(summary),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Diagnostics go to stderr so stdout stays a single JSON outcome.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
