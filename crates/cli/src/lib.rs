pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "shopsage",
    about = "ShopSage recommendation CLI",
    long_about = "Run laptop recommendations, apply migrations, and inspect runtime readiness.",
    after_help = "Examples:\n  shopsage recommend \"gaming laptop under 60000\"\n  shopsage doctor --json\n  shopsage config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Rank catalog listings for a free-text query")]
    Recommend {
        #[arg(help = "Free-text shopping query, e.g. \"light coding laptop under 70k\"")]
        query: String,
        #[arg(long, help = "Number of recommendations to return")]
        limit: Option<usize>,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, keyword tables, DB connectivity and migration state")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Recommend { query, limit, json } => commands::recommend::run(&query, limit, json),
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
