pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "procura",
    about = "Procura operator CLI",
    long_about = "Operate the procurement ledger: migrations, config inspection, demo seeding, and bid ranking.",
    after_help = "Examples:\n  procura migrate\n  procura seed\n  procura rank --request PR-1234 --top 3"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Create a demo request, drive it to approved, and place three bids")]
    Seed,
    #[command(about = "Rank the bids on a purchase request and print the top entries")]
    Rank {
        #[arg(long = "request", help = "Purchase request id, e.g. PR-...")]
        request_id: String,
        #[arg(long, help = "Number of ranked bids to print (default: scoring.default_top_k)")]
        top: Option<usize>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => commands::config::run(),
        Command::Seed => commands::seed::run(),
        Command::Rank { request_id, top } => commands::rank::run(&request_id, top),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
