pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "launchpad",
    about = "Launchpad operator CLI",
    long_about = "Inspect Launchpad configuration, check readiness of the completion endpoint and provisioning services, and list the tools exposed to the model.",
    after_help = "Examples:\n  launchpad doctor --json\n  launchpad config\n  launchpad tools"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config and probe the completion and provisioning endpoints")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Print the tool catalog sent to the model on every turn")]
    Tools,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Tools => commands::tools::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
