use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;
mod profile;

#[derive(Parser)]
#[command(name = "abtrack", about = "Replay A/B test page loads against a CMS site")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage configuration
    Config(commands::config::ConfigArgs),
    /// Inspect or edit the simulated browser profile
    Profile(commands::profile::ProfileArgs),
    /// Fire one goal event on a page
    Trigger(commands::visit::TriggerArgs),
    /// Load a page: register for its test and report reached goals
    Visit(commands::visit::VisitArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Config(args) => commands::config::run(args),
        Commands::Profile(args) => commands::profile::run(args),
        Commands::Trigger(args) => commands::visit::run_trigger(args).await,
        Commands::Visit(args) => commands::visit::run_visit(args).await,
    }
}
