mod cmd;
mod config;
mod context;
mod domain;
mod error;
mod infra;
mod services;
mod workflow;

use clap::{Parser, Subcommand};

use crate::cmd::config::{self as config_cmd, ConfigArgs};
use crate::cmd::report::{self, ReportArgs};
use crate::error::AppResult;
use crate::infra::logging::{LogFormat, init_tracing};

#[derive(Parser)]
#[command(
    name = "changes-report",
    author,
    version,
    about = "Merge closed milestone issues into a changes.xml changelog"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch closed milestone issues and merge them into the changelog.
    Report(ReportArgs),
    /// Manage CLI configuration.
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    if let Err(error) = run(cli.command).await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> AppResult<()> {
    match command {
        Commands::Config(args) => config_cmd::run(args.command),
        Commands::Report(args) => {
            let outcome = report::run(args).await?;
            let version = if outcome.release.version.is_empty() {
                "<unversioned>"
            } else {
                outcome.release.version.as_str()
            };
            println!(
                "Changelog {} updated for release {version}: {} added ({} in release), {} already present, {} dropped as open or unmapped.",
                outcome.path.display(),
                outcome.merge.added,
                outcome.merge.release_actions,
                outcome.merge.skipped.len(),
                outcome.dropped,
            );
            Ok(())
        }
    }
}
