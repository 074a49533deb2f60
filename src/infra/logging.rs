use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use crate::services::{MergeEvent, MergeReporter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Installs the global subscriber. `RUST_LOG` wins over the verbosity flag.
pub fn init_tracing(verbose: u8, format: LogFormat) {
    let filter = match verbose {
        0 => "changes_report=info",
        1 => "changes_report=debug",
        _ => "changes_report=trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

/// Forwards merge events to `tracing`.
pub struct TracingReporter;

impl MergeReporter for TracingReporter {
    fn report(&mut self, event: MergeEvent) {
        match event {
            MergeEvent::DocumentCreated { path } => {
                info!("Creating file <{}>", path.display());
            }
            MergeEvent::DocumentReused { path } => {
                info!("Reuse existing file <{}>", path.display());
            }
            MergeEvent::ReleaseCreated { version } => {
                debug!("Creating new release node for version <{version}>");
            }
            MergeEvent::ReleaseReused { version } => {
                debug!("Using existing release node for version <{version}>");
            }
            MergeEvent::ActionAdded { issue, kind } => {
                debug!(issue = issue.as_deref().unwrap_or("-"), kind, "action added");
            }
            MergeEvent::DuplicateSkipped { issue, existing } => {
                warn!("Action <{issue}> already exists as <{existing}>; skipping");
            }
        }
    }
}
