use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;

use crate::config::{AppConfig, ConfigOverrides};
use crate::context::AppContext;
use crate::error::AppResult;
use crate::infra::logging::TracingReporter;
use crate::infra::tracker::TrackerClient;
use crate::workflow::report::{ReportOutcome, ReportRequest, generate_report};

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Milestone to report on, or `all` for every milestone.
    #[arg(short, long, env = "CHANGES_MILESTONE")]
    pub milestone: String,
    /// Tracker project identifier, e.g. `owner/repo`.
    #[arg(short, long, env = "CHANGES_PROJECT")]
    pub project: Option<String>,
    /// Changelog file to create or update.
    #[arg(short, long, env = "CHANGES_OUTPUT")]
    pub output: Option<PathBuf>,
    #[arg(long, env = "CHANGES_TRACKER_URL")]
    pub tracker_url: Option<String>,
    #[arg(long, env = "CHANGES_TRACKER_USERNAME")]
    pub username: Option<String>,
    #[arg(long, env = "CHANGES_TRACKER_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
    /// Map a tracker issue type to an action kind, e.g. `Defect=fix`. Repeatable.
    #[arg(long = "type-map", value_name = "TRACKER=KIND", value_parser = parse_type_mapping)]
    pub type_map: Vec<(String, String)>,
    /// Release description for a newly created release entry.
    #[arg(long)]
    pub description: Option<String>,
    /// Release date for a newly created release entry (defaults to today).
    #[arg(long)]
    pub date: Option<String>,
    /// Include issues that are not closed yet.
    #[arg(long)]
    pub include_open: bool,
    /// Tracker request timeout.
    #[arg(long, value_name = "SECONDS")]
    pub timeout_secs: Option<u64>,
}

fn parse_type_mapping(value: &str) -> Result<(String, String), String> {
    let (tracker_type, kind) = value
        .split_once('=')
        .ok_or_else(|| format!("expected TRACKER=KIND, got '{value}'"))?;
    let tracker_type = tracker_type.trim();
    if tracker_type.is_empty() {
        return Err(format!("missing tracker type in '{value}'"));
    }
    Ok((tracker_type.to_string(), kind.trim().to_string()))
}

pub async fn run(args: ReportArgs) -> AppResult<ReportOutcome> {
    let cwd = std::env::current_dir()?;
    let overrides = ConfigOverrides {
        tracker_url: args.tracker_url,
        tracker_username: args.username,
        tracker_token: args.token,
        project: args.project,
        output: args.output,
        issue_types: args.type_map,
        timeout_secs: args.timeout_secs,
    };
    let config = AppConfig::load(&cwd, overrides)?;

    let mut tracker = TrackerClient::new(
        config.tracker_url.clone(),
        config.tracker_username.clone(),
        config.tracker_token.clone(),
        config.milestone_label_prefix.clone(),
        config.request_timeout,
    )?;
    if args.include_open {
        tracker = tracker.including_open();
    }

    let context = AppContext::new(config, Arc::new(tracker));
    let request = ReportRequest {
        milestone: args.milestone,
        description: args.description,
        date: args.date,
        include_open: args.include_open,
    };

    generate_report(&context, request, &mut TracingReporter).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_type_mapping() {
        assert_eq!(
            parse_type_mapping("Defect=fix"),
            Ok(("Defect".to_string(), "fix".to_string()))
        );
        assert!(parse_type_mapping("Defect").is_err());
        assert!(parse_type_mapping("=fix").is_err());
    }
}
