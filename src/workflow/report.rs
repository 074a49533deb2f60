use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::Local;
use tracing::{debug, info, warn};

use crate::context::AppContext;
use crate::domain::issue::TrackerIssue;
use crate::domain::release::{ActionKind, ActionRecord, ReleaseDescriptor};
use crate::error::{AppError, AppResult};
use crate::infra::changes_file::ChangesFile;
use crate::services::MergeReporter;
use crate::workflow::merge::MergeOutcome;

/// Milestone value that selects issues of every milestone.
pub const ALL_MILESTONES: &str = "all";
const RELEASE_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub milestone: String,
    pub description: Option<String>,
    pub date: Option<String>,
    pub include_open: bool,
}

pub struct ReportOutcome {
    pub path: PathBuf,
    pub release: ReleaseDescriptor,
    pub merge: MergeOutcome,
    pub dropped: usize,
}

pub async fn generate_report(
    ctx: &AppContext,
    request: ReportRequest,
    reporter: &mut dyn MergeReporter,
) -> AppResult<ReportOutcome> {
    let milestone = request.milestone.trim();
    if milestone.is_empty() {
        return Err(AppError::Configuration("milestone must not be empty".to_string()));
    }
    let milestone_filter = (milestone != ALL_MILESTONES).then_some(milestone);

    let issues = ctx
        .issue_tracker
        .milestone_issues(&ctx.config.project, milestone_filter)
        .await?;
    info!(count = issues.len(), project = %ctx.config.project, "fetched tracker issues");

    let release = release_descriptor(milestone_filter, request.description, request.date);
    let actions = map_issues(
        &issues,
        &ctx.config.type_label_prefix,
        &ctx.config.issue_types,
        request.include_open,
    );
    debug!("Release action length: {}", actions.len());

    let file = ChangesFile::new(&ctx.config.output_path);
    let merge = file.merge(&release, &actions, reporter)?;

    Ok(ReportOutcome {
        path: file.path().to_path_buf(),
        release,
        dropped: issues.len() - actions.len(),
        merge,
    })
}

/// `milestone` of `None` produces the unversioned release keyed by `""`.
pub fn release_descriptor(
    milestone: Option<&str>,
    description: Option<String>,
    date: Option<String>,
) -> ReleaseDescriptor {
    ReleaseDescriptor {
        version: milestone.unwrap_or_default().to_string(),
        date: date.unwrap_or_else(|| Local::now().format(RELEASE_DATE_FORMAT).to_string()),
        description: description.unwrap_or_default(),
    }
}

pub fn map_issues(
    issues: &[TrackerIssue],
    type_label_prefix: &str,
    issue_types: &BTreeMap<String, ActionKind>,
    include_open: bool,
) -> Vec<ActionRecord> {
    issues
        .iter()
        .filter(|issue| include_open || issue.is_closed())
        .filter_map(|issue| map_issue(issue, type_label_prefix, issue_types))
        .collect()
}

/// Translates one tracker issue, or drops it when its type has no mapping.
pub fn map_issue(
    issue: &TrackerIssue,
    type_label_prefix: &str,
    issue_types: &BTreeMap<String, ActionKind>,
) -> Option<ActionRecord> {
    let issue_type = issue.named_label(type_label_prefix);
    let Some(kind) = issue_type.and_then(|issue_type| issue_types.get(issue_type)) else {
        warn!(
            "Type <{}> cannot be translated for issue <{}>; skipping",
            issue_type.unwrap_or("none"),
            issue.number
        );
        return None;
    };

    let mut action = ActionRecord::new(
        *kind,
        Some(issue.number.to_string()),
        format!("{}: {}", issue.number, issue.title),
    );
    action.developer = issue.assignee.clone();
    Some(action)
}
