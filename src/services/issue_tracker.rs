use async_trait::async_trait;

use crate::domain::issue::TrackerIssue;
use crate::error::AppResult;

#[async_trait]
pub trait IssueTrackerService: Send + Sync {
    /// Issues tagged against `milestone`; `None` returns issues of every milestone.
    async fn milestone_issues(
        &self,
        project: &str,
        milestone: Option<&str>,
    ) -> AppResult<Vec<TrackerIssue>>;
}
