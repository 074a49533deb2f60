use std::time::Duration;

use async_trait::async_trait;
use base64::prelude::{BASE64_STANDARD, Engine as _};
use reqwest::{
    Client,
    header::{ACCEPT, AUTHORIZATION, USER_AGENT},
};
use serde::Deserialize;
use tracing::debug;

use crate::domain::issue::{IssueState, TrackerIssue};
use crate::error::{AppError, AppResult};
use crate::services::IssueTrackerService;

const DEFAULT_PAGE_SIZE: usize = 100;
const CLIENT_USER_AGENT: &str = concat!("changes-report/", env!("CARGO_PKG_VERSION"));

/// Client for a GitHub-compatible REST issues API.
pub struct TrackerClient {
    http: Client,
    base_url: String,
    username: Option<String>,
    token: Option<String>,
    milestone_label_prefix: String,
    state_filter: &'static str,
    page_size: usize,
}

impl TrackerClient {
    pub fn new(
        base_url: String,
        username: Option<String>,
        token: Option<String>,
        milestone_label_prefix: String,
        timeout: Duration,
    ) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::IssueTracker(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            base_url,
            username,
            token,
            milestone_label_prefix,
            state_filter: "closed",
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Ask the tracker for open issues too, not only closed ones.
    pub fn including_open(mut self) -> Self {
        self.state_filter = "all";
        self
    }

    #[cfg(test)]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn auth_header(&self) -> Option<String> {
        match (self.username.as_deref(), self.token.as_deref()) {
            (Some(username), Some(token)) => {
                let encoded = BASE64_STANDARD.encode(format!("{username}:{token}"));
                Some(format!("Basic {encoded}"))
            }
            (None, Some(token)) => Some(format!("Bearer {token}")),
            _ => None,
        }
    }

    fn issues_endpoint(&self, project: &str) -> String {
        format!(
            "{}/repos/{}/issues",
            self.base_url.trim_end_matches('/'),
            project.trim_matches('/')
        )
    }

    async fn fetch_page(
        &self,
        endpoint: &str,
        label: Option<&str>,
        page: usize,
    ) -> AppResult<Vec<IssuePayload>> {
        let mut query = vec![
            ("state", self.state_filter.to_string()),
            ("per_page", self.page_size.to_string()),
            ("page", page.to_string()),
        ];
        if let Some(label) = label {
            query.push(("labels", label.to_string()));
        }

        let mut request = self
            .http
            .get(endpoint)
            .query(&query)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, CLIENT_USER_AGENT);
        if let Some(auth) = self.auth_header() {
            request = request.header(AUTHORIZATION, auth);
        }

        let response = request
            .send()
            .await
            .map_err(|err| AppError::IssueTracker(format!("failed to call tracker: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unable to read response>".to_string());
            return Err(AppError::IssueTracker(format!(
                "tracker responded with {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|err| AppError::IssueTracker(format!("failed to parse tracker response: {err}")))
    }
}

#[async_trait]
impl IssueTrackerService for TrackerClient {
    async fn milestone_issues(
        &self,
        project: &str,
        milestone: Option<&str>,
    ) -> AppResult<Vec<TrackerIssue>> {
        let project = project.trim();
        if project.is_empty() {
            return Err(AppError::Configuration(
                "project identifier must not be empty".to_string(),
            ));
        }

        let endpoint = self.issues_endpoint(project);
        let label = milestone.map(|milestone| format!("{}{milestone}", self.milestone_label_prefix));
        debug!(%endpoint, label = label.as_deref().unwrap_or("<all>"), "querying tracker");

        let mut issues = Vec::new();
        let mut page = 1;
        loop {
            let payload = self.fetch_page(&endpoint, label.as_deref(), page).await?;
            let fetched = payload.len();
            issues.extend(
                payload
                    .into_iter()
                    .filter(|entry| entry.pull_request.is_none())
                    .map(IssuePayload::into_issue),
            );
            if fetched < self.page_size {
                break;
            }
            page += 1;
        }

        debug!(count = issues.len(), "tracker issues fetched");
        Ok(issues)
    }
}

#[derive(Deserialize)]
struct IssuePayload {
    number: u64,
    title: String,
    state: String,
    assignee: Option<UserPayload>,
    #[serde(default)]
    labels: Vec<LabelPayload>,
    pull_request: Option<serde_json::Value>,
}

impl IssuePayload {
    fn into_issue(self) -> TrackerIssue {
        let state = if self.state.eq_ignore_ascii_case("closed") {
            IssueState::Closed
        } else {
            IssueState::Open
        };
        TrackerIssue {
            number: self.number,
            title: self.title,
            state,
            assignee: self.assignee.map(|user| user.login),
            labels: self.labels.into_iter().map(|label| label.name).collect(),
        }
    }
}

#[derive(Deserialize)]
struct UserPayload {
    login: String,
}

#[derive(Deserialize)]
struct LabelPayload {
    name: String,
}
