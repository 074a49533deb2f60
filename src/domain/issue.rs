#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueState {
    Open,
    Closed,
}

#[derive(Debug, Clone)]
pub struct TrackerIssue {
    pub number: u64,
    pub title: String,
    pub state: IssueState,
    pub assignee: Option<String>,
    pub labels: Vec<String>,
}

impl TrackerIssue {
    /// Value of the first label starting with `prefix`, with the prefix removed.
    pub fn named_label(&self, prefix: &str) -> Option<&str> {
        self.labels
            .iter()
            .find_map(|label| label.strip_prefix(prefix))
    }

    pub fn is_closed(&self) -> bool {
        self.state == IssueState::Closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_named_label() {
        let issue = TrackerIssue {
            number: 3,
            title: "Crash on save".to_string(),
            state: IssueState::Closed,
            assignee: None,
            labels: vec![
                "Priority-High".to_string(),
                "Type-Defect".to_string(),
                "Type-Enhancement".to_string(),
            ],
        };

        assert_eq!(issue.named_label("Type-"), Some("Defect"));
        assert_eq!(issue.named_label("Milestone-"), None);
    }
}
