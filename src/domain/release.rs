/// Semantic category of a changelog action, serialized as the `type` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Add,
    Fix,
    Remove,
    Update,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::Add,
        ActionKind::Fix,
        ActionKind::Remove,
        ActionKind::Update,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Add => "add",
            ActionKind::Fix => "fix",
            ActionKind::Remove => "remove",
            ActionKind::Update => "update",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "add" => Some(ActionKind::Add),
            "fix" => Some(ActionKind::Fix),
            "remove" => Some(ActionKind::Remove),
            "update" => Some(ActionKind::Update),
            _ => None,
        }
    }
}

/// The release a batch of actions is merged under. `version` is the merge key;
/// an empty version is a literal key, not a wildcard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDescriptor {
    pub version: String,
    pub date: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRecord {
    pub developer: Option<String>,
    pub kind: ActionKind,
    pub issue_ref: Option<String>,
    pub due_to: Option<String>,
    pub due_to_email: Option<String>,
    pub summary: String,
}

impl ActionRecord {
    pub fn new(kind: ActionKind, issue_ref: Option<String>, summary: impl Into<String>) -> Self {
        Self {
            developer: None,
            kind,
            issue_ref,
            due_to: None,
            due_to_email: None,
            summary: summary.into(),
        }
    }

    /// Issue reference usable as a de-duplication key. Absent and empty
    /// references never match an existing action.
    pub fn dedup_key(&self) -> Option<&str> {
        self.issue_ref.as_deref().filter(|issue| !issue.is_empty())
    }
}
