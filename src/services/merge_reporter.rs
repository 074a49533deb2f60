use std::path::PathBuf;

/// Operator-visible things that happen while a changelog is merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeEvent {
    DocumentCreated { path: PathBuf },
    DocumentReused { path: PathBuf },
    ReleaseCreated { version: String },
    ReleaseReused { version: String },
    ActionAdded { issue: Option<String>, kind: &'static str },
    DuplicateSkipped { issue: String, existing: String },
}

pub trait MergeReporter {
    fn report(&mut self, event: MergeEvent);
}

impl MergeReporter for Vec<MergeEvent> {
    fn report(&mut self, event: MergeEvent) {
        self.push(event);
    }
}
