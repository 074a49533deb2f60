pub mod issue_tracker;
pub mod merge_reporter;

pub use issue_tracker::IssueTrackerService;
pub use merge_reporter::{MergeEvent, MergeReporter};
