pub mod merge;
pub mod report;
