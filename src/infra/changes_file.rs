use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::release::{ActionRecord, ReleaseDescriptor};
use crate::error::{AppError, AppResult};
use crate::services::{MergeEvent, MergeReporter};
use crate::workflow::merge::{MergeOutcome, merge_source};

/// A `changes.xml` file on disk. The file is read once and rewritten in full.
pub struct ChangesFile {
    path: PathBuf,
}

impl ChangesFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Merges into the file, creating it (and its parent directories) first when absent.
    pub fn merge(
        &self,
        release: &ReleaseDescriptor,
        actions: &[ActionRecord],
        reporter: &mut dyn MergeReporter,
    ) -> AppResult<MergeOutcome> {
        let existing = self.load_or_create(reporter)?;
        let existing = existing.filter(|source| !source.trim().is_empty());
        let (rendered, outcome) = merge_source(existing.as_deref(), release, actions, reporter)?;
        self.save(&rendered)?;
        Ok(outcome)
    }

    fn load_or_create(&self, reporter: &mut dyn MergeReporter) -> AppResult<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                reporter.report(MergeEvent::DocumentReused {
                    path: self.path.clone(),
                });
                Ok(Some(contents))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                reporter.report(MergeEvent::DocumentCreated {
                    path: self.path.clone(),
                });
                self.create_empty()?;
                Ok(None)
            }
            Err(err) => Err(self.storage_error("cannot read", err)),
        }
    }

    fn create_empty(&self) -> AppResult<()> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|err| self.storage_error("cannot create parent directories of", err))?;
        }
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .map_err(|err| self.storage_error("cannot create", err))?;
        Ok(())
    }

    /// Writes to a sibling temporary file, then renames it over the target.
    fn save(&self, rendered: &str) -> AppResult<()> {
        let staging = self.staging_path();
        debug!(path = %staging.display(), "writing staged changelog");

        if let Err(err) = fs::write(&staging, rendered) {
            let _ = fs::remove_file(&staging);
            return Err(self.storage_error("cannot write", err));
        }
        if let Err(err) = fs::rename(&staging, &self.path) {
            let _ = fs::remove_file(&staging);
            return Err(self.storage_error("cannot replace", err));
        }
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "changes.xml".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn storage_error(&self, action: &str, err: std::io::Error) -> AppError {
        AppError::Storage(format!("{action} <{}>: {err}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::release::ActionKind;
    use crate::infra::xml;

    fn release(version: &str) -> ReleaseDescriptor {
        ReleaseDescriptor {
            version: version.to_string(),
            date: "2024-01-01".to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn creates_file_and_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("target/generated-changes/changes.xml");
        let file = ChangesFile::new(&path);
        let mut events: Vec<MergeEvent> = Vec::new();

        let outcome = file
            .merge(
                &release("1.0"),
                &[ActionRecord::new(ActionKind::Fix, Some("7".to_string()), "bug")],
                &mut events,
            )
            .unwrap();

        assert_eq!(outcome.added, 1);
        assert_eq!(events[0], MergeEvent::DocumentCreated { path: path.clone() });
        let document = xml::parse(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(document.releases().len(), 1);
        assert!(!file.staging_path().exists());
    }

    #[test]
    fn reuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("changes.xml");
        let file = ChangesFile::new(&path);
        let actions = [ActionRecord::new(ActionKind::Add, Some("1".to_string()), "1: one")];

        file.merge(&release("1.0"), &actions, &mut Vec::<MergeEvent>::new()).unwrap();
        let first = fs::read_to_string(&path).unwrap();

        let mut events: Vec<MergeEvent> = Vec::new();
        let outcome = file.merge(&release("1.0"), &actions, &mut events).unwrap();

        assert_eq!(events[0], MergeEvent::DocumentReused { path: path.clone() });
        assert_eq!(outcome.skipped, vec!["1".to_string()]);
        assert_eq!(fs::read_to_string(&path).unwrap(), first);
    }

    #[test]
    fn empty_leftover_file_is_treated_as_new_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("changes.xml");
        fs::write(&path, "").unwrap();

        let outcome = ChangesFile::new(&path)
            .merge(&release("1.0"), &[], &mut Vec::<MergeEvent>::new())
            .unwrap();

        assert!(outcome.release_created);
        let document = xml::parse(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(document.releases().len(), 1);
    }

    #[test]
    fn malformed_file_is_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("changes.xml");
        fs::write(&path, "<document><body>").unwrap();

        let err = ChangesFile::new(&path)
            .merge(&release("1.0"), &[], &mut Vec::<MergeEvent>::new())
            .unwrap_err();

        assert!(matches!(err, AppError::Storage(_)));
        assert_eq!(fs::read_to_string(&path).unwrap(), "<document><body>");
    }

    #[test]
    fn failed_final_write_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("changes.xml");
        let file = ChangesFile::new(&path);
        file.merge(&release("1.0"), &[], &mut Vec::<MergeEvent>::new()).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        let staging = file.staging_path();
        fs::create_dir(&staging).unwrap();

        let err = file
            .merge(
                &release("2.0"),
                &[ActionRecord::new(ActionKind::Add, Some("8".to_string()), "8: new")],
                &mut Vec::<MergeEvent>::new(),
            )
            .unwrap_err();

        assert!(matches!(err, AppError::Storage(_)));
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
        assert!(!staging.is_file());
    }

    #[test]
    fn uncreatable_path_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let err = ChangesFile::new(blocker.join("changes.xml"))
            .merge(&release("1.0"), &[], &mut Vec::<MergeEvent>::new())
            .unwrap_err();

        assert!(matches!(err, AppError::Storage(_)));
    }
}
