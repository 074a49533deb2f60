use crate::domain::changelog::ChangelogDocument;
use crate::domain::release::{ActionRecord, ReleaseDescriptor};
use crate::error::AppResult;
use crate::infra::xml;
use crate::services::{MergeEvent, MergeReporter};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub release_created: bool,
    pub added: usize,
    pub skipped: Vec<String>,
    /// Actions under the release once the merge is done, including earlier ones.
    pub release_actions: usize,
}

/// Merges `actions` under the release keyed by `release.version`.
///
/// Strictly additive: an existing release keeps its date and description, and an
/// action whose issue reference is already present in that release is skipped.
pub fn merge_release(
    document: &mut ChangelogDocument,
    release: &ReleaseDescriptor,
    actions: &[ActionRecord],
    reporter: &mut dyn MergeReporter,
) -> AppResult<MergeOutcome> {
    let body = document.ensure_body()?;
    let mut outcome = MergeOutcome::default();

    let release_node = match document.find_release(body, &release.version) {
        Some(node) => {
            reporter.report(MergeEvent::ReleaseReused {
                version: release.version.clone(),
            });
            node
        }
        None => {
            reporter.report(MergeEvent::ReleaseCreated {
                version: release.version.clone(),
            });
            outcome.release_created = true;
            document.append_release(body, release)
        }
    };

    for action in actions {
        if let Some(issue) = action.dedup_key() {
            if let Some(existing) = document.find_action(release_node, issue) {
                reporter.report(MergeEvent::DuplicateSkipped {
                    issue: issue.to_string(),
                    existing: document.text(existing),
                });
                outcome.skipped.push(issue.to_string());
                continue;
            }
        }

        document.append_action(release_node, action);
        reporter.report(MergeEvent::ActionAdded {
            issue: action.issue_ref.clone(),
            kind: action.kind.as_str(),
        });
        outcome.added += 1;
    }

    outcome.release_actions = document.actions(release_node).len();
    Ok(outcome)
}

/// Source-to-source form of the merge: `existing` is the current changelog text,
/// `None` when there is no document yet.
pub fn merge_source(
    existing: Option<&str>,
    release: &ReleaseDescriptor,
    actions: &[ActionRecord],
    reporter: &mut dyn MergeReporter,
) -> AppResult<(String, MergeOutcome)> {
    let mut document = match existing {
        Some(source) => xml::parse(source)?,
        None => ChangelogDocument::skeleton(),
    };
    let outcome = merge_release(&mut document, release, actions, reporter)?;
    let rendered = xml::render(&document)?;
    Ok((rendered, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::release::ActionKind;
    use crate::error::AppError;

    fn release(version: &str, date: &str) -> ReleaseDescriptor {
        ReleaseDescriptor {
            version: version.to_string(),
            date: date.to_string(),
            description: String::new(),
        }
    }

    fn action(kind: ActionKind, issue: Option<&str>, summary: &str) -> ActionRecord {
        ActionRecord::new(kind, issue.map(str::to_string), summary)
    }

    fn merge(
        existing: Option<&str>,
        release: &ReleaseDescriptor,
        actions: &[ActionRecord],
    ) -> (String, MergeOutcome, Vec<MergeEvent>) {
        let mut events: Vec<MergeEvent> = Vec::new();
        let (rendered, outcome) = merge_source(existing, release, actions, &mut events).unwrap();
        (rendered, outcome, events)
    }

    #[test]
    fn creates_fresh_document() {
        let (rendered, outcome, _) = merge(
            None,
            &release("1.0", "2024-01-01"),
            &[action(ActionKind::Fix, Some("7"), "bug")],
        );

        let document = xml::parse(&rendered).unwrap();
        let releases = document.releases();
        assert_eq!(releases.len(), 1);
        assert_eq!(document.attribute(releases[0], "version"), Some("1.0"));
        assert_eq!(document.attribute(releases[0], "date"), Some("2024-01-01"));

        let actions = document.actions(releases[0]);
        assert_eq!(actions.len(), 1);
        assert_eq!(document.attribute(actions[0], "issue"), Some("7"));
        assert_eq!(document.attribute(actions[0], "type"), Some("fix"));
        assert_eq!(document.text(actions[0]), "bug");
        assert!(outcome.release_created);
        assert_eq!(outcome.added, 1);
    }

    #[test]
    fn rerun_is_idempotent() {
        let release = release("1.0", "2024-01-01");
        let actions = [
            action(ActionKind::Fix, Some("7"), "7: crash on save"),
            action(ActionKind::Add, Some("9"), "9: export to csv"),
        ];

        let (once, _, _) = merge(None, &release, &actions);
        let (twice, outcome, events) = merge(Some(&once), &release, &actions);

        assert_eq!(once, twice);
        assert!(!outcome.release_created);
        assert_eq!(outcome.added, 0);
        assert_eq!(outcome.skipped, vec!["7".to_string(), "9".to_string()]);
        assert_eq!(
            events[0],
            MergeEvent::ReleaseReused {
                version: "1.0".to_string()
            }
        );
    }

    #[test]
    fn existing_release_metadata_is_not_overwritten() {
        let (first, _, _) = merge(
            None,
            &ReleaseDescriptor {
                version: "2.0".to_string(),
                date: "2024-01-01".to_string(),
                description: "original".to_string(),
            },
            &[],
        );
        let (second, _, _) = merge(
            Some(&first),
            &ReleaseDescriptor {
                version: "2.0".to_string(),
                date: "2024-02-02".to_string(),
                description: "changed".to_string(),
            },
            &[action(ActionKind::Update, Some("11"), "11: new docs")],
        );

        let document = xml::parse(&second).unwrap();
        let releases = document.releases();
        assert_eq!(releases.len(), 1);
        assert_eq!(document.attribute(releases[0], "date"), Some("2024-01-01"));
        assert_eq!(document.attribute(releases[0], "description"), Some("original"));
        assert_eq!(document.actions(releases[0]).len(), 1);
    }

    #[test]
    fn duplicate_issue_is_skipped_without_touching_existing_action() {
        let existing = r#"<document>
  <body>
    <release date="2023-01-01" version="1.0" description="">
      <action dev="carol" type="add" issue="42">42: the original</action>
    </release>
  </body>
</document>"#;

        let mut duplicate = action(ActionKind::Fix, Some("42"), "42: rewritten");
        duplicate.developer = Some("mallory".to_string());
        let (rendered, outcome, events) =
            merge(Some(existing), &release("1.0", "2024-01-01"), &[duplicate]);

        let document = xml::parse(&rendered).unwrap();
        let actions = document.actions(document.releases()[0]);
        assert_eq!(actions.len(), 1);
        assert_eq!(document.attribute(actions[0], "dev"), Some("carol"));
        assert_eq!(document.attribute(actions[0], "type"), Some("add"));
        assert_eq!(document.text(actions[0]), "42: the original");
        assert_eq!(outcome.skipped, vec!["42".to_string()]);
        assert!(events.contains(&MergeEvent::DuplicateSkipped {
            issue: "42".to_string(),
            existing: "42: the original".to_string(),
        }));
        assert_eq!(outcome.release_actions, 1);
    }

    #[test]
    fn actions_without_issue_are_always_inserted() {
        let release = release("1.0", "2024-01-01");
        let actions = [
            action(ActionKind::Update, None, "dependency bump"),
            action(ActionKind::Update, None, "dependency bump"),
        ];

        let (first, _, _) = merge(None, &release, &actions);
        let (second, outcome, _) = merge(Some(&first), &release, &actions);

        let document = xml::parse(&second).unwrap();
        assert_eq!(document.actions(document.releases()[0]).len(), 4);
        assert_eq!(outcome.added, 2);
        assert_eq!(outcome.release_actions, 4);
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn same_issue_twice_in_one_batch_is_inserted_once() {
        let (rendered, outcome, _) = merge(
            None,
            &release("1.0", "2024-01-01"),
            &[
                action(ActionKind::Fix, Some("5"), "5: first"),
                action(ActionKind::Fix, Some("5"), "5: second"),
            ],
        );

        let document = xml::parse(&rendered).unwrap();
        assert_eq!(document.actions(document.releases()[0]).len(), 1);
        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.skipped, vec!["5".to_string()]);
    }

    #[test]
    fn issue_is_only_deduplicated_within_its_release() {
        let (first, _, _) = merge(
            None,
            &release("1.0", "2024-01-01"),
            &[action(ActionKind::Fix, Some("7"), "7: bug")],
        );
        let (second, outcome, _) = merge(
            Some(&first),
            &release("1.1", "2024-03-01"),
            &[action(ActionKind::Fix, Some("7"), "7: bug")],
        );

        let document = xml::parse(&second).unwrap();
        let releases = document.releases();
        assert_eq!(releases.len(), 2);
        assert_eq!(document.attribute(releases[1], "version"), Some("1.1"));
        assert_eq!(document.actions(releases[1]).len(), 1);
        assert_eq!(outcome.added, 1);
    }

    #[test]
    fn unversioned_runs_share_one_release() {
        let unversioned = release("", "2024-01-01");
        let (first, _, _) = merge(
            None,
            &unversioned,
            &[action(ActionKind::Add, Some("1"), "1: one")],
        );
        let (second, _, _) = merge(
            Some(&first),
            &unversioned,
            &[action(ActionKind::Add, Some("2"), "2: two")],
        );

        let document = xml::parse(&second).unwrap();
        let releases = document.releases();
        assert_eq!(releases.len(), 1);
        assert_eq!(document.attribute(releases[0], "version"), Some(""));
        let issues: Vec<_> = document
            .actions(releases[0])
            .into_iter()
            .filter_map(|node| document.attribute(node, "issue"))
            .collect();
        assert_eq!(issues, vec!["1", "2"]);
    }

    #[test]
    fn empty_action_list_still_records_release() {
        let (rendered, outcome, _) = merge(None, &release("3.0", "2024-01-01"), &[]);

        let document = xml::parse(&rendered).unwrap();
        assert_eq!(document.releases().len(), 1);
        assert!(outcome.release_created);
        assert_eq!(outcome.added, 0);
    }

    #[test]
    fn preserves_unrelated_content() {
        let existing = r#"<?xml version="1.0" encoding="UTF-8"?>
<document xmlns="http://maven.apache.org/changes/1.0.0">
  <properties>
    <title>Widgets</title>
  </properties>
  <body>
    <!-- older releases below -->
    <release date="2023-01-01" version="0.1" description="alpha">
      <action dev="dan" type="add" due-to="erin" due-to-email="erin@example.com" issue="1">1: bootstrap</action>
    </release>
  </body>
</document>"#;

        let (rendered, _, _) = merge(
            Some(existing),
            &release("0.2", "2024-01-01"),
            &[action(ActionKind::Remove, Some("2"), "2: drop legacy api")],
        );

        assert!(rendered.contains("<title>Widgets</title>"));
        assert!(rendered.contains("<!-- older releases below -->"));
        assert!(rendered.contains(
            r#"<release date="2023-01-01" version="0.1" description="alpha">"#
        ));
        assert!(rendered.contains(
            r#"<action dev="dan" type="add" due-to="erin" due-to-email="erin@example.com" issue="1">1: bootstrap</action>"#
        ));
        assert!(rendered.contains(r#"<action type="remove" issue="2">2: drop legacy api</action>"#));
    }

    #[test]
    fn existing_mixed_content_and_padded_summaries_are_kept() {
        let existing = r#"<document>
  <properties>
    <title>Hello <b>big</b> world</title>
  </properties>
  <body/>
</document>"#;
        let release = release("1.0", "2024-01-01");
        let actions = [action(ActionKind::Fix, Some("3"), "  padded  ")];

        let (once, _, _) = merge(Some(existing), &release, &actions);
        let (twice, outcome, _) = merge(Some(&once), &release, &actions);

        assert!(once.contains("<title>Hello <b>big</b> world</title>"));
        assert!(once.contains(r#"<action type="fix" issue="3">  padded  </action>"#));
        assert_eq!(once, twice);
        assert_eq!(outcome.skipped, vec!["3".to_string()]);
    }

    #[test]
    fn body_is_created_when_missing() {
        let (rendered, _, _) = merge(
            Some("<document><properties/></document>"),
            &release("1.0", "2024-01-01"),
            &[],
        );

        let document = xml::parse(&rendered).unwrap();
        assert!(document.body().is_some());
        assert_eq!(document.releases().len(), 1);
    }

    #[test]
    fn malformed_document_is_a_storage_error() {
        let mut events: Vec<MergeEvent> = Vec::new();
        let err = merge_source(
            Some("<document><body>"),
            &release("1.0", "2024-01-01"),
            &[],
            &mut events,
        )
        .unwrap_err();

        assert!(matches!(err, AppError::Storage(_)));
        assert!(events.is_empty());
    }
}
