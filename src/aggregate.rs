/*
harvest: Generate a changes report and a release announcement from issue trackers.
Copyright (C) 2022  Marek Suchánek  <msuchane@redhat.com>

This program is free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

/*!
Grouping issues into releases, and merging the releases that come
from several trackers or from several modules of a project.

None of the functions modify their input. Merged releases are new values.
*/

use color_eyre::eyre::{bail, Result};

use crate::issue_type::IssueManagementSystem;
use crate::model::{describe_releases, Action, Component, DueTo, Issue, Release};
use crate::version;

/// Convert an issue to an action in the changes report.
pub fn action_from_issue(issue: &Issue, system: &IssueManagementSystem) -> Action {
    Action {
        kind: system.category(issue.kind.as_deref()).to_string(),
        text: issue.summary.clone(),
        issue: Some(issue.key.clone()),
        dev: issue.assignee.clone(),
        due_to: issue
            .reporter
            .iter()
            .map(|reporter| DueTo {
                name: reporter.clone(),
                email: None,
            })
            .collect(),
        ..Action::default()
    }
}

/// Group issues into releases by their fix versions.
///
/// An issue with several fix versions contributes an action to each of the releases.
/// The releases are sorted from the newest version to the oldest.
pub fn releases_from_issues(issues: &[Issue], system: &IssueManagementSystem) -> Vec<Release> {
    let mut releases: Vec<Release> = Vec::new();

    for issue in issues {
        for fix_version in &issue.fix_versions {
            let action = action_from_issue(issue, system);

            if let Some(release) = releases.iter_mut().find(|r| &r.version == fix_version) {
                release.actions.push(action);
            } else {
                let mut release = Release::new(fix_version);
                release.actions.push(action);
                releases.push(release);
            }
        }
    }

    // The sort is stable, so equal versions keep the order of their first appearance.
    releases.sort_by(|left, right| version::compare(&right.version, &left.version));

    log::debug!(
        "Grouped {} issues into {} releases.",
        issues.len(),
        releases.len()
    );

    releases
}

/// Merge two lists of releases into one.
///
/// A version that's in both lists results in a single release with the metadata
/// from the first list and the actions from both. Versions that are only
/// in the second list follow after all the releases from the first list.
pub fn merge_releases(first: Option<&[Release]>, second: Option<&[Release]>) -> Vec<Release> {
    let (first, second) = match (first, second) {
        (None, None) => return Vec::new(),
        (Some(first), None) => return first.to_vec(),
        (None, Some(second)) => return second.to_vec(),
        (Some(first), Some(second)) => (first, second),
    };

    let mut merged: Vec<Release> = first
        .iter()
        .map(|release| match find_release(second, &release.version) {
            Some(other) => release.clone().with_actions_from(other),
            None => release.clone(),
        })
        .collect();

    merged.extend(
        second
            .iter()
            .filter(|release| find_release(first, &release.version).is_none())
            .cloned(),
    );

    merged
}

/// Attach the releases of a child module to the parent releases as named components.
///
/// A child release without a matching parent version becomes a new release
/// that only holds the component.
pub fn merge_components(
    parent: &[Release],
    component_name: &str,
    child: &[Release],
) -> Vec<Release> {
    let mut merged: Vec<Release> = parent
        .iter()
        .map(|release| match find_release(child, &release.version) {
            Some(child_release) => release
                .clone()
                .with_component(Component::from_release(component_name, child_release)),
            None => release.clone(),
        })
        .collect();

    for child_release in child {
        if find_release(parent, &child_release.version).is_none() {
            let release = Release {
                version: child_release.version.clone(),
                date: child_release.date.clone(),
                ..Release::default()
            };
            merged.push(
                release.with_component(Component::from_release(component_name, child_release)),
            );
        }
    }

    merged
}

/// Find the release with exactly this version.
pub fn find_release<'a>(releases: &'a [Release], version: &str) -> Option<&'a Release> {
    releases.iter().find(|release| release.version == version)
}

/// Find the release that corresponds to the current project version.
/// A snapshot version matches the release without the snapshot suffix.
pub fn latest_release<'a>(releases: &'a [Release], project_version: &str) -> Result<&'a Release> {
    let version = version::strip_snapshot(project_version);
    log::debug!("Looking for the release of version {}.", version);

    match find_release(releases, version) {
        Some(release) => Ok(release),
        None => bail!(
            "Couldn't find the release '{}' among the supplied releases: {}",
            version,
            describe_releases(releases)
        ),
    }
}

/// Keep only the issues that have a fix version starting with the prefix.
pub fn issues_with_version_prefix(issues: &[Issue], prefix: &str) -> Result<Vec<Issue>> {
    let filtered: Vec<Issue> = issues
        .iter()
        .filter(|issue| issue.fix_versions.iter().any(|v| v.starts_with(prefix)))
        .cloned()
        .collect();

    if filtered.is_empty() {
        bail!(
            "None of the issues has a fix version that starts with '{}'.",
            prefix
        );
    }

    Ok(filtered)
}

/// Keep only the issues that are fixed in the version. A snapshot suffix is ignored.
pub fn issues_for_version(issues: &[Issue], version: &str) -> Result<Vec<Issue>> {
    let version = version::strip_snapshot(version);

    let filtered: Vec<Issue> = issues
        .iter()
        .filter(|issue| issue.fix_versions.iter().any(|v| v == version))
        .cloned()
        .collect();

    if filtered.is_empty() {
        bail!(
            "Couldn't find any issues for the version '{}' among the supplied issues.",
            version
        );
    }

    Ok(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(key: &str, kind: &str, fix_versions: &[&str]) -> Issue {
        Issue {
            kind: Some(kind.to_string()),
            fix_versions: fix_versions.iter().map(ToString::to_string).collect(),
            ..Issue::new(key, &format!("Summary of {key}"))
        }
    }

    fn release(version: &str, actions: usize) -> Release {
        let mut release = Release::new(version);
        for index in 0..actions {
            release.actions.push(Action {
                text: format!("Change {index} in {version}"),
                ..Action::default()
            });
        }
        release
    }

    fn versions(releases: &[Release]) -> Vec<&str> {
        releases.iter().map(|r| r.version.as_str()).collect()
    }

    #[test]
    fn merge_with_nothing() {
        let releases = vec![release("1.0", 1), release("0.9", 2)];

        assert_eq!(merge_releases(Some(releases.as_slice()), None), releases);
        assert_eq!(merge_releases(None, Some(releases.as_slice())), releases);
        assert!(merge_releases(None, None).is_empty());
    }

    #[test]
    fn merge_sums_the_actions() {
        let mut first = vec![release("1.0", 2)];
        first[0].date = Some("2023-05-01".into());
        let mut second = vec![release("1.0", 3), release("1.1", 1)];
        second[0].date = Some("2000-01-01".into());

        let merged = merge_releases(Some(first.as_slice()), Some(second.as_slice()));

        assert_eq!(versions(&merged), vec!["1.0", "1.1"]);
        assert_eq!(merged[0].actions.len(), 5);
        assert_eq!(merged[0].date.as_deref(), Some("2023-05-01"));
        // The inputs stay intact.
        assert_eq!(first[0].actions.len(), 2);
    }

    #[test]
    fn merge_keeps_the_second_list_order() {
        let first = vec![release("2.0", 1)];
        let second = vec![release("1.5", 1), release("2.0", 1), release("1.0", 1)];

        let merged = merge_releases(Some(first.as_slice()), Some(second.as_slice()));

        assert_eq!(versions(&merged), vec!["2.0", "1.5", "1.0"]);
    }

    #[test]
    fn merge_child_components() {
        let parent = vec![release("2.0", 1)];
        let mut child_only = release("3.0", 2);
        child_only.date = Some("2024-02-02".into());
        let child = vec![release("2.0", 3), child_only];

        let merged = merge_components(&parent, "childName", &child);

        assert_eq!(versions(&merged), vec!["2.0", "3.0"]);

        assert_eq!(merged[0].actions.len(), 1);
        assert_eq!(merged[0].components.len(), 1);
        assert_eq!(merged[0].components[0].name, "childName");
        assert_eq!(merged[0].components[0].actions.len(), 3);
        assert_eq!(merged[0].action_count(), 4);

        assert!(merged[1].actions.is_empty());
        assert_eq!(merged[1].date.as_deref(), Some("2024-02-02"));
        assert_eq!(merged[1].components.len(), 1);
        assert_eq!(merged[1].components[0].name, "childName");
        assert_eq!(merged[1].components[0].actions.len(), 2);
    }

    #[test]
    fn releases_from_issues_newest_first() {
        let issues = vec![
            issue("TEST-1", "Bug", &["1.0.0-alpha"]),
            issue("TEST-2", "Bug", &["1.2.1"]),
            issue("TEST-3", "Bug", &["0.1.1"]),
            issue("TEST-4", "Bug", &["3.0"]),
            issue("TEST-5", "Bug", &["4"]),
            issue("TEST-6", "Bug", &["0.1.1"]),
        ];

        let releases = releases_from_issues(&issues, &IssueManagementSystem::jira());

        assert_eq!(
            versions(&releases),
            vec!["4", "3.0", "1.2.1", "1.0.0-alpha", "0.1.1"]
        );
        let oldest = &releases[4];
        assert_eq!(oldest.actions.len(), 2);
        assert_eq!(oldest.actions[0].issue.as_deref(), Some("TEST-3"));
        assert_eq!(oldest.actions[1].issue.as_deref(), Some("TEST-6"));
    }

    #[test]
    fn issue_in_several_releases() {
        let issues = vec![issue("TEST-1", "New Feature", &["1.0", "1.1"])];

        let releases = releases_from_issues(&issues, &IssueManagementSystem::jira());

        assert_eq!(versions(&releases), vec!["1.1", "1.0"]);
        assert!(releases.iter().all(|r| r.actions.len() == 1));
    }

    #[test]
    fn issue_without_fix_version_is_skipped() {
        let issues = vec![issue("TEST-1", "Bug", &[])];

        assert!(releases_from_issues(&issues, &IssueManagementSystem::jira()).is_empty());
    }

    #[test]
    fn action_fields() {
        let mut source = issue("MCHANGES-42", "Bug", &["2.0"]);
        source.assignee = Some("dev1".into());
        source.reporter = Some("Jane Doe".into());

        let action = action_from_issue(&source, &IssueManagementSystem::jira());

        assert_eq!(action.kind, "fix");
        assert_eq!(action.issue.as_deref(), Some("MCHANGES-42"));
        assert_eq!(action.text, "Summary of MCHANGES-42");
        assert_eq!(action.dev.as_deref(), Some("dev1"));
        assert_eq!(action.due_to[0].name, "Jane Doe");

        let unknown = action_from_issue(
            &issue("MCHANGES-43", "Mystery", &[]),
            &IssueManagementSystem::jira(),
        );
        assert_eq!(unknown.kind, "");
        assert!(unknown.due_to.is_empty());
    }

    #[test]
    fn latest_release_ignores_snapshot() {
        let releases = vec![release("1.1", 1), release("1.0", 1)];

        assert_eq!(
            latest_release(&releases, "1.1-SNAPSHOT").unwrap().version,
            "1.1"
        );
        assert_eq!(latest_release(&releases, "1.0").unwrap().version, "1.0");
    }

    #[test]
    fn latest_release_lists_known_releases() {
        let releases = vec![release("1.1", 1), release("1.0", 0)];

        let error = latest_release(&releases, "2.0-SNAPSHOT").unwrap_err();
        let message = error.to_string();

        assert!(message.contains("'2.0'"));
        assert!(message.contains("version='1.1'"));
        assert!(message.contains("actionsSize=0"));
    }

    #[test]
    fn filter_by_version_prefix() {
        let issues = vec![
            issue("TEST-1", "Bug", &["plugin-1.0"]),
            issue("TEST-2", "Bug", &["other-1.0"]),
        ];

        let filtered = issues_with_version_prefix(&issues, "plugin-").unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].key, "TEST-1");

        assert!(issues_with_version_prefix(&issues, "missing-").is_err());
    }

    #[test]
    fn filter_by_current_version() {
        let issues = vec![
            issue("TEST-1", "Bug", &["1.0", "1.1"]),
            issue("TEST-2", "Bug", &["1.0"]),
        ];

        assert_eq!(issues_for_version(&issues, "1.1-SNAPSHOT").unwrap().len(), 1);
        assert_eq!(issues_for_version(&issues, "1.0").unwrap().len(), 2);
        assert!(issues_for_version(&issues, "2.0").is_err());
    }
}
