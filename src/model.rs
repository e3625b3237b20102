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
The tracker-independent data that every part of the program passes around:
issues downloaded from a tracker, and the releases, actions, and components
that the reports are rendered from.
*/

use std::fmt;

use chrono::{DateTime, Utc};

/// An issue downloaded from any of the supported trackers,
/// normalized so that the rest of the program doesn't care about its origin.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Issue {
    pub id: String,
    pub key: String,
    pub link: Option<String>,
    pub summary: String,
    /// The tracker-native issue type, such as `Bug` in Jira or a label in GitHub.
    pub kind: Option<String>,
    pub status: Option<String>,
    pub resolution: Option<String>,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    pub reporter: Option<String>,
    /// The affected versions, joined as a single display string.
    pub version: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub fix_versions: Vec<String>,
    pub components: Vec<String>,
}

impl Issue {
    /// A minimal issue. The remaining fields are filled in by the tracker adapters.
    pub fn new(key: &str, summary: &str) -> Self {
        Self {
            id: key.to_string(),
            key: key.to_string(),
            summary: summary.to_string(),
            ..Self::default()
        }
    }
}

/// A person that an action credits for the contribution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DueTo {
    pub name: String,
    pub email: Option<String>,
}

impl DueTo {
    /// Pair up the comma-separated names and emails from a changes file.
    /// Names without a matching email get no email.
    pub fn parse_lists(names: Option<&str>, emails: Option<&str>) -> Vec<Self> {
        let names = comma_list(names);
        let emails: Vec<String> = emails
            .map(|emails| emails.split(',').map(|e| e.trim().to_string()).collect())
            .unwrap_or_default();

        names
            .into_iter()
            .enumerate()
            .map(|(index, name)| Self {
                name,
                email: emails.get(index).filter(|e| !e.is_empty()).cloned(),
            })
            .collect()
    }
}

/// A single entry in the list of changes in a release.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Action {
    /// One of `add`, `fix`, `update`, `remove`, or an empty string if unknown.
    pub kind: String,
    pub text: String,
    pub issue: Option<String>,
    pub fixed_issues: Vec<String>,
    pub dev: Option<String>,
    pub due_to: Vec<DueTo>,
    pub date: Option<String>,
    /// The issue management system that the issue IDs refer to.
    pub system: Option<String>,
}

impl Action {
    /// The primary issue followed by all the other fixed issues, without duplicates.
    pub fn all_issues(&self) -> Vec<&str> {
        let mut issues: Vec<&str> = Vec::new();

        for issue in self.issue.iter().chain(self.fixed_issues.iter()) {
            if !issues.contains(&issue.as_str()) {
                issues.push(issue);
            }
        }

        issues
    }
}

/// A named group of actions inside a release.
/// Represents the changes that a child module contributes to an aggregated report.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Component {
    pub name: String,
    pub description: Option<String>,
    pub actions: Vec<Action>,
}

impl Component {
    /// Wrap all the actions of a child module release under the name of the module.
    pub fn from_release(name: &str, release: &Release) -> Self {
        Self {
            name: name.to_string(),
            description: release.description.clone(),
            actions: release.actions.clone(),
        }
    }
}

/// All the changes in a single version of the project.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Release {
    pub version: String,
    pub date: Option<String>,
    pub description: Option<String>,
    pub actions: Vec<Action>,
    pub components: Vec<Component>,
}

impl Release {
    /// An empty release with the specified version.
    pub fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
            ..Self::default()
        }
    }

    /// Produce a copy of this release with the actions of another release appended.
    /// The version, date, and description of this release stay.
    #[must_use]
    pub fn with_actions_from(self, other: &Release) -> Self {
        let mut actions = self.actions;
        actions.extend(other.actions.iter().cloned());

        Self { actions, ..self }
    }

    /// Produce a copy of this release with an additional component at the end.
    #[must_use]
    pub fn with_component(self, component: Component) -> Self {
        let mut components = self.components;
        components.push(component);

        Self { components, ..self }
    }

    /// The number of actions in the release, including those in components.
    pub fn action_count(&self) -> usize {
        self.actions.len()
            + self
                .components
                .iter()
                .map(|component| component.actions.len())
                .sum::<usize>()
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Release[version='{}', date='{}', description='{}', actionsSize={}]",
            self.version,
            self.date.as_deref().unwrap_or_default(),
            self.description.as_deref().unwrap_or_default(),
            self.actions.len()
        )
    }
}

/// Describe a list of releases on a single line, for diagnostic messages.
pub fn describe_releases(releases: &[Release]) -> String {
    let described: Vec<String> = releases.iter().map(ToString::to_string).collect();
    format!("[{}]", described.join(", "))
}

/// Split a comma-separated configuration value into trimmed, non-empty items.
pub fn comma_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_to_pads_missing_emails() {
        let due_to = DueTo::parse_lists(Some("Jane Doe, John Roe ,"), Some("jane@example.org"));

        assert_eq!(
            due_to,
            vec![
                DueTo {
                    name: "Jane Doe".into(),
                    email: Some("jane@example.org".into()),
                },
                DueTo {
                    name: "John Roe".into(),
                    email: None,
                },
            ]
        );
        assert!(DueTo::parse_lists(None, Some("nobody@example.org")).is_empty());
    }

    #[test]
    fn merged_release_keeps_its_metadata() {
        let mut first = Release::new("1.0");
        first.date = Some("2023-01-01".into());
        first.actions.push(Action {
            text: "First".into(),
            ..Action::default()
        });

        let mut second = Release::new("1.0");
        second.date = Some("1999-12-31".into());
        second.actions.push(Action {
            text: "Second".into(),
            ..Action::default()
        });

        let merged = first.with_actions_from(&second);

        assert_eq!(merged.date.as_deref(), Some("2023-01-01"));
        assert_eq!(merged.actions.len(), 2);
        assert_eq!(merged.actions[1].text, "Second");
    }

    #[test]
    fn all_issues_skips_duplicates() {
        let action = Action {
            issue: Some("MCHANGES-1".into()),
            fixed_issues: vec!["MCHANGES-1".into(), "MCHANGES-2".into()],
            ..Action::default()
        };

        assert_eq!(action.all_issues(), vec!["MCHANGES-1", "MCHANGES-2"]);
    }

    #[test]
    fn comma_list_drops_blanks() {
        assert_eq!(comma_list(Some(" a, ,b ,")), vec!["a", "b"]);
        assert!(comma_list(None).is_empty());
        assert!(comma_list(Some("")).is_empty());
    }
}
