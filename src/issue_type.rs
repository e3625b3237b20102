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

use std::collections::HashMap;
use std::fmt;

use color_eyre::eyre::{bail, Result};

/// The category of a change, as the reports group them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IssueType {
    Add,
    Fix,
    Update,
}

impl IssueType {
    /// The category as it's written in a changes file.
    pub fn model_representation(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Fix => "fix",
            Self::Update => "update",
        }
    }

    /// Find the category for a group name in the issue type configuration.
    /// The name must match exactly.
    pub fn lookup_by_key(key: &str) -> Option<Self> {
        match key {
            "add" => Some(Self::Add),
            "fix" => Some(Self::Fix),
            "update" => Some(Self::Update),
            _ => None,
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model_representation())
    }
}

/// An issue tracker, and the way its native issue types translate to change categories.
#[derive(Clone, Debug)]
pub struct IssueManagementSystem {
    name: String,
    issue_type_map: HashMap<String, IssueType>,
}

impl IssueManagementSystem {
    /// A tracker with no type mapping at all. Every issue ends up uncategorized.
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            issue_type_map: HashMap::new(),
        }
    }

    fn with_defaults(name: &str, defaults: &[(&str, IssueType)]) -> Self {
        let mut system = Self::empty(name);
        for &(issue_type, category) in defaults {
            system.insert(issue_type, category);
        }
        system
    }

    /// The tracker with this name, with its standard issue types.
    /// The name is case-insensitive. An unknown tracker gets an empty mapping.
    pub fn for_tracker(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "jira" => Self::jira(),
            "github" => Self::github(),
            "trac" => Self::trac(),
            _ => {
                log::debug!("No standard issue types for the {} tracker.", name);
                Self::empty(name)
            }
        }
    }

    /// Jira, with its standard issue types.
    pub fn jira() -> Self {
        Self::with_defaults(
            "JIRA",
            &[
                ("Bug", IssueType::Fix),
                ("Dependency upgrade", IssueType::Update),
                ("Improvement", IssueType::Update),
                ("New Feature", IssueType::Add),
                ("Task", IssueType::Update),
                ("Wish", IssueType::Update),
            ],
        )
    }

    /// GitHub, where the type of an issue is its label.
    pub fn github() -> Self {
        Self::with_defaults(
            "GitHub",
            &[("bug", IssueType::Fix), ("enhancement", IssueType::Add)],
        )
    }

    /// Trac, with its standard ticket types.
    pub fn trac() -> Self {
        Self::with_defaults(
            "Trac",
            &[
                ("defect", IssueType::Fix),
                ("enhancement", IssueType::Add),
                ("task", IssueType::Update),
            ],
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Map a tracker-native issue type to a category, overriding any previous mapping.
    pub fn insert(&mut self, issue_type: &str, category: IssueType) {
        self.issue_type_map.insert(issue_type.to_string(), category);
    }

    /// Apply the user's issue type configuration on top of the current mapping.
    ///
    /// The keys are category names (`add`, `fix`, or `update`) and the values are
    /// comma-separated lists of tracker-native issue types. Only the listed types change;
    /// the rest of the mapping stays. An unknown category name, or an issue type listed
    /// under two categories, is an error, and in that case the mapping doesn't change at all.
    pub fn apply_configuration(&mut self, issue_types: &HashMap<String, String>) -> Result<()> {
        let mut groups: Vec<(&String, &String)> = issue_types.iter().collect();
        groups.sort();

        let mut updates: Vec<(&str, IssueType)> = Vec::new();

        for (group, type_names) in groups {
            let Some(category) = IssueType::lookup_by_key(group) else {
                bail!(
                    "Invalid issue action type found in the configuration of {}: `{}`. \
                     Use `add`, `fix`, or `update`.",
                    self.name,
                    group
                );
            };

            for type_name in type_names.split(',').map(str::trim) {
                if type_name.is_empty() {
                    continue;
                }
                match updates.iter().find(|(name, _)| *name == type_name) {
                    Some((_, previous)) if *previous != category => bail!(
                        "The issue type `{}` is configured as both `{}` and `{}` in {}.",
                        type_name,
                        previous,
                        category,
                        self.name
                    ),
                    Some(_) => {}
                    None => updates.push((type_name, category)),
                }
            }
        }

        for (type_name, category) in updates {
            log::debug!("{}: mapping issue type `{}` to `{}`.", self.name, type_name, category);
            self.insert(type_name, category);
        }

        Ok(())
    }

    /// The category for a tracker-native issue type.
    pub fn lookup(&self, issue_type: &str) -> Option<IssueType> {
        self.issue_type_map.get(issue_type).copied()
    }

    /// The category of an issue type as written in a changes file,
    /// or an empty string if the type has no mapping.
    pub fn category(&self, issue_type: Option<&str>) -> &'static str {
        issue_type
            .and_then(|issue_type| self.lookup(issue_type))
            .map_or("", IssueType::model_representation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn default_jira_mapping() {
        let jira = IssueManagementSystem::jira();

        assert_eq!(jira.category(Some("Bug")), "fix");
        assert_eq!(jira.category(Some("New Feature")), "add");
        assert_eq!(jira.category(Some("Improvement")), "update");
        assert_eq!(jira.category(Some("Unknown Type")), "");
        assert_eq!(jira.category(None), "");
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let jira = IssueManagementSystem::jira();

        assert_eq!(jira.category(Some("bug")), "");
    }

    #[test]
    fn custom_mapping_keeps_the_defaults() {
        let mut jira = IssueManagementSystem::jira();
        jira.apply_configuration(&config(&[("add", "Story,Epic"), ("fix", "Defect, Error")]))
            .unwrap();

        assert_eq!(jira.category(Some("Story")), "add");
        assert_eq!(jira.category(Some("Epic")), "add");
        assert_eq!(jira.category(Some("Defect")), "fix");
        assert_eq!(jira.category(Some("Error")), "fix");
        assert_eq!(jira.category(Some("Improvement")), "update");
    }

    #[test]
    fn custom_mapping_can_move_a_default() {
        let mut jira = IssueManagementSystem::jira();
        jira.apply_configuration(&config(&[("add", "Improvement")]))
            .unwrap();

        assert_eq!(jira.category(Some("Improvement")), "add");
    }

    #[test]
    fn empty_system_maps_nothing() {
        let system = IssueManagementSystem::empty("Mock IMS");

        assert_eq!(system.category(Some("New Feature")), "");
        assert_eq!(system.category(Some("Bug")), "");
    }

    #[test]
    fn valid_group_names_are_accepted() {
        let mut system = IssueManagementSystem::empty("Mock IMS");

        let result = system.apply_configuration(&config(&[
            ("add", "Story,Epic"),
            ("fix", "Defect"),
            ("update", "Improvement"),
        ]));

        assert!(result.is_ok());
    }

    #[test]
    fn invalid_group_name_fails_without_changes() {
        let mut system = IssueManagementSystem::github();

        let result =
            system.apply_configuration(&config(&[("new", "Story,Epic"), ("fix", "bug,defect")]));

        assert!(result.is_err());
        assert_eq!(system.category(Some("defect")), "");
        assert_eq!(system.category(Some("enhancement")), "add");
    }

    #[test]
    fn default_trac_mapping() {
        let trac = IssueManagementSystem::trac();

        assert_eq!(trac.name(), "Trac");
        assert_eq!(trac.category(Some("defect")), "fix");
        assert_eq!(trac.category(Some("enhancement")), "add");
        assert_eq!(trac.category(Some("task")), "update");
        assert_eq!(trac.category(Some("milestone")), "");
    }

    #[test]
    fn systems_by_tracker_name() {
        assert_eq!(IssueManagementSystem::for_tracker("TRAC").category(Some("task")), "update");
        assert_eq!(IssueManagementSystem::for_tracker("Jira").category(Some("Bug")), "fix");
        assert_eq!(IssueManagementSystem::for_tracker("GitHub").category(Some("bug")), "fix");

        let unknown = IssueManagementSystem::for_tracker("Mantis");
        assert_eq!(unknown.name(), "Mantis");
        assert_eq!(unknown.category(Some("Bug")), "");
    }

    #[test]
    fn type_in_two_groups_fails_without_changes() {
        let mut jira = IssueManagementSystem::jira();

        let result = jira.apply_configuration(&config(&[
            ("add", "Story, Improvement"),
            ("update", "Improvement"),
        ]));

        assert!(result.is_err());
        assert_eq!(jira.category(Some("Story")), "");
        assert_eq!(jira.category(Some("Improvement")), "update");
    }

    #[test]
    fn repeated_type_in_one_group_is_accepted() {
        let mut jira = IssueManagementSystem::jira();

        jira.apply_configuration(&config(&[("fix", "Defect, Defect")]))
            .unwrap();

        assert_eq!(jira.category(Some("Defect")), "fix");
    }
}
