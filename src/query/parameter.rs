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

use color_eyre::eyre::{bail, Result};
use once_cell::sync::Lazy;

use super::{sort_column, split_values, QueryBuilder};

// The numeric IDs that the old Jira issue navigator expects in place of names.
static PRIORITIES: Lazy<HashMap<&str, &str>> = Lazy::new(|| {
    HashMap::from([
        ("Blocker", "1"),
        ("Critical", "2"),
        ("Major", "3"),
        ("Minor", "4"),
        ("Trivial", "5"),
    ])
});
static RESOLUTIONS: Lazy<HashMap<&str, &str>> = Lazy::new(|| {
    HashMap::from([
        ("Unresolved", "-1"),
        ("Fixed", "1"),
        ("Won't Fix", "2"),
        ("Duplicate", "3"),
        ("Incomplete", "4"),
        ("Cannot Reproduce", "5"),
    ])
});
static STATUSES: Lazy<HashMap<&str, &str>> = Lazy::new(|| {
    HashMap::from([
        ("Open", "1"),
        ("In Progress", "3"),
        ("Reopened", "4"),
        ("Resolved", "5"),
        ("Closed", "6"),
    ])
});
static TYPES: Lazy<HashMap<&str, &str>> = Lazy::new(|| {
    HashMap::from([
        ("Bug", "1"),
        ("New Feature", "2"),
        ("Task", "3"),
        ("Improvement", "4"),
        ("Wish", "5"),
        ("Test", "6"),
        ("Sub-task", "7"),
    ])
});

/// The sort field that the issue navigator uses for a column name.
fn sort_field(column: &str) -> Option<&'static str> {
    let field = match column {
        "key" => "issuekey",
        "summary" => "summary",
        "status" => "status",
        "resolution" => "resolution",
        "assignee" => "assignee",
        "reporter" => "reporter",
        "type" => "issuetype",
        "priority" => "priority",
        "version" => "versions",
        "fix version" => "fixVersions",
        "component" => "components",
        "created" => "created",
        "updated" => "updated",
        _ => return None,
    };
    Some(field)
}

/// Builds a query out of the URL parameters of the issue navigator in Jira 3.
///
/// The parameters are appended in the order that the methods are called,
/// each starting with `&`. The project and the single fix version aren't
/// part of this query; the caller puts them in the URL.
#[derive(Clone, Debug, Default)]
pub struct ParameterQueryBuilder {
    filter: String,
    query: String,
}

impl ParameterQueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn append(&mut self, parameter: &str, value: &str) {
        self.query.push('&');
        self.query.push_str(parameter);
        self.query.push('=');
        self.query.push_str(value);
    }

    /// Append the IDs of known names. Unknown names are skipped.
    fn append_mapped(&mut self, parameter: &str, values: &str, ids: &HashMap<&str, &str>) {
        for value in split_values(values) {
            if let Some(id) = ids.get(value) {
                self.append(parameter, id);
            } else {
                log::debug!("Skipping the unknown {} value `{}`.", parameter, value);
            }
        }
    }
}

fn unsupported_list<T>(operation: &str) -> Result<T> {
    bail!(
        "The `{}` operation with a list of values isn't supported for old parameter queries.",
        operation
    )
}

impl QueryBuilder for ParameterQueryBuilder {
    fn build(&self) -> String {
        if self.filter.is_empty() {
            self.query.clone()
        } else {
            self.filter.clone()
        }
    }

    fn filter(&mut self, filter: &str) -> &mut Self {
        self.filter = filter.to_string();
        self
    }

    /// This has no effect in parameter queries.
    fn project(&mut self, _project: &str) -> &mut Self {
        self
    }

    /// This has no effect in parameter queries.
    fn fix_version(&mut self, _fix_version: &str) -> &mut Self {
        self
    }

    fn fix_version_ids(&mut self, fix_version_ids: &str) -> &mut Self {
        for fix_version in split_values(fix_version_ids) {
            self.append("fixfor", fix_version);
        }
        self
    }

    fn fix_version_id_list(&mut self, _fix_version_ids: &[String]) -> Result<&mut Self> {
        unsupported_list("fixVersionIds")
    }

    fn status_ids(&mut self, status_ids: &str) -> &mut Self {
        for status in split_values(status_ids) {
            if let Some(id) = STATUSES.get(status) {
                self.append("statusIds", id);
            // Numeric status IDs can be passed directly.
            } else if status.parse::<i32>().is_ok() {
                self.append("statusIds", status);
            } else {
                log::error!("Invalid status ID: `{}`", status);
            }
        }
        self
    }

    fn status_id_list(&mut self, _status_ids: &[String]) -> Result<&mut Self> {
        unsupported_list("statusIds")
    }

    fn resolution_ids(&mut self, resolution_ids: &str) -> &mut Self {
        self.append_mapped("resolutionIds", resolution_ids, &RESOLUTIONS);
        self
    }

    fn resolution_id_list(&mut self, _resolution_ids: &[String]) -> Result<&mut Self> {
        unsupported_list("resolutionIds")
    }

    fn priority_ids(&mut self, priority_ids: &str) -> &mut Self {
        self.append_mapped("priorityIds", priority_ids, &PRIORITIES);
        self
    }

    fn priority_id_list(&mut self, _priority_ids: &[String]) -> Result<&mut Self> {
        unsupported_list("priorityIds")
    }

    fn type_ids(&mut self, type_ids: &str) -> &mut Self {
        self.append_mapped("type", type_ids, &TYPES);
        self
    }

    fn type_id_list(&mut self, _type_ids: &[String]) -> Result<&mut Self> {
        unsupported_list("typeIds")
    }

    fn components(&mut self, components: &str) -> &mut Self {
        for component in split_values(components) {
            self.append("component", component);
        }
        self
    }

    fn component_list(&mut self, components: &[String]) -> Result<&mut Self> {
        for component in components.iter().map(|c| c.trim()) {
            if !component.is_empty() {
                self.append("component", component);
            }
        }
        Ok(self)
    }

    fn sort_column_names(&mut self, sort_column_names: &str) -> &mut Self {
        let mut valid_columns = 0;

        // The issue navigator expects the columns in reverse order.
        for column in sort_column_names.split(',').rev() {
            let (name, descending) = sort_column(column);

            if let Some(field) = sort_field(&name) {
                self.append("sorter/field", field);
                self.append("sorter/order", if descending { "DESC" } else { "ASC" });
                valid_columns += 1;
            } else {
                log::error!("The configured sort column `{}` isn't correct.", name);
            }
        }

        if valid_columns == 0 {
            log::error!(
                "None of the configured sort columns `{}` are correct.",
                sort_column_names
            );
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query() {
        assert_eq!(ParameterQueryBuilder::new().build(), "");
    }

    #[test]
    fn project_and_fix_version_are_ignored() {
        assert_eq!(
            ParameterQueryBuilder::new()
                .project("DOXIA")
                .fix_version("1.0")
                .build(),
            ""
        );
    }

    #[test]
    fn names_map_to_ids() {
        let query = ParameterQueryBuilder::new()
            .priority_ids("Blocker, Major, Unheard-of")
            .resolution_ids("Won't Fix")
            .type_ids("Bug,Sub-task")
            .build();

        assert_eq!(
            query,
            "&priorityIds=1&priorityIds=3&resolutionIds=2&type=1&type=7"
        );
    }

    #[test]
    fn numeric_statuses_pass_through() {
        assert_eq!(
            ParameterQueryBuilder::new()
                .status_ids("Closed, 10001, Nonsense")
                .build(),
            "&statusIds=6&statusIds=10001"
        );
    }

    #[test]
    fn fix_versions_and_components() {
        assert_eq!(
            ParameterQueryBuilder::new()
                .fix_version_ids("12345, 12346")
                .components("core,")
                .build(),
            "&fixfor=12345&fixfor=12346&component=core"
        );
    }

    #[test]
    fn component_string_and_list_are_identical() {
        let list: Vec<String> = vec!["core".into(), " site ".into()];

        assert_eq!(
            ParameterQueryBuilder::new().components("core, site").build(),
            ParameterQueryBuilder::new()
                .component_list(&list)
                .unwrap()
                .build()
        );
    }

    #[test]
    fn lists_are_unsupported() {
        let list: Vec<String> = vec!["1".into()];
        let mut builder = ParameterQueryBuilder::new();

        assert!(builder.fix_version_id_list(&list).is_err());
        assert!(builder.status_id_list(&list).is_err());
        assert!(builder.resolution_id_list(&list).is_err());
        assert!(builder.priority_id_list(&list).is_err());
        assert!(builder.type_id_list(&list).is_err());
    }

    #[test]
    fn sort_columns_in_reverse_order() {
        assert_eq!(
            ParameterQueryBuilder::new()
                .sort_column_names("key DESC, fix version, nonsense")
                .build(),
            "&sorter/field=fixVersions&sorter/order=ASC\
             &sorter/field=issuekey&sorter/order=DESC"
        );
    }

    #[test]
    fn invalid_sort_columns_are_dropped() {
        assert_eq!(
            ParameterQueryBuilder::new()
                .sort_column_names("nonsense, more nonsense")
                .build(),
            ""
        );
    }

    #[test]
    fn filter_overrides_everything() {
        let filter = "&pid=12345&status=1";

        assert_eq!(
            ParameterQueryBuilder::new()
                .status_ids("Open")
                .filter(filter)
                .type_ids("Bug")
                .build(),
            filter
        );
    }
}
