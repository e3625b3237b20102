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
Translating the filters configured for Jira into a search query.

Two query syntaxes exist: JQL, which current Jira versions accept in the REST API,
and the URL parameters of the old issue navigator.
*/

use color_eyre::eyre::Result;

use crate::config::JiraConfig;

mod jql;
mod parameter;

pub use jql::JqlQueryBuilder;
pub use parameter::ParameterQueryBuilder;

/// The operations that both query syntaxes share.
///
/// The string variants take comma-separated values. The list variants take the same
/// values already split; a builder that can't handle lists reports an error instead.
pub trait QueryBuilder {
    /// Assemble the query. If a filter is set, the filter is the whole query.
    fn build(&self) -> String;

    /// Use this raw query instead of anything that the other methods add.
    fn filter(&mut self, filter: &str) -> &mut Self;

    fn project(&mut self, project: &str) -> &mut Self;

    /// Combining this with `fix_version_ids` results in a valid query that finds nothing,
    /// unless both refer to the same version.
    fn fix_version(&mut self, fix_version: &str) -> &mut Self;

    fn fix_version_ids(&mut self, fix_version_ids: &str) -> &mut Self;
    fn fix_version_id_list(&mut self, fix_version_ids: &[String]) -> Result<&mut Self>;

    fn status_ids(&mut self, status_ids: &str) -> &mut Self;
    fn status_id_list(&mut self, status_ids: &[String]) -> Result<&mut Self>;

    fn resolution_ids(&mut self, resolution_ids: &str) -> &mut Self;
    fn resolution_id_list(&mut self, resolution_ids: &[String]) -> Result<&mut Self>;

    fn priority_ids(&mut self, priority_ids: &str) -> &mut Self;
    fn priority_id_list(&mut self, priority_ids: &[String]) -> Result<&mut Self>;

    fn type_ids(&mut self, type_ids: &str) -> &mut Self;
    fn type_id_list(&mut self, type_ids: &[String]) -> Result<&mut Self>;

    fn components(&mut self, components: &str) -> &mut Self;
    fn component_list(&mut self, components: &[String]) -> Result<&mut Self>;

    /// Sort by these comma-separated columns. Each can end with `ASC` or `DESC`.
    fn sort_column_names(&mut self, sort_column_names: &str) -> &mut Self;
}

/// Split a comma-separated value into trimmed, non-empty items.
fn split_values(values: &str) -> Vec<&str> {
    values
        .split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .collect()
}

/// Split a sort column such as `key DESC` into the lowercase column name
/// and whether the order is descending. The order defaults to ascending.
fn sort_column(column: &str) -> (String, bool) {
    let lower = column.trim().to_lowercase();

    let (name, descending) = match lower.rsplit_once(char::is_whitespace) {
        Some((name, "desc")) => (name, true),
        Some((name, "asc")) => (name, false),
        _ => match lower.as_str() {
            "desc" => ("", true),
            "asc" => ("", false),
            _ => (lower.as_str(), false),
        },
    };

    (name.trim().to_string(), descending)
}

/// Apply all filters from the Jira configuration to a query builder.
///
/// The IDs are passed as they're configured. Resolving names to IDs
/// against a live Jira instance is up to the caller.
pub fn from_config<B: QueryBuilder>(
    builder: &mut B,
    jira: &JiraConfig,
    project: &str,
    fix_for: Option<&str>,
) {
    builder.project(project);

    if let Some(fix_for) = fix_for {
        builder.fix_version(fix_for);
    }
    if let Some(fix_version_ids) = &jira.fix_version_ids {
        builder.fix_version_ids(fix_version_ids);
    }
    if let Some(status_ids) = &jira.status_ids {
        builder.status_ids(status_ids);
    }
    if let Some(priority_ids) = &jira.priority_ids {
        builder.priority_ids(priority_ids);
    }
    if let Some(resolution_ids) = &jira.resolution_ids {
        builder.resolution_ids(resolution_ids);
    }
    if let Some(component) = &jira.component {
        builder.components(component);
    }
    if let Some(type_ids) = &jira.type_ids {
        builder.type_ids(type_ids);
    }
    if let Some(sort_column_names) = &jira.sort_column_names {
        builder.sort_column_names(sort_column_names);
    }
    if let Some(filter) = &jira.filter {
        builder.filter(filter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_column_directions() {
        assert_eq!(sort_column("key"), ("key".to_string(), false));
        assert_eq!(sort_column("  Key   DESC  "), ("key".to_string(), true));
        assert_eq!(sort_column("fix version asc"), ("fix version".to_string(), false));
        assert_eq!(sort_column(""), (String::new(), false));
    }

    #[test]
    fn split_values_ignores_blanks() {
        assert_eq!(split_values(" Blocker , ,Major,"), vec!["Blocker", "Major"]);
        assert!(split_values("").is_empty());
    }

    #[test]
    fn configuration_fills_both_builders() {
        let jira = JiraConfig {
            status_ids: Some("Closed".into()),
            type_ids: Some("Bug".into()),
            sort_column_names: Some("key DESC".into()),
            ..JiraConfig::default()
        };

        let mut jql = JqlQueryBuilder::new();
        jql.url_encode(false);
        from_config(&mut jql, &jira, "MCHANGES", Some("2.1"));
        assert_eq!(
            jql.build(),
            "project = MCHANGES AND fixVersion = \"2.1\" AND status in (Closed) \
             AND type in (Bug) ORDER BY key DESC"
        );

        let mut parameters = ParameterQueryBuilder::new();
        from_config(&mut parameters, &jira, "MCHANGES", Some("2.1"));
        assert_eq!(
            parameters.build(),
            "&statusIds=6&type=1&sorter/field=issuekey&sorter/order=DESC"
        );
    }
}
