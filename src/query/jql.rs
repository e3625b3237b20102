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

use std::collections::HashSet;

use color_eyre::eyre::Result;
use once_cell::sync::Lazy;

use super::{sort_column, split_values, QueryBuilder};

/// Words that JQL reserves. A value that matches one of them must be quoted.
/// See <https://confluence.atlassian.com/jirasoftwareserver/advanced-searching-939938733.html>.
static RESERVED_JQL_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "abort", "access", "add", "after", "alias", "all", "alter", "and", "any", "as", "asc",
        "audit", "avg", "before", "begin", "between", "boolean", "break", "by", "byte", "catch",
        "cf", "char", "character", "check", "checkpoint", "collate", "collation", "column",
        "commit", "connect", "continue", "count", "create", "current", "date", "decimal",
        "declare", "decrement", "default", "defaults", "define", "delete", "delimiter", "desc",
        "difference", "distinct", "divide", "do", "double", "drop", "else", "empty", "encoding",
        "end", "equals", "escape", "exclusive", "exec", "execute", "exists", "explain", "false",
        "fetch", "file", "field", "first", "float", "for", "from", "function", "go", "goto",
        "grant", "greater", "group", "having", "identified", "if", "immediate", "in",
        "increment", "index", "initial", "inner", "inout", "input", "insert", "int", "integer",
        "intersect", "intersection", "into", "is", "isempty", "isnull", "join", "last", "left",
        "less", "like", "limit", "lock", "long", "max", "min", "minus", "mode", "modify",
        "modulo", "more", "multiply", "next", "noaudit", "not", "notin", "nowait", "null",
        "number", "object", "of", "on", "option", "or", "order", "outer", "output", "power",
        "previous", "prior", "privileges", "public", "raise", "raw", "remainder", "rename",
        "resource", "return", "returns", "revoke", "right", "row", "rowid", "rownum", "rows",
        "select", "session", "set", "share", "size", "sqrt", "start", "strict", "string",
        "subtract", "sum", "synonym", "table", "then", "to", "trans", "transaction", "trigger",
        "true", "uid", "union", "unique", "update", "user", "validate", "values", "view", "when",
        "whenever", "where", "while", "with",
    ]
    .into_iter()
    .collect()
});

/// Which configured filter a clause comes from. Setting a filter again replaces its clause.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Field {
    Project,
    FixVersion,
    FixVersionIds,
    Status,
    Resolution,
    Priority,
    Type,
    Component,
}

impl Field {
    /// The name of the field in JQL.
    fn jql_name(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::FixVersion | Self::FixVersionIds => "fixVersion",
            Self::Status => "status",
            Self::Resolution => "resolution",
            Self::Priority => "priority",
            Self::Type => "type",
            Self::Component => "component",
        }
    }
}

/// Builds a Jira query in the Jira query language. Supports only a small part of JQL:
/// a project, a list of values for several fields, and the sort order.
#[derive(Clone, Debug)]
pub struct JqlQueryBuilder {
    filter: String,
    url_encode: bool,
    clauses: Vec<(Field, String)>,
    order_by: Vec<String>,
}

impl Default for JqlQueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl JqlQueryBuilder {
    /// An empty query that will be URL-encoded when built.
    pub fn new() -> Self {
        Self {
            filter: String::new(),
            url_encode: true,
            clauses: Vec::new(),
            order_by: Vec::new(),
        }
    }

    /// Set whether `build` percent-encodes the query.
    pub fn url_encode(&mut self, url_encode: bool) -> &mut Self {
        self.url_encode = url_encode;
        self
    }

    pub fn is_url_encoded(&self) -> bool {
        self.url_encode
    }

    /// Record a clause. A clause for the same field replaces the previous one in its place.
    fn set_clause(&mut self, field: Field, clause: String) {
        if let Some(existing) = self.clauses.iter_mut().find(|(f, _)| *f == field) {
            existing.1 = clause;
        } else {
            self.clauses.push((field, clause));
        }
    }

    fn add_single_value(&mut self, field: Field, value: &str) {
        let clause = format!("{} = {}", field.jql_name(), quote_value(value));
        self.set_clause(field, clause);
    }

    fn add_values<'a>(&mut self, field: Field, values: impl IntoIterator<Item = &'a str>) {
        let quoted: Vec<String> = values
            .into_iter()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(quote_value)
            .collect();

        // An empty list would make the query invalid.
        if quoted.is_empty() {
            return;
        }

        let clause = format!("{} in ({})", field.jql_name(), quoted.join(", "));
        self.set_clause(field, clause);
    }

    fn add_list(&mut self, field: Field, values: &[String]) -> Result<&mut Self> {
        self.add_values(field, values.iter().map(String::as_str));
        Ok(self)
    }
}

impl QueryBuilder for JqlQueryBuilder {
    fn build(&self) -> String {
        let query = if self.filter.is_empty() {
            let mut query = self
                .clauses
                .iter()
                .map(|(_, clause)| clause.as_str())
                .collect::<Vec<_>>()
                .join(" AND ");
            if !self.order_by.is_empty() {
                query.push_str(" ORDER BY ");
                query.push_str(&self.order_by.join(", "));
            }
            query
        } else {
            self.filter.clone()
        };

        if self.url_encode {
            log::debug!("Encoding JQL query: {}", query);
            let encoded = urlencoding::encode(&query).into_owned();
            log::debug!("Encoded JQL query: {}", encoded);
            encoded
        } else {
            query
        }
    }

    fn filter(&mut self, filter: &str) -> &mut Self {
        self.filter = filter.to_string();
        self
    }

    fn project(&mut self, project: &str) -> &mut Self {
        self.add_single_value(Field::Project, project);
        self
    }

    fn fix_version(&mut self, fix_version: &str) -> &mut Self {
        self.add_single_value(Field::FixVersion, fix_version);
        self
    }

    fn fix_version_ids(&mut self, fix_version_ids: &str) -> &mut Self {
        self.add_values(Field::FixVersionIds, split_values(fix_version_ids));
        self
    }

    fn fix_version_id_list(&mut self, fix_version_ids: &[String]) -> Result<&mut Self> {
        self.add_list(Field::FixVersionIds, fix_version_ids)
    }

    fn status_ids(&mut self, status_ids: &str) -> &mut Self {
        self.add_values(Field::Status, split_values(status_ids));
        self
    }

    fn status_id_list(&mut self, status_ids: &[String]) -> Result<&mut Self> {
        self.add_list(Field::Status, status_ids)
    }

    fn resolution_ids(&mut self, resolution_ids: &str) -> &mut Self {
        self.add_values(Field::Resolution, split_values(resolution_ids));
        self
    }

    fn resolution_id_list(&mut self, resolution_ids: &[String]) -> Result<&mut Self> {
        self.add_list(Field::Resolution, resolution_ids)
    }

    fn priority_ids(&mut self, priority_ids: &str) -> &mut Self {
        self.add_values(Field::Priority, split_values(priority_ids));
        self
    }

    fn priority_id_list(&mut self, priority_ids: &[String]) -> Result<&mut Self> {
        self.add_list(Field::Priority, priority_ids)
    }

    fn type_ids(&mut self, type_ids: &str) -> &mut Self {
        self.add_values(Field::Type, split_values(type_ids));
        self
    }

    fn type_id_list(&mut self, type_ids: &[String]) -> Result<&mut Self> {
        self.add_list(Field::Type, type_ids)
    }

    fn components(&mut self, components: &str) -> &mut Self {
        self.add_values(Field::Component, split_values(components));
        self
    }

    fn component_list(&mut self, components: &[String]) -> Result<&mut Self> {
        self.add_list(Field::Component, components)
    }

    fn sort_column_names(&mut self, sort_column_names: &str) -> &mut Self {
        self.order_by = sort_column_names
            .split(',')
            .map(sort_column)
            .filter(|(name, _)| !name.is_empty())
            .map(|(name, descending)| {
                // Spaces in the column name trip up the JQL parser.
                let name = name.replace(' ', "");
                format!("{} {}", name, if descending { "DESC" } else { "ASC" })
            })
            .collect();

        if self.order_by.is_empty() {
            log::error!(
                "None of the sort columns `{}` can be used. Not sorting the query.",
                sort_column_names
            );
        }

        self
    }
}

/// Quote a value if JQL would misinterpret it otherwise:
/// if it contains a space or a dot, or if it's a reserved word.
fn quote_value(value: &str) -> String {
    let value = value.trim();
    if value.contains(' ') || value.contains('.') || is_reserved_jql_word(value) {
        format!("\"{}\"", value)
    } else {
        value.to_string()
    }
}

fn is_reserved_jql_word(value: &str) -> bool {
    RESERVED_JQL_WORDS.contains(value.to_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A builder that produces readable queries.
    fn builder() -> JqlQueryBuilder {
        let mut builder = JqlQueryBuilder::new();
        builder.url_encode(false);
        builder
    }

    #[test]
    fn empty_query() {
        assert_eq!(JqlQueryBuilder::new().build(), "");
        assert_eq!(builder().build(), "");
    }

    #[test]
    fn single_parameter_value() {
        assert_eq!(builder().project("DOXIA").build(), "project = DOXIA");
    }

    #[test]
    fn project_is_set_only_once() {
        assert_eq!(
            builder().project("DOXIA").project("MCHANGES").build(),
            "project = MCHANGES"
        );
    }

    #[test]
    fn fix_version_with_a_dot_is_quoted() {
        assert_eq!(builder().fix_version("1.0").build(), "fixVersion = \"1.0\"");
        assert_eq!(
            builder().project("DOXIA").fix_version("1.0").build(),
            "project = DOXIA AND fixVersion = \"1.0\""
        );
    }

    #[test]
    fn single_parameter_single_value() {
        assert_eq!(builder().priority_ids("Blocker").build(), "priority in (Blocker)");
        assert_eq!(
            builder().priority_ids("  Blocker   ").build(),
            "priority in (Blocker)"
        );
    }

    #[test]
    fn single_parameter_multiple_values() {
        let expected = "priority in (Blocker, Critical, Major)";

        assert_eq!(builder().priority_ids("Blocker,Critical,Major").build(), expected);
        assert_eq!(
            builder().priority_ids("  Blocker  ,  Critical,  Major").build(),
            expected
        );
    }

    #[test]
    fn string_and_list_forms_are_identical() {
        let list: Vec<String> = vec!["Open".into(), " In Progress ".into(), "Closed".into()];
        let string = "Open, In Progress ,Closed";

        let from_list = builder()
            .fix_version_id_list(&list)
            .unwrap()
            .status_id_list(&list)
            .unwrap()
            .priority_id_list(&list)
            .unwrap()
            .resolution_id_list(&list)
            .unwrap()
            .type_id_list(&list)
            .unwrap()
            .component_list(&list)
            .unwrap()
            .build();
        let from_string = builder()
            .fix_version_ids(string)
            .status_ids(string)
            .priority_ids(string)
            .resolution_ids(string)
            .type_ids(string)
            .components(string)
            .build();

        assert_eq!(from_list, from_string);
        assert!(from_list.starts_with("fixVersion in (Open, \"In Progress\", Closed) AND status in"));
    }

    #[test]
    fn empty_value_lists_add_no_clause() {
        assert_eq!(builder().status_ids(" , ").build(), "");
        assert_eq!(builder().status_id_list(&[]).unwrap().build(), "");
    }

    #[test]
    fn multiple_parameters_combined_with_and() {
        assert_eq!(
            builder().priority_ids("Blocker").status_ids("Resolved").build(),
            "priority in (Blocker) AND status in (Resolved)"
        );
    }

    #[test]
    fn values_with_spaces_are_quoted() {
        assert_eq!(
            builder().status_ids("In Progress").build(),
            "status in (\"In Progress\")"
        );
    }

    #[test]
    fn reserved_words_are_quoted() {
        assert_eq!(builder().type_ids("Task,Update").build(), "type in (Task, \"Update\")");
        assert_eq!(builder().components("ORDER").build(), "component in (\"ORDER\")");
    }

    #[test]
    fn fix_version_and_ids_are_separate_clauses() {
        assert_eq!(
            builder().fix_version("2.0").fix_version_ids("2.0,2.1").build(),
            "fixVersion = \"2.0\" AND fixVersion in (\"2.0\", \"2.1\")"
        );
    }

    #[test]
    fn sort_single_column_ascending() {
        let expected = "project = DOXIA ORDER BY key ASC";

        assert_eq!(builder().project("DOXIA").sort_column_names("key").build(), expected);
        assert_eq!(
            builder().project("DOXIA").sort_column_names("key ASC").build(),
            expected
        );
        assert_eq!(
            builder()
                .project("DOXIA")
                .sort_column_names("     key    ASC    ")
                .build(),
            expected
        );
    }

    #[test]
    fn sort_single_column_descending() {
        let expected = "project = DOXIA ORDER BY key DESC";

        assert_eq!(
            builder().project("DOXIA").sort_column_names("key DESC").build(),
            expected
        );
        assert_eq!(
            builder()
                .project("DOXIA")
                .sort_column_names("     key    DESC    ")
                .build(),
            expected
        );
    }

    #[test]
    fn sort_multiple_columns() {
        assert_eq!(
            builder()
                .project("DOXIA")
                .sort_column_names("key ASC,assignee DESC, reporter ASC")
                .build(),
            "project = DOXIA ORDER BY key ASC, assignee DESC, reporter ASC"
        );
    }

    #[test]
    fn spaces_in_sort_columns_are_removed() {
        assert_eq!(
            builder().sort_column_names("Fix Version DESC").build(),
            " ORDER BY fixversion DESC"
        );
    }

    #[test]
    fn order_by_is_the_last_element() {
        assert_eq!(
            builder()
                .sort_column_names("key ASC,assignee DESC, reporter ASC")
                .project("DOXIA")
                .build(),
            "project = DOXIA ORDER BY key ASC, assignee DESC, reporter ASC"
        );
    }

    #[test]
    fn unusable_sort_columns_omit_order_by() {
        assert_eq!(
            builder().project("DOXIA").sort_column_names(" , DESC").build(),
            "project = DOXIA"
        );
    }

    #[test]
    fn filter_overrides_everything() {
        let filter = "project = MCHANGES AND status = Open";

        let mut builder = builder();
        builder.project("DOXIA").status_ids("Closed");
        builder.filter(filter);
        builder.priority_ids("Major").sort_column_names("key");

        assert_eq!(builder.build(), filter);
    }

    #[test]
    fn empty_filter_is_ignored() {
        assert_eq!(
            builder().filter("").project("DOXIA").build(),
            "project = DOXIA"
        );
    }

    #[test]
    fn query_is_url_encoded_by_default() {
        let mut builder = JqlQueryBuilder::new();
        assert!(builder.is_url_encoded());

        assert_eq!(
            builder.project("DOXIA").fix_version("1.0").build(),
            "project%20%3D%20DOXIA%20AND%20fixVersion%20%3D%20%221.0%22"
        );
    }
}
