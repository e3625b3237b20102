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
The HTML issues report: a table of the issues downloaded from a tracker,
with the columns that the user picks.
*/

use askama::Template;
use chrono::{DateTime, Utc};
use color_eyre::eyre::{bail, Result, WrapErr};

use crate::config::System;
use crate::model::Issue;

/// The format of the `Created` and `Updated` cells.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// A column of the issues report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Column {
    Assignee,
    Component,
    Created,
    FixVersion,
    Id,
    Key,
    Priority,
    Reporter,
    Resolution,
    Status,
    Summary,
    Type,
    Updated,
    Version,
}

/// Jira fills in all the columns.
pub const JIRA_COLUMNS: [Column; 14] = [
    Column::Assignee,
    Column::Component,
    Column::Created,
    Column::FixVersion,
    Column::Id,
    Column::Key,
    Column::Priority,
    Column::Reporter,
    Column::Resolution,
    Column::Status,
    Column::Summary,
    Column::Type,
    Column::Updated,
    Column::Version,
];

/// GitHub issues have no components, keys, priorities, resolutions, or affected versions.
pub const GITHUB_COLUMNS: [Column; 9] = [
    Column::Assignee,
    Column::Created,
    Column::FixVersion,
    Column::Id,
    Column::Reporter,
    Column::Status,
    Column::Summary,
    Column::Type,
    Column::Updated,
];

pub const JIRA_DEFAULT_COLUMNS: &str = "Key,Summary,Status,Resolution,Assignee";
pub const GITHUB_DEFAULT_COLUMNS: &str =
    "Id,Type,Summary,Assignee,Reporter,Status,Created,Updated,Fix Version";

impl Column {
    /// The name of the column in the configuration and in the table header.
    pub fn label(self) -> &'static str {
        match self {
            Self::Assignee => "Assignee",
            Self::Component => "Component",
            Self::Created => "Created",
            Self::FixVersion => "Fix Version",
            Self::Id => "Id",
            Self::Key => "Key",
            Self::Priority => "Priority",
            Self::Reporter => "Reporter",
            Self::Resolution => "Resolution",
            Self::Status => "Status",
            Self::Summary => "Summary",
            Self::Type => "Type",
            Self::Updated => "Updated",
            Self::Version => "Version",
        }
    }

    /// Find the column by its name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        JIRA_COLUMNS
            .into_iter()
            .find(|column| column.label().eq_ignore_ascii_case(name.trim()))
    }

    fn cell(self, issue: &Issue) -> Cell {
        let text = |value: &Option<String>| Cell::text(value.clone().unwrap_or_default());

        match self {
            Self::Id => Cell::link(&issue.id, issue.link.as_deref()),
            Self::Key => Cell::link(&issue.key, issue.link.as_deref()),
            Self::Assignee => text(&issue.assignee),
            Self::Component => Cell::text(issue.components.join(", ")),
            Self::Created => Cell::text(timestamp(issue.created)),
            Self::FixVersion => Cell::text(issue.fix_versions.join(", ")),
            Self::Priority => text(&issue.priority),
            Self::Reporter => text(&issue.reporter),
            Self::Resolution => text(&issue.resolution),
            Self::Status => text(&issue.status),
            Self::Summary => Cell::text(issue.summary.clone()),
            Self::Type => text(&issue.kind),
            Self::Updated => Cell::text(timestamp(issue.updated)),
            Self::Version => text(&issue.version),
        }
    }
}

fn timestamp(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|value| value.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}

/// The columns that the tracker supports, and the columns that the report uses by default.
pub fn tracker_columns(system: System) -> (&'static [Column], &'static str) {
    match system {
        System::GitHub => (&GITHUB_COLUMNS, GITHUB_DEFAULT_COLUMNS),
        System::Jira | System::ChangesFile => (&JIRA_COLUMNS, JIRA_DEFAULT_COLUMNS),
    }
}

/// Pick the columns from a comma-separated list of names, in the listed order.
///
/// Names that aren't columns of this tracker are skipped with a warning.
/// If none of the names is usable, that's an error.
pub fn select_columns(names: &str, supported: &[Column]) -> Result<Vec<Column>> {
    let mut columns = Vec::new();

    for name in names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        match Column::from_name(name) {
            Some(column) if supported.contains(&column) => columns.push(column),
            Some(_) => log::warn!("The tracker doesn't support the `{}` column.", name),
            None => log::warn!("Unknown column in the issues report: `{}`", name),
        }
    }

    if columns.is_empty() {
        bail!("None of the configured columns `{}` are valid.", names);
    }

    Ok(columns)
}

struct Cell {
    text: String,
    link: Option<String>,
}

impl Cell {
    fn text(text: String) -> Self {
        Self { text, link: None }
    }

    fn link(text: &str, link: Option<&str>) -> Self {
        Self {
            text: text.to_string(),
            link: link.map(ToString::to_string),
        }
    }
}

#[derive(Template)]
#[template(path = "issues-report.html")]
struct IssuesReportTemplate<'a> {
    title: &'a str,
    headers: Vec<&'static str>,
    rows: Vec<Vec<Cell>>,
    generated_date: &'a str,
}

/// Render the issues as an HTML table with the selected columns.
pub fn issues_report(title: &str, issues: &[Issue], columns: &[Column]) -> Result<String> {
    let rows = issues
        .iter()
        .map(|issue| columns.iter().map(|column| column.cell(issue)).collect())
        .collect();

    let generated_date = Utc::now().to_rfc2822();

    let report = IssuesReportTemplate {
        title,
        headers: columns.iter().map(|column| column.label()).collect(),
        rows,
        generated_date: &generated_date,
    };

    report
        .render()
        .wrap_err("Failed to prepare the issues report.")
}
