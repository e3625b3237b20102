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

// Enable additional clippy lints by default.
#![warn(
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::clone_on_ref_ptr,
    clippy::todo
)]
// Disable the documentation clippy lint, so that it stops suggesting backticks around tracker names.
#![allow(clippy::doc_markdown)]
// Forbid unsafe code in this program.
#![forbid(unsafe_code)]

use std::fs;
use std::path::Path;

use color_eyre::eyre::{bail, Result, WrapErr};

pub mod aggregate;
pub mod announcement;
pub mod changes_file;
pub mod check;
pub mod cli;
pub mod config;
mod github;
mod init;
pub mod issue_type;
pub mod issues_report;
mod jira;
mod logging;
pub mod model;
pub mod query;
pub mod report;
pub mod tracker_access;
pub mod version;

use cli::{Cli, Commands};
use query::{JqlQueryBuilder, ParameterQueryBuilder, QueryBuilder};

use crate::changes_file::ChangesDocument;
use crate::config::{Project, System};
pub use crate::model::{Action, Component, Issue, Release};

const REPORT_FILE: &str = "changes-report.html";
const ANNOUNCEMENT_FILE: &str = "announcement.txt";
const ISSUES_REPORT_FILE: &str = "issues-report.html";

/// Run the subcommand that the user picked on the command line.
pub fn run(cli: &Cli) -> Result<()> {
    // Initialize the logging system based on the set verbosity
    logging::initialize_logger(cli.verbose)?;

    match &cli.command {
        Commands::Report {
            show_action_date,
            project,
        } => {
            write_report(project, *show_action_date)?;
        }
        Commands::Announce { project } => {
            write_announcement(project)?;
        }
        Commands::Issues {
            tracker,
            columns,
            project,
        } => {
            write_issues_report(project, *tracker, columns.as_deref())?;
        }
        Commands::Check { project } => {
            check_project(project)?;
        }
        Commands::Validate { project } => {
            validate_changes_file(project)?;
        }
        Commands::Query { project } => {
            println!("{}", preview_query(project)?);
        }
        Commands::Init { directory } => init::initialize_directory(directory)
            .wrap_err("Failed to initialize the project directory.")?,
    }

    Ok(())
}

/// Save a generated file to the output directory of the project.
fn write_generated(project: &Project, file_name: &str, content: &str) -> Result<()> {
    // Make sure that the output directory exists.
    fs::create_dir_all(&project.generated_dir)
        .wrap_err("Failed to create the output directory.")?;

    let out_file = project.generated_dir.join(file_name);
    log::debug!("Writing file: {}", out_file.display());
    fs::write(&out_file, content)
        .wrap_err_with(|| format!("Failed to write {}.", out_file.display()))?;

    log::info!("Saved {}", out_file.display());

    Ok(())
}

/// Run the `report` subcommand, which collects the releases from all configured systems
/// and renders them as an HTML page.
fn write_report(project_dir: &Path, show_action_date: bool) -> Result<()> {
    let project = Project::new(project_dir)?;
    log::info!("Building the changes report in {}", project.base_dir.display());

    let releases = tracker_access::releases_from_trackers(&project)?;
    let changes = if project.metadata.systems.contains(&System::ChangesFile) {
        ChangesDocument::load(&project.changes_file)?
    } else {
        ChangesDocument::default()
    };
    let report =
        report::changes_report(&project.metadata, &changes, &releases, show_action_date)?;

    write_generated(&project, REPORT_FILE, &report)
}

/// Run the `announce` subcommand, which renders the announcement of the current release.
fn write_announcement(project_dir: &Path) -> Result<()> {
    let project = Project::new(project_dir)?;
    log::info!("Building the announcement in {}", project.base_dir.display());

    let releases = tracker_access::releases_from_trackers(&project)?;
    let text = announcement::announcement(&project.metadata, &releases)?;

    write_generated(&project, ANNOUNCEMENT_FILE, &text)
}

/// Run the `issues` subcommand, which downloads the issues from a tracker
/// and renders them as an HTML table.
///
/// The columns on the command line take precedence over the tracker configuration.
fn write_issues_report(
    project_dir: &Path,
    tracker: Option<System>,
    columns: Option<&str>,
) -> Result<()> {
    let project = Project::new(project_dir)?;
    let system = tracker_access::report_tracker(&project, tracker)?;
    let columns = issues_report_columns(&project, system, columns)?;
    log::info!("Building the issues report in {}", project.base_dir.display());

    let issues = tracker_access::issues_from_tracker(&project, system)?;
    let title = format!("{} issues", project.metadata.name);
    let report = issues_report::issues_report(&title, &issues, &columns)?;

    write_generated(&project, ISSUES_REPORT_FILE, &report)
}

fn issues_report_columns(
    project: &Project,
    system: System,
    requested: Option<&str>,
) -> Result<Vec<issues_report::Column>> {
    let (supported, defaults) = issues_report::tracker_columns(system);
    let configured = match system {
        System::Jira => project.trackers.jira.columns.as_deref(),
        System::GitHub => project.trackers.github.columns.as_deref(),
        System::ChangesFile => None,
    };
    let names = requested.or(configured).unwrap_or(defaults);

    issues_report::select_columns(names, supported)
}

/// Run the `check` subcommand against the changes file of the project.
fn check_project(project_dir: &Path) -> Result<()> {
    let project = Project::new(project_dir)?;
    let changes = ChangesDocument::load(&project.changes_file)?;

    check::check_release(
        &changes.releases,
        &project.metadata.version,
        &project.metadata.date_format,
    )
}

/// Run the `validate` subcommand, which lists the problems in the changes file.
fn validate_changes_file(project_dir: &Path) -> Result<()> {
    let project = Project::new(project_dir)?;
    let changes = ChangesDocument::load(&project.changes_file)?;

    let problems = changes.validate();
    for problem in &problems {
        log::error!("{}", problem);
    }

    if problems.is_empty() {
        log::info!("The changes file is valid: {}", project.changes_file.display());
        Ok(())
    } else {
        bail!(
            "Found {} problems in {}.",
            problems.len(),
            project.changes_file.display()
        )
    }
}

/// Build the Jira query from the configured filters, without contacting Jira.
/// The filters appear as they're configured, so names aren't resolved to IDs.
fn preview_query(project_dir: &Path) -> Result<String> {
    let project = Project::new(project_dir)?;
    let metadata = &project.metadata;
    let jira = &project.trackers.jira;

    let Some(url) = metadata.issue_management_url() else {
        bail!("The project configuration has no issue management URL.");
    };
    let (_, project_key) = jira::parse_browse_url(url)?;

    let fix_for = metadata.only_current_version.then(|| metadata.prefixed_version());
    let fix_for = fix_for.as_deref().map(version::strip_snapshot);

    let query = if jira.use_jql {
        let mut builder = JqlQueryBuilder::new();
        builder.url_encode(false);
        query::from_config(&mut builder, jira, &project_key, fix_for);
        builder.build()
    } else {
        let mut builder = ParameterQueryBuilder::new();
        query::from_config(&mut builder, jira, &project_key, fix_for);
        builder.build()
    };

    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project_dir(project_yaml: &str, trackers_yaml: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join("harvest");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join("project.yaml"), project_yaml).unwrap();
        if !trackers_yaml.is_empty() {
            fs::write(config_dir.join("trackers.yaml"), trackers_yaml).unwrap();
        }
        dir
    }

    const JIRA_PROJECT: &str = "name: Example
version: 2.1-SNAPSHOT
only_current_version: true
issue_management:
  system: JIRA
  url: https://issues.example.org/browse/EX
";

    #[test]
    fn jql_preview() {
        let dir = project_dir(JIRA_PROJECT, "jira:\n  status_ids: Closed\n");

        let query = preview_query(dir.path()).unwrap();

        assert!(query.starts_with("project = EX"));
        assert!(query.contains("fixVersion = \"2.1\""));
        assert!(query.contains("status in (Closed)"));
    }

    #[test]
    fn preview_without_url() {
        let dir = project_dir("name: Example\nversion: '1.0'\n", "");

        assert!(preview_query(dir.path()).is_err());
    }

    #[test]
    fn report_and_announcement_files() {
        let dir = project_dir("name: Example\nversion: '1.0'\n", "");
        fs::write(
            dir.path().join("harvest").join("changes.yaml"),
            "releases:\n  - version: '1.0'\n    date: '2023-01-01'\n    actions:\n      - type: fix\n        text: Fix it.\n",
        )
        .unwrap();

        write_report(dir.path(), false).unwrap();
        write_announcement(dir.path()).unwrap();
        check_project(dir.path()).unwrap();
        validate_changes_file(dir.path()).unwrap();

        let generated = dir.path().join("generated");
        let report = fs::read_to_string(generated.join(REPORT_FILE)).unwrap();
        let announcement = fs::read_to_string(generated.join(ANNOUNCEMENT_FILE)).unwrap();
        assert!(report.contains("Fix it."));
        assert!(announcement.contains("o Fix it."));
    }

    #[test]
    fn invalid_changes_file() {
        let dir = project_dir("name: Example\nversion: '1.0'\n", "");
        fs::write(
            dir.path().join("harvest").join("changes.yaml"),
            "releases:\n  - version: '1.0'\n    actions:\n      - type: fixed\n        text: Fix it.\n",
        )
        .unwrap();

        assert!(validate_changes_file(dir.path()).is_err());
        assert!(check_project(dir.path()).is_err());
    }

    #[test]
    fn issues_report_needs_a_tracker() {
        let dir = project_dir("name: Example\nversion: '1.0'\n", "");

        assert!(write_issues_report(dir.path(), None, None).is_err());
        assert!(write_issues_report(dir.path(), Some(System::ChangesFile), None).is_err());
        assert!(!dir.path().join("generated").exists());
    }

    #[test]
    fn issues_report_column_precedence() {
        let dir = project_dir(
            JIRA_PROJECT,
            "jira:\n  columns: Key, Priority\ngithub:\n  columns: Priority\n",
        );
        let project = Project::new(dir.path()).unwrap();

        let configured = issues_report_columns(&project, System::Jira, None).unwrap();
        let requested = issues_report_columns(&project, System::Jira, Some("Summary")).unwrap();

        assert_eq!(
            configured,
            vec![issues_report::Column::Key, issues_report::Column::Priority]
        );
        assert_eq!(requested, vec![issues_report::Column::Summary]);
        // GitHub issues have no priority.
        assert!(issues_report_columns(&project, System::GitHub, None).is_err());
    }

    #[test]
    fn issues_report_default_columns() {
        let dir = project_dir(JIRA_PROJECT, "");
        let project = Project::new(dir.path()).unwrap();

        let columns = issues_report_columns(&project, System::GitHub, None).unwrap();

        assert_eq!(columns.len(), 9);
        assert_eq!(columns[0], issues_report::Column::Id);
    }
}
