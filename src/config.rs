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
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use color_eyre::eyre::{Result, WrapErr};
use serde_derive::Deserialize;

/// The directory inside the project that holds all configuration files.
const CONFIG_DIR: &str = "harvest";
const PROJECT_FILE: &str = "project.yaml";
const TRACKERS_FILE: &str = "trackers.yaml";
const CHANGES_FILE: &str = "changes.yaml";
/// The directory inside the project where the generated files end up.
const GENERATED_DIR: &str = "generated";

/// A source of releases that the project can draw from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum System {
    #[serde(rename = "changes-file")]
    ChangesFile,
    #[serde(rename = "jira")]
    Jira,
    #[serde(rename = "github")]
    GitHub,
}

impl FromStr for System {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_lowercase().as_str() {
            "changes-file" => Ok(Self::ChangesFile),
            "jira" => Ok(Self::Jira),
            "github" => Ok(Self::GitHub),
            other => Err(format!(
                "Unknown system `{other}`. Use `changes-file`, `jira`, or `github`."
            )),
        }
    }
}

impl fmt::Display for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ChangesFile => "changes file",
            Self::Jira => "Jira",
            Self::GitHub => "GitHub",
        };
        f.write_str(name)
    }
}

/// The issue tracker that the project uses, as the project metadata describes it.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IssueManagement {
    /// The name of the tracker, such as `JIRA` or `GitHub`. Selects the issue link template.
    pub system: Option<String>,
    pub url: Option<String>,
}

/// A child module whose changes appear as a component of each release.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Module {
    pub name: String,
    /// The directory of the module, relative to the project directory.
    pub path: PathBuf,
}

fn default_systems() -> Vec<System> {
    vec![System::ChangesFile]
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

/// The content of the `project.yaml` file.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    pub name: String,
    pub version: String,
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub packaging: Option<String>,
    pub url: Option<String>,
    pub url_download: Option<String>,
    pub final_name: Option<String>,
    pub development_team: Option<String>,
    pub introduction: Option<String>,
    pub issue_management: Option<IssueManagement>,
    /// The sources of releases, merged in this order.
    #[serde(default = "default_systems")]
    pub systems: Vec<System>,
    /// Additional mapping of tracker issue types to the `add`, `fix`, and `update` categories.
    pub issue_types: Option<HashMap<String, String>>,
    /// A prefix that the project uses for versions in the tracker, such as `maven-changes-`.
    pub version_prefix: Option<String>,
    #[serde(default)]
    pub only_current_version: bool,
    /// The URL of a team page. Developer names in the report link to its anchors.
    pub team: Option<String>,
    /// Templates of issue links, by the name of the tracker. Override the built-in ones.
    #[serde(default)]
    pub issue_link_templates: HashMap<String, String>,
    #[serde(default)]
    pub modules: Vec<Module>,
    /// The `chrono` format of release dates in the changes file.
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

impl ProjectConfig {
    /// The project version as the tracker knows it, including the version prefix.
    pub fn prefixed_version(&self) -> String {
        format!(
            "{}{}",
            self.version_prefix.as_deref().unwrap_or_default(),
            self.version
        )
    }

    /// The URL of the issue tracker, if it's configured.
    pub fn issue_management_url(&self) -> Option<&str> {
        self.issue_management
            .as_ref()
            .and_then(|im| im.url.as_deref())
            .filter(|url| !url.trim().is_empty())
    }

    /// The name of the issue tracker, if it's configured.
    pub fn issue_management_system(&self) -> Option<&str> {
        self.issue_management
            .as_ref()
            .and_then(|im| im.system.as_deref())
    }
}

/// Access and query settings for Jira.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct JiraConfig {
    pub user: Option<String>,
    pub password: Option<String>,
    /// A personal access token. Falls back on the `JIRA_API_KEY` environment variable.
    pub api_key: Option<String>,
    /// A raw JQL query that replaces all the other filters.
    pub filter: Option<String>,
    pub fix_version_ids: Option<String>,
    pub status_ids: Option<String>,
    pub resolution_ids: Option<String>,
    pub priority_ids: Option<String>,
    pub component: Option<String>,
    pub type_ids: Option<String>,
    pub sort_column_names: Option<String>,
    pub max_entries: u32,
    pub connection_timeout_ms: u64,
    pub receive_timeout_ms: u64,
    /// Preview the query in JQL rather than in the old URL parameter syntax.
    pub use_jql: bool,
    /// The columns of the issues report, such as `Key,Summary,Status`.
    pub columns: Option<String>,
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            user: None,
            password: None,
            api_key: None,
            filter: None,
            fix_version_ids: None,
            status_ids: None,
            resolution_ids: None,
            priority_ids: None,
            component: None,
            type_ids: None,
            sort_column_names: None,
            max_entries: 100,
            connection_timeout_ms: 36_000,
            receive_timeout_ms: 60_000,
            use_jql: true,
            columns: None,
        }
    }
}

/// Access settings for GitHub.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct GitHubConfig {
    /// A personal access token. Falls back on the `GITHUB_TOKEN` environment variable.
    pub api_key: Option<String>,
    pub include_open_issues: bool,
    pub only_milestone_issues: bool,
    /// The columns of the issues report, such as `Id,Summary,Status`.
    pub columns: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            include_open_issues: true,
            only_milestone_issues: true,
            columns: None,
        }
    }
}

/// The content of the optional `trackers.yaml` file.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TrackerConfig {
    pub jira: JiraConfig,
    pub github: GitHubConfig,
}

/// All the configuration of a project directory.
#[derive(Debug)]
pub struct Project {
    pub base_dir: PathBuf,
    pub generated_dir: PathBuf,
    pub changes_file: PathBuf,
    pub metadata: ProjectConfig,
    pub trackers: TrackerConfig,
}

impl Project {
    /// Load the configuration from the `harvest` subdirectory of the project directory.
    pub fn new(project_dir: &Path) -> Result<Self> {
        let base_dir = project_dir.canonicalize().wrap_err_with(|| {
            format!("Cannot access the project directory: {}", project_dir.display())
        })?;
        let config_dir = base_dir.join(CONFIG_DIR);

        let project_file = config_dir.join(PROJECT_FILE);
        let trackers_file = config_dir.join(TRACKERS_FILE);

        log::debug!(
            "Configuration files:\n* {}\n* {}",
            project_file.display(),
            trackers_file.display()
        );

        let text = fs::read_to_string(&project_file).wrap_err_with(|| {
            format!("Cannot read the project file: {}", project_file.display())
        })?;
        let metadata = parse_project(&text)?;

        let trackers = if trackers_file.exists() {
            let text = fs::read_to_string(&trackers_file)
                .wrap_err("Cannot read the trackers configuration file.")?;
            parse_trackers(&text)?
        } else {
            log::debug!("No trackers configuration. Using the defaults.");
            TrackerConfig::default()
        };

        Ok(Self {
            generated_dir: base_dir.join(GENERATED_DIR),
            changes_file: config_dir.join(CHANGES_FILE),
            base_dir,
            metadata,
            trackers,
        })
    }

    /// The changes file of a child module.
    pub fn module_changes_file(&self, module: &Module) -> PathBuf {
        self.base_dir
            .join(&module.path)
            .join(CONFIG_DIR)
            .join(CHANGES_FILE)
    }
}

fn parse_project(text: &str) -> Result<ProjectConfig> {
    let metadata: ProjectConfig =
        serde_yaml::from_str(text).wrap_err("Cannot parse the project file.")?;
    log::debug!("{:#?}", metadata);
    Ok(metadata)
}

fn parse_trackers(text: &str) -> Result<TrackerConfig> {
    let trackers: TrackerConfig =
        serde_yaml::from_str(text).wrap_err("Cannot parse the trackers configuration file.")?;
    Ok(trackers)
}
