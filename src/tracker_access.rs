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

use async_trait::async_trait;
use color_eyre::eyre::{bail, eyre, Result, WrapErr};

use crate::aggregate::{
    issues_for_version, issues_with_version_prefix, merge_components, merge_releases,
    releases_from_issues,
};
use crate::changes_file::ChangesDocument;
use crate::config::{Project, ProjectConfig, System};
use crate::github::GitHubSource;
use crate::issue_type::IssueManagementSystem;
use crate::jira::JiraSource;
use crate::model::{Issue, Release};
use crate::version;

/// An issue tracker that issues can be downloaded from.
#[async_trait]
pub trait IssueSource {
    /// The name of the tracker, for log messages.
    fn name(&self) -> &str;

    /// The default mapping of the native issue types of the tracker.
    fn issue_management_system(&self) -> IssueManagementSystem {
        IssueManagementSystem::for_tracker(self.name())
    }

    async fn fetch_issues(&self) -> Result<Vec<Issue>>;
}

/// Download the issues from the tracker, keeping only those that match
/// the version prefix and, if configured, the current version.
pub async fn issues_from_source(
    source: &(dyn IssueSource + Sync),
    metadata: &ProjectConfig,
) -> Result<Vec<Issue>> {
    let mut issues = source
        .fetch_issues()
        .await
        .wrap_err_with(|| format!("Failed to download issues from {}.", source.name()))?;

    if let Some(prefix) = metadata.version_prefix.as_deref().filter(|p| !p.is_empty()) {
        let downloaded = issues.len();
        issues = issues_with_version_prefix(&issues, prefix)?;
        log::debug!(
            "Kept {} of {} issues with the version prefix `{}`.",
            issues.len(),
            downloaded,
            prefix
        );
    }
    if metadata.only_current_version {
        issues = issues_for_version(&issues, &metadata.prefixed_version())?;
    }

    Ok(issues)
}

/// Download the issues from the tracker and group them into releases,
/// applying the version filters and the issue type configuration of the project.
pub async fn releases_from_source(
    source: &(dyn IssueSource + Sync),
    metadata: &ProjectConfig,
) -> Result<Vec<Release>> {
    let issues = issues_from_source(source, metadata).await?;

    let mut system = source.issue_management_system();
    if let Some(issue_types) = &metadata.issue_types {
        system.apply_configuration(issue_types)?;
    }

    Ok(releases_from_issues(&issues, &system))
}

/// The issue management URL, which the trackers need to find the project.
fn tracker_url(system: System, metadata: &ProjectConfig) -> Result<&str> {
    metadata.issue_management_url().ok_or_else(|| {
        eyre!(
            "The {} system needs the issue management URL in the project configuration.",
            system
        )
    })
}

/// Prepare the access to a tracker that the project configures.
fn issue_source(project: &Project, system: System) -> Result<Box<dyn IssueSource + Sync>> {
    let metadata = &project.metadata;
    let url = tracker_url(system, metadata)?;

    let source: Box<dyn IssueSource + Sync> = match system {
        System::Jira => {
            let fix_for = metadata
                .only_current_version
                .then(|| metadata.prefixed_version());
            Box::new(JiraSource::new(
                url,
                &project.trackers.jira,
                fix_for.as_deref().map(version::strip_snapshot),
            )?)
        }
        System::GitHub => Box::new(GitHubSource::new(url, &project.trackers.github)?),
        System::ChangesFile => bail!("The changes file isn't an issue tracker."),
    };

    Ok(source)
}

/// The issue tracker that the issues report draws from: the requested one,
/// or else the first tracker among the configured systems.
pub fn report_tracker(project: &Project, requested: Option<System>) -> Result<System> {
    if let Some(system) = requested {
        return match system {
            System::ChangesFile => {
                bail!("The issues report needs an issue tracker, not the {}.", system)
            }
            tracker => Ok(tracker),
        };
    }

    project
        .metadata
        .systems
        .iter()
        .copied()
        .find(|system| *system != System::ChangesFile)
        .ok_or_else(|| eyre!("The project configures no issue tracker for the issues report."))
}

/// Download the filtered issues from a single tracker.
#[tokio::main]
pub async fn issues_from_tracker(project: &Project, system: System) -> Result<Vec<Issue>> {
    let source = issue_source(project, system)?;
    let issues = issues_from_source(source.as_ref(), &project.metadata).await?;

    log::info!("Collected {} issues from {}.", issues.len(), source.name());

    Ok(issues)
}

/// Collect the releases from all the configured systems, in their configured order,
/// and attach the releases of child modules as components.
///
/// Downloads from the trackers one after another. Any failure ends the whole collection.
#[tokio::main]
pub async fn releases_from_trackers(project: &Project) -> Result<Vec<Release>> {
    let mut releases: Vec<Release> = Vec::new();

    for &system in &project.metadata.systems {
        log::debug!("Collecting releases from the {}.", system);

        let system_releases = match system {
            System::ChangesFile => ChangesDocument::load(&project.changes_file)?.releases,
            System::Jira | System::GitHub => {
                let source = issue_source(project, system)?;
                releases_from_source(source.as_ref(), &project.metadata).await?
            }
        };

        releases = merge_releases(Some(releases.as_slice()), Some(system_releases.as_slice()));
    }

    for module in &project.metadata.modules {
        let changes = ChangesDocument::load(&project.module_changes_file(module))?;
        releases = merge_components(&releases, &module.name, &changes.releases);
    }

    log::info!(
        "Collected {} releases with {} actions.",
        releases.len(),
        releases.iter().map(Release::action_count).sum::<usize>()
    );

    Ok(releases)
}
