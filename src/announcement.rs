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

//! The plain-text announcement of the latest release.

use askama::Template;
use color_eyre::eyre::{bail, Result, WrapErr};

use crate::aggregate::latest_release;
use crate::config::ProjectConfig;
use crate::model::{Action, Release};
use crate::version::strip_snapshot;

/// A single line in the announcement, with the issues and the contributors.
fn entry(action: &Action) -> String {
    let mut line = action.text.clone();

    let issues = action.all_issues();
    if !issues.is_empty() {
        line.push_str(&format!("  Issue: {}.", issues.join(", ")));
    }

    let names: Vec<&str> = action.due_to.iter().map(|d| d.name.as_str()).collect();
    if !names.is_empty() {
        line.push_str(&format!(" Thanks to {}.", names.join(", ")));
    }

    line
}

/// The actions of one category, under a heading.
struct Section {
    heading: &'static str,
    entries: Vec<String>,
}

const SECTIONS: [(&str, &str); 4] = [
    ("add", "New features"),
    ("fix", "Fixed bugs"),
    ("update", "Changes"),
    ("remove", "Removed"),
];

fn sections(actions: &[Action]) -> Vec<Section> {
    SECTIONS
        .iter()
        .map(|&(kind, heading)| Section {
            heading,
            entries: actions
                .iter()
                .filter(|action| action.kind == kind)
                .map(entry)
                .collect(),
        })
        .filter(|section| !section.entries.is_empty())
        .collect()
}

struct ComponentSection {
    name: String,
    sections: Vec<Section>,
}

struct Dependency<'a> {
    group_id: &'a str,
    artifact_id: &'a str,
    packaging: &'a str,
}

#[derive(Template)]
#[template(path = "announcement.txt")]
struct AnnouncementTemplate<'a> {
    development_team: &'a str,
    final_name: &'a str,
    introduction: &'a str,
    version: &'a str,
    url_download: &'a str,
    dependency: Option<Dependency<'a>>,
    description: &'a str,
    sections: Vec<Section>,
    components: Vec<ComponentSection>,
}

/// Render the announcement of the release that matches the project version.
pub fn announcement(metadata: &ProjectConfig, releases: &[Release]) -> Result<String> {
    if releases.is_empty() {
        bail!("No releases found in any of the configured issue management systems.");
    }

    let release = latest_release(releases, &metadata.prefixed_version())?;
    log::info!("Creating the announcement of release {}.", release.version);

    let version = strip_snapshot(&metadata.version);
    let final_name = metadata
        .final_name
        .clone()
        .unwrap_or_else(|| format!("{}-{}", metadata.name, version));
    let development_team = metadata
        .development_team
        .clone()
        .unwrap_or_else(|| format!("{} team", metadata.name));
    // Without an introduction, the project URL introduces the project.
    let introduction = metadata
        .introduction
        .as_deref()
        .or(metadata.url.as_deref())
        .unwrap_or_default();

    let dependency = match (&metadata.group_id, &metadata.artifact_id) {
        (Some(group_id), Some(artifact_id)) => Some(Dependency {
            group_id,
            artifact_id,
            packaging: metadata.packaging.as_deref().unwrap_or("jar"),
        }),
        _ => None,
    };

    let components = release
        .components
        .iter()
        .map(|component| ComponentSection {
            name: component.name.clone(),
            sections: sections(&component.actions),
        })
        .filter(|component| !component.sections.is_empty())
        .collect();

    let template = AnnouncementTemplate {
        development_team: &development_team,
        final_name: &final_name,
        introduction,
        version,
        url_download: metadata.url_download.as_deref().unwrap_or_default(),
        dependency,
        description: release.description.as_deref().unwrap_or_default(),
        sections: sections(&release.actions),
        components,
    };

    template
        .render()
        .wrap_err("Failed to prepare the announcement.")
}
