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

//! The hand-written changes file that lists releases and their actions.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};
use serde_derive::Deserialize;

use crate::model::{comma_list, Action, DueTo, Release};

/// The action types that a changes file can use.
const ACTION_TYPES: [&str; 4] = ["add", "fix", "update", "remove"];

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawChanges {
    title: Option<String>,
    author: Option<String>,
    author_email: Option<String>,
    #[serde(default)]
    releases: Vec<RawRelease>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRelease {
    version: String,
    date: Option<String>,
    description: Option<String>,
    #[serde(default)]
    actions: Vec<RawAction>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAction {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: String,
    issue: Option<String>,
    fixes_issues: Option<String>,
    dev: Option<String>,
    due_to: Option<String>,
    due_to_email: Option<String>,
    date: Option<String>,
    system: Option<String>,
}

impl From<RawAction> for Action {
    fn from(raw: RawAction) -> Self {
        Self {
            kind: raw.kind.trim().to_string(),
            text: raw.text.trim().to_string(),
            issue: raw.issue.filter(|issue| !issue.trim().is_empty()),
            fixed_issues: comma_list(raw.fixes_issues.as_deref()),
            dev: raw.dev,
            due_to: DueTo::parse_lists(raw.due_to.as_deref(), raw.due_to_email.as_deref()),
            date: raw.date,
            system: raw.system,
        }
    }
}

impl From<RawRelease> for Release {
    fn from(raw: RawRelease) -> Self {
        Self {
            version: raw.version,
            date: raw.date,
            description: raw.description,
            actions: raw.actions.into_iter().map(Action::from).collect(),
            components: Vec::new(),
        }
    }
}

/// The content of a changes file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangesDocument {
    pub title: Option<String>,
    pub author: Option<String>,
    pub author_email: Option<String>,
    pub releases: Vec<Release>,
}

impl ChangesDocument {
    pub fn parse(text: &str) -> Result<Self> {
        let raw: RawChanges =
            serde_yaml::from_str(text).wrap_err("Cannot parse the changes file.")?;

        Ok(Self {
            title: raw.title,
            author: raw.author,
            author_email: raw.author_email,
            releases: raw.releases.into_iter().map(Release::from).collect(),
        })
    }

    /// Read the changes file. A missing file counts as an empty document.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::warn!("The changes file does not exist: {}", path.display());
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path)
            .wrap_err_with(|| format!("Cannot read the changes file: {}", path.display()))?;
        let document = Self::parse(&text)
            .wrap_err_with(|| format!("Invalid changes file: {}", path.display()))?;

        log::debug!(
            "Loaded {} releases from {}.",
            document.releases.len(),
            path.display()
        );

        Ok(document)
    }

    /// Look for problems that the file format itself doesn't rule out.
    /// Returns a description of each problem.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut seen_versions = HashSet::new();

        for (index, release) in self.releases.iter().enumerate() {
            let version = release.version.trim();

            if version.is_empty() {
                problems.push(format!("Release #{} has an empty version.", index + 1));
            } else if !seen_versions.insert(version) {
                problems.push(format!("Release {version} is listed more than once."));
            }

            for action in &release.actions {
                let label = action.issue.as_deref().unwrap_or("without an issue");

                if !ACTION_TYPES.contains(&action.kind.as_str()) {
                    problems.push(format!(
                        "Release {version}: action {label} has an invalid type `{}`. \
                         Use one of: {}.",
                        action.kind,
                        ACTION_TYPES.join(", ")
                    ));
                }
                if action.text.is_empty() {
                    problems.push(format!("Release {version}: action {label} has no text."));
                }
            }
        }

        problems
    }
}
