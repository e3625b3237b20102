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

//! The HTML changes report, with the release history and the changes in each release.

use std::collections::HashMap;

use askama::Template;
use chrono::prelude::*;
use color_eyre::eyre::{Result, WrapErr};
use counter::Counter;

use crate::changes_file::ChangesDocument;
use crate::config::ProjectConfig;
use crate::model::{Action, DueTo, Release};

const URL_TOKEN: &str = "%URL%";
const ISSUE_TOKEN: &str = "%ISSUE%";
/// The link template for actions whose tracker is unknown.
pub const DEFAULT_SYSTEM: &str = "default";

/// Issue link templates for common trackers.
const DEFAULT_LINK_TEMPLATES: [(&str, &str); 16] = [
    (DEFAULT_SYSTEM, "%URL%/ViewIssue.jspa?key=%ISSUE%"),
    ("Bitbucket", "%URL%/issue/%ISSUE%"),
    ("Bugzilla", "%URL%/show_bug.cgi?id=%ISSUE%"),
    ("GitHub", "%URL%/%ISSUE%"),
    ("GoogleCode", "%URL%/detail?id=%ISSUE%"),
    ("JIRA", "%URL%/%ISSUE%"),
    ("Mantis", "%URL%/view.php?id=%ISSUE%"),
    ("MKS", "%URL%/viewissue?selection=%ISSUE%"),
    ("Redmine", "%URL%/issues/show/%ISSUE%"),
    ("Scarab", "%URL%/issues/id/%ISSUE%"),
    ("SourceForge", "http://sourceforge.net/support/tracker.php?aid=%ISSUE%"),
    ("SourceForge2", "%URL%/%ISSUE%"),
    ("Trac", "%URL%/ticket/%ISSUE%"),
    ("Trackplus", "%URL%/printItem.action?key=%ISSUE%"),
    ("Tuleap", "%URL%/?aid=%ISSUE%"),
    ("YouTrack", "%URL%/issue/%ISSUE%"),
];

/// Turns issue IDs into links, using a link template for each tracker.
///
/// Tracker names are case-insensitive.
#[derive(Debug)]
pub struct IssueLinker {
    templates: HashMap<String, String>,
    /// The issue management URL without its last path segment.
    url: Option<String>,
    system: Option<String>,
}

impl IssueLinker {
    /// The configured templates take precedence over the built-in ones.
    pub fn new(
        configured: &HashMap<String, String>,
        issue_management_url: Option<&str>,
        system: Option<&str>,
    ) -> Self {
        let mut templates: HashMap<String, String> = configured
            .iter()
            .map(|(system, template)| (system.to_lowercase(), template.clone()))
            .collect();

        for (system, template) in DEFAULT_LINK_TEMPLATES {
            templates
                .entry(system.to_lowercase())
                .or_insert_with(|| template.to_string());
        }

        let url = issue_management_url
            .and_then(|url| url.rfind('/').map(|index| url[..index].to_string()))
            .filter(|url| !url.trim().is_empty());

        if url.is_none() {
            log::warn!("No usable issue management URL. Some issue links might be missing.");
        }

        Self {
            templates,
            url,
            system: system
                .filter(|system| !system.trim().is_empty())
                .map(str::to_lowercase),
        }
    }

    /// The template for an action: its own tracker, the project tracker, or the default.
    fn template(&self, action_system: Option<&str>) -> Option<&str> {
        let system = action_system
            .filter(|system| !system.trim().is_empty())
            .map(str::to_lowercase)
            .or_else(|| self.system.clone())
            .unwrap_or_else(|| DEFAULT_SYSTEM.to_string());

        self.templates
            .get(&system)
            .map(String::as_str)
            .filter(|template| !template.trim().is_empty())
            .filter(|template| !template.contains(URL_TOKEN) || self.url.is_some())
    }

    /// The link to the issue, or nothing if the tracker doesn't allow links.
    pub fn link(&self, issue: &str, action_system: Option<&str>) -> Option<String> {
        let template = self.template(action_system)?;
        let link = template.replacen(ISSUE_TOKEN, issue, 1);

        Some(match &self.url {
            Some(url) => link.replacen(URL_TOKEN, url, 1),
            None => link,
        })
    }
}

struct IssueView {
    id: String,
    link: Option<String>,
}

struct ActionView {
    kind: String,
    text: String,
    issues: Vec<IssueView>,
    due_to: Vec<DueTo>,
    dev: String,
    dev_link: Option<String>,
    date: String,
}

impl ActionView {
    fn new(action: &Action, linker: &IssueLinker, team: Option<&str>) -> Self {
        let issues: Vec<IssueView> = action
            .all_issues()
            .into_iter()
            .map(|issue| IssueView {
                id: issue.to_string(),
                link: linker.link(issue, action.system.as_deref()),
            })
            .collect();

        // The issue list follows the text as another sentence.
        let text = if !issues.is_empty() && !action.text.is_empty() && !action.text.ends_with('.') {
            format!("{}.", action.text)
        } else {
            action.text.clone()
        };

        let dev = action.dev.clone().unwrap_or_default();
        let dev_link = team
            .filter(|_| !dev.is_empty())
            .map(|team| format!("{team}#{dev}"));

        Self {
            kind: action.kind.clone(),
            text,
            issues,
            due_to: action.due_to.clone(),
            dev,
            dev_link,
            date: action.date.clone().unwrap_or_default(),
        }
    }
}

struct ComponentView {
    name: String,
    actions: Vec<ActionView>,
}

struct ReleaseView {
    version: String,
    anchor: String,
    date: String,
    description: String,
    actions: Vec<ActionView>,
    components: Vec<ComponentView>,
    added: usize,
    fixed: usize,
    updated: usize,
    removed: usize,
}

impl ReleaseView {
    fn new(release: &Release, linker: &IssueLinker, team: Option<&str>) -> Self {
        let categories: Counter<&str> = release
            .actions
            .iter()
            .chain(release.components.iter().flat_map(|c| c.actions.iter()))
            .map(|action| action.kind.as_str())
            .collect();

        let view = |actions: &[Action]| -> Vec<ActionView> {
            actions
                .iter()
                .map(|action| ActionView::new(action, linker, team))
                .collect()
        };

        Self {
            version: release.version.clone(),
            anchor: anchor(&release.version),
            date: release.date.clone().unwrap_or_default(),
            description: release.description.clone().unwrap_or_default(),
            actions: view(release.actions.as_slice()),
            components: release
                .components
                .iter()
                .filter(|component| !component.actions.is_empty())
                .map(|component| ComponentView {
                    name: component.name.clone(),
                    actions: view(component.actions.as_slice()),
                })
                .collect(),
            added: categories[&"add"],
            fixed: categories[&"fix"],
            updated: categories[&"update"],
            removed: categories[&"remove"],
        }
    }

    fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.components.is_empty()
    }
}

/// An HTML ID for the version.
fn anchor(version: &str) -> String {
    let id: String = version
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if id.starts_with(|c: char| c.is_ascii_alphabetic()) {
        id
    } else {
        format!("a{id}")
    }
}

#[derive(Template)]
#[template(path = "changes-report.html")]
struct ChangesReportTemplate<'a> {
    title: &'a str,
    author: Option<&'a str>,
    author_email: Option<&'a str>,
    releases: &'a [ReleaseView],
    show_action_date: bool,
    generated_date: &'a str,
}

/// Render the changes report as an HTML page.
///
/// The title and author come from the changes file, if it sets them.
pub fn changes_report(
    metadata: &ProjectConfig,
    changes: &ChangesDocument,
    releases: &[Release],
    show_action_date: bool,
) -> Result<String> {
    let linker = IssueLinker::new(
        &metadata.issue_link_templates,
        metadata.issue_management_url(),
        metadata.issue_management_system(),
    );
    let team = metadata.team.as_deref().filter(|team| !team.trim().is_empty());

    let views: Vec<ReleaseView> = releases
        .iter()
        .map(|release| ReleaseView::new(release, &linker, team))
        .collect();

    let title = changes
        .title
        .clone()
        .filter(|title| !title.trim().is_empty())
        .unwrap_or_else(|| format!("{} changes", metadata.name));
    let generated_date = Utc::now().to_rfc2822();

    let report = ChangesReportTemplate {
        title: &title,
        author: changes.author.as_deref().filter(|a| !a.trim().is_empty()),
        author_email: changes.author_email.as_deref().filter(|e| !e.trim().is_empty()),
        releases: &views,
        show_action_date,
        generated_date: &generated_date,
    };

    report
        .render()
        .wrap_err("Failed to prepare the changes report.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Component;

    fn templates(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn default_link_template() {
        let linker = IssueLinker::new(
            &HashMap::new(),
            Some("https://issues.apache.org/jira/browse/MCHANGES"),
            None,
        );

        assert_eq!(
            linker.link("MCHANGES-1", None).as_deref(),
            Some("https://issues.apache.org/jira/browse/ViewIssue.jspa?key=MCHANGES-1")
        );
    }

    #[test]
    fn project_system_is_case_insensitive() {
        let linker = IssueLinker::new(
            &HashMap::new(),
            Some("https://issues.apache.org/jira/browse/MCHANGES"),
            Some("jira"),
        );

        assert_eq!(
            linker.link("MCHANGES-1", None).as_deref(),
            Some("https://issues.apache.org/jira/browse/MCHANGES-1")
        );
    }

    #[test]
    fn action_system_wins() {
        let linker = IssueLinker::new(
            &templates(&[("myTracker", "https://tracker.example.org/%ISSUE%")]),
            None,
            Some("JIRA"),
        );

        assert_eq!(
            linker.link("42", Some("MYTRACKER")).as_deref(),
            Some("https://tracker.example.org/42")
        );
        // The project tracker needs the URL that's missing here.
        assert_eq!(linker.link("42", None), None);
    }

    #[test]
    fn configured_template_overrides_default() {
        let linker = IssueLinker::new(
            &templates(&[("github", "%URL%/issues/%ISSUE%"), ("Trac", " ")]),
            Some("https://github.com/owner/repo/issues"),
            Some("GitHub"),
        );

        assert_eq!(
            linker.link("7", None).as_deref(),
            Some("https://github.com/owner/repo/issues/7")
        );
        // A blank template disables links.
        assert_eq!(linker.link("7", Some("Trac")), None);
        assert_eq!(linker.link("7", Some("Unknown")), None);
    }

    #[test]
    fn anchors() {
        assert_eq!(anchor("2.12"), "a2.12");
        assert_eq!(anchor("maven-changes 1.0"), "maven-changes_1.0");
    }

    fn metadata() -> ProjectConfig {
        serde_yaml::from_str(
            "name: Example\nversion: '1.1'\nteam: team.html\n\
             issue_management:\n  system: JIRA\n  url: https://jira.example.org/browse/EX\n",
        )
        .unwrap()
    }

    #[test]
    fn rendered_report() {
        let mut release = Release::new("1.1");
        release.date = Some("2023-04-01".into());
        release.actions.push(Action {
            kind: "fix".into(),
            text: "Fix <the> parser".into(),
            issue: Some("EX-1".into()),
            fixed_issues: vec!["EX-2".into()],
            dev: Some("jdoe".into()),
            due_to: vec![DueTo {
                name: "John Roe".into(),
                email: Some("john@example.org".into()),
            }],
            ..Action::default()
        });
        let release = release.with_component(Component {
            name: "core".into(),
            description: None,
            actions: vec![Action {
                kind: "add".into(),
                text: "New core API.".into(),
                ..Action::default()
            }],
        });
        let empty = Release::new("1.0");

        let html =
            changes_report(&metadata(), &ChangesDocument::default(), &[release, empty], false)
                .unwrap();

        assert!(html.contains("<h1>Example changes</h1>"));
        assert!(!html.contains("class=\"author\""));
        assert!(html.contains("Fix &lt;the&gt; parser."));
        assert!(html.contains(r#"EX-1">EX-1</a>"#));
        assert!(html.contains(r#"EX-2">EX-2</a>"#));
        assert!(html.contains(r#"href="mailto:john@example.org""#));
        assert!(html.contains(r#"href="team.html#jdoe""#));
        assert!(html.contains("New core API."));
        assert!(html.contains("No changes in this release."));
    }

    #[test]
    fn title_and_author_from_the_changes_file() {
        let changes = ChangesDocument {
            title: Some("Example release notes".into()),
            author: Some("Jane Doe".into()),
            author_email: Some("jane@example.org".into()),
            releases: Vec::new(),
        };

        let html = changes_report(&metadata(), &changes, &[Release::new("1.1")], false).unwrap();

        assert!(html.contains("<title>Example release notes</title>"));
        assert!(!html.contains("Example changes"));
        assert!(html.contains(r#"<a href="mailto:jane@example.org">Jane Doe</a>"#));
    }

    #[test]
    fn author_without_email() {
        let changes = ChangesDocument {
            author: Some("Jane Doe".into()),
            author_email: Some(" ".into()),
            ..ChangesDocument::default()
        };

        let html = changes_report(&metadata(), &changes, &[], false).unwrap();

        assert!(html.contains("<h1>Example changes</h1>"));
        assert!(html.contains("Jane Doe"));
        assert!(!html.contains("mailto:jane"));
    }
}
