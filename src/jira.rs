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

//! Downloading issues from the Jira REST API.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use color_eyre::eyre::{bail, eyre, Result, WrapErr};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, RequestBuilder, Response};
use serde_derive::Deserialize;
use serde_json::{json, Value};

use crate::config::JiraConfig;
use crate::model::Issue;
use crate::query::{JqlQueryBuilder, QueryBuilder};
use crate::tracker_access::IssueSource;

const REGEX_ERROR: &str = "Failed to parse a regular expression.";
/// The variable that can hold a Jira personal access token.
const API_KEY_VAR: &str = "JIRA_API_KEY";
/// The timestamp format of the Jira REST API, such as `2011-01-24T10:00:45.000+0100`.
const JIRA_TIMESTAMP: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

// A project URL in Jira looks like `https://issues.example.org/jira/browse/PROJECT`.
static BROWSE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<base>https?://\S+?)/browse/(?P<project>[^/\s]+)/?$").expect(REGEX_ERROR)
});

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<JiraIssue>,
}

#[derive(Debug, Deserialize)]
struct JiraIssue {
    id: String,
    key: String,
    fields: Fields,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Fields {
    #[serde(default)]
    summary: String,
    issuetype: Option<Named>,
    status: Option<Named>,
    resolution: Option<Named>,
    priority: Option<Named>,
    assignee: Option<User>,
    reporter: Option<User>,
    #[serde(default)]
    versions: Vec<Named>,
    #[serde(default)]
    fix_versions: Vec<Named>,
    #[serde(default)]
    components: Vec<Named>,
    created: Option<String>,
    updated: Option<String>,
}

/// Any Jira object that has a name, such as a status or a version.
#[derive(Debug, Deserialize)]
struct Named {
    id: Option<String>,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct User {
    name: Option<String>,
    display_name: Option<String>,
}

impl User {
    fn into_name(self) -> Option<String> {
        self.display_name.or(self.name)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    #[serde(default)]
    error_messages: Vec<String>,
    #[serde(default)]
    errors: HashMap<String, String>,
    message: Option<String>,
}

impl ErrorResponse {
    fn messages(self) -> Vec<String> {
        let mut messages = self.error_messages;
        messages.extend(
            self.errors
                .into_iter()
                .map(|(field, error)| format!("{field}: {error}")),
        );
        messages.extend(self.message);
        messages
    }
}

fn parse_timestamp(timestamp: Option<&str>) -> Option<DateTime<Utc>> {
    timestamp
        .and_then(|ts| DateTime::parse_from_str(ts, JIRA_TIMESTAMP).ok())
        .map(|ts| ts.with_timezone(&Utc))
}

fn names(items: Vec<Named>) -> Vec<String> {
    items.into_iter().map(|item| item.name).collect()
}

impl JiraIssue {
    fn into_issue(self, base_url: &str) -> Issue {
        let fields = self.fields;
        let versions = names(fields.versions);

        Issue {
            link: Some(format!("{}/browse/{}", base_url, self.key)),
            id: self.id,
            key: self.key,
            summary: fields.summary,
            kind: fields.issuetype.map(|t| t.name),
            status: fields.status.map(|s| s.name),
            resolution: fields.resolution.map(|r| r.name),
            priority: fields.priority.map(|p| p.name),
            assignee: fields.assignee.and_then(User::into_name),
            reporter: fields.reporter.and_then(User::into_name),
            version: if versions.is_empty() {
                None
            } else {
                Some(versions.join(", "))
            },
            created: parse_timestamp(fields.created.as_deref()),
            updated: parse_timestamp(fields.updated.as_deref()),
            fix_versions: names(fields.fix_versions),
            components: names(fields.components),
        }
    }
}

/// Split a Jira project URL into the base URL of the Jira instance and the project key.
pub fn parse_browse_url(url: &str) -> Result<(String, String)> {
    let captures = BROWSE_URL.captures(url.trim()).ok_or_else(|| {
        eyre!(
            "The Jira URL `{}` is invalid. Use the form `https://host/browse/PROJECT`.",
            url
        )
    })?;

    Ok((
        captures["base"].to_string(),
        captures["project"].to_string(),
    ))
}

/// Find the IDs of the configured names among the items that Jira knows.
/// An item that's configured by its ID is accepted as well.
fn resolve_ids(what: &str, configured: Option<&str>, known: &[Named]) -> Result<Vec<String>> {
    let mut ids = Vec::new();

    for name in crate::model::comma_list(configured) {
        let found = known
            .iter()
            .find(|item| item.name == name || item.id.as_deref() == Some(name.as_str()));

        match found.and_then(|item| item.id.clone()) {
            Some(id) => ids.push(id),
            None => bail!("Could not find the {} `{}` in Jira.", what, name),
        }
    }

    Ok(ids)
}

/// A filter that's configured by names, but that the query needs as IDs.
#[derive(Clone, Copy, Debug)]
enum ListField {
    Component,
    FixVersion,
    Status,
    Resolution,
    IssueType,
    Priority,
}

impl ListField {
    const ALL: [Self; 6] = [
        Self::Component,
        Self::FixVersion,
        Self::Status,
        Self::Resolution,
        Self::IssueType,
        Self::Priority,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::Component => "component",
            Self::FixVersion => "version",
            Self::Status => "status",
            Self::Resolution => "resolution",
            Self::IssueType => "issue type",
            Self::Priority => "priority",
        }
    }

    fn configured(self, config: &JiraConfig) -> Option<&str> {
        match self {
            Self::Component => config.component.as_deref(),
            Self::FixVersion => config.fix_version_ids.as_deref(),
            Self::Status => config.status_ids.as_deref(),
            Self::Resolution => config.resolution_ids.as_deref(),
            Self::IssueType => config.type_ids.as_deref(),
            Self::Priority => config.priority_ids.as_deref(),
        }
    }

    /// The REST endpoint that lists the known items, relative to `rest/api/2`.
    fn path(self, project: &str) -> String {
        match self {
            Self::Component => format!("project/{project}/components"),
            Self::FixVersion => format!("project/{project}/versions"),
            Self::Status => "status".to_string(),
            Self::Resolution => "resolution".to_string(),
            Self::IssueType => "issuetype".to_string(),
            Self::Priority => "priority".to_string(),
        }
    }

    fn apply<B: QueryBuilder>(self, builder: &mut B, ids: &[String]) -> Result<()> {
        match self {
            Self::Component => builder.component_list(ids)?,
            Self::FixVersion => builder.fix_version_id_list(ids)?,
            Self::Status => builder.status_id_list(ids)?,
            Self::Resolution => builder.resolution_id_list(ids)?,
            Self::IssueType => builder.type_id_list(ids)?,
            Self::Priority => builder.priority_id_list(ids)?,
        };
        Ok(())
    }
}

enum Auth {
    Basic { user: String, password: String },
    Token(String),
    Anonymous,
}

/// A Jira project that issues are downloaded from.
pub struct JiraSource {
    client: Client,
    base_url: String,
    project: String,
    auth: Auth,
    config: JiraConfig,
    fix_for: Option<String>,
}

impl JiraSource {
    /// Prepare the access to the project at the Jira URL.
    /// With `fix_for`, only the issues fixed in that version are downloaded.
    pub fn new(url: &str, config: &JiraConfig, fix_for: Option<&str>) -> Result<Self> {
        let (base_url, project) = parse_browse_url(url)?;

        let auth = match (&config.user, &config.password) {
            (Some(user), Some(password)) => Auth::Basic {
                user: user.clone(),
                password: password.clone(),
            },
            _ => match config.api_key.clone().or_else(|| std::env::var(API_KEY_VAR).ok()) {
                Some(key) => Auth::Token(key),
                None => {
                    log::debug!("No Jira credentials. Accessing Jira anonymously.");
                    Auth::Anonymous
                }
            },
        };

        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connection_timeout_ms))
            .timeout(Duration::from_millis(config.receive_timeout_ms))
            .build()
            .wrap_err("Failed to prepare the HTTP client for Jira.")?;

        Ok(Self {
            client,
            base_url,
            project,
            auth,
            config: config.clone(),
            fix_for: fix_for.map(ToString::to_string),
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Auth::Basic { user, password } => request.basic_auth(user, Some(password)),
            Auth::Token(key) => request.bearer_auth(key),
            Auth::Anonymous => request,
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/rest/api/2/{}", self.base_url, path)
    }

    /// Fail with the messages that Jira sent, if the response isn't successful.
    async fn check_response(response: Response, action: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error: ErrorResponse = response.json().await.unwrap_or_default();
        for message in error.messages() {
            log::error!("Jira: {}", message);
        }

        bail!("Failed to {} in Jira. Server response: {}", action, status)
    }

    async fn get_list(&self, path: &str) -> Result<Vec<Named>> {
        let response = self
            .authorize(self.client.get(self.api_url(path)))
            .send()
            .await
            .wrap_err_with(|| format!("Failed to download {path} from Jira."))?;
        let response = Self::check_response(response, &format!("list {path}")).await?;

        response
            .json()
            .await
            .wrap_err_with(|| format!("Failed to parse {path} from Jira."))
    }

    async fn check_server(&self) -> Result<()> {
        let response = self
            .authorize(self.client.get(self.api_url("serverInfo")))
            .send()
            .await
            .wrap_err_with(|| format!("Failed to connect to Jira at {}.", self.base_url))?;
        Self::check_response(response, "access the server information").await?;

        log::debug!("Connected to Jira at {}.", self.base_url);
        Ok(())
    }

    /// Look up the configured names and build the JQL query out of their IDs.
    async fn query(&self) -> Result<String> {
        let mut builder = JqlQueryBuilder::new();
        builder.url_encode(false).project(&self.project);

        if let Some(fix_for) = &self.fix_for {
            builder.fix_version(fix_for);
        }

        for field in ListField::ALL {
            let Some(configured) = field.configured(&self.config) else {
                continue;
            };
            let known = self.get_list(&field.path(&self.project)).await?;
            let ids = resolve_ids(field.label(), Some(configured), &known)?;
            field.apply(&mut builder, &ids)?;
        }

        if let Some(sort_column_names) = &self.config.sort_column_names {
            builder.sort_column_names(sort_column_names);
        }
        if let Some(filter) = &self.config.filter {
            builder.filter(filter);
        }

        Ok(builder.build())
    }
}

#[async_trait]
impl IssueSource for JiraSource {
    fn name(&self) -> &str {
        "Jira"
    }

    async fn fetch_issues(&self) -> Result<Vec<Issue>> {
        self.check_server().await?;

        let jql = self.query().await?;
        log::info!("Downloading issues from Jira: {}", jql);

        let body = json!({
            "jql": jql,
            "maxResults": self.config.max_entries,
            "fields": ["*all"],
        });

        let response = self
            .authorize(self.client.post(self.api_url("search")))
            .json(&body)
            .send()
            .await
            .wrap_err("Failed to search for issues in Jira.")?;
        let response = Self::check_response(response, "search for issues").await?;

        let search: Value = response
            .json()
            .await
            .wrap_err("Failed to read the search results from Jira.")?;
        let issues = parse_search(search, &self.base_url)?;

        log::info!("Downloaded {} issues from Jira.", issues.len());

        Ok(issues)
    }
}

fn parse_search(search: Value, base_url: &str) -> Result<Vec<Issue>> {
    let search: SearchResponse =
        serde_json::from_value(search).wrap_err("Unexpected search results from Jira.")?;

    Ok(search
        .issues
        .into_iter()
        .map(|issue| issue.into_issue(base_url))
        .collect())
}
