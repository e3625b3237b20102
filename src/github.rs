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

//! Downloading issues from the GitHub REST API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use color_eyre::eyre::{bail, eyre, Result, WrapErr};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde_derive::Deserialize;

use crate::config::GitHubConfig;
use crate::model::Issue;
use crate::tracker_access::IssueSource;

const REGEX_ERROR: &str = "Failed to parse a regular expression.";
/// The variable that can hold a GitHub personal access token.
const TOKEN_VAR: &str = "GITHUB_TOKEN";
const PUBLIC_HOST: &str = "github.com";
const PUBLIC_API: &str = "https://api.github.com";
/// The largest page that the GitHub API serves.
const PAGE_SIZE: usize = 100;
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

// An issue list on GitHub looks like `https://github.com/OWNER/REPO/issues`.
static ISSUES_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(?P<scheme>https?)://(?P<host>[^/\s]+)/",
        r"(?P<owner>[^/\s]+)/(?P<repo>[^/\s]+?)(?:\.git)?(?:/issues)?/?$"
    ))
    .expect(REGEX_ERROR)
});

#[derive(Debug, Deserialize)]
struct GitHubIssue {
    number: u64,
    title: String,
    state: String,
    #[serde(default)]
    labels: Vec<Label>,
    milestone: Option<Milestone>,
    assignee: Option<Account>,
    user: Option<Account>,
    created_at: Option<String>,
    updated_at: Option<String>,
    // Only pull requests carry this field.
    pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Label {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Milestone {
    title: String,
}

#[derive(Debug, Deserialize)]
struct Account {
    login: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

/// The location of a repository and its API.
#[derive(Debug, PartialEq, Eq)]
pub struct Repository {
    pub api_url: String,
    pub owner: String,
    pub repo: String,
    /// The web page with the list of issues. Issue links start with it.
    pub issues_url: String,
}

impl Repository {
    /// Find the repository in the issue management URL.
    /// GitHub Enterprise hosts serve the API under `/api/v3`.
    pub fn parse(url: &str) -> Result<Self> {
        let captures = ISSUES_URL.captures(url.trim()).ok_or_else(|| {
            eyre!(
                "The GitHub URL `{}` is invalid. \
                 Use the form `https://github.com/OWNER/REPO/issues`.",
                url
            )
        })?;

        let scheme = &captures["scheme"];
        let host = &captures["host"];
        let owner = captures["owner"].to_string();
        let repo = captures["repo"].to_string();

        let api_url = if host == PUBLIC_HOST {
            PUBLIC_API.to_string()
        } else {
            format!("{scheme}://{host}/api/v3")
        };
        let issues_url = format!("{scheme}://{host}/{owner}/{repo}/issues");

        Ok(Self {
            api_url,
            owner,
            repo,
            issues_url,
        })
    }
}

fn parse_timestamp(timestamp: Option<&str>) -> Option<DateTime<Utc>> {
    timestamp
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|ts| ts.with_timezone(&Utc))
}

impl GitHubIssue {
    fn into_issue(self, issues_url: &str) -> Issue {
        let key = self.number.to_string();

        Issue {
            link: Some(format!("{issues_url}/{key}")),
            id: key.clone(),
            key,
            summary: self.title,
            kind: self.labels.into_iter().next().map(|label| label.name),
            status: Some(self.state),
            assignee: self.assignee.map(|a| a.login),
            reporter: self.user.map(|u| u.login),
            created: parse_timestamp(self.created_at.as_deref()),
            updated: parse_timestamp(self.updated_at.as_deref()),
            fix_versions: self.milestone.into_iter().map(|m| m.title).collect(),
            ..Issue::default()
        }
    }
}

/// Keep the issues that belong to the report and convert them.
fn convert_issues(issues: Vec<GitHubIssue>, config: &GitHubConfig, issues_url: &str) -> Vec<Issue> {
    issues
        .into_iter()
        .filter(|issue| issue.pull_request.is_none())
        .filter(|issue| !config.only_milestone_issues || issue.milestone.is_some())
        .map(|issue| issue.into_issue(issues_url))
        .collect()
}

/// A GitHub repository that issues are downloaded from.
pub struct GitHubSource {
    client: Client,
    repository: Repository,
    token: Option<String>,
    config: GitHubConfig,
}

impl GitHubSource {
    pub fn new(url: &str, config: &GitHubConfig) -> Result<Self> {
        let repository = Repository::parse(url)?;
        let token = config
            .api_key
            .clone()
            .or_else(|| std::env::var(TOKEN_VAR).ok());

        if token.is_none() {
            log::debug!("No GitHub token. Accessing GitHub anonymously.");
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .wrap_err("Failed to prepare the HTTP client for GitHub.")?;

        Ok(Self {
            client,
            repository,
            token,
            config: config.clone(),
        })
    }

    /// Download all the issues in the state, page by page.
    async fn issues_in_state(&self, state: &str) -> Result<Vec<GitHubIssue>> {
        let url = format!(
            "{}/repos/{}/{}/issues",
            self.repository.api_url, self.repository.owner, self.repository.repo
        );
        let mut issues = Vec::new();

        for page in 1.. {
            let mut request = self
                .client
                .get(&url)
                .header("Accept", "application/vnd.github+json")
                .query(&[
                    ("state", state.to_string()),
                    ("per_page", PAGE_SIZE.to_string()),
                    ("page", page.to_string()),
                ]);
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            let response = request
                .send()
                .await
                .wrap_err("Failed to download issues from GitHub.")?;

            let status = response.status();
            if !status.is_success() {
                if let Ok(error) = response.json::<ErrorResponse>().await {
                    log::error!("GitHub: {}", error.message);
                }
                bail!("Failed to download issues from GitHub. Server response: {}", status);
            }

            let batch: Vec<GitHubIssue> = response
                .json()
                .await
                .wrap_err("Failed to parse the issues from GitHub.")?;
            let last_page = batch.len() < PAGE_SIZE;
            issues.extend(batch);

            if last_page {
                break;
            }
        }

        Ok(issues)
    }
}

#[async_trait]
impl IssueSource for GitHubSource {
    fn name(&self) -> &str {
        "GitHub"
    }

    async fn fetch_issues(&self) -> Result<Vec<Issue>> {
        log::info!(
            "Downloading issues from GitHub: {}/{}",
            self.repository.owner,
            self.repository.repo
        );

        let mut downloaded = self.issues_in_state("closed").await?;
        if self.config.include_open_issues {
            downloaded.extend(self.issues_in_state("open").await?);
        }

        let issues = convert_issues(downloaded, &self.config, &self.repository.issues_url);
        log::info!("Downloaded {} issues from GitHub.", issues.len());

        Ok(issues)
    }
}
