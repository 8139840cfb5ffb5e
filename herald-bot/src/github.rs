use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const GITHUB_API: &str = "https://api.github.com";
const ACCEPT: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("herald-bot/", env!("CARGO_PKG_VERSION"));

// ─── Wire types ───────────────────────────────────────────────

/// An issue waiting for approval before it is posted upstream.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DraftIssue {
    pub title: Option<String>,
    pub body: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GithubAccount {
    pub login: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Milestone {
    pub title: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Label {
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Issue {
    pub title: Option<String>,
    pub body: Option<String>,
    pub state: Option<String>,
    pub html_url: Option<String>,
    pub user: Option<GithubAccount>,
    pub milestone: Option<Milestone>,
    pub labels: Option<Vec<Label>>,
    pub assignees: Option<Vec<GithubAccount>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PullRequest {
    pub title: Option<String>,
    pub state: Option<String>,
    #[serde(default)]
    pub merged: bool,
    pub additions: Option<i64>,
    pub deletions: Option<i64>,
    pub commits: Option<i64>,
    pub changed_files: Option<i64>,
    pub html_url: Option<String>,
    pub user: Option<GithubAccount>,
}

/// What a number under `user/repo` turned out to be. Pulls carry the issue
/// record too: milestone/labels/assignees only exist on the issue side.
#[derive(Clone, Debug)]
pub enum Fetched {
    Issue(Issue),
    Pull { issue: Issue, pull: PullRequest },
}

// ─── Collaborator trait ───────────────────────────────────────

/// The issue-tracker seam. `fetch` returns `Ok(None)` for an unknown
/// number; transport-level and non-404 HTTP failures are errors and must be
/// surfaced to the channel, never swallowed.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn fetch(
        &self,
        user: &str,
        repo: &str,
        number: i64,
        token: &str,
    ) -> Result<Option<Fetched>>;

    async fn create_issue(
        &self,
        user: &str,
        repo: &str,
        draft: &DraftIssue,
        token: &str,
    ) -> Result<()>;
}

// ─── reqwest-backed client ────────────────────────────────────

pub struct GithubClient {
    http: reqwest::Client,
    base_url: String,
}

impl GithubClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(GITHUB_API)
    }

    /// Point the client at a different API root (test servers).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("building http client")?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, token: &str) -> Result<Option<T>> {
        let response = self
            .http
            .get(url)
            .header("Accept", ACCEPT)
            .header("Authorization", format!("token {token}"))
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            bail!("GET {url}: {}", response.status());
        }
        let parsed = response
            .json()
            .await
            .with_context(|| format!("decoding {url}"))?;
        Ok(Some(parsed))
    }
}

#[async_trait]
impl IssueTracker for GithubClient {
    async fn fetch(
        &self,
        user: &str,
        repo: &str,
        number: i64,
        token: &str,
    ) -> Result<Option<Fetched>> {
        let issue_url = format!("{}/repos/{user}/{repo}/issues/{number}", self.base_url);
        let Some(issue) = self.get_json::<Issue>(&issue_url, token).await? else {
            return Ok(None);
        };

        // The issues endpoint serves pulls as well; only the URL tells them
        // apart. Pulls get a second request for diff statistics.
        let is_pull = issue
            .html_url
            .as_deref()
            .is_some_and(|url| url.contains("/pull/"));
        if !is_pull {
            return Ok(Some(Fetched::Issue(issue)));
        }

        let pull_url = format!("{}/repos/{user}/{repo}/pulls/{number}", self.base_url);
        match self.get_json::<PullRequest>(&pull_url, token).await? {
            Some(pull) => Ok(Some(Fetched::Pull { issue, pull })),
            None => Ok(Some(Fetched::Issue(issue))),
        }
    }

    async fn create_issue(
        &self,
        user: &str,
        repo: &str,
        draft: &DraftIssue,
        token: &str,
    ) -> Result<()> {
        let url = format!("{}/repos/{user}/{repo}/issues", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("Accept", ACCEPT)
            .header("Authorization", format!("token {token}"))
            .json(draft)
            .send()
            .await
            .with_context(|| format!("POST {url}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("creating issue in {user}/{repo}: {status} {body}");
        }
        Ok(())
    }
}
