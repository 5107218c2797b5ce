use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, Response};
use reqwest::{header, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::warn;

use crate::error::{PulseError, Result};
use crate::model::{RawCommit, RawIssue, RepoId, TimeWindow};

pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

const PER_PAGE: usize = 100;
const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE_MS: u64 = 1_000;

/// Narrow capability interface over the remote activity source. The engine
/// depends only on this; the real client and test doubles both implement it.
pub trait ActivitySource {
    fn fetch_commits(&self, repo: &RepoId, window: &TimeWindow) -> Result<Vec<RawCommit>>;
    fn fetch_issues(&self, repo: &RepoId, window: &TimeWindow) -> Result<Vec<RawIssue>>;
}

pub struct GitHubClient {
    http: Client,
    base_url: String,
    token: String,
}

impl GitHubClient {
    pub fn new(token: String, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("repopulse/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            token,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn repo_url(&self, repo: &RepoId, tail: &str) -> String {
        format!("{}/repos/{}/{}{tail}", self.base_url, repo.owner, repo.name)
    }

    fn get_once(&self, url: &str, query: &[(&str, String)]) -> Result<Response> {
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/vnd.github+json")
            .query(query)
            .send()
            .map_err(|e| PulseError::TransientNetwork(format!("{url}: {e}")))?;
        if resp.status().is_success() {
            return Ok(resp);
        }
        Err(classify_response(url, resp))
    }

    /// GET with bounded retry. Only transient failures (rate limit, network,
    /// 5xx) are retried; the delay doubles per attempt.
    fn get_with_retry(&self, url: &str, query: &[(&str, String)]) -> Result<Response> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.get_once(url, query) {
                Ok(resp) => return Ok(resp),
                Err(err) if err.is_transient() && attempt < MAX_ATTEMPTS => {
                    let delay = Duration::from_millis(BACKOFF_BASE_MS << (attempt - 1));
                    warn!(url, attempt, ?delay, "transient error, backing off: {err}");
                    thread::sleep(delay);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Follow pagination until a page comes back shorter than `PER_PAGE`.
    fn get_paginated<T: DeserializeOwned>(
        &self,
        url: &str,
        base_query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page = 1u32;
        loop {
            let mut query = base_query.to_vec();
            query.push(("per_page", PER_PAGE.to_string()));
            query.push(("page", page.to_string()));
            let batch: Vec<T> = self.get_with_retry(url, &query)?.json()?;
            let fetched = batch.len();
            items.extend(batch);
            if fetched < PER_PAGE {
                return Ok(items);
            }
            page += 1;
        }
    }

    /// Line stats live on the per-commit detail resource. Transient failures
    /// (already retried) propagate; anything else degrades to zero lines,
    /// matching the tolerance of the listing endpoints for missing stats.
    fn commit_line_stats(&self, repo: &RepoId, sha: &str) -> Result<(u64, u64)> {
        let url = self.repo_url(repo, &format!("/commits/{sha}"));
        let detail = self
            .get_with_retry(&url, &[])
            .and_then(|resp| resp.json::<CommitDetail>().map_err(PulseError::from));
        match detail {
            Ok(detail) => Ok(detail
                .stats
                .map(|s| (s.additions, s.deletions))
                .unwrap_or((0, 0))),
            Err(err) if err.is_transient() => Err(err),
            Err(err) => {
                warn!(%repo, sha, "line stats unavailable: {err}");
                Ok((0, 0))
            }
        }
    }
}

impl ActivitySource for GitHubClient {
    fn fetch_commits(&self, repo: &RepoId, window: &TimeWindow) -> Result<Vec<RawCommit>> {
        let url = self.repo_url(repo, "/commits");
        let query = [
            ("since", window.start.to_rfc3339()),
            ("until", window.end.to_rfc3339()),
        ];
        let items: Vec<CommitItem> = self.get_paginated(&url, &query)?;

        let mut commits = Vec::with_capacity(items.len());
        for item in items {
            let committed_at = match item.commit.timestamp() {
                Some(t) => t,
                None => {
                    warn!(%repo, sha = %item.sha, "commit has no timestamp, skipping");
                    continue;
                }
            };
            if !window.contains(&committed_at) {
                continue;
            }
            let is_merge = item.parents.len() > 1;
            let (additions, deletions) = if is_merge {
                // excluded from every metric downstream, not worth a detail fetch
                (0, 0)
            } else {
                self.commit_line_stats(repo, &item.sha)?
            };
            commits.push(RawCommit {
                sha: item.sha,
                is_merge,
                additions,
                deletions,
                committed_at,
            });
        }
        Ok(commits)
    }

    fn fetch_issues(&self, repo: &RepoId, window: &TimeWindow) -> Result<Vec<RawIssue>> {
        let url = self.repo_url(repo, "/issues");
        // `since` filters on update time, so issues closed in-window but
        // created earlier still show up.
        let query = [
            ("state", "all".to_string()),
            ("since", window.start.to_rfc3339()),
        ];
        let items: Vec<IssueItem> = self.get_paginated(&url, &query)?;

        Ok(items
            .into_iter()
            .filter(|item| item.pull_request.is_none())
            .filter(|item| {
                window.contains(&item.created_at)
                    || item.closed_at.map_or(false, |t| window.contains(&t))
            })
            .map(|item| RawIssue {
                id: item.number.to_string(),
                created_at: item.created_at,
                closed_at: item.closed_at,
                comments: item.comments,
            })
            .collect())
    }
}

fn classify_response(url: &str, resp: Response) -> PulseError {
    let status = resp.status();
    let rate_exhausted = resp
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v.trim() == "0");
    let detail = match resp.text() {
        Ok(body) if !body.trim().is_empty() => {
            format!("{status}: {}", truncate(body.trim(), 200))
        }
        _ => status.to_string(),
    };

    match status {
        StatusCode::NOT_FOUND => PulseError::RepoNotFound(format!("{url} ({detail})")),
        StatusCode::TOO_MANY_REQUESTS => PulseError::RateLimited(format!("{url} ({detail})")),
        StatusCode::FORBIDDEN if rate_exhausted => {
            PulseError::RateLimited(format!("{url} ({detail})"))
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            PulseError::AccessDenied(format!("{url} ({detail})"))
        }
        s if s.is_server_error() => PulseError::TransientNetwork(format!("{url} ({detail})")),
        _ => PulseError::Api(format!("{url} ({detail})")),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[derive(Deserialize)]
struct CommitItem {
    sha: String,
    #[serde(default)]
    parents: Vec<CommitParent>,
    commit: CommitMeta,
}

#[derive(Deserialize)]
struct CommitParent {}

#[derive(Deserialize)]
struct CommitMeta {
    committer: Option<CommitSignature>,
    author: Option<CommitSignature>,
}

impl CommitMeta {
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.committer
            .as_ref()
            .or(self.author.as_ref())
            .map(|sig| sig.date)
    }
}

#[derive(Deserialize)]
struct CommitSignature {
    date: DateTime<Utc>,
}

#[derive(Deserialize)]
struct CommitDetail {
    stats: Option<CommitLineStats>,
}

#[derive(Deserialize)]
struct CommitLineStats {
    additions: u64,
    deletions: u64,
}

#[derive(Deserialize)]
struct IssueItem {
    number: u64,
    created_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    comments: u64,
    pull_request: Option<serde_json::Value>,
}
