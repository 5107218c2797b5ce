use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{PulseError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    /// Parse an `owner/name` identifier. Exactly one `/`, both sides non-empty.
    pub fn parse(input: &str) -> Result<Self> {
        let mut parts = input.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => Ok(Self {
                owner: owner.to_string(),
                name: name.to_string(),
            }),
            _ => Err(PulseError::InvalidRepoFormat(format!(
                "expected owner/name, got {input:?}"
            ))),
        }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoId {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Resolve an ordered list of `owner/name` strings. Order and duplicates are
/// preserved; the first malformed entry aborts the run.
pub fn parse_repo_list(inputs: &[String]) -> Result<Vec<RepoId>> {
    inputs.iter().map(|s| RepoId::parse(s)).collect()
}

/// Half-open interval `[start, end)` over which activity is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start >= end {
            return Err(PulseError::InvalidWindow(format!(
                "start ({start}) must precede end ({end})"
            )));
        }
        Ok(Self { start, end })
    }

    /// Window of `days_back` whole days ending at the UTC midnight of `now`.
    pub fn ending_at_midnight(now: DateTime<Utc>, days_back: i64) -> Result<Self> {
        if days_back <= 0 {
            return Err(PulseError::InvalidWindow(format!(
                "days_back must be positive, got {days_back}"
            )));
        }
        let midnight = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| PulseError::InvalidWindow(format!("invalid reference time {now}")))?;
        let end = Utc.from_utc_datetime(&midnight);
        Self::new(end - Duration::days(days_back), end)
    }

    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        *timestamp >= self.start && *timestamp < self.end
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCommit {
    pub sha: String,
    pub is_merge: bool,
    pub additions: u64,
    pub deletions: u64,
    pub committed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawIssue {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub comments: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoStatus {
    Ok,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoMetrics {
    pub repo: RepoId,
    pub commit_count: u64,
    pub additions: u64,
    pub deletions: u64,
    pub net: i64,
    pub issues_opened: u64,
    pub issues_closed: u64,
    pub comments: u64,
    pub status: RepoStatus,
    pub error: Option<String>,
}

impl RepoMetrics {
    /// All-zero entry recording why this repository could not be collected.
    pub fn failed(repo: RepoId, detail: impl Into<String>) -> Self {
        Self {
            repo,
            commit_count: 0,
            additions: 0,
            deletions: 0,
            net: 0,
            issues_opened: 0,
            issues_closed: 0,
            comments: 0,
            status: RepoStatus::Failed,
            error: Some(detail.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == RepoStatus::Ok
    }
}

/// Field-wise sum over the `Ok` entries of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricTotals {
    pub commit_count: u64,
    pub additions: u64,
    pub deletions: u64,
    pub net: i64,
    pub issues_opened: u64,
    pub issues_closed: u64,
    pub comments: u64,
}

impl MetricTotals {
    pub fn accumulate(&mut self, metrics: &RepoMetrics) {
        self.commit_count += metrics.commit_count;
        self.additions += metrics.additions;
        self.deletions += metrics.deletions;
        self.net += metrics.net;
        self.issues_opened += metrics.issues_opened;
        self.issues_closed += metrics.issues_closed;
        self.comments += metrics.comments;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateReport {
    pub window: TimeWindow,
    pub include_issues: bool,
    pub repos: Vec<RepoMetrics>,
    pub totals: MetricTotals,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn repo_id_parses_owner_and_name() {
        let id = RepoId::parse("rust-lang/rust").unwrap();
        assert_eq!(id.owner, "rust-lang");
        assert_eq!(id.name, "rust");
        assert_eq!(id.to_string(), "rust-lang/rust");
    }

    #[test]
    fn repo_id_rejects_malformed_input() {
        for bad in ["norepo", "a/b/c", "/name", "owner/", "/", ""] {
            assert!(
                matches!(RepoId::parse(bad), Err(PulseError::InvalidRepoFormat(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn repo_list_preserves_order_and_duplicates() {
        let input = vec!["a/b".to_string(), "c/d".to_string(), "a/b".to_string()];
        let ids = parse_repo_list(&input).unwrap();
        let rendered: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        assert_eq!(rendered, input);
    }

    #[test]
    fn window_is_half_open() {
        let window =
            TimeWindow::new(utc("2026-01-01T00:00:00Z"), utc("2026-01-02T00:00:00Z")).unwrap();
        assert!(window.contains(&utc("2026-01-01T00:00:00Z")));
        assert!(window.contains(&utc("2026-01-01T23:59:59Z")));
        assert!(!window.contains(&utc("2026-01-02T00:00:00Z")));
        assert!(!window.contains(&utc("2025-12-31T23:59:59Z")));
    }

    #[test]
    fn window_anchors_to_utc_midnight() {
        let window = TimeWindow::ending_at_midnight(utc("2026-08-06T15:23:45Z"), 1).unwrap();
        assert_eq!(window.end, utc("2026-08-06T00:00:00Z"));
        assert_eq!(window.start, utc("2026-08-05T00:00:00Z"));

        let weekly = TimeWindow::ending_at_midnight(utc("2026-08-06T15:23:45Z"), 7).unwrap();
        assert_eq!(weekly.start, utc("2026-07-30T00:00:00Z"));
    }

    #[test]
    fn window_rejects_non_positive_days() {
        for days in [0, -1] {
            assert!(matches!(
                TimeWindow::ending_at_midnight(Utc::now(), days),
                Err(PulseError::InvalidWindow(_))
            ));
        }
    }

    #[test]
    fn window_rejects_inverted_bounds() {
        let t = utc("2026-01-01T00:00:00Z");
        assert!(matches!(
            TimeWindow::new(t, t),
            Err(PulseError::InvalidWindow(_))
        ));
    }

    #[test]
    fn totals_accumulate_field_wise() {
        let repo = RepoId::parse("a/b").unwrap();
        let metrics = RepoMetrics {
            repo,
            commit_count: 2,
            additions: 15,
            deletions: 3,
            net: 12,
            issues_opened: 1,
            issues_closed: 0,
            comments: 3,
            status: RepoStatus::Ok,
            error: None,
        };
        let mut totals = MetricTotals::default();
        totals.accumulate(&metrics);
        totals.accumulate(&metrics);
        assert_eq!(totals.commit_count, 4);
        assert_eq!(totals.additions, 30);
        assert_eq!(totals.net, 24);
    }
}
