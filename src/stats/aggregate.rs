use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::warn;

use super::reduce::{reduce_commits, reduce_issues, IssueTotals};
use crate::error::{PulseError, Result};
use crate::github::ActivitySource;
use crate::model::{
    AggregateReport, MetricTotals, RepoId, RepoMetrics, RepoStatus, TimeWindow,
};

/// Drive fetch-and-reduce for every repository and fold the results into an
/// AggregateReport. One repository's failure never aborts the run: the error
/// is caught here and recorded as a Failed entry. Output order always matches
/// the input identifier order regardless of completion order.
pub fn collect_all<S: ActivitySource + Sync>(
    source: &S,
    repos: &[RepoId],
    window: TimeWindow,
    include_issues: bool,
    concurrency: usize,
) -> Result<AggregateReport> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(concurrency.max(1))
        .build()
        .map_err(|e| PulseError::Aggregation(e.to_string()))?;

    let pb = ProgressBar::new(repos.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{bar:30.green} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let metrics: Vec<RepoMetrics> = pool.install(|| {
        repos
            .par_iter()
            .map(|repo| {
                pb.set_message(repo.to_string());
                let entry = collect_repo_isolated(source, repo, &window, include_issues);
                pb.inc(1);
                entry
            })
            .collect()
    });
    pb.finish_and_clear();

    let mut totals = MetricTotals::default();
    for entry in metrics.iter().filter(|m| m.is_ok()) {
        totals.accumulate(entry);
    }

    Ok(AggregateReport {
        window,
        include_issues,
        repos: metrics,
        totals,
        generated_at: Utc::now(),
    })
}

/// The per-repository failure boundary: errors and panics both convert to a
/// Failed entry instead of unwinding past the aggregator.
fn collect_repo_isolated<S: ActivitySource + ?Sized>(
    source: &S,
    repo: &RepoId,
    window: &TimeWindow,
    include_issues: bool,
) -> RepoMetrics {
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        collect_repo(source, repo, window, include_issues)
    }));
    match outcome {
        Ok(Ok(metrics)) => metrics,
        Ok(Err(err)) => {
            warn!(%repo, "collection failed: {err}");
            RepoMetrics::failed(repo.clone(), err.to_string())
        }
        Err(_) => {
            let err = PulseError::Aggregation("unexpected internal failure".to_string());
            warn!(%repo, "{err}");
            RepoMetrics::failed(repo.clone(), err.to_string())
        }
    }
}

fn collect_repo<S: ActivitySource + ?Sized>(
    source: &S,
    repo: &RepoId,
    window: &TimeWindow,
    include_issues: bool,
) -> Result<RepoMetrics> {
    let commits = source.fetch_commits(repo, window)?;
    let commit_totals = reduce_commits(&commits);

    let issue_totals = if include_issues {
        let issues = source.fetch_issues(repo, window)?;
        reduce_issues(&issues, window)
    } else {
        IssueTotals::default()
    };

    Ok(RepoMetrics {
        repo: repo.clone(),
        commit_count: commit_totals.commit_count,
        additions: commit_totals.additions,
        deletions: commit_totals.deletions,
        net: commit_totals.net,
        issues_opened: issue_totals.opened,
        issues_closed: issue_totals.closed,
        comments: issue_totals.comments,
        status: RepoStatus::Ok,
        error: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RawCommit, RawIssue};
    use chrono::{DateTime, Utc};
    use std::collections::HashMap;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn window() -> TimeWindow {
        TimeWindow::new(utc("2026-01-01T00:00:00Z"), utc("2026-01-02T00:00:00Z")).unwrap()
    }

    #[derive(Default)]
    struct ScriptedSource {
        commits: HashMap<String, Vec<RawCommit>>,
        issues: HashMap<String, Vec<RawIssue>>,
        rate_limited: Vec<String>,
    }

    impl ScriptedSource {
        fn with_commits(mut self, repo: &str, commits: Vec<RawCommit>) -> Self {
            self.commits.insert(repo.to_string(), commits);
            self
        }

        fn failing(mut self, repo: &str) -> Self {
            self.rate_limited.push(repo.to_string());
            self
        }
    }

    impl ActivitySource for ScriptedSource {
        fn fetch_commits(&self, repo: &RepoId, _window: &TimeWindow) -> Result<Vec<RawCommit>> {
            if self.rate_limited.contains(&repo.to_string()) {
                return Err(PulseError::RateLimited(format!(
                    "{repo} (retries exhausted)"
                )));
            }
            Ok(self.commits.get(&repo.to_string()).cloned().unwrap_or_default())
        }

        fn fetch_issues(&self, repo: &RepoId, _window: &TimeWindow) -> Result<Vec<RawIssue>> {
            Ok(self.issues.get(&repo.to_string()).cloned().unwrap_or_default())
        }
    }

    fn commit(additions: u64, deletions: u64) -> RawCommit {
        RawCommit {
            sha: format!("sha-{additions}"),
            is_merge: false,
            additions,
            deletions,
            committed_at: utc("2026-01-01T12:00:00Z"),
        }
    }

    #[test]
    fn failed_repo_is_listed_but_excluded_from_totals() {
        let repos = vec![
            RepoId::parse("a/b").unwrap(),
            RepoId::parse("c/d").unwrap(),
            RepoId::parse("e/f").unwrap(),
        ];
        let source = ScriptedSource::default()
            .with_commits("a/b", vec![commit(10, 2)])
            .failing("c/d")
            .with_commits("e/f", vec![commit(5, 1)]);

        let report = collect_all(&source, &repos, window(), true, 2).unwrap();

        assert_eq!(report.repos.len(), 3);
        let order: Vec<String> = report.repos.iter().map(|m| m.repo.to_string()).collect();
        assert_eq!(order, vec!["a/b", "c/d", "e/f"]);

        assert!(report.repos[0].is_ok());
        assert_eq!(report.repos[1].status, RepoStatus::Failed);
        assert!(report.repos[1]
            .error
            .as_deref()
            .unwrap()
            .contains("Rate limited"));
        assert!(report.repos[2].is_ok());

        assert_eq!(report.totals.commit_count, 2);
        assert_eq!(report.totals.additions, 15);
        assert_eq!(report.totals.deletions, 3);
        assert_eq!(report.totals.net, 12);
    }

    #[test]
    fn all_failed_still_yields_a_report() {
        let repos = vec![RepoId::parse("a/b").unwrap(), RepoId::parse("c/d").unwrap()];
        let source = ScriptedSource::default().failing("a/b").failing("c/d");

        let report = collect_all(&source, &repos, window(), true, 1).unwrap();
        assert_eq!(report.repos.len(), 2);
        assert!(report.repos.iter().all(|m| !m.is_ok()));
        assert_eq!(report.totals, MetricTotals::default());
    }

    #[test]
    fn sequential_and_parallel_agree() {
        let repos = vec![
            RepoId::parse("a/b").unwrap(),
            RepoId::parse("c/d").unwrap(),
            RepoId::parse("e/f").unwrap(),
            RepoId::parse("g/h").unwrap(),
        ];
        let source = ScriptedSource::default()
            .with_commits("a/b", vec![commit(1, 0)])
            .with_commits("c/d", vec![commit(2, 0)])
            .with_commits("e/f", vec![commit(3, 0)])
            .with_commits("g/h", vec![commit(4, 0)]);

        let seq = collect_all(&source, &repos, window(), true, 1).unwrap();
        let par = collect_all(&source, &repos, window(), true, 4).unwrap();

        assert_eq!(seq.totals, par.totals);
        let seq_order: Vec<String> = seq.repos.iter().map(|m| m.repo.to_string()).collect();
        let par_order: Vec<String> = par.repos.iter().map(|m| m.repo.to_string()).collect();
        assert_eq!(seq_order, par_order);
    }

    #[test]
    fn include_issues_false_skips_issue_fetch() {
        struct PanickyIssues;

        impl ActivitySource for PanickyIssues {
            fn fetch_commits(
                &self,
                _repo: &RepoId,
                _window: &TimeWindow,
            ) -> Result<Vec<RawCommit>> {
                Ok(vec![])
            }

            fn fetch_issues(&self, _repo: &RepoId, _window: &TimeWindow) -> Result<Vec<RawIssue>> {
                panic!("issues must not be fetched");
            }
        }

        let repos = vec![RepoId::parse("a/b").unwrap()];
        let report = collect_all(&PanickyIssues, &repos, window(), false, 1).unwrap();
        assert!(report.repos[0].is_ok());
        assert_eq!(report.repos[0].issues_opened, 0);
    }

    #[test]
    fn panic_in_collection_becomes_failed_entry() {
        struct PanickySource;

        impl ActivitySource for PanickySource {
            fn fetch_commits(
                &self,
                _repo: &RepoId,
                _window: &TimeWindow,
            ) -> Result<Vec<RawCommit>> {
                panic!("boom");
            }

            fn fetch_issues(&self, _repo: &RepoId, _window: &TimeWindow) -> Result<Vec<RawIssue>> {
                Ok(vec![])
            }
        }

        let repos = vec![RepoId::parse("a/b").unwrap()];
        let report = collect_all(&PanickySource, &repos, window(), true, 1).unwrap();
        assert_eq!(report.repos[0].status, RepoStatus::Failed);
        assert!(report.repos[0]
            .error
            .as_deref()
            .unwrap()
            .contains("Aggregation"));
    }
}
