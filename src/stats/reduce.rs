use crate::model::{RawCommit, RawIssue, TimeWindow};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CommitTotals {
    pub commit_count: u64,
    pub additions: u64,
    pub deletions: u64,
    pub net: i64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IssueTotals {
    pub opened: u64,
    pub closed: u64,
    pub comments: u64,
}

/// Sum code-change metrics over one repository's commits. Merge commits
/// contribute to nothing; an empty input is a quiet repository, not an error.
pub fn reduce_commits(commits: &[RawCommit]) -> CommitTotals {
    let mut totals = CommitTotals::default();
    for commit in commits.iter().filter(|c| !c.is_merge) {
        totals.commit_count += 1;
        totals.additions += commit.additions;
        totals.deletions += commit.deletions;
    }
    totals.net = totals.additions as i64 - totals.deletions as i64;
    totals
}

/// Classify one repository's issues against the window. Opened and closed are
/// independent counters; an issue both opened and closed in-window counts
/// toward both. Comments are summed over records counted by either.
pub fn reduce_issues(issues: &[RawIssue], window: &TimeWindow) -> IssueTotals {
    let mut totals = IssueTotals::default();
    for issue in issues {
        let opened = window.contains(&issue.created_at);
        let closed = issue.closed_at.map_or(false, |t| window.contains(&t));
        if opened {
            totals.opened += 1;
        }
        if closed {
            totals.closed += 1;
        }
        if opened || closed {
            totals.comments += issue.comments;
        }
    }
    totals
}
