use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{PulseError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Daily,
    Weekly,
}

impl ReportKind {
    pub fn label(&self) -> &'static str {
        match self {
            ReportKind::Daily => "Daily",
            ReportKind::Weekly => "Weekly",
        }
    }

    pub fn subject(&self) -> String {
        format!("GitHub {} Activity Report", self.label())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub daily_report: ReportKindConfig,
    pub weekly_report: ReportKindConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportKindConfig {
    pub enabled: bool,
    pub days_back: i64,
    #[serde(default = "default_include_issues")]
    pub include_issues: bool,
}

fn default_include_issues() -> bool {
    true
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            PulseError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| PulseError::Config(format!("malformed {}: {e}", path.display())))
    }

    pub fn for_kind(&self, kind: ReportKind) -> &ReportKindConfig {
        match kind {
            ReportKind::Daily => &self.daily_report,
            ReportKind::Weekly => &self.weekly_report,
        }
    }
}

/// Load the ordered `owner/name` list from `repos.json`. An empty list is a
/// configuration error, not an empty report.
pub fn load_repo_list(path: &Path) -> Result<Vec<String>> {
    let raw = fs::read_to_string(path)
        .map_err(|e| PulseError::Config(format!("cannot read {}: {e}", path.display())))?;
    let repos: Vec<String> = serde_json::from_str(&raw)
        .map_err(|e| PulseError::Config(format!("malformed {}: {e}", path.display())))?;
    if repos.is_empty() {
        return Err(PulseError::Config(format!(
            "no repositories configured in {}",
            path.display()
        )));
    }
    Ok(repos)
}

pub fn github_token() -> Result<String> {
    std::env::var("GITHUB_TOKEN")
        .map_err(|_| PulseError::Config("GITHUB_TOKEN is not set".to_string()))
}
