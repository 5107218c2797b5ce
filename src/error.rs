use thiserror::Error;

pub type Result<T> = std::result::Result<T, PulseError>;

#[derive(Error, Debug)]
pub enum PulseError {
    #[error("Invalid repository identifier: {0}")]
    InvalidRepoFormat(String),
    #[error("Invalid time window: {0}")]
    InvalidWindow(String),
    #[error("Repository not found: {0}")]
    RepoNotFound(String),
    #[error("Access denied: {0}")]
    AccessDenied(String),
    #[error("Rate limited: {0}")]
    RateLimited(String),
    #[error("Network error: {0}")]
    TransientNetwork(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Aggregation error: {0}")]
    Aggregation(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PulseError {
    /// Whether a retry could plausibly succeed. Drives the fetcher's backoff
    /// loop; `RepoNotFound` and `AccessDenied` are never retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PulseError::RateLimited(_) | PulseError::TransientNetwork(_) | PulseError::Http(_)
        )
    }
}
