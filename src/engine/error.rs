use ulid::Ulid;

use super::validate::Rejection;

#[derive(Debug)]
pub enum EngineError {
    /// Settings could not be loaded; callers fall back to defaults.
    ConfigUnavailable(String),
    /// Reservation rows could not be fetched; last derived state stays on screen.
    FetchFailed(String),
    /// Blocked locally; nothing was sent to the store.
    ValidationRejected(Rejection),
    /// The store refused the commit. The reason is shown verbatim.
    CommitRejected(String),
    NotFound(Ulid),
    LimitExceeded(&'static str),
}

impl EngineError {
    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            EngineError::ConfigUnavailable(_) => "config_unavailable",
            EngineError::FetchFailed(_) => "fetch_failed",
            EngineError::ValidationRejected(_) => "validation_rejected",
            EngineError::CommitRejected(_) => "commit_rejected",
            EngineError::NotFound(_) => "not_found",
            EngineError::LimitExceeded(_) => "limit_exceeded",
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::ConfigUnavailable(e) => write!(f, "settings unavailable: {e}"),
            EngineError::FetchFailed(e) => write!(f, "failed to load reservations: {e}"),
            EngineError::ValidationRejected(reason) => write!(f, "{reason}"),
            EngineError::CommitRejected(reason) => write!(f, "{reason}"),
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<Rejection> for EngineError {
    fn from(reason: Rejection) -> Self {
        EngineError::ValidationRejected(reason)
    }
}
