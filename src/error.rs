/// error taxonomy for the cache engine
///
/// Segment and provider errors separate a soft "not ready yet" from a hard
/// failure so callers can classify without matching on message text.
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// returned by a segment loader
#[derive(Debug, Error)]
pub enum SegmentError {
    /// a dependency of the loader is not available yet; retried on a later pass
    #[error("not ready: {0}")]
    NotReady(String),

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

/// returned by the external membership provider
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("membership provider not ready: {0}")]
    NotReady(String),

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("segment '{segment}' failed after {elapsed:?}: {source:#}")]
    SegmentLoad {
        segment: String,
        elapsed: Duration,
        #[source]
        source: anyhow::Error,
    },

    #[error("reconciliation aborted: {0:#}")]
    Reconciliation(#[source] anyhow::Error),

    #[error("not ready: {0}")]
    NotReady(String),

    #[error("fatal configuration error: {0}")]
    FatalConfig(String),

    /// the cache is mid-rebuild; carries the reason to surface to the caller
    #[error("{0}")]
    Maintenance(String),

    #[error("a {0} pass is already running")]
    AlreadyRunning(&'static str),
}

impl EngineError {
    /// true for conditions that are expected to clear up on their own
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EngineError::NotReady(_) | EngineError::AlreadyRunning(_) | EngineError::Maintenance(_)
        )
    }
}

impl From<ProviderError> for EngineError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotReady(msg) => EngineError::NotReady(msg),
            ProviderError::Failed(e) => EngineError::Reconciliation(e),
        }
    }
}
