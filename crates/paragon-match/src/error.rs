//! Fatal run errors
//!
//! Everything recoverable (a group exhausting its retries, one malformed
//! entity) is handled inside the engine and reported as unresolved counts;
//! only conditions that invalidate the whole run surface here.

use paragon_store::StoreError;

#[derive(Debug)]
pub enum RunError {
    /// The external API call quota is exhausted. A partial result must never
    /// be returned as complete, so the run stops.
    Quota,
    /// The local store became unreachable. Continuing would re-spend quota
    /// on lookups that cannot be persisted.
    Storage(StoreError),
    /// Cancellation was requested. The store is consistent; a re-run resumes
    /// from cache.
    Cancelled,
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Quota => write!(f, "external API quota exhausted"),
            Self::Storage(e) => write!(f, "{e}"),
            Self::Cancelled => write!(f, "run cancelled"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for RunError {
    fn from(e: StoreError) -> Self {
        Self::Storage(e)
    }
}
