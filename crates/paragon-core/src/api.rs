//! Boundary to the external bibliometric search API
//!
//! The core never parses the wire protocol; implementations translate their
//! transport into these types. One structured log record is expected per
//! call attempt (API name, parameters, row count or error).

use rustc_hash::FxHashSet;

use crate::profile::{AuthorId, AuthorProfile, SourceId};

/// How much of an author profile to retrieve.
///
/// `Light` returns identity, field codes, and the indexed document count;
/// `Full` additionally returns the publication list. Light lookups are an
/// order of magnitude cheaper upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Light,
    Full,
}

impl View {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Full => "full",
        }
    }
}

/// Error from a single external call.
#[derive(Debug)]
pub enum ApiError {
    /// Network or HTTP failure. Retried with bounded backoff.
    Transport {
        status: Option<u16>,
        message: String,
    },
    /// Call exceeded its upper time bound. Treated like a transport failure.
    Timeout,
    /// The weekly call quota is exhausted. Fatal to the whole run; a partial
    /// result must never be silently returned as complete.
    QuotaExceeded,
    /// The response for one entity could not be decoded. The entity is
    /// skipped and logged; the batch continues.
    Malformed(String),
}

impl ApiError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { status, .. } => {
                // Client errors other than rate limiting won't heal on retry
                !matches!(status, Some(400..=428) | Some(430..=499))
            }
            Self::Timeout => true,
            Self::QuotaExceeded | Self::Malformed(_) => false,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport {
                status: Some(s),
                message,
            } => write!(f, "transport error (HTTP {s}): {message}"),
            Self::Transport {
                status: None,
                message,
            } => write!(f, "transport error: {message}"),
            Self::Timeout => write!(f, "call timed out"),
            Self::QuotaExceeded => write!(f, "API call quota exceeded"),
            Self::Malformed(msg) => write!(f, "malformed response: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

/// External search operations the pipeline depends on.
///
/// Implementations are expected to be cheap to call repeatedly; all caching
/// happens above this trait.
pub trait SearchApi: Send + Sync {
    /// Fetch an author snapshot.
    fn search_author(&self, id: AuthorId, view: View) -> Result<AuthorProfile, ApiError>;

    /// IDs of all authors publishing in any of `source_ids` during `year`.
    fn search_source_year(
        &self,
        source_ids: &[SourceId],
        year: u16,
    ) -> Result<FxHashSet<AuthorId>, ApiError>;

    /// Citations received by `author_id`'s research output up to and
    /// including `up_to_year`, not counting citing documents authored by
    /// anyone in `excluded_authors`.
    fn citation_count(
        &self,
        author_id: AuthorId,
        up_to_year: u16,
        excluded_authors: &[AuthorId],
    ) -> Result<u64, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(status: u16) -> ApiError {
        ApiError::Transport {
            status: Some(status),
            message: "test".into(),
        }
    }

    #[test]
    fn server_errors_retryable() {
        assert!(transport(500).is_retryable());
        assert!(transport(503).is_retryable());
    }

    #[test]
    fn rate_limit_retryable() {
        assert!(transport(429).is_retryable());
    }

    #[test]
    fn client_errors_not_retryable() {
        assert!(!transport(400).is_retryable());
        assert!(!transport(404).is_retryable());
    }

    #[test]
    fn timeout_retryable() {
        assert!(ApiError::Timeout.is_retryable());
    }

    #[test]
    fn quota_and_malformed_not_retryable() {
        assert!(!ApiError::QuotaExceeded.is_retryable());
        assert!(!ApiError::Malformed("bad json".into()).is_retryable());
    }
}
