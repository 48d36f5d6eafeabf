//! paragon-core - shared value types and infrastructure
//!
//! Leaf components of the researcher-matching pipeline: margins, year
//! chunking, author/source models, the external search API boundary, and
//! the retry/cancellation/progress plumbing the other crates build on.

pub mod api;
pub mod cancel;
pub mod discipline;
pub mod logging;
pub mod margin;
pub mod observer;
pub mod period;
pub mod profile;
pub mod progress;
pub mod retry;

// Re-exports for convenience
pub use api::{ApiError, SearchApi, View};
pub use cancel::{cancel_flag, is_cancelled, request_cancel};
pub use logging::init_logging;
pub use margin::Margin;
pub use observer::{LogObserver, NullObserver, PipelineObserver};
pub use period::{chunk_periods, chunk_years, ChunkError, YearRange};
pub use profile::{
    AffiliationId, AuthorId, AuthorProfile, DocumentType, Match, Publication, SourceId,
    SourceRecord, SourceType,
};
pub use progress::{ProgressContext, ProgressObserver, SharedProgress};
pub use retry::{backoff_duration, retry_with_backoff, DEFAULT_MAX_RETRIES};
