//! paragon-match - candidate identification and margin filtering
//!
//! Turns the narrow external search API into set-intersection candidate
//! discovery across year chunks, then narrows the pool through margin
//! filters in increasing cost order. Every externally fetched fact is
//! persisted through `paragon-store` before it is used.

pub mod candidates;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod sources;

pub use candidates::{identify_candidates, CandidatePool, ChunkScan};
pub use engine::{
    pack_groups, CitationBatch, EngineConfig, ProfileBatch, SourceYearBatch, StackedQueryEngine,
    QUERY_MAX_LEN,
};
pub use error::RunError;
pub use pipeline::{
    FilterConfig, FilterPipeline, PipelineOutcome, RunSummary, SelfCitationPolicy, StageCount,
};
pub use sources::derive_search_sources;
