//! Progress observation at pipeline stage boundaries
//!
//! The pipeline never prints; it reports to an observer at stage boundaries
//! and the front-end decides how to render (log lines, progress bars, or
//! nothing at all in tests).

use crate::period::YearRange;

pub trait PipelineObserver: Send + Sync {
    /// A filter stage is about to run over `pool_size` candidates.
    fn stage_started(&self, stage: &str, pool_size: usize) {
        let _ = (stage, pool_size);
    }

    /// A filter stage finished; `survivors` candidates remain.
    fn stage_finished(&self, stage: &str, survivors: usize) {
        let _ = (stage, survivors);
    }

    /// One identification chunk was scanned, yielding `authors` author IDs.
    fn chunk_scanned(&self, chunk: &YearRange, authors: usize) {
        let _ = (chunk, authors);
    }

    /// A batch of external lookups progressed (`done` of `total` groups).
    fn groups_progressed(&self, done: usize, total: usize) {
        let _ = (done, total);
    }
}

/// Observer that reports through the `log` crate.
#[derive(Debug, Default)]
pub struct LogObserver;

impl PipelineObserver for LogObserver {
    fn stage_started(&self, stage: &str, pool_size: usize) {
        log::info!("{stage}: filtering {pool_size} candidates");
    }

    fn stage_finished(&self, stage: &str, survivors: usize) {
        log::info!("{stage}: {survivors} candidates remain");
    }

    fn chunk_scanned(&self, chunk: &YearRange, authors: usize) {
        log::info!(
            "chunk {}-{}: {authors} authors active",
            chunk.start(),
            chunk.end()
        );
    }
}

/// Observer that ignores everything.
#[derive(Debug, Default)]
pub struct NullObserver;

impl PipelineObserver for NullObserver {}
