//! Candidate identification by publication regularity
//!
//! A candidate is any author who published in the search sources at least
//! once in every year chunk of the comparison window. The pool is the
//! intersection of the per-chunk author sets, minus the Original and their
//! co-authors.

use rustc_hash::FxHashSet;

use paragon_core::observer::PipelineObserver;
use paragon_core::period::YearRange;
use paragon_core::profile::{AuthorId, SourceId};

use crate::engine::StackedQueryEngine;
use crate::error::RunError;

/// Authors active per chunk, for reporting.
#[derive(Debug)]
pub struct ChunkScan {
    pub years: YearRange,
    pub authors: usize,
}

#[derive(Debug)]
pub struct CandidatePool {
    pub pool: FxHashSet<AuthorId>,
    pub chunks: Vec<ChunkScan>,
    /// Chunks in which no author published in any search source. One of
    /// these is enough to empty the pool; they are listed so the caller can
    /// see which window was the problem.
    pub empty_chunks: Vec<YearRange>,
    pub unresolved_sources: usize,
}

/// Scan every chunk and intersect the active-author sets.
///
/// All chunks are scanned even once the intersection is empty; per-chunk
/// results are cached, so the extra scans pay for the next run and every
/// empty chunk gets reported rather than only the first.
pub fn identify_candidates(
    engine: &StackedQueryEngine<'_>,
    sources: &FxHashSet<SourceId>,
    chunks: &[YearRange],
    original_ids: &[AuthorId],
    original_coauthors: &FxHashSet<AuthorId>,
    observer: &dyn PipelineObserver,
) -> Result<CandidatePool, RunError> {
    let mut sorted_sources: Vec<SourceId> = sources.iter().copied().collect();
    sorted_sources.sort_unstable();

    let mut pool: Option<FxHashSet<AuthorId>> = None;
    let mut scans = Vec::with_capacity(chunks.len());
    let mut empty_chunks = Vec::new();
    let mut unresolved_sources = 0usize;

    for chunk in chunks {
        let mut active: FxHashSet<AuthorId> = FxHashSet::default();
        for year in chunk.clone() {
            let batch = engine.source_year_authors(&sorted_sources, year, observer)?;
            unresolved_sources += batch.unresolved_sources.len();
            active.extend(batch.authors);
        }
        observer.chunk_scanned(chunk, active.len());
        if active.is_empty() {
            log::warn!(
                "no authors active in sources during {}-{}",
                chunk.start(),
                chunk.end()
            );
            empty_chunks.push(chunk.clone());
        }
        scans.push(ChunkScan {
            years: chunk.clone(),
            authors: active.len(),
        });
        pool = Some(match pool {
            None => active,
            Some(acc) => acc.intersection(&active).copied().collect(),
        });
    }

    let mut pool = pool.unwrap_or_default();
    for id in original_ids {
        pool.remove(id);
    }
    for id in original_coauthors {
        pool.remove(id);
    }

    Ok(CandidatePool {
        pool,
        chunks: scans,
        empty_chunks,
        unresolved_sources,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use paragon_core::api::{ApiError, SearchApi, View};
    use paragon_core::observer::NullObserver;
    use paragon_core::profile::AuthorProfile;
    use paragon_store::LocalStore;

    use crate::engine::EngineConfig;

    /// Authors 20..=23 publish every year; 30 skips 2013-2014; 2 (a
    /// co-author of the Original) publishes every year.
    struct YearlyApi;

    impl SearchApi for YearlyApi {
        fn search_author(&self, _: AuthorId, _: View) -> Result<AuthorProfile, ApiError> {
            unimplemented!("not used here")
        }

        fn search_source_year(
            &self,
            _: &[SourceId],
            year: u16,
        ) -> Result<FxHashSet<AuthorId>, ApiError> {
            let mut set: FxHashSet<AuthorId> = [2, 20, 21, 22, 23].into_iter().collect();
            if !(2013..=2014).contains(&year) {
                set.insert(30);
            }
            Ok(set)
        }

        fn citation_count(&self, _: AuthorId, _: u16, _: &[AuthorId]) -> Result<u64, ApiError> {
            unimplemented!("not used here")
        }
    }

    fn chunks() -> Vec<YearRange> {
        vec![2010..=2012, 2013..=2014, 2015..=2017]
    }

    #[test]
    fn intersection_minus_original_and_coauthors() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        let engine = StackedQueryEngine::new(&YearlyApi, &store, EngineConfig::default());

        let sources: FxHashSet<SourceId> = [100, 101].into_iter().collect();
        let coauthors: FxHashSet<AuthorId> = [2, 3].into_iter().collect();
        let out = identify_candidates(
            &engine,
            &sources,
            &chunks(),
            &[1],
            &coauthors,
            &NullObserver,
        )
        .unwrap();

        let expected: FxHashSet<AuthorId> = [20, 21, 22, 23].into_iter().collect();
        assert_eq!(out.pool, expected);
        assert!(!out.pool.contains(&30), "gap in 2013-2014 must disqualify");
        assert!(out.empty_chunks.is_empty());
        assert_eq!(out.chunks.len(), 3);
    }

    /// No author at all in 2013-2014.
    struct GappyApi;

    impl SearchApi for GappyApi {
        fn search_author(&self, _: AuthorId, _: View) -> Result<AuthorProfile, ApiError> {
            unimplemented!("not used here")
        }

        fn search_source_year(
            &self,
            _: &[SourceId],
            year: u16,
        ) -> Result<FxHashSet<AuthorId>, ApiError> {
            if (2013..=2014).contains(&year) {
                Ok(FxHashSet::default())
            } else {
                Ok([20, 21].into_iter().collect())
            }
        }

        fn citation_count(&self, _: AuthorId, _: u16, _: &[AuthorId]) -> Result<u64, ApiError> {
            unimplemented!("not used here")
        }
    }

    #[test]
    fn empty_chunk_empties_the_pool_and_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        let engine = StackedQueryEngine::new(&GappyApi, &store, EngineConfig::default());

        let sources: FxHashSet<SourceId> = [100].into_iter().collect();
        let out = identify_candidates(
            &engine,
            &sources,
            &chunks(),
            &[1],
            &FxHashSet::default(),
            &NullObserver,
        )
        .unwrap();

        assert!(out.pool.is_empty());
        assert_eq!(out.empty_chunks, vec![2013..=2014]);
    }
}
