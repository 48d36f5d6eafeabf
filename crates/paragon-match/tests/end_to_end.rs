//! Full identification-plus-filtering run against an in-memory API.
//!
//! A researcher first publishing in 2012 is compared as of 2017. The window
//! is chunked into 2010-2012 (lead-in), 2013-2014, and 2015-2017; the pool
//! is the intersection of active authors across those chunks, and the
//! margin pipeline narrows it to the single statistically similar author.

use std::sync::Mutex;

use rustc_hash::{FxHashMap, FxHashSet};

use paragon_core::api::{ApiError, SearchApi, View};
use paragon_core::margin::Margin;
use paragon_core::observer::NullObserver;
use paragon_core::period::chunk_periods;
use paragon_core::profile::{AuthorId, AuthorProfile, DocumentType, Publication, SourceId};
use paragon_match::{
    identify_candidates, EngineConfig, FilterConfig, FilterPipeline, StackedQueryEngine,
};
use paragon_store::LocalStore;

struct FakeApi {
    profiles: FxHashMap<AuthorId, AuthorProfile>,
    citations: FxHashMap<AuthorId, u64>,
    calls: Mutex<u32>,
}

impl SearchApi for FakeApi {
    fn search_author(&self, id: AuthorId, view: View) -> Result<AuthorProfile, ApiError> {
        *self.calls.lock().unwrap() += 1;
        let p = self
            .profiles
            .get(&id)
            .ok_or_else(|| ApiError::Malformed(format!("unknown author {id}")))?;
        Ok(match view {
            View::Full => p.clone(),
            View::Light => AuthorProfile {
                publications: Vec::new(),
                ..p.clone()
            },
        })
    }

    fn search_source_year(
        &self,
        _source_ids: &[SourceId],
        year: u16,
    ) -> Result<FxHashSet<AuthorId>, ApiError> {
        *self.calls.lock().unwrap() += 1;
        // 2 is a co-author of the Original; 30 has a gap in 2013-2014
        let mut active: FxHashSet<AuthorId> = [2, 20, 21, 22, 23, 24].into_iter().collect();
        if !(2013..=2014).contains(&year) {
            active.insert(30);
        }
        Ok(active)
    }

    fn citation_count(&self, id: AuthorId, _: u16, _: &[AuthorId]) -> Result<u64, ApiError> {
        *self.calls.lock().unwrap() += 1;
        Ok(*self.citations.get(&id).unwrap_or(&0))
    }
}

fn pubs(author: AuthorId, first_year: u16, n: u32, coauthor_seed: AuthorId) -> Vec<Publication> {
    (0..n)
        .map(|i| Publication {
            id: author * 1000 + u64::from(i),
            year: first_year + i as u16,
            source_id: 100,
            doc_type: DocumentType::Article,
            language: None,
            author_ids: vec![author, coauthor_seed + u64::from(i % 2)],
            affiliation_ids: vec![900],
            cited_refs: vec![],
        })
        .collect()
}

fn candidate(id: AuthorId, first_year: u16, main_field: u16, n_pubs: u32) -> AuthorProfile {
    AuthorProfile {
        id,
        first_year,
        main_field,
        fields: vec![main_field],
        indexed_documents: n_pubs,
        publications: pubs(id, first_year, n_pubs, id * 100),
    }
}

fn fake_api(original: &AuthorProfile) -> FakeApi {
    let profiles = vec![
        original.clone(),
        candidate(20, 2011, 2005, 5),  // the intended match
        candidate(21, 2008, 2002, 5),  // started too early
        candidate(22, 2012, 2002, 2),  // publishes too little
        candidate(23, 2012, 2002, 5),  // cited far too often
        candidate(24, 2012, 1701, 5),  // wrong discipline
        candidate(30, 2011, 2002, 5),  // gap in 2013-2014
    ];
    FakeApi {
        profiles: profiles.into_iter().map(|p| (p.id, p)).collect(),
        citations: [(1u64, 10u64), (20, 9), (23, 50)].into_iter().collect(),
        calls: Mutex::new(0),
    }
}

fn original() -> AuthorProfile {
    AuthorProfile {
        id: 1,
        first_year: 2012,
        main_field: 2002,
        fields: vec![2002, 2003],
        indexed_documents: 5,
        // co-authors 2 and 3
        publications: (0..5)
            .map(|i| Publication {
                id: 1000 + i,
                year: 2012 + i as u16,
                source_id: 100,
                doc_type: DocumentType::Article,
                language: None,
                author_ids: vec![1, 2 + i % 2],
                affiliation_ids: vec![900],
                cited_refs: vec![],
            })
            .collect(),
    }
}

fn config() -> FilterConfig {
    FilterConfig {
        same_discipline: true,
        first_year_margin: Some(Margin::Absolute(1)),
        pub_margin: Some(Margin::Relative(0.2)),
        coauth_margin: Some(Margin::Relative(0.2)),
        cits_margin: Some(Margin::Relative(0.15)),
        ..FilterConfig::new(2017)
    }
}

#[test]
fn identifies_and_filters_to_the_similar_author() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::open(dir.path()).unwrap();
    let original = original();
    let api = fake_api(&original);
    let engine = StackedQueryEngine::new(&api, &store, EngineConfig::default());

    let chunks = chunk_periods(2012, 2017, 2, 2).unwrap();
    assert_eq!(chunks, vec![2010..=2012, 2013..=2014, 2015..=2017]);

    let sources: FxHashSet<SourceId> = [100, 101].into_iter().collect();
    let coauthors = original.coauthors(2017);
    assert_eq!(coauthors.len(), 2);

    let identified = identify_candidates(
        &engine,
        &sources,
        &chunks,
        &[original.id],
        &coauthors,
        &NullObserver,
    )
    .unwrap();
    let expected_pool: FxHashSet<AuthorId> = [20, 21, 22, 23, 24].into_iter().collect();
    assert_eq!(identified.pool, expected_pool);
    assert!(identified.empty_chunks.is_empty());
    assert_eq!(identified.unresolved_sources, 0);

    let pipeline = FilterPipeline::new(&engine, config());
    let outcome = pipeline.run(&original, &identified.pool, &NullObserver).unwrap();

    assert_eq!(outcome.matches.len(), 1);
    let m = &outcome.matches[0];
    assert_eq!(m.id, 20);
    assert_eq!(m.first_year, 2011);
    assert_eq!(m.publications, 5);
    assert_eq!(m.coauthors, 2);
    assert_eq!(m.citations, Some(9));
    assert!(m.same_discipline);
    assert_eq!(m.affiliation, Some(900));

    assert_eq!(outcome.summary.pool_initial, 5);
    assert_eq!(outcome.summary.unresolved, 0);
    for pair in outcome.summary.stages.windows(2) {
        assert!(pair[1].entered <= pair[0].survivors);
    }
}

#[test]
fn second_run_is_served_entirely_from_cache() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::open(dir.path()).unwrap();
    let original = original();
    let api = fake_api(&original);
    let engine = StackedQueryEngine::new(&api, &store, EngineConfig::default());

    let chunks = chunk_periods(2012, 2017, 2, 2).unwrap();
    let sources: FxHashSet<SourceId> = [100, 101].into_iter().collect();
    let coauthors = original.coauthors(2017);

    let run = || {
        let identified = identify_candidates(
            &engine,
            &sources,
            &chunks,
            &[original.id],
            &coauthors,
            &NullObserver,
        )
        .unwrap();
        FilterPipeline::new(&engine, config())
            .run(&original, &identified.pool, &NullObserver)
            .unwrap()
    };

    let first = run();
    let calls_after_first = *api.calls.lock().unwrap();
    assert!(calls_after_first > 0);

    let second = run();
    assert_eq!(*api.calls.lock().unwrap(), calls_after_first);
    assert_eq!(
        first.matches.iter().map(|m| m.id).collect::<Vec<_>>(),
        second.matches.iter().map(|m| m.id).collect::<Vec<_>>()
    );
}
