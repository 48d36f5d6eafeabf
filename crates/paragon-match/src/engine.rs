//! Batched, cached access to the external search API
//!
//! The upstream search grammar caps the serialized query length, so stacked
//! lookups pack ID universes into the fewest groups that stay under the
//! limit and each group becomes one boolean-OR compound call. Per-entity
//! lookups (profiles, citation counts, and source scans by default) run one
//! call per entity instead, because each entity is its own cache record and
//! stays reusable by differently parameterized runs.
//!
//! Every result goes through the store before it is returned, so a crashed
//! or cancelled run never re-spends quota on what it already fetched.

use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use paragon_core::api::{ApiError, SearchApi, View};
use paragon_core::cancel::is_cancelled;
use paragon_core::observer::PipelineObserver;
use paragon_core::profile::{AuthorId, AuthorProfile, SourceId};
use paragon_core::retry::{retry_with_backoff, DEFAULT_MAX_RETRIES};
use paragon_store::{make_signature, LocalStore, Relation};

use crate::error::RunError;

/// Upstream cap on the serialized length of one search query.
pub const QUERY_MAX_LEN: usize = 2000;

/// Serialized length of one `SOURCE-ID(n)` term.
fn term_len(id: SourceId) -> usize {
    let digits = if id == 0 { 1 } else { id.ilog10() as usize + 1 };
    "SOURCE-ID()".len() + digits
}

const JOIN_LEN: usize = " OR ".len();

/// Greedily pack sorted IDs into groups whose compound query stays under
/// `max_len`. A single oversized term still forms a group of its own.
pub fn pack_groups(ids: &[SourceId], max_len: usize) -> Vec<Vec<SourceId>> {
    let mut groups = Vec::new();
    let mut current: Vec<SourceId> = Vec::new();
    let mut current_len = 0usize;
    for &id in ids {
        let added = if current.is_empty() {
            term_len(id)
        } else {
            JOIN_LEN + term_len(id)
        };
        if !current.is_empty() && current_len + added > max_len {
            groups.push(std::mem::take(&mut current));
            current_len = term_len(id);
        } else {
            current_len += added;
        }
        current.push(id);
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_query_len: usize,
    pub max_retries: u32,
    /// Bypass cached records and overwrite them with fresh fetches.
    pub refresh: bool,
    /// Run per-entity lookups on the rayon pool.
    pub parallel: bool,
    /// Pack source scans into compound queries instead of caching each
    /// source on its own. Fewer calls, but the records are keyed by the
    /// whole group and cannot be reused once the source set changes.
    pub stacked: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_query_len: QUERY_MAX_LEN,
            max_retries: DEFAULT_MAX_RETRIES,
            refresh: false,
            parallel: false,
            stacked: false,
        }
    }
}

/// Author IDs active in a source set during one year, plus the sources whose
/// group could not be resolved.
#[derive(Debug, Default)]
pub struct SourceYearBatch {
    pub authors: FxHashSet<AuthorId>,
    pub unresolved_sources: Vec<SourceId>,
}

/// Fetched profiles plus the authors that stayed unresolved.
#[derive(Debug, Default)]
pub struct ProfileBatch {
    pub profiles: Vec<AuthorProfile>,
    pub unresolved: Vec<AuthorId>,
}

/// Citation counts plus the authors that stayed unresolved.
#[derive(Debug, Default)]
pub struct CitationBatch {
    pub counts: FxHashMap<AuthorId, u64>,
    pub unresolved: Vec<AuthorId>,
}

#[derive(Serialize)]
struct SourceYearParams<'a> {
    sources: &'a [SourceId],
    year: u16,
}

#[derive(Serialize)]
struct AuthorParams {
    author: AuthorId,
    view: &'static str,
}

#[derive(Serialize)]
struct CitationParams<'a> {
    author: AuthorId,
    up_to: u16,
    excluded: &'a [AuthorId],
}

pub struct StackedQueryEngine<'a> {
    api: &'a dyn SearchApi,
    store: &'a LocalStore,
    config: EngineConfig,
}

impl<'a> StackedQueryEngine<'a> {
    pub fn new(api: &'a dyn SearchApi, store: &'a LocalStore, config: EngineConfig) -> Self {
        Self { api, store, config }
    }

    pub fn store(&self) -> &LocalStore {
        self.store
    }

    /// Resolve one cache record, retrying transient failures.
    ///
    /// `Ok(None)` means the lookup stayed unresolved (retries exhausted or
    /// the response was malformed); the batch continues without it. Quota
    /// exhaustion and storage failures abort the run.
    fn resolve<T>(
        &self,
        relation: Relation,
        params: &impl Serialize,
        label: &str,
        mut call: impl FnMut() -> Result<T, ApiError>,
    ) -> Result<Option<T>, RunError>
    where
        T: Serialize + serde::de::DeserializeOwned,
    {
        let sig = make_signature(relation, params);
        let fetched = self.store.get_or_fetch(&sig, self.config.refresh, || {
            retry_with_backoff(label, self.config.max_retries, &mut call)
        });
        match fetched {
            Ok(v) => Ok(Some(v)),
            Err(paragon_store::FetchError::Store(e)) => Err(RunError::Storage(e)),
            Err(paragon_store::FetchError::Fetch(ApiError::QuotaExceeded)) => Err(RunError::Quota),
            Err(paragon_store::FetchError::Fetch(ApiError::Malformed(msg))) => {
                log::warn!("{label}: malformed response, skipping: {msg}");
                Ok(None)
            }
            Err(paragon_store::FetchError::Fetch(e)) => {
                log::warn!("{label}: unresolved after retries: {e}");
                Ok(None)
            }
        }
    }

    /// All authors publishing in any of `sources` during `year`.
    ///
    /// Per-source mode (the default): one cached call per source, so a run
    /// over a different source set still reuses every record fetched so
    /// far and only queries the additions. Stacked mode packs the sorted
    /// source list into compound-query groups keyed as a whole, spending
    /// fewer calls at the cost of that reuse. Either way, an exhausted
    /// lookup marks its sources unresolved and the rest still run.
    pub fn source_year_authors(
        &self,
        sources: &[SourceId],
        year: u16,
        observer: &dyn PipelineObserver,
    ) -> Result<SourceYearBatch, RunError> {
        debug_assert!(sources.windows(2).all(|w| w[0] < w[1]), "sources must be sorted");
        if self.config.stacked {
            self.source_year_stacked(sources, year, observer)
        } else {
            self.source_year_per_source(sources, year, observer)
        }
    }

    fn source_year_per_source(
        &self,
        sources: &[SourceId],
        year: u16,
        observer: &dyn PipelineObserver,
    ) -> Result<SourceYearBatch, RunError> {
        let total = sources.len();
        let mut batch = SourceYearBatch::default();

        for (done, &source) in sources.iter().enumerate() {
            if is_cancelled() {
                return Err(RunError::Cancelled);
            }
            let group = [source];
            let params = SourceYearParams {
                sources: &group,
                year,
            };
            let label = format!("source {source} in {year}");
            let authors: Option<FxHashSet<AuthorId>> =
                self.resolve(Relation::SourceYear, &params, &label, || {
                    self.api.search_source_year(&group, year)
                })?;
            match authors {
                Some(set) => batch.authors.extend(set),
                None => batch.unresolved_sources.push(source),
            }
            observer.groups_progressed(done + 1, total);
        }
        Ok(batch)
    }

    fn source_year_stacked(
        &self,
        sources: &[SourceId],
        year: u16,
        observer: &dyn PipelineObserver,
    ) -> Result<SourceYearBatch, RunError> {
        let groups = pack_groups(sources, self.config.max_query_len);
        let total = groups.len();
        let mut batch = SourceYearBatch::default();

        for (done, group) in groups.iter().enumerate() {
            if is_cancelled() {
                return Err(RunError::Cancelled);
            }
            let params = SourceYearParams {
                sources: group,
                year,
            };
            let label = format!("source-year {year} [{} sources]", group.len());
            let authors: Option<FxHashSet<AuthorId>> =
                self.resolve(Relation::SourceYear, &params, &label, || {
                    self.api.search_source_year(group, year)
                })?;
            match authors {
                Some(set) => batch.authors.extend(set),
                None => batch.unresolved_sources.extend_from_slice(group),
            }
            observer.groups_progressed(done + 1, total);
        }
        Ok(batch)
    }

    /// Fetch author profiles, one cached call per author.
    pub fn author_profiles(
        &self,
        ids: &[AuthorId],
        view: View,
        observer: &dyn PipelineObserver,
    ) -> Result<ProfileBatch, RunError> {
        let resolved = self.per_entity(ids, observer, |id| {
            let params = AuthorParams {
                author: id,
                view: view.as_str(),
            };
            let label = format!("author {id} ({})", view.as_str());
            self.resolve(Relation::Authors, &params, &label, || {
                self.api.search_author(id, view)
            })
        })?;

        let mut batch = ProfileBatch::default();
        for (id, profile) in resolved {
            match profile {
                Some(p) => batch.profiles.push(p),
                None => batch.unresolved.push(id),
            }
        }
        Ok(batch)
    }

    /// Citation counts up to `up_to`, one cached call per author. The
    /// per-author exclusion list comes from `excluded_for` and is part of
    /// the cache key.
    pub fn citation_counts(
        &self,
        ids: &[AuthorId],
        up_to: u16,
        excluded_for: impl Fn(AuthorId) -> Vec<AuthorId> + Sync,
        observer: &dyn PipelineObserver,
    ) -> Result<CitationBatch, RunError> {
        let resolved = self.per_entity(ids, observer, |id| {
            let mut excluded = excluded_for(id);
            excluded.sort_unstable();
            excluded.dedup();
            let params = CitationParams {
                author: id,
                up_to,
                excluded: &excluded,
            };
            let label = format!("citations for {id} up to {up_to}");
            self.resolve(Relation::Citations, &params, &label, || {
                self.api.citation_count(id, up_to, &excluded)
            })
        })?;

        let mut batch = CitationBatch::default();
        for (id, count) in resolved {
            match count {
                Some(c) => {
                    batch.counts.insert(id, c);
                }
                None => batch.unresolved.push(id),
            }
        }
        Ok(batch)
    }

    /// Run `op` once per ID, sequentially or on the rayon pool. Each entity
    /// is its own group, so cancellation is checked before every call.
    fn per_entity<T, F>(
        &self,
        ids: &[AuthorId],
        observer: &dyn PipelineObserver,
        op: F,
    ) -> Result<Vec<(AuthorId, Option<T>)>, RunError>
    where
        T: Send,
        F: Fn(AuthorId) -> Result<Option<T>, RunError> + Sync,
    {
        let total = ids.len();
        let done = AtomicUsize::new(0);
        let run = |&id: &AuthorId| -> Result<(AuthorId, Option<T>), RunError> {
            if is_cancelled() {
                return Err(RunError::Cancelled);
            }
            let out = op(id)?;
            observer.groups_progressed(done.fetch_add(1, Ordering::Relaxed) + 1, total);
            Ok((id, out))
        };
        if self.config.parallel {
            ids.par_iter().map(run).collect()
        } else {
            ids.iter().map(run).collect()
        }
    }
}
