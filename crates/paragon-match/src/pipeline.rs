//! Margin filtering of the candidate pool
//!
//! Stages run strictly in increasing cost order, each fetching only for the
//! candidates still in the pool: the light-profile stages (discipline,
//! publication floor, first year) share one cheap lookup per candidate, the
//! exact-count stages need full profiles, and citation counting comes last.
//! A stage whose margin is not configured is skipped entirely, without
//! fetching anything. The pool only shrinks.

use rustc_hash::{FxHashMap, FxHashSet};

use paragon_core::api::View;
use paragon_core::margin::Margin;
use paragon_core::observer::PipelineObserver;
use paragon_core::profile::{AffiliationId, AuthorId, AuthorProfile, Match};

use crate::engine::StackedQueryEngine;
use crate::error::RunError;

/// Whose citing documents are excluded from a candidate's citation count.
///
/// The reference count for the Original always excludes the Original's own
/// citing documents. `Symmetric` applies the same treatment to candidates
/// (their self-citations are dropped, and so are citations the Original
/// gave them); `OriginalOnly` drops only the Original's citations, keeping
/// candidate self-citations in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfCitationPolicy {
    Symmetric,
    OriginalOnly,
}

#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// All counts are taken as of this year.
    pub comparison_year: u16,
    /// Require the candidate's primary discipline to equal the Original's.
    pub same_discipline: bool,
    pub first_year_margin: Option<Margin>,
    pub pub_margin: Option<Margin>,
    pub coauth_margin: Option<Margin>,
    pub cits_margin: Option<Margin>,
    /// Keep only candidates whose latest affiliation is in this set.
    pub affiliations: Option<FxHashSet<AffiliationId>>,
    pub self_citation: SelfCitationPolicy,
}

impl FilterConfig {
    /// All stages off; enable the ones you need.
    pub fn new(comparison_year: u16) -> Self {
        Self {
            comparison_year,
            same_discipline: false,
            first_year_margin: None,
            pub_margin: None,
            coauth_margin: None,
            cits_margin: None,
            affiliations: None,
            self_citation: SelfCitationPolicy::Symmetric,
        }
    }
}

/// Survivor count of one executed stage.
#[derive(Debug, Clone)]
pub struct StageCount {
    pub stage: &'static str,
    pub entered: usize,
    pub survivors: usize,
}

/// What happened during a run, for completeness judgement: a high
/// `unresolved` count means the match set may be missing qualifying
/// candidates.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub pool_initial: usize,
    pub stages: Vec<StageCount>,
    pub unresolved: usize,
    pub matched: usize,
}

#[derive(Debug)]
pub struct PipelineOutcome {
    pub matches: Vec<Match>,
    pub summary: RunSummary,
}

pub struct FilterPipeline<'a> {
    engine: &'a StackedQueryEngine<'a>,
    config: FilterConfig,
}

fn apply_stage(
    name: &'static str,
    ids: &mut Vec<AuthorId>,
    stages: &mut Vec<StageCount>,
    observer: &dyn PipelineObserver,
    keep: impl Fn(AuthorId) -> bool,
) {
    observer.stage_started(name, ids.len());
    let entered = ids.len();
    ids.retain(|&id| keep(id));
    observer.stage_finished(name, ids.len());
    stages.push(StageCount {
        stage: name,
        entered,
        survivors: ids.len(),
    });
}

fn to_u32(v: u64) -> u32 {
    v.min(u64::from(u32::MAX)) as u32
}

impl<'a> FilterPipeline<'a> {
    pub fn new(engine: &'a StackedQueryEngine<'a>, config: FilterConfig) -> Self {
        Self { engine, config }
    }

    /// Filter `pool` down to the candidates statistically similar to
    /// `original` and snapshot each survivor as a [`Match`].
    pub fn run(
        &self,
        original: &AuthorProfile,
        pool: &FxHashSet<AuthorId>,
        observer: &dyn PipelineObserver,
    ) -> Result<PipelineOutcome, RunError> {
        let year = self.config.comparison_year;
        let coauthors = original.coauthors(year);

        // The Original and their co-authors never qualify, whatever the
        // caller put in the pool.
        let mut ids: Vec<AuthorId> = pool
            .iter()
            .copied()
            .filter(|&id| id != original.id && !coauthors.contains(&id))
            .collect();
        ids.sort_unstable();

        let mut summary = RunSummary {
            pool_initial: ids.len(),
            ..RunSummary::default()
        };

        let ref_discipline = original.primary_discipline();
        let ref_pubs = original.publication_count(year);
        let ref_first = u32::from(original.first_year);
        let ref_coauthors = coauthors.len() as u32;

        // Stages 1-3 share one light lookup per candidate.
        let light_active = self.config.same_discipline
            || self.config.pub_margin.is_some()
            || self.config.first_year_margin.is_some();
        let mut light: FxHashMap<AuthorId, AuthorProfile> = FxHashMap::default();
        if light_active && !ids.is_empty() {
            let batch = self.engine.author_profiles(&ids, View::Light, observer)?;
            summary.unresolved += batch.unresolved.len();
            light = batch.profiles.into_iter().map(|p| (p.id, p)).collect();
            ids.retain(|id| light.contains_key(id));
        }

        if self.config.same_discipline {
            apply_stage("discipline", &mut ids, &mut summary.stages, observer, |id| {
                light[&id].primary_discipline() == ref_discipline
            });
        }

        if let Some(margin) = self.config.pub_margin {
            // The indexed document count over-counts (all types, all years),
            // so only the low bound is safe to enforce here; the exact test
            // runs on full profiles below.
            let (low, _) = margin.range(ref_pubs);
            apply_stage(
                "publication floor",
                &mut ids,
                &mut summary.stages,
                observer,
                |id| light[&id].indexed_documents >= low,
            );
        }

        if let Some(margin) = self.config.first_year_margin {
            apply_stage("first year", &mut ids, &mut summary.stages, observer, |id| {
                margin.contains(ref_first, u32::from(light[&id].first_year))
            });
        }
        drop(light);

        // Stages 4, 5 and 7 need full publication lists.
        let full_active = self.config.pub_margin.is_some()
            || self.config.coauth_margin.is_some()
            || self.config.affiliations.is_some();
        let mut full: FxHashMap<AuthorId, AuthorProfile> = FxHashMap::default();
        if full_active && !ids.is_empty() {
            let batch = self.engine.author_profiles(&ids, View::Full, observer)?;
            summary.unresolved += batch.unresolved.len();
            full = batch.profiles.into_iter().map(|p| (p.id, p)).collect();
            ids.retain(|id| full.contains_key(id));
        }

        if let Some(margin) = self.config.pub_margin {
            apply_stage(
                "publication count",
                &mut ids,
                &mut summary.stages,
                observer,
                |id| margin.contains(ref_pubs, full[&id].publication_count(year)),
            );
        }

        if let Some(margin) = self.config.coauth_margin {
            apply_stage(
                "co-author count",
                &mut ids,
                &mut summary.stages,
                observer,
                |id| margin.contains(ref_coauthors, full[&id].coauthors(year).len() as u32),
            );
        }

        let mut citations: FxHashMap<AuthorId, u64> = FxHashMap::default();
        if let Some(margin) = self.config.cits_margin {
            if !ids.is_empty() {
                citations = self.citation_stage(original, margin, &mut ids, &mut summary, observer)?;
            }
        }

        if let Some(whitelist) = &self.config.affiliations {
            apply_stage("affiliation", &mut ids, &mut summary.stages, observer, |id| {
                full[&id]
                    .latest_affiliation(year)
                    .is_some_and(|a| whitelist.contains(&a))
            });
        }

        // Matches snapshot their comparison fields from full profiles; when
        // no full-profile stage ran, fetch them for the survivors now.
        if !full_active && !ids.is_empty() {
            let batch = self.engine.author_profiles(&ids, View::Full, observer)?;
            summary.unresolved += batch.unresolved.len();
            full = batch.profiles.into_iter().map(|p| (p.id, p)).collect();
            ids.retain(|id| full.contains_key(id));
        }

        let matches: Vec<Match> = ids
            .iter()
            .map(|&id| {
                let p = &full[&id];
                Match {
                    id,
                    first_year: p.first_year,
                    publications: p.publication_count(year),
                    coauthors: p.coauthors(year).len() as u32,
                    citations: citations.get(&id).copied(),
                    same_discipline: p.primary_discipline() == ref_discipline,
                    affiliation: p.latest_affiliation(year),
                }
            })
            .collect();

        summary.matched = matches.len();
        Ok(PipelineOutcome { matches, summary })
    }

    fn citation_stage(
        &self,
        original: &AuthorProfile,
        margin: Margin,
        ids: &mut Vec<AuthorId>,
        summary: &mut RunSummary,
        observer: &dyn PipelineObserver,
    ) -> Result<FxHashMap<AuthorId, u64>, RunError> {
        let year = self.config.comparison_year;
        let original_id = original.id;

        let ref_batch =
            self.engine
                .citation_counts(&[original_id], year, |id| vec![id], observer)?;
        let reference = match ref_batch.counts.get(&original_id) {
            Some(&c) => c,
            None => {
                log::warn!("citation count for the reference researcher unresolved; stage skipped");
                summary.unresolved += 1;
                return Ok(FxHashMap::default());
            }
        };

        let policy = self.config.self_citation;
        let batch = self.engine.citation_counts(
            ids,
            year,
            |candidate| match policy {
                SelfCitationPolicy::Symmetric => vec![candidate, original_id],
                SelfCitationPolicy::OriginalOnly => vec![original_id],
            },
            observer,
        )?;
        summary.unresolved += batch.unresolved.len();

        let counts = batch.counts;
        apply_stage("citations", ids, &mut summary.stages, observer, |id| {
            counts
                .get(&id)
                .is_some_and(|&c| margin.contains(to_u32(reference), to_u32(c)))
        });
        Ok(counts)
    }
}
