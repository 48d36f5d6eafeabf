//! `paragon find` - identify and filter similar researchers

use std::time::Duration;

use anyhow::{ensure, Context, Result};
use clap::Args;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use rustc_hash::FxHashSet;

use paragon_client::{load_source_table, HttpSearchApi};
use paragon_core::api::View;
use paragon_core::margin::Margin;
use paragon_core::observer::{LogObserver, PipelineObserver};
use paragon_core::period::chunk_periods;
use paragon_core::profile::SourceId;
use paragon_core::progress::{fmt_num, ProgressObserver, SharedProgress};
use paragon_match::{
    derive_search_sources, identify_candidates, EngineConfig, FilterConfig, FilterPipeline,
    PipelineOutcome, SelfCitationPolicy, StackedQueryEngine,
};
use paragon_store::LocalStore;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct FindArgs {
    /// Author ID of the researcher; repeat for a pre-merged identity list
    #[arg(short, long, required = true, value_delimiter = ',')]
    pub author: Vec<u64>,

    /// Comparison year; all counts are taken as of this year
    #[arg(short, long)]
    pub year: u16,

    /// Explicit search-source IDs (skips derivation from the source table)
    #[arg(long, value_delimiter = ',')]
    pub sources: Vec<u64>,

    /// Drop derived sources carrying fields the researcher never works in
    #[arg(long)]
    pub narrow: bool,

    /// Require candidates to share the researcher's primary discipline
    #[arg(long)]
    pub same_discipline: bool,

    /// First-publication-year margin ("2" absolute, "0.2" relative)
    #[arg(long, value_parser = parse_margin)]
    pub first_year_margin: Option<Margin>,

    /// Publication-count margin
    #[arg(long, value_parser = parse_margin)]
    pub pubs_margin: Option<Margin>,

    /// Co-author-count margin
    #[arg(long, value_parser = parse_margin)]
    pub coauthors_margin: Option<Margin>,

    /// Citation-count margin
    #[arg(long, value_parser = parse_margin)]
    pub citations_margin: Option<Margin>,

    /// Keep only candidates whose latest affiliation is in this list
    #[arg(long, value_delimiter = ',')]
    pub affiliations: Vec<u64>,

    /// Count candidate self-citations (the researcher's are always dropped)
    #[arg(long)]
    pub keep_self_citations: bool,

    /// Chunk length in years for the publication-regularity test
    #[arg(long)]
    pub chunk_size: Option<u16>,

    /// Years before the first publication covered by the first chunk
    #[arg(long)]
    pub lead_in: Option<u16>,

    /// Re-fetch cached lookups
    #[arg(long)]
    pub refresh: bool,

    /// Run per-author lookups in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Pack source scans into compound queries (fewer calls, but the
    /// cached records cannot be reused once the source set changes)
    #[arg(long)]
    pub stacked: bool,

    /// Correct a mis-indexed first publication year
    #[arg(long)]
    pub override_first_year: Option<u16>,

    /// Correct a mis-indexed main field code
    #[arg(long)]
    pub override_main_field: Option<u16>,
}

/// "2" is an absolute margin of 2, "0.2" a relative margin of 20%.
fn parse_margin(s: &str) -> Result<Margin, String> {
    if s.contains('.') {
        let f: f64 = s.parse().map_err(|_| format!("invalid margin: {s}"))?;
        if !(0.0..1.0).contains(&f) {
            return Err(format!("relative margin must be in [0, 1): {s}"));
        }
        Ok(Margin::Relative(f))
    } else {
        let n: u32 = s.parse().map_err(|_| format!("invalid margin: {s}"))?;
        Ok(Margin::Absolute(n))
    }
}

pub fn run(args: FindArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    ensure!(
        !config.api.base_url.is_empty(),
        "api.base_url is not configured"
    );
    let api_key = config
        .api
        .api_key
        .clone()
        .context("api.api_key is not configured (set PARAGON_API_KEY or the config file)")?;
    let api = HttpSearchApi::new(&config.api.base_url, api_key)
        .with_timeout(Duration::from_secs(config.api.timeout_secs));

    let store_dir = config.store.resolve()?;
    let store = LocalStore::open(&store_dir)?;
    store.cleanup_tmp()?;

    let engine = StackedQueryEngine::new(
        &api,
        &store,
        EngineConfig {
            max_query_len: config.search.max_query_len,
            max_retries: config.search.max_retries,
            refresh: args.refresh,
            parallel: args.parallel,
            stacked: args.stacked,
        },
    );

    let observer: Box<dyn PipelineObserver> = if progress.is_tty() {
        Box::new(ProgressObserver::new(progress.clone()))
    } else {
        Box::new(LogObserver)
    };
    let observer = observer.as_ref();

    // Resolve the researcher being matched
    let primary = args.author[0];
    let batch = engine.author_profiles(&[primary], View::Full, observer)?;
    let mut original = batch
        .profiles
        .into_iter()
        .next()
        .with_context(|| format!("could not resolve author {primary}"))?;
    if let Some(year) = args.override_first_year {
        original = original.with_first_year(year);
    }
    if let Some(field) = args.override_main_field {
        original = original.with_main_field(field);
    }
    let tag = paragon_core::discipline::discipline_tag(original.primary_discipline())
        .unwrap_or("unknown");
    progress.println(format!(
        "author {primary}: first published {}, discipline {tag}",
        original.first_year
    ));
    ensure!(
        original.first_year <= args.year,
        "author {primary} first published in {}, after the comparison year {}",
        original.first_year,
        args.year
    );

    let sources: FxHashSet<SourceId> = if args.sources.is_empty() {
        ensure!(
            !config.search.source_table_url.is_empty(),
            "search.source_table_url is not configured and no --sources given"
        );
        let table = load_source_table(&store, &config.search.source_table_url, args.refresh)?;
        derive_search_sources(&original, args.year, &table, args.narrow)
    } else {
        args.sources.iter().copied().collect()
    };
    ensure!(!sources.is_empty(), "no search sources to scan");
    progress.println(format!("scanning {} sources", fmt_num(sources.len())));

    let chunk_size = args.chunk_size.unwrap_or(config.search.chunk_size);
    let lead_in = args.lead_in.unwrap_or(chunk_size);
    let chunks = chunk_periods(original.first_year, args.year, chunk_size, lead_in)?;

    let coauthors = original.coauthors(args.year);
    let identified = identify_candidates(
        &engine,
        &sources,
        &chunks,
        &args.author,
        &coauthors,
        observer,
    )?;
    for chunk in &identified.empty_chunks {
        log::warn!(
            "no activity in the search sources during {}-{}; the pool is empty",
            chunk.start(),
            chunk.end()
        );
    }
    progress.println(format!(
        "{} candidates identified",
        fmt_num(identified.pool.len())
    ));

    let filter = FilterConfig {
        same_discipline: args.same_discipline,
        first_year_margin: args.first_year_margin,
        pub_margin: args.pubs_margin,
        coauth_margin: args.coauthors_margin,
        cits_margin: args.citations_margin,
        affiliations: if args.affiliations.is_empty() {
            None
        } else {
            Some(args.affiliations.iter().copied().collect())
        },
        self_citation: if args.keep_self_citations {
            SelfCitationPolicy::OriginalOnly
        } else {
            SelfCitationPolicy::Symmetric
        },
        ..FilterConfig::new(args.year)
    };
    let outcome = FilterPipeline::new(&engine, filter).run(&original, &identified.pool, observer)?;

    print_outcome(&outcome, identified.unresolved_sources);
    if let Some(remaining) = api.quota_remaining() {
        eprintln!("API quota remaining: {remaining}");
    }
    Ok(())
}

fn print_outcome(outcome: &PipelineOutcome, unresolved_sources: usize) {
    if outcome.matches.is_empty() {
        eprintln!("\nNo matching researchers.");
    } else {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                Cell::new("Author").fg(Color::Cyan),
                Cell::new("First year").fg(Color::Cyan),
                Cell::new("Publications").fg(Color::Cyan),
                Cell::new("Co-authors").fg(Color::Cyan),
                Cell::new("Citations").fg(Color::Cyan),
                Cell::new("Same discipline").fg(Color::Cyan),
                Cell::new("Affiliation").fg(Color::Cyan),
            ]);
        let mut matches = outcome.matches.clone();
        matches.sort_by_key(|m| m.id);
        for m in &matches {
            table.add_row(vec![
                Cell::new(m.id),
                Cell::new(m.first_year),
                Cell::new(m.publications),
                Cell::new(m.coauthors),
                Cell::new(m.citations.map_or("-".to_string(), |c| c.to_string())),
                Cell::new(if m.same_discipline { "yes" } else { "no" }),
                Cell::new(m.affiliation.map_or("-".to_string(), |a| a.to_string())),
            ]);
        }
        eprintln!("\n{table}");
    }

    let summary = &outcome.summary;
    eprintln!(
        "{} matches from a pool of {}",
        fmt_num(summary.matched),
        fmt_num(summary.pool_initial)
    );
    for stage in &summary.stages {
        eprintln!(
            "  {:<20} {:>8} -> {}",
            stage.stage,
            fmt_num(stage.entered),
            fmt_num(stage.survivors)
        );
    }
    let unresolved = summary.unresolved + unresolved_sources;
    if unresolved > 0 {
        eprintln!(
            "{} lookups stayed unresolved; the match set may be incomplete",
            fmt_num(unresolved)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn margin_parsing() {
        assert_eq!(parse_margin("2").unwrap(), Margin::Absolute(2));
        assert_eq!(parse_margin("0.2").unwrap(), Margin::Relative(0.2));
        assert!(parse_margin("1.5").is_err());
        assert!(parse_margin("abc").is_err());
    }
}
