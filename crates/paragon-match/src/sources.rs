//! Search-source derivation
//!
//! The search sources are the venues where a statistically similar
//! researcher could plausibly publish: every source of a type the Original
//! publishes in whose field set contains the Original's main field. Narrow
//! mode additionally drops sources carrying fields the Original has never
//! worked in. The Original's own sources always qualify.

use rustc_hash::{FxHashMap, FxHashSet};

use paragon_core::profile::{AuthorProfile, SourceId, SourceRecord, SourceType};

pub fn derive_search_sources(
    original: &AuthorProfile,
    comparison_year: u16,
    table: &FxHashMap<SourceId, SourceRecord>,
    narrow: bool,
) -> FxHashSet<SourceId> {
    let own_sources = original.source_ids(comparison_year);
    let own_types: FxHashSet<SourceType> = own_sources
        .iter()
        .filter_map(|id| table.get(id))
        .map(|s| s.source_type)
        .collect();
    let own_fields: FxHashSet<_> = original.fields.iter().copied().collect();

    let mut selected: FxHashSet<SourceId> = table
        .values()
        .filter(|s| own_types.contains(&s.source_type))
        .filter(|s| s.fields.contains(&original.main_field))
        .filter(|s| !narrow || s.fields.iter().all(|f| own_fields.contains(f)))
        .map(|s| s.id)
        .collect();

    selected.extend(own_sources);
    log::info!(
        "derived {} search sources (narrow: {narrow})",
        selected.len()
    );
    selected
}
