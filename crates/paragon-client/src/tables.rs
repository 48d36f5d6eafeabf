//! Static source reference table
//!
//! One JSON download of the full source list (ID, title, type, field codes),
//! cached in the store like any other lookup. The table changes a few times
//! a year, so `refresh` is the only invalidation.

use anyhow::Context;
use rustc_hash::FxHashMap;
use serde::Serialize;

use paragon_core::api::ApiError;
use paragon_core::profile::{SourceId, SourceRecord};
use paragon_store::{make_signature, LocalStore, Relation};

use crate::http::{block_on, http_client};

#[derive(Serialize)]
struct TableParams<'a> {
    url: &'a str,
}

fn fetch_table(url: &str) -> Result<Vec<SourceRecord>, ApiError> {
    log::info!("downloading source table");
    let records: Vec<SourceRecord> = block_on(async {
        let response = http_client()
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ApiError::Transport {
                status: e.status().map(|s| s.as_u16()),
                message: e.without_url().to_string(),
            })?;
        response
            .json()
            .await
            .map_err(|e| ApiError::Malformed(e.without_url().to_string()))
    })?;
    log::info!("source table: {} records", records.len());
    Ok(records)
}

/// Load the source table, downloading it on first use.
pub fn load_source_table(
    store: &LocalStore,
    url: &str,
    refresh: bool,
) -> anyhow::Result<FxHashMap<SourceId, SourceRecord>> {
    let sig = make_signature(Relation::SourceTable, &TableParams { url });
    let records: Vec<SourceRecord> = store
        .get_or_fetch(&sig, refresh, || fetch_table(url))
        .context("loading the source reference table")?;
    Ok(records.into_iter().map(|r| (r.id, r)).collect())
}
