//! `paragon store` - inspect and clean the record store

use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};

use paragon_core::progress::fmt_num;
use paragon_store::{LocalStore, Relation};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct StoreArgs {
    #[command(subcommand)]
    pub action: StoreAction,
}

#[derive(Subcommand, Debug)]
pub enum StoreAction {
    /// Show record counts per relation
    Status,
    /// Remove cached records of one relation
    Clear {
        #[arg(value_enum)]
        relation: RelationArg,

        /// Actually delete (otherwise dry-run)
        #[arg(long)]
        confirm: bool,
    },
    /// Remove stale temporary files left by a crashed run
    Cleanup,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum RelationArg {
    Authors,
    SourceYear,
    Citations,
    SourceTable,
}

impl From<RelationArg> for Relation {
    fn from(arg: RelationArg) -> Self {
        match arg {
            RelationArg::Authors => Relation::Authors,
            RelationArg::SourceYear => Relation::SourceYear,
            RelationArg::Citations => Relation::Citations,
            RelationArg::SourceTable => Relation::SourceTable,
        }
    }
}

pub fn run(args: StoreArgs, config: &Config) -> Result<()> {
    let store = LocalStore::open(&config.store.resolve()?)?;
    match args.action {
        StoreAction::Status => status(&store),
        StoreAction::Clear { relation, confirm } => clear(&store, relation.into(), confirm),
        StoreAction::Cleanup => cleanup(&store),
    }
}

fn fmt_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

fn status(store: &LocalStore) -> Result<()> {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Relation").fg(Color::Cyan),
            Cell::new("Records").fg(Color::Cyan),
            Cell::new("Size").fg(Color::Cyan),
        ]);

    let mut total = 0usize;
    for rel in store.status()? {
        total += rel.records;
        table.add_row(vec![
            Cell::new(rel.relation),
            Cell::new(fmt_num(rel.records)),
            Cell::new(fmt_bytes(rel.bytes)),
        ]);
    }

    eprintln!("Store at {}", store.base().display());
    eprintln!("{table}");
    eprintln!("{} records total", fmt_num(total));
    Ok(())
}

fn clear(store: &LocalStore, relation: Relation, confirm: bool) -> Result<()> {
    if !confirm {
        let records = store
            .status()?
            .into_iter()
            .find(|s| s.relation == relation)
            .map_or(0, |s| s.records);
        eprintln!("Would remove {} {relation} records.", fmt_num(records));
        eprintln!("Run with --confirm to actually delete.");
        return Ok(());
    }
    let removed = store.clear(relation)?;
    eprintln!("Removed {} {relation} records.", fmt_num(removed));
    Ok(())
}

fn cleanup(store: &LocalStore) -> Result<()> {
    let removed = store.cleanup_tmp()?;
    if removed == 0 {
        eprintln!("Nothing to clean up.");
    } else {
        eprintln!("Removed {removed} stale temporary files.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_formatting() {
        assert_eq!(fmt_bytes(512), "512 B");
        assert_eq!(fmt_bytes(2048), "2.0 KiB");
        assert_eq!(fmt_bytes(5 * 1024 * 1024), "5.0 MiB");
    }
}
