//! paragon - find statistically similar researchers
//!
//! Identifies candidate researchers publishing in the same venues over the
//! same years as a given author, then filters them by margins on first
//! publication year, publication count, co-author count and citations.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "paragon")]
#[command(about = "Find statistically similar researchers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./paragon.toml or ~/.config/paragon/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Identify and filter researchers similar to a given author
    Find(cmd::find::FindArgs),
    /// Inspect or clean the local record store
    Store(cmd::store::StoreArgs),
    /// Show current configuration
    Config,
}

fn setup_signal_handler() {
    // First signal: request cooperative cancellation (checked between
    // lookup groups). Second signal: force exit.
    // SAFETY: AtomicBool::swap and process::exit are async-signal-safe
    unsafe {
        for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
            signal_hook::low_level::register(signal, || {
                if paragon_core::cancel_flag().swap(true, Ordering::Relaxed) {
                    std::process::exit(130);
                }
            })
            .expect("Failed to register signal handler");
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_signal_handler();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(paragon_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug  — progress lines show activity
    //   non-TTY: info unless --debug          — logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    paragon_core::init_logging(quiet, cli.debug, multi);

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::Find(args) => cmd::find::run(args, &config, &progress),
        Command::Store(args) => cmd::store::run(args, &config),
        Command::Config => {
            use comfy_table::{
                modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table,
            };

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            table.add_row(vec![
                "API base URL",
                if config.api.base_url.is_empty() {
                    "not set"
                } else {
                    config.api.base_url.as_str()
                },
            ]);
            table.add_row(vec![
                "API key",
                if config.api.api_key.is_some() {
                    "configured"
                } else {
                    "not set"
                },
            ]);
            table.add_row(vec!["API timeout", &format!("{}s", config.api.timeout_secs)]);
            table.add_row(vec![
                "Store directory",
                &config.store.resolve()?.display().to_string(),
            ]);
            table.add_row(vec!["Chunk size", &config.search.chunk_size.to_string()]);
            table.add_row(vec![
                "Max query length",
                &config.search.max_query_len.to_string(),
            ]);
            table.add_row(vec!["Max retries", &config.search.max_retries.to_string()]);
            table.add_row(vec![
                "Source table URL",
                if config.search.source_table_url.is_empty() {
                    "not set"
                } else {
                    config.search.source_table_url.as_str()
                },
            ]);

            eprintln!("\n{table}");
            Ok(())
        }
    }
}
