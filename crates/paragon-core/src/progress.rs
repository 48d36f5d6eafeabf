//! Progress reporting for TTY and non-TTY environments.
//!
//! TTY mode: indicatif bars per lookup batch (clear on completion).
//! Non-TTY mode: log-based output (no progress bars).

use std::io::IsTerminal;
use std::sync::{Arc, Mutex};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::observer::PipelineObserver;
use crate::period::YearRange;

/// Count-based bar for lookup batches (groups done / groups total)
fn batch_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix:<24.dim} {bar:30.green/dim} {pos:>6}/{len:6} {wide_msg:.dim}")
        .expect("invalid template")
        .progress_chars("--")
}

/// Central progress context managing multi-progress bars.
pub struct ProgressContext {
    multi: MultiProgress,
    is_tty: bool,
}

impl ProgressContext {
    /// Create new context, detecting TTY automatically.
    pub fn new() -> Self {
        let is_tty = std::io::stderr().is_terminal();
        Self {
            multi: MultiProgress::new(),
            is_tty,
        }
    }

    /// Create a bar tracking `total` lookup groups.
    ///
    /// TTY: visible count bar. Non-TTY: hidden (no-op).
    pub fn batch_bar(&self, name: &str, total: u64) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new(total));
        pb.set_style(batch_style());
        pb.set_prefix(truncate_label(name).to_string());
        pb
    }

    /// Print a line above managed progress bars (avoids interference).
    pub fn println(&self, msg: impl AsRef<str>) {
        if self.is_tty {
            let _ = self.multi.println(msg);
        } else {
            eprintln!("{}", msg.as_ref());
        }
    }

    /// Whether running in TTY mode.
    pub fn is_tty(&self) -> bool {
        self.is_tty
    }

    /// Get reference to `MultiProgress` for the log bridge.
    pub fn multi(&self) -> &MultiProgress {
        &self.multi
    }
}

impl Default for ProgressContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe wrapper for `ProgressContext`.
pub type SharedProgress = Arc<ProgressContext>;

/// Observer rendering stage boundaries onto a `ProgressContext`.
pub struct ProgressObserver {
    progress: SharedProgress,
    bar: Mutex<Option<ProgressBar>>,
}

impl ProgressObserver {
    pub fn new(progress: SharedProgress) -> Self {
        Self {
            progress,
            bar: Mutex::new(None),
        }
    }
}

impl PipelineObserver for ProgressObserver {
    fn groups_progressed(&self, done: usize, total: usize) {
        let mut guard = match self.bar.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };
        let bar = guard
            .get_or_insert_with(|| self.progress.batch_bar("lookups", total as u64));
        bar.set_length(total as u64);
        bar.set_position(done as u64);
        if done >= total {
            bar.finish_and_clear();
            *guard = None;
        }
    }

    fn stage_started(&self, stage: &str, pool_size: usize) {
        self.progress
            .println(format!("{stage}: filtering {} candidates", fmt_num(pool_size)));
    }

    fn stage_finished(&self, stage: &str, survivors: usize) {
        self.progress
            .println(format!("{stage}: {} candidates remain", fmt_num(survivors)));
    }

    fn chunk_scanned(&self, chunk: &YearRange, authors: usize) {
        self.progress.println(format!(
            "chunk {}-{}: {} authors active",
            chunk.start(),
            chunk.end(),
            fmt_num(authors)
        ));
    }
}

/// Truncate a bar label to 24 characters, on a char boundary.
fn truncate_label(name: &str) -> &str {
    match name.char_indices().nth(24) {
        Some((idx, _)) => &name[..idx],
        None => name,
    }
}

/// Format number with thousand separators.
pub fn fmt_num(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_truncate_on_char_boundaries() {
        assert_eq!(truncate_label("lookups"), "lookups");
        assert_eq!(truncate_label(&"x".repeat(40)), "x".repeat(24));
        let wide = "é".repeat(40);
        assert_eq!(truncate_label(&wide), "é".repeat(24));
    }

    #[test]
    fn fmt_num_small() {
        assert_eq!(fmt_num(0), "0");
        assert_eq!(fmt_num(12), "12");
        assert_eq!(fmt_num(123), "123");
    }

    #[test]
    fn fmt_num_thousands() {
        assert_eq!(fmt_num(1_000), "1,000");
        assert_eq!(fmt_num(12_345), "12,345");
        assert_eq!(fmt_num(1_234_567), "1,234,567");
    }
}
