//! Cooperative cancellation via atomic flag
//!
//! Long stacked lookups check the flag between query groups, never
//! mid-group, so a cancelled run leaves the store consistent (possibly
//! incomplete; a re-run resumes from cache).

use std::sync::atomic::{AtomicBool, Ordering};

/// Global cancellation flag — set by the SIGINT/SIGTERM handler
pub fn cancel_flag() -> &'static AtomicBool {
    static FLAG: AtomicBool = AtomicBool::new(false);
    &FLAG
}

/// Check if cancellation was requested
pub fn is_cancelled() -> bool {
    cancel_flag().load(Ordering::Relaxed)
}

/// Request cancellation (for signal handlers)
pub fn request_cancel() {
    cancel_flag().store(true, Ordering::Relaxed);
}
