//! Media pipeline metrics.
//!
//! Recorded through the `metrics` facade; the library installs no exporter.

use metrics::{counter, histogram};

// =============================================================================
// Metric Names
// =============================================================================

/// Metric name constants for consistency.
pub mod names {
    /// Exports by status (`success` / `failure`).
    pub const EXPORTS_TOTAL: &str = "reelcraft_exports_total";

    /// Wall-clock encode time in seconds.
    pub const EXPORT_DURATION_SECONDS: &str = "reelcraft_export_duration_seconds";

    /// Remote stream selections by path (`progressive` / `adaptive`).
    pub const STREAM_SELECTIONS_TOTAL: &str = "reelcraft_stream_selections_total";

    /// Remote variant downloads by status.
    pub const DOWNLOADS_TOTAL: &str = "reelcraft_downloads_total";
}

// =============================================================================
// Recording Functions
// =============================================================================

/// Record a finished export attempt.
pub fn record_export(success: bool, elapsed_secs: f64) {
    let status = if success { "success" } else { "failure" };

    counter!(names::EXPORTS_TOTAL, "status" => status).increment(1);
    histogram!(names::EXPORT_DURATION_SECONDS, "status" => status).record(elapsed_secs);
}

/// Record which selection path a remote source took.
pub fn record_stream_selection(path: &'static str) {
    counter!(names::STREAM_SELECTIONS_TOTAL, "path" => path).increment(1);
}

/// Record a variant download.
pub fn record_download(success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(names::DOWNLOADS_TOTAL, "status" => status).increment(1);
}
