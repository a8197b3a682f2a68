//! Result and status types for the import pipeline and scheduler
//!
//! These are produced fresh per invocation and returned to callers or
//! serialized into API responses; nothing here is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Overall outcome of one scan pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RunStatus {
    /// Scan ran to completion (individual objects may still have failed)
    Completed,
    /// Object store unreachable before any work happened
    Skipped { reason: String },
    /// Listing itself failed mid-scan
    Error { message: String },
}

/// Aggregated result of one `scan_and_import` pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRunResult {
    /// JSON objects seen under the source prefix
    pub scanned: usize,
    /// Net-new catalog entries created this pass
    pub imported: usize,
    /// Objects that errored and were left in place for retry
    pub failed: usize,
    /// One message per failed object, keyed by object name
    pub errors: Vec<String>,
    /// Titles of newly created entries, in processing order
    pub imported_titles: Vec<String>,
    #[serde(flatten)]
    pub status: RunStatus,
}

impl ImportRunResult {
    /// Empty completed result, counters at zero
    pub fn new() -> Self {
        Self {
            scanned: 0,
            imported: 0,
            failed: 0,
            errors: Vec::new(),
            imported_titles: Vec::new(),
            status: RunStatus::Completed,
        }
    }

    /// Whole-scan short circuit: store unavailable
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Skipped {
                reason: reason.into(),
            },
            ..Self::new()
        }
    }

    /// Whole-scan failure while listing
    pub fn errored(message: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Error {
                message: message.into(),
            },
            ..Self::new()
        }
    }
}

impl Default for ImportRunResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Storage-side import statistics (GET /import/status)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportStatus {
    /// Objects currently waiting under the source prefix
    pub generated_files: usize,
    /// Objects already relocated to the archive prefix
    pub imported_files: usize,
    /// When the pipeline last ran, if it has
    pub last_scan: Option<DateTime<Utc>>,
    /// Size of the in-memory processed-object cache
    pub processed_cache_size: usize,
}

/// Scheduler state snapshot (GET /scheduler/status)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub auto_import_enabled: bool,
    pub import_interval_minutes: u64,
    /// Names of live background tasks ("import" when the periodic
    /// loop is active)
    pub active_tasks: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_status_serializes_with_flat_status_field() {
        let ok = serde_json::to_value(ImportRunResult::new()).unwrap();
        assert_eq!(ok["status"], "completed");
        assert_eq!(ok["scanned"], 0);

        let skipped = serde_json::to_value(ImportRunResult::skipped("store down")).unwrap();
        assert_eq!(skipped["status"], "skipped");
        assert_eq!(skipped["reason"], "store down");

        let errored = serde_json::to_value(ImportRunResult::errored("listing failed")).unwrap();
        assert_eq!(errored["status"], "error");
        assert_eq!(errored["message"], "listing failed");
    }
}
