//! Pass report and watcher notification types.

use std::path::PathBuf;

use super::record::ShopRecord;

/// Outcome of one extraction pass.
///
/// A pass is one cycle of range determination, extraction, dedup and sink
/// write. Reports are returned from one-shot extraction and delivered as
/// [`WatchEvent::PassCompleted`] by a watch session.
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    /// Records admitted by this pass, in byte-stream order.
    pub new_records: Vec<ShopRecord>,
    /// Candidates rejected as already-seen identities.
    pub duplicates: usize,
    /// Candidate spans that failed to parse (recoverable; includes a
    /// trailing mid-write candidate, which is retried on the next pass).
    pub parse_failures: usize,
    /// Size of the byte range this pass examined.
    pub scanned_bytes: u64,
    /// Wall-clock duration of the pass in milliseconds.
    pub duration_ms: u64,
}

impl PassReport {
    /// Number of newly admitted records.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.new_records.len()
    }

    /// True when the pass had nothing to do and found nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.new_records.is_empty() && self.duplicates == 0 && self.parse_failures == 0
    }
}

/// Asynchronous notification from a watch session.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// A triggered pass ran to completion (possibly finding nothing).
    PassCompleted(PassReport),
    /// A triggered pass failed as a whole; the cursor was not advanced
    /// and the session keeps watching.
    PassFailed {
        /// Diagnostic message for the caller.
        error: String,
    },
}

/// Snapshot of a watch session's state.
#[derive(Debug, Clone)]
pub struct WatchStatus {
    /// Whether the session is still accepting triggers.
    pub active: bool,
    /// The source file being watched.
    pub watched_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report() {
        let report = PassReport::default();
        assert!(report.is_empty());
        assert_eq!(report.record_count(), 0);
    }

    #[test]
    fn test_report_with_duplicates_not_empty() {
        let report = PassReport {
            duplicates: 2,
            ..Default::default()
        };
        assert!(!report.is_empty());
    }
}
