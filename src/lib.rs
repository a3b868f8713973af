//! # Shopwatch
//!
//! Incremental extractor for captured shop listings.
//!
//! Shopwatch consumes a text file that an external capture tool appends
//! HTTP responses to, recovers the JSON shop documents embedded in it,
//! and maintains a deduplicated CSV of shop records (name, phone,
//! address). Extraction is incremental: a scan cursor tracks how much of
//! the source file has been processed, so repeated passes only parse new
//! bytes, and a file watcher can drive passes automatically as the
//! producer appends.
//!
//! ## Pipeline
//!
//! ```text
//! source file ──▶ ScanController ──▶ RecordExtractor ──▶ DedupStore ──▶ CsvSink
//!      ▲              (cursor)        (brace matching)    (seen set)     (rows)
//!      │
//! external producer (uncoordinated appends)
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use shopwatch::services::run_extraction;
//! use shopwatch::io::WriteMode;
//!
//! let report = run_extraction("captures.txt", "shops.csv", WriteMode::Append)?;
//! println!("{} new records", report.record_count());
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
// multiple_crate_versions is inherently crate-level (detects duplicate transitive dependencies).
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod extractor;
pub mod io;
pub mod models;
pub mod observability;
pub mod rendering;
pub mod services;
pub mod watch;

// Re-exports for convenience
pub use config::ShopwatchConfig;
pub use extractor::{Extraction, RecordExtractor};
pub use io::{CsvSink, WriteMode};
pub use models::{PassReport, RecordKey, ShopRecord, WatchEvent, WatchStatus};
pub use services::{DedupStore, ExtractionPipeline, ScanController, run_extraction};
pub use watch::{WatchOptions, WatchSession};

/// Error type for shopwatch operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Missing required parameters, malformed CSV seed rows, bad config values |
/// | `OperationFailed` | Source file unreadable, sink unwritable, watcher registration fails |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - A required path argument is empty
    /// - The output CSV exists but has no usable header row
    /// - A config file value fails validation
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - The source file cannot be read at the start of a pass
    /// - The output sink cannot be written
    /// - Cursor state cannot be persisted
    /// - The platform file watcher cannot be registered
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Builds an `OperationFailed` from an operation name and cause.
    ///
    /// Most failure paths in this crate wrap an underlying I/O or parse
    /// error; this keeps the mapping one line at the call site.
    pub fn operation(operation: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for shopwatch operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("test error".to_string());
        assert_eq!(err.to_string(), "invalid input: test error");

        let err = Error::OperationFailed {
            operation: "read_source".to_string(),
            cause: "permission denied".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "operation 'read_source' failed: permission denied"
        );
    }

    #[test]
    fn test_error_operation_helper() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Error::operation("read_source", io);
        assert!(err.to_string().contains("read_source"));
        assert!(err.to_string().contains("gone"));
    }
}
