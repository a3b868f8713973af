//! Record extraction from raw captured content.
//!
//! The source file is an uncontrolled concatenation of chunks appended by
//! an external capture tool. Each chunk is either a full HTTP-response
//! dump (headers followed by a JSON body) or a bare JSON body, and a read
//! may land in the middle of a write. Extraction therefore recovers JSON
//! documents by brace matching rather than line splitting:
//!
//! 1. [`CandidateScanner`] walks the bytes and yields balanced
//!    `{...}` spans, ignoring any non-JSON prefix text.
//! 2. Each span is parsed with `serde_json`; spans that do not parse are
//!    counted as recoverable failures and skipped.
//! 3. `fields` maps the fixed capture schema onto [`ShopRecord`]s.
//!
//! Extraction is a pure function of the input bytes; it never touches
//! the filesystem.

mod fields;
mod scanner;

pub use scanner::{Candidate, CandidateScanner};

use crate::models::ShopRecord;

/// Result of extracting one byte range.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Candidate records in byte-stream order, before deduplication.
    pub records: Vec<ShopRecord>,
    /// Spans that looked like JSON but did not parse, plus a trailing
    /// unterminated candidate if the range ended mid-write.
    pub parse_failures: usize,
    /// Absolute offset the next pass should resume from. Equal to the
    /// end of the range unless the range ended inside an unterminated
    /// candidate, in which case it points at that candidate's opening
    /// brace so the span is re-read once more bytes arrive.
    pub resume_offset: u64,
}

/// Parses raw captured bytes into shop record candidates.
///
/// Stateless; one instance can serve any number of passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordExtractor;

impl RecordExtractor {
    /// Creates an extractor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Extracts records from `bytes`, which start at absolute file
    /// offset `base_offset`.
    ///
    /// Candidates are yielded in the order their documents appear in the
    /// byte stream. Malformed spans are skipped and logged, never fatal.
    #[must_use]
    pub fn extract(&self, bytes: &[u8], base_offset: u64) -> Extraction {
        let mut scanner = CandidateScanner::new(bytes);
        let mut records = Vec::new();
        let mut parse_failures = 0usize;

        while let Some(candidate) = scanner.next_candidate() {
            match serde_json::from_slice::<serde_json::Value>(candidate.bytes) {
                Ok(document) => match fields::map_document(&document) {
                    fields::Mapped::Record(record) => {
                        tracing::debug!(
                            name = %record.name,
                            offset = base_offset + candidate.start as u64,
                            "candidate mapped"
                        );
                        records.push(record);
                    },
                    fields::Mapped::MissingName => {
                        // No name means no identity; the candidate is
                        // dropped rather than counted as a failure.
                        tracing::debug!(
                            offset = base_offset + candidate.start as u64,
                            "candidate dropped: missing name"
                        );
                    },
                    fields::Mapped::NotShopDocument => {
                        parse_failures += 1;
                        tracing::warn!(
                            offset = base_offset + candidate.start as u64,
                            "candidate skipped: no shop payload"
                        );
                    },
                },
                Err(e) => {
                    parse_failures += 1;
                    tracing::warn!(
                        offset = base_offset + candidate.start as u64,
                        len = candidate.bytes.len(),
                        error = %e,
                        "candidate skipped: malformed JSON"
                    );
                },
            }
        }

        if scanner.ended_mid_candidate() {
            // A mid-write read: the producer has not finished this chunk.
            parse_failures += 1;
            tracing::warn!(
                offset = base_offset + scanner.resume_offset() as u64,
                "trailing candidate unterminated; will retry once more bytes arrive"
            );
        }

        Extraction {
            records,
            parse_failures,
            resume_offset: base_offset + scanner.resume_offset() as u64,
        }
    }
}
