//! Incremental scan cursor over the growing source file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::RecordKey;
use crate::{Error, Result};

/// Persisted scan position.
///
/// `byte_offset` is monotonically non-decreasing across a process
/// lifetime, except for the documented reset when the source file
/// shrinks or is replaced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanCursor {
    /// How many bytes of the source file have been consumed.
    pub byte_offset: u64,
    /// Identity key of the last record admitted before this position.
    pub last_record_key: Option<String>,
}

/// Tracks the unprocessed byte range of the source file.
///
/// Owned by one run or watch session; passes receive it by mutable
/// reference. When constructed with a state file, the cursor survives
/// process restarts, so a restarted watcher re-scans only unprocessed
/// bytes.
#[derive(Debug)]
pub struct ScanController {
    source: PathBuf,
    state_path: Option<PathBuf>,
    cursor: ScanCursor,
}

impl ScanController {
    /// Creates a controller starting at offset zero, without persistence.
    #[must_use]
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            state_path: None,
            cursor: ScanCursor::default(),
        }
    }

    /// Creates a controller whose cursor is loaded from and saved to
    /// `state_path`.
    ///
    /// A missing state file starts the cursor at zero; an unreadable or
    /// corrupt one is an error so progress is never silently discarded.
    pub fn with_state_file(
        source: impl Into<PathBuf>,
        state_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let state_path = state_path.into();
        let cursor = if state_path.exists() {
            let contents = fs::read_to_string(&state_path)
                .map_err(|e| Error::operation("read_cursor_state", e))?;
            serde_json::from_str(&contents)
                .map_err(|e| Error::operation("parse_cursor_state", e))?
        } else {
            ScanCursor::default()
        };
        Ok(Self {
            source: source.into(),
            state_path: Some(state_path),
            cursor,
        })
    }

    /// The current cursor.
    #[must_use]
    pub const fn cursor(&self) -> &ScanCursor {
        &self.cursor
    }

    /// The watched source path.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Computes the unprocessed byte range, or `None` when the file has
    /// not grown past the cursor.
    ///
    /// If the file shrank or was replaced (length below the cursor), the
    /// cursor resets to zero and the whole file is treated as new
    /// content: re-processing plus downstream dedup beats silently
    /// losing data.
    ///
    /// # Errors
    ///
    /// Returns an error when the source file cannot be stat'ed (missing
    /// or permission denied); the cursor is left unchanged so the same
    /// range is retried on the next trigger.
    pub fn pending_range(&mut self) -> Result<Option<(u64, u64)>> {
        let len = fs::metadata(&self.source)
            .map_err(|e| Error::operation("stat_source", format!("{}: {e}", self.source.display())))?
            .len();

        if len < self.cursor.byte_offset {
            tracing::warn!(
                source = %self.source.display(),
                cursor = self.cursor.byte_offset,
                len,
                "source file shrank; resetting cursor"
            );
            self.cursor.byte_offset = 0;
            self.cursor.last_record_key = None;
        }

        if len == self.cursor.byte_offset {
            return Ok(None);
        }
        Ok(Some((self.cursor.byte_offset, len)))
    }

    /// Records progress after a pass completed successfully.
    ///
    /// Offsets only move forward; a smaller value is ignored. State-file
    /// persistence failure is logged but does not fail the pass — the
    /// in-memory cursor stays correct and the worst case after a crash
    /// is re-scanning bytes the dedup store already knows.
    pub fn advance(&mut self, new_offset: u64, last_key: Option<&RecordKey>) {
        if new_offset < self.cursor.byte_offset {
            tracing::debug!(
                current = self.cursor.byte_offset,
                requested = new_offset,
                "ignoring backwards cursor advance"
            );
            return;
        }
        self.cursor.byte_offset = new_offset;
        if let Some(key) = last_key {
            self.cursor.last_record_key = Some(key.as_str().to_string());
        }
        self.persist();
    }

    /// Writes the cursor to the state file, if one is configured.
    fn persist(&self) {
        let Some(path) = &self.state_path else {
            return;
        };
        let result = serde_json::to_string(&self.cursor)
            .map_err(|e| Error::operation("encode_cursor_state", e))
            .and_then(|json| {
                fs::write(path, json).map_err(|e| Error::operation("write_cursor_state", e))
            });
        if let Err(e) = result {
            tracing::warn!(state = %path.display(), error = %e, "cursor state not persisted");
        }
    }
}
