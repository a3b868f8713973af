//! Business logic services.
//!
//! Services own the mutable pipeline state (cursor, seen set) and
//! orchestrate extraction passes over it. State is constructed once per
//! run or watch session and passed explicitly into each pass, which
//! keeps a pass testable in isolation with injected state.

mod cursor;
pub mod dedup;
mod pipeline;

pub use cursor::{ScanController, ScanCursor};
pub use dedup::DedupStore;
pub use pipeline::{ExtractionPipeline, run_extraction};
