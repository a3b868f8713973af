//! Deduplication of extracted records.
//!
//! Identity is the `(name, address)` pair, hashed to a [`RecordKey`]
//! by [`KeyHasher`]. The store keeps every admitted record first-seen
//! wins, and stages each pass's admissions so a failed sink write can
//! roll them back without losing the right to re-admit later.
//!
//! [`RecordKey`]: crate::models::RecordKey

mod hasher;
mod store;

pub use hasher::KeyHasher;
pub use store::DedupStore;
