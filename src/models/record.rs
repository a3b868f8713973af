//! Shop record and identity key types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel used when a capture carries no phone number.
///
/// Legacy captures omit the phone field entirely; substituting a sentinel
/// keeps the record (phone is not part of the identity key).
pub const PHONE_SENTINEL: &str = "N/A";

/// One extracted shop record.
///
/// Identity is `(name, address)` — see [`RecordKey`]. `phone` is excluded
/// from identity because it is sometimes absent in legacy captures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopRecord {
    /// Shop display name.
    pub name: String,
    /// Contact phone, or [`PHONE_SENTINEL`] when the capture had none.
    pub phone: String,
    /// Shop street address.
    pub address: String,
    /// When this record was extracted.
    pub extracted_at: DateTime<Utc>,
}

impl ShopRecord {
    /// Creates a record with an explicit extraction timestamp.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        address: impl Into<String>,
        extracted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            address: address.into(),
            extracted_at,
        }
    }

    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn stamped(
        name: impl Into<String>,
        phone: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self::new(name, phone, address, Utc::now())
    }

    /// Extraction timestamp in the sink's display format.
    #[must_use]
    pub fn display_timestamp(&self) -> String {
        self.extracted_at.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Identity key for deduplication.
///
/// A hex-encoded SHA-256 over the whitespace-normalized `(name, address)`
/// pair. Computed by `services::dedup::KeyHasher`; two records with the
/// same key are the same shop for deduplication purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordKey(String);

impl RecordKey {
    /// Wraps a precomputed hex digest.
    #[must_use]
    pub const fn from_digest(digest: String) -> Self {
        Self(digest)
    }

    /// The hex digest as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
