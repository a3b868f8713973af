//! Identity hashing for deduplication.
//!
//! Produces SHA-256 keys over the normalized `(name, address)` pair.
//! Normalization trims and collapses whitespace runs so incidental
//! formatting differences between captures of the same shop do not
//! defeat deduplication. Case is left alone: the data is predominantly
//! CJK, where case folding is meaningless.

use sha2::{Digest, Sha256};

use crate::models::{RecordKey, ShopRecord};

/// Separator between the hashed fields; never appears in trimmed text.
const FIELD_SEPARATOR: u8 = 0x1f;

/// Computes identity keys for shop records.
pub struct KeyHasher;

impl KeyHasher {
    /// Computes the identity key for a `(name, address)` pair.
    ///
    /// # Example
    ///
    /// ```rust
    /// use shopwatch::services::dedup::KeyHasher;
    ///
    /// let key = KeyHasher::key("甲店", "北京路1号");
    /// assert_eq!(key.as_str().len(), 64); // SHA-256 hex digest
    /// assert_eq!(key, KeyHasher::key("  甲店  ", "北京路1号"));
    /// ```
    #[must_use]
    pub fn key(name: &str, address: &str) -> RecordKey {
        let mut hasher = Sha256::new();
        hasher.update(Self::normalize(name).as_bytes());
        hasher.update([FIELD_SEPARATOR]);
        hasher.update(Self::normalize(address).as_bytes());
        RecordKey::from_digest(hex::encode(hasher.finalize()))
    }

    /// Computes the identity key of a record.
    #[must_use]
    pub fn record_key(record: &ShopRecord) -> RecordKey {
        Self::key(&record.name, &record.address)
    }

    /// Trims and collapses whitespace runs to single spaces.
    fn normalize(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_hex_sha256() {
        let key = KeyHasher::key("A", "X");
        assert_eq!(key.as_str().len(), 64);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_whitespace_normalized() {
        assert_eq!(
            KeyHasher::key("  甲店  ", "北京路1号"),
            KeyHasher::key("甲店", "北京路1号")
        );
        assert_eq!(KeyHasher::key("A  B", "X"), KeyHasher::key("A B", "X"));
    }

    #[test]
    fn test_case_not_folded() {
        assert_ne!(KeyHasher::key("Shop", "X"), KeyHasher::key("shop", "X"));
    }

    #[test]
    fn test_field_boundary_unambiguous() {
        // "AB" + "" must not collide with "A" + "B".
        assert_ne!(KeyHasher::key("AB", ""), KeyHasher::key("A", "B"));
    }

    #[test]
    fn test_phone_not_part_of_identity() {
        let a = ShopRecord::stamped("甲店", "138", "北京路1号");
        let b = ShopRecord::stamped("甲店", "N/A", "北京路1号");
        assert_eq!(KeyHasher::record_key(&a), KeyHasher::record_key(&b));
    }
}
