//! Field mapping for the capture schema.
//!
//! The capture tool records responses from a shop-info API whose payload
//! is a top-level `data` object. The field names are a fixed external
//! schema: `data.name`, `data.call_center`, `data.phone_list` and
//! `data.address`.

use serde_json::Value;

use crate::models::{PHONE_SENTINEL, ShopRecord};

/// Outcome of mapping one parsed document.
#[derive(Debug)]
pub enum Mapped {
    /// The document carried a usable shop record.
    Record(ShopRecord),
    /// A shop payload without a name; no identity, so dropped.
    MissingName,
    /// Valid JSON but not a shop payload (no `data` object).
    NotShopDocument,
}

/// Maps a parsed JSON document onto a [`ShopRecord`].
///
/// Phone falls back through `call_center`, then the first entry of
/// `phone_list`, then [`PHONE_SENTINEL`]. A missing address becomes the
/// empty string (it still participates in identity).
pub fn map_document(document: &Value) -> Mapped {
    let Some(data) = document.get("data").and_then(Value::as_object) else {
        return Mapped::NotShopDocument;
    };

    let name = data
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let Some(name) = name else {
        return Mapped::MissingName;
    };

    let phone = data
        .get("call_center")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| {
            data.get("phone_list")
                .and_then(Value::as_array)
                .and_then(|list| list.iter().find_map(Value::as_str))
                .map(str::trim)
                .filter(|s| !s.is_empty())
        })
        .unwrap_or(PHONE_SENTINEL);

    let address = data
        .get("address")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();

    Mapped::Record(ShopRecord::stamped(name, phone, address))
}
