//! Human-readable overview rendering and parsing.
//!
//! One-shot extraction prints an overview listing each admitted record
//! as `"<n>. <name> - <phone> - <address>"`. Calling processes parse
//! this text back into structured form, so the parser lives next to the
//! renderer and the two round-trip. A legacy two-part form without the
//! phone column (`"<n>. <name> - <address>"`) is still accepted and
//! parsed with the phone sentinel.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{PHONE_SENTINEL, ShopRecord};

/// Header line preceding the numbered records.
pub const OVERVIEW_HEADER: &str = "Extracted shop records:";

#[allow(clippy::unwrap_used)] // pattern is a compile-time constant
static OVERVIEW_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\d+\.\s*(.+)$").unwrap());

/// Renders the overview text for a batch of admitted records.
///
/// Returns an empty string for an empty batch so callers can print the
/// result unconditionally.
#[must_use]
pub fn render_overview(records: &[ShopRecord]) -> String {
    if records.is_empty() {
        return String::new();
    }
    let mut out = String::from(OVERVIEW_HEADER);
    out.push('\n');
    for (index, record) in records.iter().enumerate() {
        out.push_str(&format!(
            "{}. {} - {} - {}\n",
            index + 1,
            record.name,
            record.phone,
            record.address
        ));
    }
    out
}

/// Parses overview text back into records.
///
/// Lines that do not match the numbered format are ignored, so the
/// parser tolerates surrounding log output. Addresses containing the
/// ` - ` separator survive: only the first two separators split fields.
#[must_use]
pub fn parse_overview(text: &str) -> Vec<ShopRecord> {
    let mut records = Vec::new();
    for line in text.lines() {
        let Some(captures) = OVERVIEW_LINE.captures(line.trim()) else {
            continue;
        };
        let Some(body) = captures.get(1) else {
            continue;
        };
        let parts: Vec<&str> = body.as_str().splitn(3, " - ").collect();
        match parts.as_slice() {
            [name, phone, address] => {
                records.push(ShopRecord::stamped(name.trim(), phone.trim(), address.trim()));
            },
            // Legacy form: no phone column.
            [name, address] => {
                records.push(ShopRecord::stamped(name.trim(), PHONE_SENTINEL, address.trim()));
            },
            _ => {},
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("1. 甲店 - 138 - 北京路1号", "甲店", "138", "北京路1号" ; "three part line")]
    #[test_case("2. 乙店 - 上海路2号", "乙店", "N/A", "上海路2号" ; "legacy two part line")]
    #[test_case("  3.   C - 9 - Z  ", "C", "9", "Z" ; "surrounding whitespace")]
    fn test_parse_single_line(line: &str, name: &str, phone: &str, address: &str) {
        let parsed = parse_overview(line);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].name, name);
        assert_eq!(parsed[0].phone, phone);
        assert_eq!(parsed[0].address, address);
    }

    #[test]
    fn test_render_numbered_lines() {
        let records = vec![
            ShopRecord::stamped("甲店", "13800000000", "北京路1号"),
            ShopRecord::stamped("乙店", "N/A", "上海路2号"),
        ];
        let text = render_overview(&records);
        assert!(text.starts_with(OVERVIEW_HEADER));
        assert!(text.contains("1. 甲店 - 13800000000 - 北京路1号"));
        assert!(text.contains("2. 乙店 - N/A - 上海路2号"));
    }

    #[test]
    fn test_render_empty_batch() {
        assert_eq!(render_overview(&[]), "");
    }

    #[test]
    fn test_round_trip() {
        let records = vec![
            ShopRecord::stamped("甲店", "138", "北京路1号"),
            ShopRecord::stamped("乙店", "N/A", "上海路2号"),
        ];
        let parsed = parse_overview(&render_overview(&records));
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].name, "甲店");
        assert_eq!(parsed[0].phone, "138");
        assert_eq!(parsed[1].address, "上海路2号");
    }

    #[test]
    fn test_parse_legacy_two_part_line() {
        let parsed = parse_overview("1. 甲店 - 北京路1号\n");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].phone, PHONE_SENTINEL);
        assert_eq!(parsed[0].address, "北京路1号");
    }

    #[test]
    fn test_parse_ignores_surrounding_output() {
        let text = "Processing captures.txt\nExtracted shop records:\n1. A - 1 - X\nDone.\n";
        let parsed = parse_overview(text);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].name, "A");
    }

    #[test]
    fn test_parse_address_containing_separator() {
        let parsed = parse_overview("1. A - 1 - Block 3 - Unit 4\n");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].address, "Block 3 - Unit 4");
    }
}
