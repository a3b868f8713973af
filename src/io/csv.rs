//! CSV output sink.
//!
//! Rows are `name,phone,address,extracted_at`. The sink doubles as the
//! seed input for cross-run deduplication: in append mode its existing
//! rows are read back and indexed before the first pass of a run.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::models::ShopRecord;
use crate::{Error, Result};

/// Column headers written to new output files.
const HEADERS: [&str; 4] = ["name", "phone", "address", "extracted_at"];

/// How the sink treats pre-existing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Preserve existing rows and add only newly-admitted records.
    Append,
    /// Replace the file with the records admitted in the current run.
    Overwrite,
}

/// Maps CSV column indices to record fields.
///
/// Header matching is case-insensitive with a few aliases, so files
/// produced by earlier exports remain seedable.
#[derive(Debug, Default)]
struct ColumnMap {
    name: Option<usize>,
    phone: Option<usize>,
    address: Option<usize>,
    extracted_at: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let mut map = Self::default();

        for (i, header) in headers.iter().enumerate() {
            match header.to_lowercase().as_str() {
                "name" | "shop" | "shop_name" => map.name = Some(i),
                "phone" | "tel" | "call_center" => map.phone = Some(i),
                "address" | "addr" => map.address = Some(i),
                "extracted_at" | "extracted" | "timestamp" => map.extracted_at = Some(i),
                _ => {}, // Ignore unknown columns
            }
        }

        // Identity needs at least the name column
        if map.name.is_none() {
            return Err(Error::InvalidInput(
                "output CSV must have a 'name' column to seed deduplication".to_string(),
            ));
        }

        Ok(map)
    }
}

/// CSV sink for admitted records.
pub struct CsvSink {
    path: PathBuf,
    mode: WriteMode,
}

impl CsvSink {
    /// Creates a sink for `path` in the given mode.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, mode: WriteMode) -> Self {
        Self {
            path: path.into(),
            mode,
        }
    }

    /// The sink's output path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads back the rows already present in the output file.
    ///
    /// Returns an empty list when the file does not exist. Rows with an
    /// unparseable timestamp keep their identity fields; the timestamp
    /// falls back to the Unix epoch (it plays no part in dedup).
    pub fn read_existing(&self) -> Result<Vec<ShopRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file =
            fs::File::open(&self.path).map_err(|e| Error::operation("open_output_csv", e))?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let headers = reader
            .headers()
            .map_err(|e| Error::operation("read_csv_headers", e))?
            .clone();
        let map = ColumnMap::from_headers(&headers)?;

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row.map_err(|e| Error::operation("read_csv_row", e))?;
            let get = |idx: Option<usize>| -> &str { idx.and_then(|i| row.get(i)).unwrap_or("") };

            let name = get(map.name).trim();
            if name.is_empty() {
                continue;
            }
            records.push(ShopRecord::new(
                name,
                get(map.phone),
                get(map.address),
                parse_timestamp(get(map.extracted_at)),
            ));
        }
        Ok(records)
    }

    /// Persists a batch of admitted records.
    ///
    /// Append mode writes the header only when the file is new or empty;
    /// overwrite mode replaces the file and then behaves like append for
    /// the rest of the sink's lifetime, so a watch session reusing the
    /// sink keeps accumulating rows.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be opened or written; the
    /// caller rolls back the dedup store for this pass.
    pub fn persist(&mut self, records: &[ShopRecord]) -> Result<()> {
        if records.is_empty() && self.mode == WriteMode::Append {
            return Ok(());
        }

        let (file, write_headers) = match self.mode {
            WriteMode::Overwrite => {
                let file = fs::File::create(&self.path)
                    .map_err(|e| Error::operation("create_output_csv", e))?;
                self.mode = WriteMode::Append;
                (file, true)
            },
            WriteMode::Append => {
                let fresh = fs::metadata(&self.path).map_or(true, |m| m.len() == 0);
                let file = fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.path)
                    .map_err(|e| Error::operation("open_output_csv", e))?;
                (file, fresh)
            },
        };

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false) // Headers are written manually
            .from_writer(file);

        if write_headers {
            writer
                .write_record(HEADERS)
                .map_err(|e| Error::operation("write_csv_headers", e))?;
        }
        for record in records {
            writer
                .write_record([
                    record.name.as_str(),
                    record.phone.as_str(),
                    record.address.as_str(),
                    record.display_timestamp().as_str(),
                ])
                .map_err(|e| Error::operation("write_csv_row", e))?;
        }
        writer
            .flush()
            .map_err(|e| Error::operation("flush_csv", e))?;
        Ok(())
    }
}

/// Parses the sink's display timestamp, falling back to the epoch.
fn parse_timestamp(text: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(text.trim(), "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .unwrap_or(DateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use tempfile::TempDir;

    fn record(name: &str, phone: &str, address: &str) -> ShopRecord {
        ShopRecord::stamped(name, phone, address)
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shops.csv");

        let mut sink = CsvSink::new(&path, WriteMode::Overwrite);
        sink.persist(&[record("甲店", "138", "北京路1号"), record("B", "N/A", "Y")])
            .unwrap();

        let rows = CsvSink::new(&path, WriteMode::Append).read_existing().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "甲店");
        assert_eq!(rows[0].address, "北京路1号");
        assert_eq!(rows[1].phone, "N/A");
    }

    #[test]
    fn test_append_preserves_existing_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shops.csv");

        CsvSink::new(&path, WriteMode::Overwrite)
            .persist(&[record("A", "1", "X")])
            .unwrap();
        CsvSink::new(&path, WriteMode::Append)
            .persist(&[record("B", "2", "Y")])
            .unwrap();

        let rows = CsvSink::new(&path, WriteMode::Append).read_existing().unwrap();
        assert_eq!(rows.len(), 2);

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.matches("name,phone,address").count(), 1);
    }

    #[test]
    fn test_overwrite_replaces_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shops.csv");

        CsvSink::new(&path, WriteMode::Overwrite)
            .persist(&[record("A", "1", "X")])
            .unwrap();
        CsvSink::new(&path, WriteMode::Overwrite)
            .persist(&[record("C", "3", "Z")])
            .unwrap();

        let rows = CsvSink::new(&path, WriteMode::Append).read_existing().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "C");
    }

    #[test]
    fn test_overwrite_sink_appends_on_later_batches() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shops.csv");

        let mut sink = CsvSink::new(&path, WriteMode::Overwrite);
        sink.persist(&[record("A", "1", "X")]).unwrap();
        sink.persist(&[record("B", "2", "Y")]).unwrap();

        let rows = CsvSink::new(&path, WriteMode::Append).read_existing().unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_read_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let sink = CsvSink::new(dir.path().join("absent.csv"), WriteMode::Append);
        assert!(sink.read_existing().unwrap().is_empty());
    }

    #[test]
    fn test_empty_append_batch_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shops.csv");
        CsvSink::new(&path, WriteMode::Append).persist(&[]).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_seed_reader_accepts_alias_headers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("legacy.csv");
        fs::write(&path, "shop_name,tel,addr\nA,1,X\n").unwrap();

        let rows = CsvSink::new(&path, WriteMode::Append).read_existing().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "A");
        assert_eq!(rows[0].phone, "1");
    }

    #[test]
    fn test_seed_reader_rejects_headerless_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("junk.csv");
        fs::write(&path, "no,usable,columns\n1,2,3\n").unwrap();

        assert!(CsvSink::new(&path, WriteMode::Append).read_existing().is_err());
    }

    #[test]
    fn test_unparseable_timestamp_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shops.csv");
        fs::write(&path, "name,phone,address,extracted_at\nA,1,X,whenever\n").unwrap();

        let rows = CsvSink::new(&path, WriteMode::Append).read_existing().unwrap();
        assert_eq!(rows[0].extracted_at, DateTime::UNIX_EPOCH);
    }

    #[test]
    fn test_fields_with_commas_are_quoted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shops.csv");
        CsvSink::new(&path, WriteMode::Overwrite)
            .persist(&[record("A, B", "1", "X")])
            .unwrap();

        let rows = CsvSink::new(&path, WriteMode::Append).read_existing().unwrap();
        assert_eq!(rows[0].name, "A, B");
    }
}
