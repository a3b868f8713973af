//! Tabular input/output.

mod csv;

pub use csv::{CsvSink, WriteMode};
