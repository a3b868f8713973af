//! One-shot extraction command.

use std::path::Path;

use shopwatch::io::WriteMode;
use shopwatch::rendering::render_overview;
use shopwatch::services::run_extraction;
use shopwatch::Result;

/// Runs one extraction pass and prints the overview.
///
/// The overview lines are a stable machine-parseable format (see
/// `shopwatch::rendering::parse_overview`); diagnostics go to stderr
/// via tracing, so stdout stays clean for calling processes.
pub fn cmd_extract(input: &Path, output: &Path, append: bool) -> Result<()> {
    let mode = if append {
        WriteMode::Append
    } else {
        WriteMode::Overwrite
    };

    println!("Processing {}", input.display());
    let report = run_extraction(input, output, mode)?;

    if report.record_count() == 0 {
        println!("No new shop records extracted");
    } else {
        println!("Extracted {} new shop records", report.record_count());
    }
    if report.duplicates > 0 {
        println!("Skipped {} duplicate records", report.duplicates);
    }
    if report.parse_failures > 0 {
        println!("Recovered from {} parse failures", report.parse_failures);
    }
    println!("Saved to {}", output.display());

    let overview = render_overview(&report.new_records);
    if !overview.is_empty() {
        println!();
        print!("{overview}");
    }
    Ok(())
}
