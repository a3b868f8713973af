//! Watch command: change-driven extraction until Ctrl-C.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;

use shopwatch::config::ShopwatchConfig;
use shopwatch::models::WatchEvent;
use shopwatch::watch::{WatchOptions, WatchSession};
use shopwatch::{Error, Result};

/// Watches `input` and appends newly-admitted records to `output`.
///
/// Runs until Ctrl-C; per-pass results are printed as they arrive.
pub async fn cmd_watch(
    config: &ShopwatchConfig,
    input: &Path,
    output: &Path,
    state_file: Option<PathBuf>,
    debounce_ms: Option<u64>,
) -> Result<()> {
    let mut options = WatchOptions::new(input, output)
        .with_debounce(Duration::from_millis(debounce_ms.unwrap_or(config.debounce_ms)))
        .with_poll_interval(config.poll_interval());
    if let Some(state) = state_file.or_else(|| config.state_file.clone()) {
        options = options.with_state_file(state);
    }

    let (events_tx, mut events_rx) = mpsc::channel(16);
    let session = WatchSession::start(options, events_tx)?;
    println!("Watching {} (Ctrl-C to stop)", input.display());

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.map_err(|e| Error::operation("await_ctrl_c", e))?;
                println!("Stopping...");
                break;
            },
            event = events_rx.recv() => {
                match event {
                    Some(WatchEvent::PassCompleted(report)) => {
                        if report.record_count() > 0 {
                            println!(
                                "{} new records ({} duplicates, {} parse failures)",
                                report.record_count(),
                                report.duplicates,
                                report.parse_failures
                            );
                            for record in &report.new_records {
                                println!("  {} - {} - {}", record.name, record.phone, record.address);
                            }
                        }
                    },
                    Some(WatchEvent::PassFailed { error }) => {
                        eprintln!("Pass failed: {error}");
                    },
                    None => break,
                }
            },
        }
    }

    session.stop().await
}
