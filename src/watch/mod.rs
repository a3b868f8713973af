//! File-change-driven extraction sessions.
//!
//! A [`WatchSession`] owns the pipeline state (cursor, seen set, sink)
//! and runs extraction passes whenever the source file changes. Change
//! events come from the platform watcher (`notify`); a polling interval
//! backs it up for platforms or filesystems that drop events.
//!
//! Serialization: passes run inline in the session's single task, so the
//! dedup store and cursor are never touched by two passes concurrently.
//! Triggers land in a bounded channel of capacity one — a trigger
//! arriving while a pass is in flight coalesces into exactly one re-run
//! after the pass finishes, never an unbounded queue.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use crate::io::{CsvSink, WriteMode};
use crate::models::{WatchEvent, WatchStatus};
use crate::services::{DedupStore, ExtractionPipeline, ScanController};
use crate::{Error, Result};

/// Configuration for a watch session.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Source file appended to by the external producer.
    pub source: PathBuf,
    /// CSV output path. Watch passes always append; the existing rows
    /// seed deduplication at session start.
    pub output: PathBuf,
    /// Optional cursor state file, letting a restarted session resume
    /// instead of rescanning the whole source.
    pub state_file: Option<PathBuf>,
    /// Window for absorbing a burst of rapid appends into one pass.
    pub debounce: Duration,
    /// Fallback polling cadence for missed change events.
    pub poll_interval: Duration,
}

impl WatchOptions {
    /// Creates options with default debounce (200 ms) and polling (2 s).
    #[must_use]
    pub fn new(source: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output: output.into(),
            state_file: None,
            debounce: Duration::from_millis(200),
            poll_interval: Duration::from_secs(2),
        }
    }

    /// Persists the scan cursor to `path` across restarts.
    #[must_use]
    pub fn with_state_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_file = Some(path.into());
        self
    }

    /// Sets the debounce window.
    #[must_use]
    pub const fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Sets the fallback polling interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// State shared between the session handle and its task.
#[derive(Debug)]
struct Shared {
    active: AtomicBool,
    source: PathBuf,
}

/// A running watch session.
///
/// Dropping the handle requests shutdown without waiting; call
/// [`stop`](Self::stop) to wait for an in-flight pass to complete.
#[derive(Debug)]
pub struct WatchSession {
    shared: Arc<Shared>,
    shutdown_tx: watch::Sender<bool>,
    trigger_tx: mpsc::Sender<()>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl WatchSession {
    /// Starts watching per `options`, reporting per-pass results on
    /// `events`.
    ///
    /// Must be called within a Tokio runtime. The session seeds its
    /// dedup store from the output file's existing rows, registers the
    /// platform watcher, and spawns the pass-running task. No pass runs
    /// at start; pre-existing unprocessed content is picked up by the
    /// first poll tick.
    ///
    /// # Errors
    ///
    /// Returns an error when the output's existing rows cannot be read
    /// or the platform watcher cannot be registered.
    pub fn start(options: WatchOptions, events: mpsc::Sender<WatchEvent>) -> Result<Self> {
        let controller = match &options.state_file {
            Some(state) => ScanController::with_state_file(&options.source, state)?,
            None => ScanController::new(&options.source),
        };

        let sink = CsvSink::new(&options.output, WriteMode::Append);
        let mut store = DedupStore::new();
        let seeded = store.seed(sink.read_existing()?);
        tracing::info!(
            source = %options.source.display(),
            output = %options.output.display(),
            seeded,
            "watch session starting"
        );

        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let watcher = register_watcher(&options.source, trigger_tx.clone())?;

        let shared = Arc::new(Shared {
            active: AtomicBool::new(true),
            source: options.source.clone(),
        });

        let task = tokio::spawn(session_loop(SessionState {
            options,
            controller,
            store,
            sink,
            pipeline: ExtractionPipeline::new(),
            trigger_rx,
            shutdown_rx,
            events,
            shared: Arc::clone(&shared),
            _watcher: watcher,
        }));

        Ok(Self {
            shared,
            shutdown_tx,
            trigger_tx,
            task: Some(task),
        })
    }

    /// Requests an extraction pass outside the change-detection path.
    ///
    /// Shares the watcher's serialization point and coalescing: if a
    /// pass is already pending or in flight, the request folds into the
    /// single queued re-run.
    pub fn trigger(&self) {
        let _ = self.trigger_tx.try_send(());
    }

    /// Snapshot of the session state.
    #[must_use]
    pub fn status(&self) -> WatchStatus {
        WatchStatus {
            active: self.shared.active.load(Ordering::Acquire),
            watched_path: Some(self.shared.source.clone()),
        }
    }

    /// Stops the session.
    ///
    /// Future triggers are cancelled immediately, including a pending
    /// debounced one; an in-flight pass completes first so the sink is
    /// never left with a partial write.
    pub async fn stop(mut self) -> Result<()> {
        self.shared.active.store(false, Ordering::Release);
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            task.await
                .map_err(|e| Error::operation("join_watch_task", e))?;
        }
        Ok(())
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        // Best-effort shutdown when the handle is dropped without stop().
        self.shared.active.store(false, Ordering::Release);
        let _ = self.shutdown_tx.send(true);
    }
}

/// Everything the session task owns.
struct SessionState {
    options: WatchOptions,
    controller: ScanController,
    store: DedupStore,
    sink: CsvSink,
    pipeline: ExtractionPipeline,
    trigger_rx: mpsc::Receiver<()>,
    shutdown_rx: watch::Receiver<bool>,
    events: mpsc::Sender<WatchEvent>,
    shared: Arc<Shared>,
    /// Keeps the platform watcher registered for the session lifetime.
    _watcher: RecommendedWatcher,
}

/// Registers a platform watcher for the source file.
///
/// The parent directory is watched non-recursively and events filtered
/// by file name, so a source file that does not exist yet (the producer
/// has not written anything) still gets picked up on creation.
fn register_watcher(source: &Path, trigger_tx: mpsc::Sender<()>) -> Result<RecommendedWatcher> {
    let directory = match source.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let source_name: Option<OsString> = source.file_name().map(OsString::from);

    let mut watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
        match result {
            Ok(event) => {
                let relevant = matches!(
                    event.kind,
                    EventKind::Modify(_) | EventKind::Create(_) | EventKind::Any
                );
                let ours = event.paths.is_empty()
                    || event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == source_name.as_deref());
                if relevant && ours {
                    // Capacity-1 channel: a full channel means a pass is
                    // already pending, which is exactly the coalescing
                    // the session wants.
                    let _ = trigger_tx.try_send(());
                }
            },
            Err(e) => tracing::warn!(error = %e, "file watcher error"),
        }
    })
    .map_err(|e| Error::operation("create_watcher", e))?;

    watcher
        .watch(&directory, RecursiveMode::NonRecursive)
        .map_err(|e| Error::operation("watch_source", format!("{}: {e}", directory.display())))?;
    Ok(watcher)
}

/// The session task: debounced triggers, poll fallback, serialized passes.
async fn session_loop(mut state: SessionState) {
    // interval() panics on a zero period; clamp a misconfigured value.
    let poll_period = state.options.poll_interval.max(Duration::from_millis(1));
    let mut poll = tokio::time::interval(poll_period);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of a tokio interval fires immediately; consume it so
    // session start does not imply a pass.
    poll.tick().await;

    loop {
        tokio::select! {
            _ = state.shutdown_rx.changed() => break,
            received = state.trigger_rx.recv() => {
                if received.is_none() {
                    break;
                }
                // Absorb the rest of a write burst; shutdown cancels the
                // pending trigger without running it.
                let cancelled = tokio::select! {
                    _ = state.shutdown_rx.changed() => true,
                    () = tokio::time::sleep(state.options.debounce) => false,
                };
                if cancelled {
                    break;
                }
                let _ = state.trigger_rx.try_recv();
                run_and_report(&mut state).await;
            },
            _ = poll.tick() => {
                if source_changed(&state.controller) {
                    tracing::debug!("poll fallback detected change");
                    run_and_report(&mut state).await;
                }
            },
        }
    }

    state.shared.active.store(false, Ordering::Release);
    tracing::info!(source = %state.shared.source.display(), "watch session stopped");
}

/// Whether the source length disagrees with the cursor (growth or
/// rotation). A missing source is not a change; the triggered path
/// surfaces that as a pass failure instead.
fn source_changed(controller: &ScanController) -> bool {
    std::fs::metadata(controller.source())
        .is_ok_and(|m| m.len() != controller.cursor().byte_offset)
}

/// Runs one pass and reports the outcome on the event channel.
async fn run_and_report(state: &mut SessionState) {
    metrics::counter!("watch_passes_total").increment(1);
    let outcome = state
        .pipeline
        .run_pass(&mut state.controller, &mut state.store, &mut state.sink);

    let event = match outcome {
        Ok(report) => WatchEvent::PassCompleted(report),
        Err(e) => {
            tracing::warn!(error = %e, "watch pass failed");
            WatchEvent::PassFailed {
                error: e.to_string(),
            }
        },
    };
    if state.events.send(event).await.is_err() {
        tracing::debug!("watch event receiver dropped");
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_options_defaults() {
        let options = WatchOptions::new("in.txt", "out.csv");
        assert_eq!(options.debounce, Duration::from_millis(200));
        assert_eq!(options.poll_interval, Duration::from_secs(2));
        assert!(options.state_file.is_none());
    }

    #[test]
    fn test_options_builders() {
        let options = WatchOptions::new("in.txt", "out.csv")
            .with_state_file("cursor.json")
            .with_debounce(Duration::from_millis(50))
            .with_poll_interval(Duration::from_millis(500));
        assert_eq!(options.state_file.as_deref(), Some(Path::new("cursor.json")));
        assert_eq!(options.debounce, Duration::from_millis(50));
        assert_eq!(options.poll_interval, Duration::from_millis(500));
    }

    #[test]
    fn test_start_rejects_unseedable_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = dir.path().join("captures.txt");
        let output = dir.path().join("out.csv");
        std::fs::write(&source, "").unwrap();
        // Existing output without a usable name column cannot seed dedup.
        std::fs::write(&output, "no,usable,columns\n1,2,3\n").unwrap();

        let (events_tx, _events_rx) = mpsc::channel(4);
        let result = tokio_test::block_on(async {
            WatchSession::start(WatchOptions::new(&source, &output), events_tx)
        });
        assert!(result.is_err());
    }
}
