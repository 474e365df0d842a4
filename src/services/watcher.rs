use crate::error::{Result, SorterError};
use crate::models::classify_types::FileOutcome;
use crate::models::watch_types::{PendingEvent, WatchState, WatchSummary, WatchTarget};
use crate::services::classifier::pipeline::Pipeline;
use crate::services::fs_service;
use notify::event::CreateKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

/// Wait after a creation event before touching the file, so the writer can finish.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(1);
/// How long a stopping loop waits for in-flight attempts.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

type Attempt = (PathBuf, Result<FileOutcome>);

enum EventSource {
    Filesystem,
    Channel(mpsc::UnboundedReceiver<PendingEvent>),
}

/// Sweeps a directory once, then classifies every matching file created in it
/// until told to stop.
pub struct FolderWatcher {
    target: WatchTarget,
    pipeline: Arc<Pipeline>,
    debounce: Duration,
    drain_timeout: Duration,
    source: EventSource,
    state: watch::Sender<WatchState>,
}

impl FolderWatcher {
    pub fn new(target: WatchTarget, pipeline: Arc<Pipeline>) -> Self {
        let (state, _) = watch::channel(WatchState::Starting);
        Self {
            target,
            pipeline,
            debounce: DEFAULT_DEBOUNCE,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            source: EventSource::Filesystem,
            state,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    /// Take creation events from `events` instead of subscribing to the filesystem.
    pub fn with_event_channel(mut self, events: mpsc::UnboundedReceiver<PendingEvent>) -> Self {
        self.source = EventSource::Channel(events);
        self
    }

    pub fn state(&self) -> watch::Receiver<WatchState> {
        self.state.subscribe()
    }

    /// Run until `shutdown` resolves or the event source closes.
    ///
    /// Only startup failures are returned as errors; per-file failures are logged
    /// and counted in the summary.
    pub async fn run<F>(self, shutdown: F) -> Result<WatchSummary>
    where
        F: Future<Output = ()> + Send,
    {
        let FolderWatcher {
            target,
            pipeline,
            debounce,
            drain_timeout,
            source,
            state,
        } = self;
        let transition = |next: WatchState| {
            debug!(state = ?next, "Watch loop state");
            state.send_replace(next);
        };

        info!("Service started");
        if let Err(e) = target.validate() {
            error!(error = %e, "Cannot start watching");
            transition(WatchState::Stopped);
            return Err(e);
        }

        let mut summary = WatchSummary::default();

        transition(WatchState::Sweeping);
        if let Err(e) = sweep(&target, &pipeline, &mut summary).await {
            transition(WatchState::Stopped);
            return Err(e);
        }
        if summary.swept_moved > 0 {
            info!("Moved {} existing files.", summary.swept_moved);
        }

        let (subscription, mut events) = match source {
            EventSource::Filesystem => match subscribe(&target) {
                Ok((watcher, events)) => (Some(watcher), events),
                Err(e) => {
                    error!(error = %e, "Cannot start watching");
                    transition(WatchState::Stopped);
                    return Err(e);
                }
            },
            EventSource::Channel(events) => (None, events),
        };
        transition(WatchState::Watching);
        info!(
            "Listening for images created in \"{}\"...",
            target.root().display()
        );

        tokio::pin!(shutdown);
        let mut attempts: JoinSet<Attempt> = JoinSet::new();
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Stop requested");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => {
                        if !target.matches(&event.path) {
                            debug!(file = %event.path.display(), "Ignoring event for non-matching file");
                            continue;
                        }
                        summary.events += 1;
                        let pipeline = Arc::clone(&pipeline);
                        let confidence = target.confidence();
                        attempts.spawn(async move {
                            tokio::time::sleep(debounce).await;
                            let result = process(pipeline, event.path.clone(), confidence).await;
                            (event.path, result)
                        });
                    }
                    None => {
                        warn!("Event source closed");
                        break;
                    }
                },
                Some(joined) = attempts.join_next(), if !attempts.is_empty() => {
                    record_joined(&mut summary, joined);
                }
            }
        }

        transition(WatchState::Stopping);
        drop(subscription);
        drop(events);

        let drained = tokio::time::timeout(drain_timeout, async {
            while let Some(joined) = attempts.join_next().await {
                record_joined(&mut summary, joined);
            }
        })
        .await;
        if drained.is_err() {
            summary.abandoned = attempts.len();
            warn!(
                abandoned = summary.abandoned,
                "Stopped before all in-flight files were processed"
            );
            attempts.abort_all();
        }

        transition(WatchState::Stopped);
        info!("Service stopped");
        Ok(summary)
    }
}

/// Process the files already in the directory, one after another.
async fn sweep(target: &WatchTarget, pipeline: &Arc<Pipeline>, summary: &mut WatchSummary) -> Result<()> {
    let root = target.root().to_path_buf();
    let extensions = target.extensions().to_vec();
    let files = tokio::task::spawn_blocking(move || fs_service::list_matching_files(&root, &extensions))
        .await
        .map_err(|e| SorterError::Task(e.to_string()))??;

    summary.swept = files.len();
    for path in files {
        let result = process(Arc::clone(pipeline), path.clone(), target.confidence()).await;
        if matches!(result, Ok(FileOutcome::Moved { .. })) {
            summary.swept_moved += 1;
        }
        log_failure(&path, &result);
    }
    Ok(())
}

async fn process(pipeline: Arc<Pipeline>, path: PathBuf, confidence: f32) -> Result<FileOutcome> {
    tokio::task::spawn_blocking(move || pipeline.process_file(&path, confidence))
        .await
        .map_err(|e| SorterError::Task(e.to_string()))?
}

fn subscribe(
    target: &WatchTarget,
) -> Result<(RecommendedWatcher, mpsc::UnboundedReceiver<PendingEvent>)> {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |res: std::result::Result<Event, notify::Error>| {
        match res {
            Ok(event) => {
                if let EventKind::Create(kind) = event.kind {
                    if matches!(kind, CreateKind::Folder) {
                        return;
                    }
                    for path in event.paths {
                        let _ = tx.send(PendingEvent { path });
                    }
                }
            }
            Err(e) => warn!(error = %e, "Filesystem watcher error"),
        }
    })
    .map_err(|source| SorterError::Watch {
        path: target.root().to_path_buf(),
        source,
    })?;

    watcher
        .watch(target.root(), RecursiveMode::NonRecursive)
        .map_err(|source| SorterError::Watch {
            path: target.root().to_path_buf(),
            source,
        })?;

    Ok((watcher, rx))
}

fn record_joined(summary: &mut WatchSummary, joined: std::result::Result<Attempt, JoinError>) {
    match joined {
        Ok((path, result)) => {
            match &result {
                Ok(FileOutcome::Moved { .. }) => summary.moved += 1,
                Ok(FileOutcome::BelowThreshold { .. }) => summary.below_threshold += 1,
                Err(_) => summary.failed += 1,
            }
            log_failure(&path, &result);
        }
        Err(e) => {
            summary.failed += 1;
            error!(error = %e, "Processing task failed");
        }
    }
}

fn log_failure(path: &std::path::Path, result: &Result<FileOutcome>) {
    if let Err(e) = result {
        error!(file = %path.display(), error = %e, "Error when processing file");
    }
}
