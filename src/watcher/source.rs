//! Source-tree watcher producing the ordered [`WatchSignal`] stream.

use std::path::PathBuf;

use ignore::WalkBuilder;
use notify::{Event, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::error::WatchError;
use super::event::{WatchEvent, WatchSignal, classify};
use super::filter::SourceFilter;

/// Capacity of the signal channel towards the orchestrator.
const SIGNAL_BUFFER: usize = 100;

/// Keeps the `notify` watcher and the forwarding task alive.
///
/// Signals arrive in this order: one `Added` per pre-existing matching file,
/// then [`WatchSignal::InitialScanComplete`], then live events. Live events
/// that happen during the scan are held back until the scan has finished.
pub struct SourceWatcher {
    _watcher: notify::RecommendedWatcher,
    forwarder: JoinHandle<()>,
}

impl SourceWatcher {
    /// Register a recursive watch on the filter's root and start the scan.
    pub fn start(filter: SourceFilter) -> Result<(Self, mpsc::Receiver<WatchSignal>), WatchError> {
        let root = filter.root().to_path_buf();

        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // The receiver only disappears on shutdown
            let _ = raw_tx.send(res);
        })?;

        // Watch before scanning so nothing created mid-scan is missed
        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: root.clone(),
                reason: e.to_string(),
            })?;
        crate::debug_event!("watcher", "watching", "{}", root.display());

        let (tx, rx) = mpsc::channel(SIGNAL_BUFFER);
        let forwarder = tokio::spawn(forward(filter, raw_rx, tx));

        Ok((
            Self {
                _watcher: watcher,
                forwarder,
            },
            rx,
        ))
    }
}

impl Drop for SourceWatcher {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

async fn forward(
    filter: SourceFilter,
    mut raw_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    tx: mpsc::Sender<WatchSignal>,
) {
    let scan_filter = filter.clone();
    let existing = match tokio::task::spawn_blocking(move || scan(&scan_filter)).await {
        Ok(paths) => paths,
        Err(e) => {
            tracing::error!("[watcher] initial scan failed: {e}");
            Vec::new()
        }
    };
    crate::debug_event!("watcher", "initial scan", "{} files", existing.len());

    for path in existing {
        if tx.send(WatchEvent::added(path).into()).await.is_err() {
            return;
        }
    }
    if tx.send(WatchSignal::InitialScanComplete).await.is_err() {
        return;
    }

    while let Some(res) = raw_rx.recv().await {
        let event = match res {
            Ok(event) => event,
            Err(e) => {
                tracing::error!("[watcher] file watch error: {e}");
                continue;
            }
        };

        for change in classify(&event) {
            if !filter.accepts(&change.path) || change.path.is_dir() {
                crate::debug_event!(
                    "watcher",
                    "unmatched",
                    "{:?} {}",
                    event.kind,
                    change.path.display()
                );
                continue;
            }
            if tx.send(change.into()).await.is_err() {
                return;
            }
        }
    }
}

/// Every matching file under the root, in a stable order.
pub fn scan(filter: &SourceFilter) -> Vec<PathBuf> {
    let prune = filter.clone();
    let walker = WalkBuilder::new(filter.root())
        .standard_filters(false)
        .follow_links(true)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            !prune.is_ignored(entry.path(), is_dir)
        })
        .build();

    let mut files = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) => {
                let is_file = entry.file_type().is_some_and(|t| t.is_file());
                if is_file && filter.accepts(entry.path()) {
                    files.push(entry.into_path());
                }
            }
            Err(e) => tracing::warn!("[watcher] skipping unreadable entry: {e}"),
        }
    }
    files
}
