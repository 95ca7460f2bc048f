//! File watcher / sync pipeline (C8).
//!
//! Two modes, both built on top of [`crate::graph::KnowledgeGraph`]:
//! [`spawn`] starts a dedicated OS thread watching the notes directory
//! recursively with `notify`, debounces bursts per path, and folds each
//! settled path into the graph with [`KnowledgeGraph::process_path`].
//! [`KnowledgeGraph::sync`] (called directly, not through this module) is
//! the on-demand full-reconciliation counterpart.
//!
//! Debounce model: the watcher thread only ever records "this path
//! changed at time T" into a bounded channel; all timing and coalescing
//! happens on the async side, matching `spec.md` §9's redesign flag
//! ("Async + callbacks... Map to `task + channel`").

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::graph::KnowledgeGraph;

fn is_note_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("md") | Some("markdown")
    )
}

/// Handle to a running watcher. Dropping it (or calling [`FileWatcher::stop`])
/// tears down both the notify thread and the debounce/dispatch task.
pub struct FileWatcher {
    _notify_watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl FileWatcher {
    /// Stop watching and wait for the dispatch task to drain.
    pub async fn stop(self) {
        self.task.abort();
        let _ = self.task.await;
    }
}

/// Start watching `graph.notes_root()` recursively. Every settled file
/// event is folded into `graph` via [`KnowledgeGraph::process_path`]; a
/// snapshot is persisted once per debounce batch rather than per file.
///
/// Events for non-`.md`/`.markdown` paths and for directories are
/// filtered out before they ever reach the bounded channel. A full
/// channel drops the oldest-pending path update with a `tracing::warn!`
/// (`spec.md` §7 `WatcherOverflow`) — the next forced or periodic
/// [`KnowledgeGraph::sync`] recovers any state that fell out of the
/// incremental path.
pub fn spawn(graph: Arc<KnowledgeGraph>) -> Result<FileWatcher> {
    let debounce = Duration::from_millis(graph.config().debounce_ms);
    let capacity = graph.config().watcher_queue_capacity;
    let (tx, rx) = mpsc::channel::<PathBuf>(capacity);

    let notify_watcher = spawn_notify_thread(graph.notes_root().to_path_buf(), tx)?;
    let task = tokio::spawn(dispatch_loop(graph, rx, debounce));

    Ok(FileWatcher {
        _notify_watcher: notify_watcher,
        task,
    })
}

/// Build the `notify` watcher and hand raw, filtered path events to `tx`.
/// The callback runs on notify's own thread, so it must never block —
/// `try_send` drops under backpressure instead of waiting for room.
fn spawn_notify_thread(notes_root: PathBuf, tx: mpsc::Sender<PathBuf>) -> Result<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let event = match res {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "file watcher error");
                return;
            }
        };
        for path in paths_of_interest(&event) {
            match tx.try_send(path.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(path)) => {
                    tracing::warn!(path = %path.display(), "watcher queue full, dropping event");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    // Dispatch task already shut down; nothing left to notify.
                }
            }
        }
    })
    .map_err(|e| crate::error::NoteweaveError::Other(format!("failed to start file watcher: {e}")))?;

    watcher
        .watch(&notes_root, RecursiveMode::Recursive)
        .map_err(|e| crate::error::NoteweaveError::Other(format!("failed to watch {}: {e}", notes_root.display())))?;

    Ok(watcher)
}

/// `notify::Event::paths` covers both endpoints of a rename as separate
/// paths in the same event on most backends; we treat create/modify/
/// remove/rename-from/rename-to uniformly here since [`KnowledgeGraph::process_path`]
/// already re-derives "gone" vs "changed" from whether the path still
/// exists on disk (`spec.md` §4.8: "Rename = delete(old) + create(new)").
fn paths_of_interest(event: &Event) -> Vec<PathBuf> {
    match &event.kind {
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {
            event.paths.iter().filter(|p| is_note_path(p)).cloned().collect()
        }
        _ => Vec::new(),
    }
}

/// Drain raw path events, debounce per-path, and fold each settled batch
/// into the graph. A path's window resets on every new event for that
/// path; once `debounce` has elapsed since its *last* event, it is
/// processed. Paths are checked on a fixed tick rather than one timer per
/// path, matching the coalescing behavior `spec.md` §4.8 describes.
async fn dispatch_loop(graph: Arc<KnowledgeGraph>, mut rx: mpsc::Receiver<PathBuf>, debounce: Duration) {
    let mut pending: HashMap<PathBuf, Instant> = HashMap::new();
    let tick = Duration::from_millis(200).min(debounce);
    let mut interval = tokio::time::interval(tick);

    loop {
        tokio::select! {
            maybe_path = rx.recv() => {
                match maybe_path {
                    Some(path) => {
                        pending.insert(path, Instant::now());
                    }
                    None => {
                        // Sender dropped (graph torn down); flush whatever settled and exit.
                        process_settled(&graph, &mut pending, Duration::ZERO).await;
                        return;
                    }
                }
            }
            _ = interval.tick() => {
                process_settled(&graph, &mut pending, debounce).await;
            }
        }
    }
}

/// Process (and remove from `pending`) every path whose debounce window
/// has elapsed, then persist one snapshot and resolve links once for the
/// whole batch rather than per file.
async fn process_settled(graph: &Arc<KnowledgeGraph>, pending: &mut HashMap<PathBuf, Instant>, debounce: Duration) {
    let now = Instant::now();
    let settled: Vec<PathBuf> = pending
        .iter()
        .filter(|(_, last_event)| now.duration_since(**last_event) >= debounce)
        .map(|(path, _)| path.clone())
        .collect();
    if settled.is_empty() {
        return;
    }
    for path in &settled {
        pending.remove(path);
    }

    let mut processed = 0usize;
    for path in &settled {
        match graph.process_path(path).await {
            Ok(()) => processed += 1,
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to process file-watcher event"),
        }
    }

    if processed > 0 {
        if let Err(e) = graph.persist_snapshot().await {
            tracing::warn!(error = %e, "failed to persist snapshot after watcher batch");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::time::Duration as StdDuration;
    use tempfile::tempdir;
    use tokio::time::sleep;

    fn test_config(dir: &Path) -> Config {
        Config {
            notes_directory: dir.join("notes").to_string_lossy().to_string(),
            knowledge_base_directory: dir.join("kb").to_string_lossy().to_string(),
            debounce_ms: 100,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn watcher_picks_up_a_newly_created_note() {
        let dir = tempdir().unwrap();
        let graph = Arc::new(KnowledgeGraph::init(test_config(dir.path())).await.unwrap());
        let watcher = spawn(graph.clone()).unwrap();

        let note_path = graph.notes_root().join("quick-notes").join("new.md");
        std::fs::write(&note_path, "---\ntitle: New Note\n---\nBody text.\n").unwrap();

        let mut found = false;
        for _ in 0..50 {
            sleep(StdDuration::from_millis(100)).await;
            if graph.get_statistics().await.total_nodes >= 1 {
                found = true;
                break;
            }
        }
        assert!(found, "watcher should have folded the new file into the graph");

        watcher.stop().await;
    }

    #[tokio::test]
    async fn watcher_removes_node_after_file_deletion() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        std::fs::create_dir_all(&config.notes_directory).unwrap();
        let note_path = Path::new(&config.notes_directory).join("a.md");
        std::fs::write(&note_path, "---\ntitle: Gone Soon\n---\nBody.\n").unwrap();

        let graph = Arc::new(KnowledgeGraph::init(config).await.unwrap());
        graph.sync(false).await.unwrap();
        assert_eq!(graph.get_statistics().await.total_nodes, 1);

        let watcher = spawn(graph.clone()).unwrap();
        std::fs::remove_file(&note_path).unwrap();

        let mut removed = false;
        for _ in 0..50 {
            sleep(StdDuration::from_millis(100)).await;
            if graph.get_statistics().await.total_nodes == 0 {
                removed = true;
                break;
            }
        }
        assert!(removed, "watcher should have removed the node for the deleted file");

        watcher.stop().await;
    }
}
