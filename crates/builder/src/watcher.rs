/// Debounced filesystem watching of the knowledge directory.
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use {
    anyhow::Result,
    notify_debouncer_full::{
        DebounceEventResult, Debouncer, RecommendedCache, new_debouncer, notify::RecursiveMode,
    },
    tokio::sync::mpsc,
    tracing::{debug, info, warn},
};

/// Events emitted by the knowledge watcher.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Removed(PathBuf),
}

/// Watches the knowledge directory (top level only) with debouncing, so a
/// burst of writes settles into one batch of events.
pub struct KnowledgeWatcher {
    debouncer: Debouncer<notify_debouncer_full::notify::RecommendedWatcher, RecommendedCache>,
}

impl KnowledgeWatcher {
    /// Start watching. Returns the watcher (keep it alive for as long as
    /// events are wanted) and a receiver for the event queue.
    pub fn start(
        dir: &Path,
        debounce: Duration,
    ) -> Result<(Self, mpsc::UnboundedReceiver<WatchEvent>)> {
        let (tx, rx) = mpsc::unbounded_channel();

        let debouncer = new_debouncer(debounce, None, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    for event in events {
                        for path in &event.paths {
                            // Top-level subdirectories are not documents.
                            if path.is_dir() {
                                continue;
                            }

                            use notify_debouncer_full::notify::EventKind;
                            let watch_event = match event.kind {
                                EventKind::Create(_) => WatchEvent::Created(path.clone()),
                                EventKind::Modify(_) => WatchEvent::Modified(path.clone()),
                                EventKind::Remove(_) => WatchEvent::Removed(path.clone()),
                                _ => continue,
                            };

                            debug!(path = %path.display(), "knowledge change");
                            if tx.send(watch_event).is_err() {
                                return; // receiver dropped
                            }
                        }
                    }
                },
                Err(errors) => {
                    for e in errors {
                        warn!(error = %e, "file watcher error");
                    }
                },
            }
        })?;

        let mut watcher = Self { debouncer };
        watcher.debouncer.watch(dir, RecursiveMode::NonRecursive)?;
        info!(dir = %dir.display(), "watching knowledge directory");

        Ok((watcher, rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_file_creation() {
        let dir = tempfile::tempdir().unwrap();
        let (_watcher, mut rx) =
            KnowledgeWatcher::start(dir.path(), Duration::from_millis(100)).unwrap();

        std::fs::write(dir.path().join("new.txt"), "hello").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .ok()
            .flatten();
        assert!(event.is_some(), "expected a watch event within 5s");
    }
}
