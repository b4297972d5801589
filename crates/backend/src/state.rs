//! Process-local index state with a lazy, mutex-guarded reload.
//!
//! The check runs on every request instead of through a background watcher:
//! one stat call buys correctness under router-triggered activation with no
//! extra coordination channel between builder and backend.

use std::{path::PathBuf, sync::Arc, time::SystemTime};

use {
    tokio::sync::Mutex,
    tracing::{info, warn},
};

use {
    ragswitch_embeddings::EmbeddingProvider,
    ragswitch_index::{IndexStore, VECTORS_FILE},
    ragswitch_protocol::VersionSlot,
    ragswitch_providers::ChatProvider,
};

struct LoadedIndex {
    store: Option<Arc<IndexStore>>,
    loaded_mtime: Option<SystemTime>,
}

pub struct BackendState {
    pub slot: VersionSlot,
    slot_dir: PathBuf,
    index: Mutex<LoadedIndex>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub chat: Arc<dyn ChatProvider>,
}

impl BackendState {
    pub fn new(
        slot: VersionSlot,
        slot_dir: PathBuf,
        embedder: Arc<dyn EmbeddingProvider>,
        chat: Arc<dyn ChatProvider>,
    ) -> Self {
        Self {
            slot,
            slot_dir,
            index: Mutex::new(LoadedIndex {
                store: None,
                loaded_mtime: None,
            }),
            embedder,
            chat,
        }
    }

    /// The current index snapshot, reloading first if the on-disk blob is
    /// newer than what's in memory (or nothing is loaded yet).
    ///
    /// The whole check-then-maybe-reload runs under one lock so concurrent
    /// requests never reload twice or observe a half-swapped reference. The
    /// returned `Arc` is a stable snapshot: a reload after this call does not
    /// invalidate an in-flight search. A failed reload keeps the previous
    /// snapshot serving.
    pub async fn current_index(&self) -> Option<Arc<IndexStore>> {
        let mut guard = self.index.lock().await;

        let disk_mtime = std::fs::metadata(self.slot_dir.join(VECTORS_FILE))
            .and_then(|m| m.modified())
            .ok();

        if let Some(mtime) = disk_mtime
            && guard.loaded_mtime.is_none_or(|loaded| mtime > loaded)
        {
            match IndexStore::load(&self.slot_dir) {
                Ok(store) => {
                    info!(
                        slot = %self.slot,
                        documents = store.len(),
                        dimensions = store.dimensions(),
                        "index loaded"
                    );
                    guard.store = Some(Arc::new(store));
                    guard.loaded_mtime = Some(mtime);
                },
                Err(e) => {
                    warn!(slot = %self.slot, error = %e, "could not load index");
                },
            }
        }

        guard.store.clone()
    }

    /// Whether an index is currently in memory. Does not trigger a reload.
    pub async fn index_loaded(&self) -> bool {
        self.index.lock().await.store.is_some()
    }
}
