//! Long-running builder service: bootstrap, watch, single-flight rebuild.

use std::sync::Arc;

use {
    tokio::sync::mpsc,
    tracing::{debug, error, info, warn},
};

use {
    ragswitch_config::{RagswitchConfig, schema::BuilderConfig},
    ragswitch_embeddings::{EmbeddingProvider, FallbackEmbeddings, HttpEmbeddingProvider},
    ragswitch_index::{StorageLayout, VECTORS_FILE},
    ragswitch_protocol::VersionSlot,
};

use crate::{
    pipeline,
    watcher::{KnowledgeWatcher, WatchEvent},
};

pub struct BuilderService {
    layout: StorageLayout,
    embedder: Arc<dyn EmbeddingProvider>,
    client: reqwest::Client,
    builder: BuilderConfig,
}

impl BuilderService {
    pub fn new(config: &RagswitchConfig) -> Self {
        let embedder = FallbackEmbeddings::new(
            HttpEmbeddingProvider::new(
                config.embedding.url.clone(),
                config.embedding.api_key.clone(),
                config.embedding.timeout(),
            ),
            config.embedding.fallback_dimensions,
        );
        Self {
            layout: StorageLayout::new(config.storage.data_dir.clone()),
            embedder: Arc::new(embedder),
            client: reqwest::Client::new(),
            builder: config.builder.clone(),
        }
    }

    /// Swap the embedding provider (used by tests and one-shot rebuilds).
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = embedder;
        self
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    pub fn embedder(&self) -> &dyn EmbeddingProvider {
        self.embedder.as_ref()
    }

    /// Ensure the shared directories exist, build the primary slot if it has
    /// no persisted index yet, and seed the active-version marker.
    ///
    /// An empty corpus defers the build rather than failing: the watcher will
    /// pick up the first documents that appear.
    pub async fn bootstrap(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(self.layout.knowledge_dir())?;
        std::fs::create_dir_all(self.layout.indices_dir())?;

        let primary = VersionSlot::PRIMARY;
        if !self.layout.slot_dir(primary).join(VECTORS_FILE).exists() {
            info!(slot = %primary, "no persisted index for the primary slot, building");
            match pipeline::rebuild_slot(&self.layout, self.embedder.as_ref(), primary).await {
                Ok(Some(outcome)) => {
                    info!(documents = outcome.documents, "bootstrap build complete");
                },
                Ok(None) => {
                    info!("no documents yet, deferring the initial build");
                },
                Err(e) => {
                    error!(error = %e, "bootstrap build failed, continuing with the watcher");
                },
            }
        }

        if !self.layout.marker_path().exists() {
            self.layout.write_marker(primary)?;
            info!(slot = %primary, "seeded active-version marker");
        }
        Ok(())
    }

    /// Bootstrap, then watch the knowledge directory until shutdown.
    pub async fn run(self) -> anyhow::Result<()> {
        self.bootstrap().await?;

        let (_watcher, rx) =
            KnowledgeWatcher::start(&self.layout.knowledge_dir(), self.builder.debounce())?;
        self.process_events(rx).await;
        Ok(())
    }

    /// Single-flight rebuild loop: each wakeup collapses every queued trigger
    /// into one rebuild of the secondary slot; triggers landing mid-rebuild
    /// stay queued and cause exactly one follow-up pass.
    async fn process_events(&self, mut rx: mpsc::UnboundedReceiver<WatchEvent>) {
        while let Some(event) = rx.recv().await {
            let mut coalesced = 0usize;
            while rx.try_recv().is_ok() {
                coalesced += 1;
            }
            debug!(?event, coalesced, "knowledge changed, rebuilding");
            self.rebuild_and_activate(VersionSlot::SECONDARY).await;
        }
    }

    async fn rebuild_and_activate(&self, slot: VersionSlot) {
        match pipeline::rebuild_slot(&self.layout, self.embedder.as_ref(), slot).await {
            Ok(Some(outcome)) => {
                match pipeline::activate(
                    &self.client,
                    &self.builder.router_url,
                    slot,
                    self.builder.activate_timeout(),
                )
                .await
                {
                    Ok(active) => {
                        info!(slot = %active, documents = outcome.documents, "new index version activated");
                    },
                    Err(e) => {
                        warn!(slot = %slot, error = %e, "build promoted but activation failed");
                    },
                }
            },
            Ok(None) => {},
            Err(e) => {
                error!(slot = %slot, error = %e, "rebuild failed, previous version remains active");
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use ragswitch_index::IndexStore;

    struct CountingEmbedder {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|_| vec![1.0, 2.0]).collect())
        }
    }

    fn service_in(dir: &std::path::Path) -> (BuilderService, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut config = RagswitchConfig::default();
        config.storage.data_dir = dir.to_path_buf();
        // Point activation at a dead local port so it fails fast in tests.
        config.builder.router_url = "http://127.0.0.1:9".into();
        config.builder.activate_timeout_secs = 1;
        let service = BuilderService::new(&config).with_embedder(Arc::new(CountingEmbedder {
            calls: Arc::clone(&calls),
        }));
        (service, calls)
    }

    #[tokio::test]
    async fn bootstrap_on_empty_corpus_defers_and_seeds_marker() {
        let dir = tempfile::tempdir().unwrap();
        let (service, calls) = service_in(dir.path());

        service.bootstrap().await.unwrap();

        assert!(service.layout().knowledge_dir().is_dir());
        assert!(!service.layout().slot_dir(VersionSlot::V1).exists());
        assert_eq!(service.layout().read_marker(), Some(VersionSlot::V1));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn bootstrap_builds_the_primary_slot_when_documents_exist() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _calls) = service_in(dir.path());
        std::fs::create_dir_all(service.layout().knowledge_dir()).unwrap();
        std::fs::write(service.layout().knowledge_dir().join("a.txt"), "A").unwrap();

        service.bootstrap().await.unwrap();

        let store = IndexStore::load(&service.layout().slot_dir(VersionSlot::V1)).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(service.layout().read_marker(), Some(VersionSlot::V1));
    }

    #[tokio::test]
    async fn burst_of_triggers_causes_a_single_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let (service, calls) = service_in(dir.path());
        service.bootstrap().await.unwrap();
        std::fs::write(service.layout().knowledge_dir().join("a.txt"), "A").unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        for _ in 0..5 {
            tx.send(WatchEvent::Modified(
                service.layout().knowledge_dir().join("a.txt"),
            ))
            .unwrap();
        }
        drop(tx);

        service.process_events(rx).await;

        // Five queued triggers collapse into one embed (and thus one build).
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(
            IndexStore::load(&service.layout().slot_dir(VersionSlot::V2)).is_ok(),
            "secondary slot should hold the rebuilt index"
        );
    }
}
