//! The rebuild pipeline: scan → embed → stage → promote → activate.
//!
//! A failure anywhere before the promote discards the staging directory and
//! leaves the serving slot's files and the active-version marker untouched.
//! Readers can never observe a slot directory mid-construction: the only
//! publish step is one atomic same-filesystem rename.

use std::{path::Path, time::Duration};

use {
    anyhow::Context,
    tracing::{info, warn},
};

use {
    ragswitch_embeddings::EmbeddingProvider,
    ragswitch_index::{IndexStore, StorageLayout},
    ragswitch_protocol::{ActivateRequest, ActivateResponse, VersionSlot},
};

use crate::scan::scan_documents;

/// Summary of one successful build.
#[derive(Debug, Clone, Copy)]
pub struct BuildOutcome {
    pub documents: usize,
    pub dimensions: usize,
}

/// Rebuild the given slot from the current knowledge directory contents.
///
/// Returns `Ok(None)` on an empty corpus: the pipeline defers instead of
/// erroring or publishing an unanswerable index.
pub async fn rebuild_slot(
    layout: &StorageLayout,
    embedder: &dyn EmbeddingProvider,
    slot: VersionSlot,
) -> anyhow::Result<Option<BuildOutcome>> {
    let documents = scan_documents(&layout.knowledge_dir())?;
    if documents.is_empty() {
        info!(slot = %slot, "knowledge directory is empty, skipping build");
        return Ok(None);
    }

    let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
    let vectors = embedder
        .embed_batch(&texts)
        .await
        .context("embedding the corpus")?;
    let store = IndexStore::from_parts(vectors, documents).context("assembling the index")?;

    let staging = layout.staging_dir(slot);
    let target = layout.slot_dir(slot);
    if let Err(e) = stage_and_promote(&store, &staging, &target) {
        discard_staging(&staging);
        return Err(e);
    }

    let outcome = BuildOutcome {
        documents: store.len(),
        dimensions: store.dimensions(),
    };
    info!(
        slot = %slot,
        documents = outcome.documents,
        dimensions = outcome.dimensions,
        "index build promoted"
    );
    Ok(Some(outcome))
}

fn stage_and_promote(store: &IndexStore, staging: &Path, target: &Path) -> anyhow::Result<()> {
    if staging.exists() {
        std::fs::remove_dir_all(staging).context("clearing stale staging directory")?;
    }
    std::fs::create_dir_all(staging).context("creating staging directory")?;
    store.save(staging).context("writing index files")?;

    if target.exists() {
        std::fs::remove_dir_all(target).context("removing previous slot directory")?;
    }
    std::fs::rename(staging, target).context("promoting staging directory")?;
    Ok(())
}

fn discard_staging(staging: &Path) {
    if let Err(e) = std::fs::remove_dir_all(staging)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!(dir = %staging.display(), error = %e, "could not discard staging directory");
    }
}

/// Tell the router to switch traffic to `slot`.
pub async fn activate(
    client: &reqwest::Client,
    router_url: &str,
    slot: VersionSlot,
    timeout: Duration,
) -> anyhow::Result<VersionSlot> {
    let resp = client
        .post(format!("{router_url}/activate"))
        .timeout(timeout)
        .json(&ActivateRequest {
            version: slot.as_str().to_string(),
        })
        .send()
        .await?
        .error_for_status()?
        .json::<ActivateResponse>()
        .await?;
    Ok(resp.activated)
}
