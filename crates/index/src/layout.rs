//! Shared on-disk layout and the active-version marker.
//!
//! ```text
//! <data_dir>/
//!   knowledge/               source documents, filename = document id
//!   indices/<slot>/          vectors.bin + docs.json for one slot
//!   indices/.staging-<slot>  transient build area (same filesystem)
//!   active_version           marker file holding one slot label
//! ```

use std::path::{Path, PathBuf};

use tracing::warn;

use ragswitch_protocol::VersionSlot;

const KNOWLEDGE_DIR: &str = "knowledge";
const INDICES_DIR: &str = "indices";
const MARKER_FILE: &str = "active_version";

/// Path helpers rooted at the shared data directory.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    data_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn knowledge_dir(&self) -> PathBuf {
        self.data_dir.join(KNOWLEDGE_DIR)
    }

    pub fn indices_dir(&self) -> PathBuf {
        self.data_dir.join(INDICES_DIR)
    }

    pub fn slot_dir(&self, slot: VersionSlot) -> PathBuf {
        self.indices_dir().join(slot.as_str())
    }

    /// Build area for one slot, kept under `indices/` so the final promote
    /// is a same-filesystem atomic rename.
    pub fn staging_dir(&self, slot: VersionSlot) -> PathBuf {
        self.indices_dir().join(format!(".staging-{slot}"))
    }

    pub fn marker_path(&self) -> PathBuf {
        self.data_dir.join(MARKER_FILE)
    }

    /// Read the active-version marker leniently: a missing, unreadable, or
    /// unknown-label marker yields `None` so callers can fall back.
    pub fn read_marker(&self) -> Option<VersionSlot> {
        let raw = std::fs::read_to_string(self.marker_path()).ok()?;
        match raw.parse::<VersionSlot>() {
            Ok(slot) => Some(slot),
            Err(e) => {
                warn!(error = %e, "active-version marker holds an unknown label");
                None
            },
        }
    }

    /// The slot that should receive traffic right now.
    pub fn active_or_primary(&self) -> VersionSlot {
        self.read_marker().unwrap_or(VersionSlot::PRIMARY)
    }

    /// Overwrite the marker with a known slot label.
    pub fn write_marker(&self, slot: VersionSlot) -> std::io::Result<()> {
        std::fs::write(self.marker_path(), slot.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_rooted_at_data_dir() {
        let layout = StorageLayout::new("/srv/rag");
        assert_eq!(layout.knowledge_dir(), PathBuf::from("/srv/rag/knowledge"));
        assert_eq!(
            layout.slot_dir(VersionSlot::V2),
            PathBuf::from("/srv/rag/indices/v2")
        );
        assert_eq!(
            layout.staging_dir(VersionSlot::V2),
            PathBuf::from("/srv/rag/indices/.staging-v2")
        );
        assert_eq!(layout.marker_path(), PathBuf::from("/srv/rag/active_version"));
    }

    #[test]
    fn marker_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());
        assert_eq!(layout.read_marker(), None);
        assert_eq!(layout.active_or_primary(), VersionSlot::PRIMARY);

        layout.write_marker(VersionSlot::V2).unwrap();
        assert_eq!(layout.read_marker(), Some(VersionSlot::V2));
        assert_eq!(layout.active_or_primary(), VersionSlot::V2);
    }

    #[test]
    fn corrupt_marker_falls_back_to_primary() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());
        std::fs::write(layout.marker_path(), "v9").unwrap();
        assert_eq!(layout.read_marker(), None);
        assert_eq!(layout.active_or_primary(), VersionSlot::V1);
    }

    #[test]
    fn marker_tolerates_trailing_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());
        std::fs::write(layout.marker_path(), "v2\n").unwrap();
        assert_eq!(layout.read_marker(), Some(VersionSlot::V2));
    }
}
