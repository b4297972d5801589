//! The persisted retrieval index: a flat vector index paired with an ordered
//! document manifest, plus the shared on-disk layout and active-version
//! marker the deployment triad coordinates through.

pub mod layout;
pub mod store;

pub use layout::StorageLayout;
pub use store::{Document, IndexError, IndexStore, VectorIndex, MANIFEST_FILE, VECTORS_FILE};
