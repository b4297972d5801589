//! Flat-vector nearest-neighbor index with a same-order document manifest.
//!
//! Persisted form is two paired files in one slot directory: a binary vector
//! blob and an ordered JSON manifest. Position is the only join key between
//! them, so the pair is only ever promoted whole (atomic directory rename)
//! and cross-checked on load.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Binary vector blob inside a slot directory.
pub const VECTORS_FILE: &str = "vectors.bin";
/// Ordered document manifest paired with the blob.
pub const MANIFEST_FILE: &str = "docs.json";

const MAGIC: [u8; 4] = *b"RSWX";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 16;

/// One source file from the knowledge directory. Identity is the filename;
/// absence from the next full scan is the deletion signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("index files not found in {}", .0.display())]
    NotFound(PathBuf),
    #[error("query dimension {got} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("vector blob and document manifest disagree: {rows} rows vs {documents} documents")]
    Inconsistent { rows: usize, documents: usize },
    #[error("refusing to build an index from zero documents")]
    EmptyBuild,
    #[error("malformed vector blob: {0}")]
    Malformed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Manifest(#[from] serde_json::Error),
}

/// Row-major flat matrix of embedding vectors with squared-Euclidean search.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dimensions: usize,
    data: Vec<f32>,
}

impl VectorIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            data: Vec::new(),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn rows(&self) -> usize {
        if self.dimensions == 0 {
            0
        } else {
            self.data.len() / self.dimensions
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append vectors in order. Every row must match the index dimension.
    pub fn add_batch(&mut self, vectors: &[Vec<f32>]) -> Result<(), IndexError> {
        for vector in vectors {
            if vector.len() != self.dimensions {
                return Err(IndexError::DimensionMismatch {
                    expected: self.dimensions,
                    got: vector.len(),
                });
            }
        }
        self.data
            .reserve(vectors.len().saturating_mul(self.dimensions));
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        Ok(())
    }

    /// Return up to `k` row positions with their squared-L2 distance to
    /// `query`, ascending by distance. Ties keep ascending position order
    /// (the sort is stable).
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, IndexError> {
        if query.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: query.len(),
            });
        }

        let mut hits: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimensions)
            .enumerate()
            .map(|(position, row)| {
                let dist = row
                    .iter()
                    .zip(query)
                    .map(|(a, b)| {
                        let d = a - b;
                        d * d
                    })
                    .sum::<f32>();
                (position, dist)
            })
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits.truncate(k);
        Ok(hits)
    }
}

/// A vector index paired with its same-order document list.
///
/// Invariant: `index.rows() == documents.len()`, and position `i` in both
/// refers to the same logical record.
#[derive(Debug, Clone)]
pub struct IndexStore {
    index: VectorIndex,
    documents: Vec<Document>,
}

impl IndexStore {
    /// Assemble a store from parallel vectors and documents.
    ///
    /// The dimension is taken from the first vector; a zero-document build
    /// is rejected so the caller can treat an empty corpus as a no-op
    /// instead of producing an unanswerable index.
    pub fn from_parts(
        vectors: Vec<Vec<f32>>,
        documents: Vec<Document>,
    ) -> Result<Self, IndexError> {
        if vectors.len() != documents.len() {
            return Err(IndexError::Inconsistent {
                rows: vectors.len(),
                documents: documents.len(),
            });
        }
        let Some(first) = vectors.first() else {
            return Err(IndexError::EmptyBuild);
        };
        if first.is_empty() {
            return Err(IndexError::Malformed("zero-dimension vectors".into()));
        }

        let mut index = VectorIndex::new(first.len());
        index.add_batch(&vectors)?;
        Ok(Self { index, documents })
    }

    pub fn dimensions(&self) -> usize {
        self.index.dimensions()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// The `k` documents closest to `query`, ascending by distance.
    /// Positions without a manifest entry are discarded.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<&Document>, IndexError> {
        let hits = self.index.search(query, k)?;
        Ok(hits
            .into_iter()
            .filter_map(|(position, _)| self.documents.get(position))
            .collect())
    }

    /// Write both files into `dir`. The directory must already exist; the
    /// caller is responsible for only ever publishing a fully-written
    /// directory (staging + atomic rename).
    pub fn save(&self, dir: &Path) -> Result<(), IndexError> {
        let dimensions = u32::try_from(self.index.dimensions())
            .map_err(|_| IndexError::Malformed("dimension exceeds u32".into()))?;
        let rows = u32::try_from(self.index.rows())
            .map_err(|_| IndexError::Malformed("row count exceeds u32".into()))?;
        let mut blob = Vec::with_capacity(HEADER_LEN + self.index.data.len() * 4);
        blob.extend_from_slice(&MAGIC);
        blob.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        blob.extend_from_slice(&dimensions.to_le_bytes());
        blob.extend_from_slice(&rows.to_le_bytes());
        blob.extend_from_slice(bytemuck::cast_slice(&self.index.data));

        std::fs::write(dir.join(VECTORS_FILE), blob)?;
        std::fs::write(
            dir.join(MANIFEST_FILE),
            serde_json::to_vec(&self.documents)?,
        )?;
        Ok(())
    }

    /// Read both files from `dir` and cross-check the pairing invariant.
    pub fn load(dir: &Path) -> Result<Self, IndexError> {
        let vectors_path = dir.join(VECTORS_FILE);
        let manifest_path = dir.join(MANIFEST_FILE);
        if !vectors_path.exists() || !manifest_path.exists() {
            return Err(IndexError::NotFound(dir.to_path_buf()));
        }

        let blob = std::fs::read(&vectors_path)?;
        if blob.len() < HEADER_LEN {
            return Err(IndexError::Malformed("truncated header".into()));
        }
        if blob[..4] != MAGIC {
            return Err(IndexError::Malformed("bad magic".into()));
        }
        let version = u32::from_le_bytes([blob[4], blob[5], blob[6], blob[7]]);
        if version != FORMAT_VERSION {
            return Err(IndexError::Malformed(format!(
                "unsupported format version {version}"
            )));
        }
        let dimensions = u32::from_le_bytes([blob[8], blob[9], blob[10], blob[11]]) as usize;
        let rows = u32::from_le_bytes([blob[12], blob[13], blob[14], blob[15]]) as usize;
        let expected = HEADER_LEN as u64 + (rows as u64) * (dimensions as u64) * 4;
        if blob.len() as u64 != expected {
            return Err(IndexError::Malformed(format!(
                "blob length {} does not match {rows} rows of dimension {dimensions}",
                blob.len()
            )));
        }

        let data: Vec<f32> = blob[HEADER_LEN..]
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        let documents: Vec<Document> = serde_json::from_slice(&std::fs::read(&manifest_path)?)?;
        if rows != documents.len() {
            return Err(IndexError::Inconsistent {
                rows,
                documents: documents.len(),
            });
        }

        Ok(Self {
            index: VectorIndex { dimensions, data },
            documents,
        })
    }
}
