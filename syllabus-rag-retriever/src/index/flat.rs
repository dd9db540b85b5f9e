//! Exact nearest-neighbor index with an L2 metric.

use super::artifact::{self, ByteOrder, DistanceMetric, FORMAT_VERSION, VectorHeader};
use super::{Chunk, ChunkId, EmbeddingModelMetadata, IndexStats, RetrievalResult};
use crate::error::{Result, RetrieverError};
use half::f16;
use itertools::Itertools;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use syllabus_rag_embed::EmbeddingProvider;
use tracing::{debug, info, warn};

/// Euclidean distance between two vectors, accumulated in `f32`.
///
/// Vectors of different lengths are infinitely far apart.
pub fn l2_distance(a: &[f16], b: &[f16]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x.to_f32() - y.to_f32();
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

/// Maps a distance to a similarity in `(0, 1]`; 1 means identical.
pub fn score_from_distance(distance: f32) -> f32 {
    1.0 / (1.0 + distance)
}

#[derive(Debug, Clone)]
struct IndexState {
    model: EmbeddingModelMetadata,
    dimension: usize,
    /// Chunk id of each row
    chunk_ids: Vec<ChunkId>,
    /// Row-major, `chunk_ids.len() * dimension` values
    vectors: Vec<f16>,
    chunks: Vec<Chunk>,
    /// Shared by both artifacts of one build
    build_id: String,
    source_fingerprint: Option<String>,
    created_at: i64,
}

impl IndexState {
    fn row(&self, i: usize) -> &[f16] {
        &self.vectors[i * self.dimension..(i + 1) * self.dimension]
    }
}

/// Identifies one build so its two artifacts can be matched on load.
fn build_id(model: &EmbeddingModelMetadata, chunks: &[Chunk], built_at: i64) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(model.model_id().as_bytes());
    hasher.update(&built_at.to_le_bytes());
    for chunk in chunks {
        hasher.update(&chunk.chunk_id.to_le_bytes());
        hasher.update(chunk.text.as_bytes());
        hasher.update(&[0]);
    }
    hex::encode(&hasher.finalize().as_bytes()[..16])
}

/// Chunks plus one embedding per chunk, searchable by query text.
///
/// An index starts empty. [`build`](Self::build) or [`load`](Self::load)
/// make it searchable; either one replaces the previous contents only when
/// it succeeds completely.
pub struct VectorIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    state: Option<IndexState>,
}

impl fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorIndex")
            .field("embedder", &self.embedder.model_name())
            .field("len", &self.len())
            .field("dimension", &self.dimension())
            .finish()
    }
}

impl VectorIndex {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            state: None,
        }
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Whether a build or load has succeeded.
    pub fn is_built(&self) -> bool {
        self.state.is_some()
    }

    /// Number of indexed chunks (0 before a build).
    pub fn len(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.chunks.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Embedding dimension, once built.
    pub fn dimension(&self) -> Option<usize> {
        self.state.as_ref().map(|s| s.dimension)
    }

    /// Indexed chunks in row order.
    pub fn chunks(&self) -> &[Chunk] {
        self.state
            .as_ref()
            .map(|s| s.chunks.as_slice())
            .unwrap_or_default()
    }

    /// Model that produced the stored vectors, once built.
    pub fn model(&self) -> Option<&EmbeddingModelMetadata> {
        self.state.as_ref().map(|s| &s.model)
    }

    pub fn stats(&self) -> Option<IndexStats> {
        self.state.as_ref().map(|s| IndexStats {
            chunk_count: s.chunks.len(),
            dimension: s.dimension,
            model_id: s.model.model_id(),
            units: s
                .chunks
                .iter()
                .map(|c| c.unit.clone())
                .counts()
                .into_iter()
                .collect(),
            source_fingerprint: s.source_fingerprint.clone(),
            created_at: s.created_at,
        })
    }

    /// Embed every chunk in one batch and replace the index contents.
    ///
    /// Chunks with whitespace-only text are skipped.
    ///
    /// # Errors
    ///
    /// - [`RetrieverError::EmptyInput`] if no chunk has text
    /// - [`RetrieverError::DuplicateChunkId`] if two chunks share an id
    /// - [`RetrieverError::DimensionMismatch`] if the embedder returns the
    ///   wrong number of vectors or vectors of unequal length
    /// - [`RetrieverError::Embedding`] if the embedder fails
    pub async fn build(&mut self, chunks: Vec<Chunk>) -> Result<()> {
        self.build_with_source(chunks, None).await
    }

    /// [`build`](Self::build), recording the blake3 fingerprint of the source
    /// document the chunks came from.
    pub async fn build_with_source(
        &mut self,
        chunks: Vec<Chunk>,
        source_fingerprint: Option<String>,
    ) -> Result<()> {
        let mut seen = HashSet::with_capacity(chunks.len());
        if let Some(duplicate) = chunks.iter().find(|c| !seen.insert(c.chunk_id)) {
            return Err(RetrieverError::DuplicateChunkId {
                chunk_id: duplicate.chunk_id,
            });
        }

        let total = chunks.len();
        let chunks: Vec<Chunk> = chunks
            .into_iter()
            .filter(|c| !c.text.trim().is_empty())
            .collect();
        if chunks.is_empty() {
            return Err(RetrieverError::EmptyInput);
        }
        if chunks.len() < total {
            warn!("Skipping {} chunks with empty text", total - chunks.len());
        }

        let mut model = EmbeddingModelMetadata::from_provider(self.embedder.as_ref());
        info!("Embedding {} chunks with {}", chunks.len(), model.model_id());

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let result = self.embedder.embed_texts(&texts).await?;

        if result.len() != chunks.len() {
            return Err(RetrieverError::DimensionMismatch {
                expected: format!("{} vectors", chunks.len()),
                found: format!("{} vectors", result.len()),
            });
        }
        let dimension = result.embeddings.first().map_or(0, Vec::len);
        if let Some(row) = result.embeddings.iter().find(|e| e.len() != dimension) {
            return Err(RetrieverError::DimensionMismatch {
                expected: format!("{dimension} values per vector"),
                found: format!("{} values", row.len()),
            });
        }
        if dimension == 0 {
            return Err(RetrieverError::DimensionMismatch {
                expected: format!("{} values per vector", model.dimension),
                found: "empty vectors".to_string(),
            });
        }
        if dimension != model.dimension {
            warn!(
                "Embedder reports dimension {} but produced {}",
                model.dimension, dimension
            );
            model.dimension = dimension;
        }

        let vectors: Vec<f16> = result.embeddings.into_iter().flatten().collect();
        let chunk_ids = chunks.iter().map(|c| c.chunk_id).collect();
        let now = chrono::Utc::now();
        let build_id = build_id(
            &model,
            &chunks,
            now.timestamp_nanos_opt().unwrap_or_else(|| now.timestamp()),
        );

        self.state = Some(IndexState {
            model,
            dimension,
            chunk_ids,
            vectors,
            chunks,
            build_id,
            source_fingerprint,
            created_at: now.timestamp(),
        });
        info!(
            "Built index with {} vectors of dimension {}",
            self.len(),
            dimension
        );
        Ok(())
    }

    /// The `top_k` chunks nearest to `query`, closest first.
    ///
    /// `top_k` is clamped to the index size. Equal distances keep row order.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievalResult>> {
        let state = self.state.as_ref().ok_or(RetrieverError::IndexNotBuilt)?;
        let k = top_k.min(state.chunks.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed_text(query).await?;
        if query_vector.len() != state.dimension {
            return Err(RetrieverError::DimensionMismatch {
                expected: format!("{} values per vector", state.dimension),
                found: format!("{} values", query_vector.len()),
            });
        }

        let mut ranked: Vec<(usize, f32)> = (0..state.chunks.len())
            .map(|row| (row, l2_distance(&query_vector, state.row(row))))
            .collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        ranked.truncate(k);
        debug!("Search returned {} of {} rows", ranked.len(), state.chunks.len());

        Ok(ranked
            .into_iter()
            .map(|(row, distance)| RetrievalResult {
                chunk: state.chunks[row].clone(),
                distance,
                score: score_from_distance(distance),
            })
            .collect())
    }

    /// Write the vector and chunk artifacts, creating parent directories.
    pub fn save(
        &self,
        index_path: impl AsRef<Path>,
        chunks_path: impl AsRef<Path>,
    ) -> Result<()> {
        let state = self.state.as_ref().ok_or(RetrieverError::IndexNotBuilt)?;
        let header = VectorHeader {
            format_version: FORMAT_VERSION,
            metric: DistanceMetric::L2,
            byte_order: ByteOrder::native(),
            dimension: state.dimension,
            count: state.chunks.len(),
            model: state.model.clone(),
            build_id: state.build_id.clone(),
            source_fingerprint: state.source_fingerprint.clone(),
            created_at: state.created_at,
        };
        artifact::write_vectors(
            index_path.as_ref(),
            &header,
            &state.chunk_ids,
            &state.vectors,
        )?;
        artifact::write_chunks(chunks_path.as_ref(), &state.build_id, &state.chunks)?;
        info!(
            "Saved index ({} chunks) to {} and {}",
            state.chunks.len(),
            index_path.as_ref().display(),
            chunks_path.as_ref().display()
        );
        Ok(())
    }

    /// Replace the index contents with previously saved artifacts.
    ///
    /// # Errors
    ///
    /// - [`RetrieverError::MissingArtifact`] if either file is absent,
    ///   checked before anything is decoded
    /// - [`RetrieverError::CorruptArtifact`] if a file cannot be decoded or
    ///   the two files come from different builds or disagree on count or
    ///   chunk ids
    /// - [`RetrieverError::ModelMismatch`] if the vectors came from a
    ///   different embedding model than this index's embedder
    pub fn load(
        &mut self,
        index_path: impl AsRef<Path>,
        chunks_path: impl AsRef<Path>,
    ) -> Result<()> {
        let index_path = index_path.as_ref();
        let chunks_path = chunks_path.as_ref();

        artifact::ensure_present(index_path)?;
        artifact::ensure_present(chunks_path)?;

        let stored = artifact::read_vectors(index_path)?;
        let stored_chunks = artifact::read_chunks(chunks_path)?;
        let header = stored.header;

        if header.count == 0 {
            return Err(RetrieverError::corrupt(index_path, "index holds no vectors"));
        }
        if stored_chunks.build_id != header.build_id {
            return Err(RetrieverError::corrupt(
                chunks_path,
                format!(
                    "chunk file is from build {} but {} is from build {}",
                    stored_chunks.build_id,
                    index_path.display(),
                    header.build_id
                ),
            ));
        }
        let chunks = stored_chunks.chunks;
        if chunks.len() != header.count {
            return Err(RetrieverError::corrupt(
                chunks_path,
                format!(
                    "{} chunks for {} vectors in {}",
                    chunks.len(),
                    header.count,
                    index_path.display()
                ),
            ));
        }
        if let Some((row, (id, chunk))) = stored
            .chunk_ids
            .iter()
            .zip(&chunks)
            .enumerate()
            .find(|(_, (id, chunk))| **id != chunk.chunk_id)
        {
            return Err(RetrieverError::corrupt(
                chunks_path,
                format!(
                    "row {row} holds vector for chunk {id} but chunk file has chunk {}",
                    chunk.chunk_id
                ),
            ));
        }

        let current = EmbeddingModelMetadata::from_provider(self.embedder.as_ref());
        if header.model.model_id() != current.model_id() || header.dimension != current.dimension {
            return Err(RetrieverError::ModelMismatch {
                expected: header.model.model_id(),
                found: current.model_id(),
            });
        }

        self.state = Some(IndexState {
            model: header.model,
            dimension: header.dimension,
            chunk_ids: stored.chunk_ids,
            vectors: stored.vectors,
            chunks,
            build_id: header.build_id,
            source_fingerprint: header.source_fingerprint,
            created_at: header.created_at,
        });
        info!(
            "Loaded index with {} chunks from {}",
            self.len(),
            index_path.display()
        );
        Ok(())
    }
}
