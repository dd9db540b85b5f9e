//! Vector index over syllabus chunks.
//!
//! The index holds one embedding per [`Chunk`] and answers nearest-neighbor
//! queries by exact (brute-force) Euclidean distance. Every vector row carries
//! the id of the chunk it was computed from, so rows and chunk metadata stay
//! aligned through build, save and load.
//!
//! ## Key Components
//!
//! - **[`VectorIndex`]**: build, search, save and load
//! - **[`artifact`]**: the on-disk formats of the two persisted files
//! - **Data Types**: [`Chunk`], [`RetrievalResult`], [`EmbeddingModelMetadata`],
//!   [`IndexStats`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use syllabus_rag_embed::HashingEmbedProvider;
//! use syllabus_rag_retriever::index::{Chunk, VectorIndex};
//!
//! # async fn example() -> syllabus_rag_retriever::Result<()> {
//! let mut index = VectorIndex::new(Arc::new(HashingEmbedProvider::default()));
//! index
//!     .build(vec![
//!         Chunk::new(0, "Unit 1 agents and environments").with_unit("Unit-1"),
//!         Chunk::new(1, "Unit 2 uninformed search").with_unit("Unit-2"),
//!     ])
//!     .await?;
//!
//! for result in index.search("search strategies", 1).await? {
//!     println!("{} {:.3}", result.chunk.unit, result.score);
//! }
//! index.save("rag_index.vec", "chunks.json")?;
//! # Ok(())
//! # }
//! ```

use crate::taxonomy::DEFAULT_TAXONOMY_TAG;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use syllabus_rag_context::UNKNOWN_UNIT;
use syllabus_rag_embed::EmbeddingProvider;

pub mod artifact;
pub mod flat;

pub use flat::{VectorIndex, l2_distance, score_from_distance};

/// Position of a chunk in ingestion order, starting at 0.
pub type ChunkId = u32;

/// A contiguous word window of the source document with its labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: ChunkId,
    pub text: String,
    /// `"Unit-{n}"` or `"Unknown"`
    pub unit: String,
    /// Bloom level assigned at ingestion
    pub taxonomy_tag: String,
    /// 1-based source page of the chunk's first word
    #[serde(default = "first_page")]
    pub page: u32,
}

fn first_page() -> u32 {
    1
}

impl Chunk {
    /// A chunk on page 1 with unknown unit and the default taxonomy tag.
    pub fn new(chunk_id: ChunkId, text: impl Into<String>) -> Self {
        Self {
            chunk_id,
            text: text.into(),
            unit: UNKNOWN_UNIT.to_string(),
            taxonomy_tag: DEFAULT_TAXONOMY_TAG.to_string(),
            page: first_page(),
        }
    }

    pub fn with_unit(self, unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            ..self
        }
    }

    pub fn with_taxonomy_tag(self, taxonomy_tag: impl Into<String>) -> Self {
        Self {
            taxonomy_tag: taxonomy_tag.into(),
            ..self
        }
    }

    pub fn with_page(self, page: u32) -> Self {
        Self { page, ..self }
    }
}

/// One ranked hit: the chunk, its L2 distance to the query and
/// `score = 1 / (1 + distance)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub chunk: Chunk,
    pub distance: f32,
    pub score: f32,
}

/// Identifies the embedder that produced an index's vectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingModelMetadata {
    pub provider: String,
    pub model_name: String,
    pub dimension: usize,
    pub normalized: bool,
}

impl EmbeddingModelMetadata {
    pub fn from_provider(provider: &dyn EmbeddingProvider) -> Self {
        Self {
            provider: provider.provider_name().to_string(),
            model_name: provider.model_name().to_string(),
            dimension: provider.embedding_dimension(),
            normalized: provider.normalized(),
        }
    }

    /// `provider:model:dimension`, e.g. `fastembed:all-MiniLM-L6-v2:384`
    pub fn model_id(&self) -> String {
        format!("{}:{}:{}", self.provider, self.model_name, self.dimension)
    }
}

/// Summary of a built index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    pub chunk_count: usize,
    pub dimension: usize,
    pub model_id: String,
    /// Chunks per unit label
    pub units: BTreeMap<String, usize>,
    /// blake3 hex digest of the ingested source document, when known
    pub source_fingerprint: Option<String>,
    /// Unix timestamp of the build
    pub created_at: i64,
}
