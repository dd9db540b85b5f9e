//! syllabus-rag-retriever: semantic retrieval over a course syllabus
//!
//! Ingests a syllabus document into overlapping, unit-labelled chunks, embeds
//! them into an exact L2 nearest-neighbor index that persists to disk, and
//! answers queries with the closest chunks, optionally narrowed to one unit
//! or Bloom level.
//!
//! ## Key Modules
//!
//! - **[`ingest`]**: text/PDF loading, chunking and unit labelling
//! - **[`index`]**: the vector index and its on-disk artifacts
//! - **[`retriever`]**: readiness, filtered retrieval and context formatting
//! - **[`config`]**: [`RagConfig`] and strict/lenient loading
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use syllabus_rag_retriever::{RagConfig, RetrieveOptions, Retriever};
//!
//! # async fn example() -> syllabus_rag_retriever::Result<()> {
//! let config = RagConfig::default();
//! let embedder = config.create_embedder().await?;
//!
//! let mut retriever = Retriever::open(config, embedder);
//! if !retriever.is_ready() {
//!     retriever.build_from_file(Path::new("syllabus.pdf")).await?;
//! }
//!
//! let options = RetrieveOptions::top_k(3).with_unit("Unit-2");
//! for result in retriever.retrieve("heuristic search", &options).await? {
//!     println!("[{}] {:.3} {}", result.chunk.unit, result.score, result.chunk.text);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Syllabus → Ingestor → Chunks → Embedder → VectorIndex ⇄ rag_index.vec + chunks.json
//!                                               ↓
//!                    query → Retriever → filters → results / context block
//! ```

pub mod config;
pub mod error;
pub mod index;
pub mod ingest;
pub mod retriever;
pub mod taxonomy;

pub use config::{EmbedderKind, LoadPolicy, RagConfig};
pub use error::{Result, RetrieverError};
pub use index::{Chunk, ChunkId, EmbeddingModelMetadata, IndexStats, RetrievalResult, VectorIndex};
pub use ingest::{IngestedDocument, Ingestor, PdfPage, SourceKind};
pub use retriever::{ContextSource, RetrieveOptions, Retriever, RetrieverStatus, format_context};
pub use taxonomy::{BLOOM_LEVELS, DEFAULT_TAXONOMY_TAG};
