//! # syllabus-rag-embed
//!
//! Text embedding for the syllabus retrieval index. Providers turn a batch of
//! chunk texts (or a single query) into fixed-dimension vectors behind the
//! async [`EmbeddingProvider`] trait.
//!
//! ## Providers
//!
//! - [`FastEmbedProvider`]: local ONNX sentence-embedding models via FastEmbed
//!   (`all-MiniLM-L6-v2` by default, 384 dimensions). Models are downloaded
//!   on first use and cached process-wide.
//! - [`HashingEmbedProvider`]: deterministic feature hashing with no model
//!   files, for offline builds and tests.
//!
//! ## Quick Start
//!
//! ```no_run
//! use syllabus_rag_embed::{EmbedConfig, EmbeddingProvider, FastEmbedProvider};
//!
//! # async fn example() -> syllabus_rag_embed::Result<()> {
//! let provider = FastEmbedProvider::create(EmbedConfig::default()).await?;
//!
//! let texts = vec!["Unit 1 Introduction to AI".to_string(), "Unit 2 Search".to_string()];
//! let result = provider.embed_texts(&texts).await?;
//!
//! println!("Generated {} embeddings of dimension {}",
//!          result.len(), result.dimension);
//! # Ok(())
//! # }
//! ```
//!
//! ## Precision
//!
//! Vectors are returned as half-precision (`f16`) values to halve the memory
//! and on-disk size of an index.
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`] using the crate's [`EmbedError`] type.

pub mod config;
pub mod error;
pub mod hashing;
pub mod provider;

// Re-export main types for easy access
pub use config::{DEFAULT_MODEL_NAME, EmbedConfig, KNOWN_MODELS};
pub use error::{EmbedError, Result};
pub use hashing::{DEFAULT_HASHING_DIMENSION, HashingEmbedProvider};
pub use provider::{EmbeddingProvider, EmbeddingResult, FastEmbedProvider};
