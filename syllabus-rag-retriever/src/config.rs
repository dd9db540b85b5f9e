//! Retrieval configuration.
//!
//! A [`RagConfig`] is an explicit value passed into constructors; nothing in
//! this crate reads global state. Files are TOML with every field optional:
//!
//! ```toml
//! chunk_size = 200
//! overlap = 40
//! top_k = 3
//! index_path = "data/rag_index.vec"
//! chunks_path = "data/chunks.json"
//! embedder = "hashing"
//! ```

use crate::error::{Result, RetrieverError};
use crate::taxonomy::{BLOOM_LEVELS, DEFAULT_TAXONOMY_TAG, is_bloom_level};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use syllabus_rag_context::{
    DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_UNIT_PATTERNS, UnitDetector,
    WordWindowChunker,
};
use syllabus_rag_embed::{
    DEFAULT_HASHING_DIMENSION, DEFAULT_MODEL_NAME, EmbedConfig, EmbeddingProvider,
    FastEmbedProvider, HashingEmbedProvider,
};
use tracing::{debug, warn};

/// Number of results returned when the caller does not ask for a count.
pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_INDEX_PATH: &str = "rag_index.vec";
pub const DEFAULT_CHUNKS_PATH: &str = "chunks.json";

/// Which embedding backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// Local sentence-embedding model via fastembed
    #[default]
    FastEmbed,
    /// Deterministic feature hashing, no model download
    Hashing,
}

impl FromStr for EmbedderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fastembed" => Ok(EmbedderKind::FastEmbed),
            "hashing" => Ok(EmbedderKind::Hashing),
            _ => Err(format!("Invalid embedder: {s}")),
        }
    }
}

impl fmt::Display for EmbedderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbedderKind::FastEmbed => write!(f, "fastembed"),
            EmbedderKind::Hashing => write!(f, "hashing"),
        }
    }
}

/// What [`RagConfig::load`] does when the file is missing or invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPolicy {
    /// Return a [`RetrieverError::Configuration`]
    Strict,
    /// Log a warning and use [`RagConfig::default`]
    Lenient,
}

/// Settings shared by ingestion, indexing and retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RagConfig {
    /// Words per chunk
    pub chunk_size: usize,
    /// Words shared by consecutive chunks; must be less than `chunk_size`
    pub overlap: usize,
    /// Results returned by retrieval when no count is given
    pub top_k: usize,
    /// Vector artifact location
    pub index_path: PathBuf,
    /// Chunk artifact location
    pub chunks_path: PathBuf,
    /// Bloom level stamped on every ingested chunk
    pub default_taxonomy_tag: String,
    /// Unit heading regexes in priority order, each capturing the unit number
    pub unit_patterns: Vec<String>,
    pub embedder: EmbedderKind,
    /// fastembed model name
    pub embedding_model: String,
    /// Bucket count for the hashing embedder
    pub hashing_dimension: usize,
    /// Where fastembed caches downloaded models
    pub model_cache_dir: Option<PathBuf>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
            top_k: DEFAULT_TOP_K,
            index_path: PathBuf::from(DEFAULT_INDEX_PATH),
            chunks_path: PathBuf::from(DEFAULT_CHUNKS_PATH),
            default_taxonomy_tag: DEFAULT_TAXONOMY_TAG.to_string(),
            unit_patterns: DEFAULT_UNIT_PATTERNS.iter().map(|p| p.to_string()).collect(),
            embedder: EmbedderKind::default(),
            embedding_model: DEFAULT_MODEL_NAME.to_string(),
            hashing_dimension: DEFAULT_HASHING_DIMENSION,
            model_cache_dir: None,
        }
    }
}

impl RagConfig {
    /// Read a TOML config file.
    ///
    /// Under [`LoadPolicy::Strict`] a missing, unparseable or invalid file is
    /// an error. Under [`LoadPolicy::Lenient`] the problem is logged and the
    /// defaults are returned instead.
    pub fn load(path: &Path, policy: LoadPolicy) -> Result<Self> {
        match Self::load_strict(path) {
            Ok(config) => Ok(config),
            Err(e) if policy == LoadPolicy::Lenient => {
                warn!("Using default configuration: {}", e);
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    fn load_strict(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            RetrieverError::configuration(format!(
                "cannot read config file {}: {e}",
                path.display()
            ))
        })?;
        let config = Self::from_toml_str(&contents)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| RetrieverError::configuration(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the chunk window, unit patterns, `top_k` and taxonomy tag.
    pub fn validate(&self) -> Result<()> {
        self.chunker()?;
        self.unit_detector()?;
        if self.top_k == 0 {
            return Err(RetrieverError::configuration("top_k must be > 0"));
        }
        if !is_bloom_level(&self.default_taxonomy_tag) {
            return Err(RetrieverError::configuration(format!(
                "default_taxonomy_tag {:?} is not one of {}",
                self.default_taxonomy_tag,
                BLOOM_LEVELS.join(", ")
            )));
        }
        if self.embedder == EmbedderKind::Hashing && self.hashing_dimension == 0 {
            return Err(RetrieverError::configuration(
                "hashing_dimension must be > 0",
            ));
        }
        Ok(())
    }

    pub fn chunker(&self) -> Result<WordWindowChunker> {
        Ok(WordWindowChunker::new(self.chunk_size, self.overlap)?)
    }

    pub fn unit_detector(&self) -> Result<UnitDetector> {
        Ok(UnitDetector::new(&self.unit_patterns)?)
    }

    /// fastembed settings derived from this config.
    pub fn embed_config(&self) -> EmbedConfig {
        let config = EmbedConfig::new(&self.embedding_model);
        match &self.model_cache_dir {
            Some(dir) => config.with_cache_dir(dir),
            None => config,
        }
    }

    /// Construct the configured embedding backend.
    pub async fn create_embedder(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        let provider: Arc<dyn EmbeddingProvider> = match self.embedder {
            EmbedderKind::FastEmbed => {
                Arc::new(FastEmbedProvider::create(self.embed_config()).await?)
            }
            EmbedderKind::Hashing => Arc::new(HashingEmbedProvider::new(self.hashing_dimension)?),
        };
        debug!(
            "Created {} embedder with model {}",
            provider.provider_name(),
            provider.model_name()
        );
        Ok(provider)
    }

    /// Set both artifact paths under `dir` (builder style)
    pub fn with_artifact_dir<P: AsRef<Path>>(self, dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            index_path: dir.join(DEFAULT_INDEX_PATH),
            chunks_path: dir.join(DEFAULT_CHUNKS_PATH),
            ..self
        }
    }

    /// Set the chunk window (builder style)
    pub fn with_window(self, chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size,
            overlap,
            ..self
        }
    }

    /// Set the default result count (builder style)
    pub fn with_top_k(self, top_k: usize) -> Self {
        Self { top_k, ..self }
    }

    /// Set the embedding backend (builder style)
    pub fn with_embedder(self, embedder: EmbedderKind) -> Self {
        Self { embedder, ..self }
    }
}
