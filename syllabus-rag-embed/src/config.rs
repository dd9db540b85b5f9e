//! Configuration for embedding models

use crate::error::{EmbedError, Result};
use derive_builder::Builder;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Model used when no other is configured.
pub const DEFAULT_MODEL_NAME: &str = "all-MiniLM-L6-v2";

/// Sentence-embedding models this crate can load locally, with the dimension
/// of the vectors they produce.
pub const KNOWN_MODELS: &[(&str, usize)] = &[
    ("all-MiniLM-L6-v2", 384),
    ("bge-small-en-v1.5", 384),
    ("snowflake-arctic-embed-xs", 384),
];

/// Configuration for embedding models
#[derive(Debug, Clone, Builder, Serialize)]
#[builder(setter(into))]
pub struct EmbedConfig {
    /// Name of the embedding model to use (see [`KNOWN_MODELS`])
    #[builder(default = "DEFAULT_MODEL_NAME.to_string()")]
    pub model_name: String,
    /// Directory where downloaded model files are cached
    #[builder(setter(into, strip_option), default)]
    pub cache_dir: Option<PathBuf>,
    /// Maximum batch size for embedding generation
    #[builder(default = "32")]
    pub batch_size: usize,
    /// Whether to L2-normalize embeddings. Off by default so the index sees
    /// the model's native geometry.
    #[builder(default = "false")]
    pub normalize: bool,
    /// Show a progress bar while downloading model files
    #[builder(default = "false")]
    pub show_download_progress: bool,
}

impl EmbedConfig {
    /// Create a new embedding configuration using the builder
    pub fn builder() -> EmbedConfigBuilder {
        EmbedConfigBuilder::default()
    }

    /// Create a configuration for the named model with default settings
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ..Self::default()
        }
    }

    /// Set the model cache directory (builder style)
    pub fn with_cache_dir<P: AsRef<Path>>(self, cache_dir: P) -> Self {
        Self {
            cache_dir: Some(cache_dir.as_ref().to_path_buf()),
            ..self
        }
    }

    /// Set the batch size for embedding generation (builder style)
    pub fn with_batch_size(self, batch_size: usize) -> Self {
        Self { batch_size, ..self }
    }

    /// Set whether to normalize embeddings (builder style)
    pub fn with_normalize(self, normalize: bool) -> Self {
        Self { normalize, ..self }
    }

    /// Get the model name
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Dimension of the configured model, if it is a known model.
    ///
    /// Model names are matched case-insensitively, with or without an
    /// organization prefix such as `sentence-transformers/`.
    pub fn known_dimension(&self) -> Option<usize> {
        let wanted = canonical_model_name(&self.model_name);
        KNOWN_MODELS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
            .map(|(_, dimension)| *dimension)
    }

    /// Validate the configuration without loading the model
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(EmbedError::invalid_config("batch_size must be > 0"));
        }
        if self.known_dimension().is_none() {
            return Err(EmbedError::UnknownModel {
                name: self.model_name.clone(),
            });
        }
        if let Some(dir) = &self.cache_dir {
            if dir.exists() && !dir.is_dir() {
                return Err(EmbedError::invalid_config(format!(
                    "cache_dir is not a directory: {}",
                    dir.display()
                )));
            }
        }

        tracing::debug!("Embedding config validated for: {}", self.model_name);
        Ok(())
    }
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL_NAME.to_string(),
            cache_dir: None,
            batch_size: 32,
            normalize: false,
            show_download_progress: false,
        }
    }
}

/// Strips an organization prefix (`org/model` → `model`).
pub(crate) fn canonical_model_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name).trim()
}
