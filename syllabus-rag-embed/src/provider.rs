//! Embedding provider implementations

use crate::config::{EmbedConfig, canonical_model_name};
use crate::error::{EmbedError, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use fnv::FnvHasher;
use half::f16;
use std::collections::HashMap;
use std::hash::Hasher;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

/// Result of embedding generation
#[derive(Debug, Clone)]
pub struct EmbeddingResult {
    /// The generated embeddings, one per input text
    pub embeddings: Vec<Vec<f16>>,
    /// The dimension of each embedding vector
    pub dimension: usize,
}

impl EmbeddingResult {
    /// Create a new embedding result from a vector of f16 embeddings.
    ///
    /// The dimension is inferred from the first embedding vector.
    /// If the embeddings vector is empty, dimension defaults to 0.
    pub fn new(embeddings: Vec<Vec<f16>>) -> Self {
        let dimension = embeddings.first().map(|e| e.len()).unwrap_or(0);
        Self {
            embeddings,
            dimension,
        }
    }

    /// Returns the number of embedding vectors in this result.
    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    /// Returns `true` if this result contains no embedding vectors.
    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }

    /// Returns `true` if every row has exactly `dimension` values.
    pub fn is_rectangular(&self) -> bool {
        self.embeddings.iter().all(|e| e.len() == self.dimension)
    }
}

/// Type alias for cached model entries (model, dimension)
type ModelCacheEntry = (Arc<Mutex<TextEmbedding>>, usize);

/// Global cache for initialized embedding models to avoid reloading
static MODEL_CACHE: OnceLock<Mutex<HashMap<String, ModelCacheEntry>>> = OnceLock::new();

/// Get the global model cache
fn get_model_cache() -> &'static Mutex<HashMap<String, ModelCacheEntry>> {
    MODEL_CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

fn lock_cache() -> MutexGuard<'static, HashMap<String, ModelCacheEntry>> {
    // The cache only holds fully constructed entries, so a poisoned lock
    // still guards consistent data.
    get_model_cache()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Trait for embedding providers that can generate embeddings from text
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for a single text
    async fn embed_text(&self, text: &str) -> Result<Vec<f16>>;

    /// Generate embeddings for multiple texts (batch processing)
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult>;

    /// Get the dimension of embeddings produced by this provider
    fn embedding_dimension(&self) -> usize;

    /// Get the name/identifier of this provider
    fn provider_name(&self) -> &str;

    /// Get the name of the model behind this provider
    fn model_name(&self) -> &str;

    /// Whether the produced vectors are L2-normalized
    fn normalized(&self) -> bool;
}

/// Maps a configured model name to the fastembed built-in model.
fn resolve_model(name: &str) -> Result<EmbeddingModel> {
    match canonical_model_name(name).to_ascii_lowercase().as_str() {
        "all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "snowflake-arctic-embed-xs" => Ok(EmbeddingModel::SnowflakeArcticEmbedXS),
        _ => Err(EmbedError::UnknownModel {
            name: name.to_string(),
        }),
    }
}

/// FastEmbed-based embedding provider using local ONNX models
#[derive(Clone)]
pub struct FastEmbedProvider {
    config: EmbedConfig,
    model: Option<Arc<Mutex<TextEmbedding>>>,
    dimension: usize,
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("config", &self.config)
            .field("model", &self.model.is_some())
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl FastEmbedProvider {
    /// Creates a new uninitialized provider. Call [`Self::initialize`] before embedding.
    pub fn new(config: EmbedConfig) -> Self {
        let dimension = config.known_dimension().unwrap_or(384);
        Self {
            config,
            model: None,
            dimension,
        }
    }

    /// Downloads (if needed) and loads the embedding model, reusing a cached
    /// instance when one exists for the same configuration.
    pub async fn initialize(&mut self) -> Result<()> {
        self.config.validate()?;
        tracing::info!(
            "Initializing FastEmbed provider for model: {}",
            self.config.model_name()
        );

        let cache_key = self.create_cache_key();

        let cached_data = {
            let cache = lock_cache();
            cache
                .get(&cache_key)
                .map(|(model, dim)| (Arc::clone(model), *dim))
        };

        if let Some((cached_model, cached_dimension)) = cached_data {
            tracing::info!("Using cached model for: {}", self.config.model_name());
            self.model = Some(cached_model);
            self.dimension = cached_dimension;
            return self.validate_model().await;
        }

        if let Some(dir) = &self.config.cache_dir {
            tokio::fs::create_dir_all(dir).await?;
        }

        let config = self.config.clone();
        let (model, dimension) =
            tokio::task::spawn_blocking(move || -> Result<(TextEmbedding, usize)> {
                tracing::info!("Loading embedding model: {}", config.model_name());

                let mut init_options = InitOptions::new(resolve_model(config.model_name())?)
                    .with_show_download_progress(config.show_download_progress);
                if let Some(dir) = &config.cache_dir {
                    init_options = init_options.with_cache_dir(dir.clone());
                }

                let mut model =
                    TextEmbedding::try_new(init_options).map_err(EmbedError::model_init)?;

                // Get dimension by embedding a sample text
                let sample = model
                    .embed(vec!["dimension check".to_string()], None)
                    .map_err(EmbedError::model_init)?;
                let dimension = sample
                    .first()
                    .map(|emb| emb.len())
                    .ok_or_else(|| EmbedError::model_init("model produced no sample embedding"))?;

                tracing::info!("Model loaded successfully. Dimension: {}", dimension);
                Ok((model, dimension))
            })
            .await??;

        let model_arc = Arc::new(Mutex::new(model));
        lock_cache().insert(cache_key, (Arc::clone(&model_arc), dimension));

        self.model = Some(model_arc);
        self.dimension = dimension;

        self.validate_model().await
    }

    /// Creates and initializes a provider in one step.
    pub async fn create(config: EmbedConfig) -> Result<Self> {
        let mut provider = Self::new(config);
        provider.initialize().await?;
        Ok(provider)
    }

    /// Create a cache key based on the model configuration
    fn create_cache_key(&self) -> String {
        let mut hasher = FnvHasher::default();
        hasher.write(b"v1:");
        hasher.write(canonical_model_name(&self.config.model_name).to_ascii_lowercase().as_bytes());
        if let Some(dir) = &self.config.cache_dir {
            hasher.write(dir.to_string_lossy().as_bytes());
        }

        format!("v1:{:x}", hasher.finish())
    }

    /// Validate that the model is working correctly
    async fn validate_model(&self) -> Result<()> {
        let embedding = self.embed_text("validation test").await?;

        if embedding.len() != self.dimension {
            return Err(EmbedError::invalid_config(format!(
                "Model validation failed: expected dimension {}, got {}",
                self.dimension,
                embedding.len()
            )));
        }

        if embedding.iter().any(|value| !value.to_f32().is_finite()) {
            return Err(EmbedError::invalid_config(
                "Model validation failed: non-finite values in embedding",
            ));
        }

        tracing::debug!("Model validation passed for: {}", self.config.model_name());
        Ok(())
    }

    /// Clears the global model cache.
    pub fn clear_cache() {
        lock_cache().clear();
        tracing::info!("Model cache cleared");
    }

    /// Returns the number of cached models.
    pub fn cache_size() -> usize {
        lock_cache().len()
    }

    /// Convert f32 embeddings to f16, normalizing when configured to
    fn convert_to_f16(&self, embeddings: Vec<Vec<f32>>) -> Vec<Vec<f16>> {
        embeddings
            .into_iter()
            .map(|mut embedding| {
                if self.config.normalize {
                    l2_normalize(&mut embedding);
                }
                embedding.into_iter().map(f16::from_f32).collect()
            })
            .collect()
    }
}

/// Scales `values` to unit L2 norm; zero vectors are left untouched.
pub(crate) fn l2_normalize(values: &mut [f32]) {
    let norm = values.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in values.iter_mut() {
            *value /= norm;
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f16>> {
        let texts = vec![text.to_string()];
        let result = self.embed_texts(&texts).await?;
        result
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::invalid_config("No embedding generated for text"))
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::new(vec![]));
        }

        let model = self.model.as_ref().ok_or_else(|| {
            EmbedError::invalid_config("Model not initialized. Call initialize() first.")
        })?;

        tracing::debug!("Generating embeddings for {} texts", texts.len());

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.config.batch_size.max(1)) {
            let chunk = chunk.to_vec();
            let model_clone = Arc::clone(model);

            let batch_embeddings = tokio::task::spawn_blocking(move || -> Result<Vec<Vec<f32>>> {
                tracing::debug!("Processing batch of {} texts", chunk.len());

                let mut model_guard = model_clone
                    .lock()
                    .map_err(|_| EmbedError::embedding_gen("embedding model lock poisoned"))?;
                model_guard
                    .embed(chunk, None)
                    .map_err(EmbedError::embedding_gen)
            })
            .await??;

            all_embeddings.extend(self.convert_to_f16(batch_embeddings));
        }

        tracing::debug!("Generated {} embeddings", all_embeddings.len());
        Ok(EmbeddingResult::new(all_embeddings))
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "fastembed"
    }

    fn model_name(&self) -> &str {
        self.config.model_name()
    }

    fn normalized(&self) -> bool {
        self.config.normalize
    }
}
