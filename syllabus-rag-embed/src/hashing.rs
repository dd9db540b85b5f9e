//! Deterministic feature-hashing embedder.
//!
//! Each lowercase alphanumeric token is hashed with FNV-1a into one of
//! `dimension` buckets and counted; the count vector is then L2-normalized.
//! Vectors depend only on the text and the dimension, so indexes built with
//! this provider can be rebuilt and searched without downloading a model.
//! Similarity is lexical: texts sharing words end up close together.

use crate::error::{EmbedError, Result};
use crate::provider::{EmbeddingProvider, EmbeddingResult, l2_normalize};
use async_trait::async_trait;
use fnv::FnvHasher;
use half::f16;
use std::hash::Hasher;

/// Default dimension, matching the default sentence-embedding model.
pub const DEFAULT_HASHING_DIMENSION: usize = 384;

#[derive(Debug, Clone)]
pub struct HashingEmbedProvider {
    dimension: usize,
    model_name: String,
}

impl HashingEmbedProvider {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(EmbedError::invalid_config(
                "hashing embedder dimension must be > 0",
            ));
        }
        Ok(Self {
            dimension,
            model_name: format!("fnv-hashing-{dimension}"),
        })
    }

    fn bucket(&self, token: &str) -> usize {
        let mut hasher = FnvHasher::default();
        hasher.write(token.as_bytes());
        (hasher.finish() % self.dimension as u64) as usize
    }

    /// Embeds one text synchronously.
    pub fn embed_sync(&self, text: &str) -> Vec<f16> {
        let mut counts = vec![0.0f32; self.dimension];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            counts[self.bucket(&token.to_lowercase())] += 1.0;
        }
        l2_normalize(&mut counts);
        counts.into_iter().map(f16::from_f32).collect()
    }
}

impl Default for HashingEmbedProvider {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_HASHING_DIMENSION,
            model_name: format!("fnv-hashing-{DEFAULT_HASHING_DIMENSION}"),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f16>> {
        Ok(self.embed_sync(text))
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        tracing::debug!("Hashing {} texts into {} buckets", texts.len(), self.dimension);
        let embeddings = texts.iter().map(|t| self.embed_sync(t)).collect();
        Ok(EmbeddingResult::new(embeddings))
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "hashing"
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn normalized(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(v: &[f16]) -> f32 {
        v.iter().map(|x| x.to_f32() * x.to_f32()).sum::<f32>().sqrt()
    }

    #[test]
    fn test_rejects_zero_dimension() {
        assert!(matches!(
            HashingEmbedProvider::new(0),
            Err(EmbedError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_deterministic_and_case_insensitive() {
        let provider = HashingEmbedProvider::new(64).unwrap();
        let a = provider.embed_sync("Unit 2: Informed Search");
        let b = provider.embed_sync("unit 2 informed search");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!((norm(&a) - 1.0).abs() < 1e-2);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let provider = HashingEmbedProvider::default();
        let v = provider.embed_sync("  ... ");
        assert_eq!(v.len(), DEFAULT_HASHING_DIMENSION);
        assert!(v.iter().all(|x| x.to_f32() == 0.0));
    }

    #[test]
    fn test_batch_matches_single() {
        let provider = HashingEmbedProvider::new(128).unwrap();
        let texts = vec!["agents".to_string(), "search and planning".to_string()];

        let batch = tokio_test::block_on(provider.embed_texts(&texts)).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.dimension, 128);
        for (text, row) in texts.iter().zip(&batch.embeddings) {
            let single = tokio_test::block_on(provider.embed_text(text)).unwrap();
            assert_eq!(&single, row);
        }
    }

    #[test]
    fn test_provider_identity() {
        let provider = HashingEmbedProvider::new(32).unwrap();
        assert_eq!(provider.provider_name(), "hashing");
        assert_eq!(provider.model_name(), "fnv-hashing-32");
        assert_eq!(provider.embedding_dimension(), 32);
        assert!(provider.normalized());
    }
}
