//! Query-time retrieval over a persisted index.
//!
//! A [`Retriever`] is either ready (its index was built or loaded) or not.
//! When it is not ready, retrieval returns no results instead of failing, so
//! downstream generation can proceed without grounding.

use crate::config::RagConfig;
use crate::error::{Result, RetrieverError};
use crate::index::{EmbeddingModelMetadata, IndexStats, RetrievalResult, VectorIndex};
use crate::ingest::Ingestor;
use async_trait::async_trait;
use itertools::Itertools;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use syllabus_rag_embed::EmbeddingProvider;
use tracing::{debug, info, warn};

/// Per-query retrieval settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrieveOptions {
    /// Result count; the configured `top_k` when `None`
    pub top_k: Option<usize>,
    /// Keep chunks whose unit contains this text, ignoring case
    pub unit_filter: Option<String>,
    /// Keep chunks whose taxonomy tag equals this exactly
    pub bloom_filter: Option<String>,
}

impl RetrieveOptions {
    pub fn top_k(top_k: usize) -> Self {
        Self {
            top_k: Some(top_k),
            ..Self::default()
        }
    }

    pub fn with_unit(self, unit: impl Into<String>) -> Self {
        Self {
            unit_filter: Some(unit.into()),
            ..self
        }
    }

    pub fn with_bloom(self, level: impl Into<String>) -> Self {
        Self {
            bloom_filter: Some(level.into()),
            ..self
        }
    }

    fn accepts(&self, result: &RetrievalResult) -> bool {
        let unit_ok = self.unit_filter.as_deref().is_none_or(|unit| {
            result
                .chunk
                .unit
                .to_lowercase()
                .contains(&unit.to_lowercase())
        });
        let bloom_ok = self
            .bloom_filter
            .as_deref()
            .is_none_or(|level| result.chunk.taxonomy_tag == level);
        unit_ok && bloom_ok
    }
}

/// Snapshot of a retriever for status displays.
#[derive(Debug, Clone, Serialize)]
pub struct RetrieverStatus {
    pub ready: bool,
    pub chunk_count: usize,
    pub dimension: Option<usize>,
    /// Model recorded in the index, or the embedder's when not ready
    pub model_id: String,
    pub index_path: PathBuf,
    pub chunks_path: PathBuf,
    pub index_exists: bool,
    pub chunks_exists: bool,
    pub units: BTreeMap<String, usize>,
    pub source_fingerprint: Option<String>,
    pub created_at: Option<i64>,
}

/// Grounding context for downstream generation.
///
/// Consumers depend on this trait rather than on [`Retriever`], so they can
/// run with no retrieval at all.
#[async_trait]
pub trait ContextSource: Send + Sync {
    fn is_ready(&self) -> bool;

    async fn retrieve(
        &self,
        query: &str,
        options: &RetrieveOptions,
    ) -> Result<Vec<RetrievalResult>>;

    async fn retrieve_context(&self, query: &str, top_k: Option<usize>) -> Result<String>;
}

/// Render results as numbered context blocks:
///
/// ```text
/// [Chunk 1 - Unit-2]
/// <text>
///
/// [Chunk 2 - Unit-2]
/// <text>
/// ```
pub fn format_context(results: &[RetrievalResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("[Chunk {} - {}]\n{}", i + 1, r.chunk.unit, r.chunk.text))
        .join("\n\n")
}

/// Filtered semantic retrieval over one syllabus index.
#[derive(Debug)]
pub struct Retriever {
    config: RagConfig,
    index: VectorIndex,
}

impl Retriever {
    /// A retriever with an empty index; not ready until built or reloaded.
    pub fn new(config: RagConfig, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            config,
            index: VectorIndex::new(embedder),
        }
    }

    /// Load the index from the configured artifact paths.
    ///
    /// Missing or unreadable artifacts are logged and leave the retriever
    /// not ready; they are not errors here.
    pub fn open(config: RagConfig, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        let mut retriever = Self::new(config, embedder);
        if let Err(e) = retriever.reload() {
            warn!("Retriever not ready: {}", e);
        }
        retriever
    }

    /// Wrap an index that is already built.
    pub fn from_index(config: RagConfig, index: VectorIndex) -> Self {
        Self { config, index }
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn is_ready(&self) -> bool {
        self.index.is_built()
    }

    /// The best chunks for `query` that pass the option filters, closest
    /// first. Empty when not ready.
    ///
    /// Filters apply after the nearest-neighbor search, which fetches twice
    /// the requested count, so fewer than `top_k` results can come back even
    /// when more matching chunks exist.
    pub async fn retrieve(
        &self,
        query: &str,
        options: &RetrieveOptions,
    ) -> Result<Vec<RetrievalResult>> {
        if !self.is_ready() {
            debug!("Retrieval skipped: index not ready");
            return Ok(Vec::new());
        }
        let top_k = options.top_k.unwrap_or(self.config.top_k);
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let candidates = self.index.search(query, top_k.saturating_mul(2)).await?;
        let fetched = candidates.len();
        let mut results: Vec<RetrievalResult> = candidates
            .into_iter()
            .filter(|r| options.accepts(r))
            .collect();
        results.truncate(top_k);
        debug!(
            "Retrieved {} of {} candidates for query ({} requested)",
            results.len(),
            fetched,
            top_k
        );
        Ok(results)
    }

    /// Retrieved chunks formatted by [`format_context`]; empty when nothing
    /// was retrieved.
    pub async fn retrieve_context(&self, query: &str, top_k: Option<usize>) -> Result<String> {
        let options = RetrieveOptions {
            top_k,
            ..RetrieveOptions::default()
        };
        let results = self.retrieve(query, &options).await?;
        Ok(format_context(&results))
    }

    /// Ingest `path`, build the index, save both artifacts and become ready.
    ///
    /// On any failure the previous index, if any, stays in place.
    pub async fn build_from_file(&mut self, path: &Path) -> Result<IndexStats> {
        let ingestor = Ingestor::new(&self.config)?;
        let document = ingestor.ingest_file(path)?;

        let mut index = VectorIndex::new(self.index.embedder().clone());
        index
            .build_with_source(document.chunks, Some(document.fingerprint))
            .await?;
        index.save(&self.config.index_path, &self.config.chunks_path)?;

        self.index = index;
        info!("Index ready with {} chunks", self.index.len());
        self.index.stats().ok_or(RetrieverError::IndexNotBuilt)
    }

    /// Reload the index from the configured artifact paths.
    ///
    /// Unlike [`open`](Self::open), failures are returned. A failed reload
    /// keeps the current index.
    pub fn reload(&mut self) -> Result<()> {
        self.index
            .load(&self.config.index_path, &self.config.chunks_path)
    }

    pub fn status(&self) -> RetrieverStatus {
        let stats = self.index.stats();
        let model_id = match &stats {
            Some(stats) => stats.model_id.clone(),
            None => EmbeddingModelMetadata::from_provider(
                self.index.embedder().as_ref(),
            )
            .model_id(),
        };
        RetrieverStatus {
            ready: self.is_ready(),
            chunk_count: self.index.len(),
            dimension: self.index.dimension(),
            model_id,
            index_path: self.config.index_path.clone(),
            chunks_path: self.config.chunks_path.clone(),
            index_exists: self.config.index_path.is_file(),
            chunks_exists: self.config.chunks_path.is_file(),
            units: stats.as_ref().map(|s| s.units.clone()).unwrap_or_default(),
            source_fingerprint: stats.as_ref().and_then(|s| s.source_fingerprint.clone()),
            created_at: stats.as_ref().map(|s| s.created_at),
        }
    }
}

#[async_trait]
impl ContextSource for Retriever {
    fn is_ready(&self) -> bool {
        Retriever::is_ready(self)
    }

    async fn retrieve(
        &self,
        query: &str,
        options: &RetrieveOptions,
    ) -> Result<Vec<RetrievalResult>> {
        Retriever::retrieve(self, query, options).await
    }

    async fn retrieve_context(&self, query: &str, top_k: Option<usize>) -> Result<String> {
        Retriever::retrieve_context(self, query, top_k).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Chunk;
    use syllabus_rag_embed::HashingEmbedProvider;
    use tempfile::tempdir;
    use tracing_test::traced_test;

    fn embedder() -> Arc<dyn EmbeddingProvider> {
        Arc::new(HashingEmbedProvider::new(256).unwrap())
    }

    fn chunks() -> Vec<Chunk> {
        vec![
            Chunk::new(0, "Unit 1 intelligent agents and environments").with_unit("Unit-1"),
            Chunk::new(1, "Unit 2 uninformed search breadth first search")
                .with_unit("Unit-2")
                .with_taxonomy_tag("Understand"),
            Chunk::new(2, "Unit 2 informed search heuristics A star search").with_unit("Unit-2"),
            Chunk::new(3, "Unit 3 classical planning and scheduling").with_unit("Unit-3"),
            Chunk::new(4, "Unit 10 search in reinforcement learning").with_unit("Unit-10"),
        ]
    }

    async fn ready_retriever() -> Retriever {
        let mut index = VectorIndex::new(embedder());
        index.build(chunks()).await.unwrap();
        Retriever::from_index(RagConfig::default(), index)
    }

    #[tokio::test]
    #[traced_test]
    async fn test_open_without_artifacts_is_not_ready() {
        let temp_dir = tempdir().unwrap();
        let config = RagConfig::default().with_artifact_dir(temp_dir.path());
        let retriever = Retriever::open(config, embedder());

        assert!(!retriever.is_ready());
        assert!(logs_contain("Retriever not ready"));
        assert!(retriever.retrieve("search", &RetrieveOptions::default()).await.unwrap().is_empty());
        assert_eq!(retriever.retrieve_context("search", Some(3)).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_reload_reports_errors() {
        let temp_dir = tempdir().unwrap();
        let config = RagConfig::default().with_artifact_dir(temp_dir.path());
        let mut retriever = Retriever::new(config, embedder());
        assert!(matches!(
            retriever.reload(),
            Err(RetrieverError::MissingArtifact { .. })
        ));
    }

    #[tokio::test]
    async fn test_retrieve_uses_configured_top_k() {
        let retriever = ready_retriever().await;
        let results = retriever
            .retrieve("search", &RetrieveOptions::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));

        let results = retriever
            .retrieve("search", &RetrieveOptions::top_k(1))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);

        let results = retriever
            .retrieve("search", &RetrieveOptions::top_k(0))
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_unit_filter_is_case_insensitive_substring() {
        let retriever = ready_retriever().await;
        let options = RetrieveOptions::top_k(5).with_unit("unit-1");
        let results = retriever.retrieve("search", &options).await.unwrap();

        // "unit-1" also matches "Unit-10"
        assert!(!results.is_empty());
        assert!(
            results
                .iter()
                .all(|r| r.chunk.unit == "Unit-1" || r.chunk.unit == "Unit-10")
        );
    }

    #[tokio::test]
    async fn test_bloom_filter_is_exact() {
        let retriever = ready_retriever().await;
        let options = RetrieveOptions::top_k(5).with_bloom("Understand");
        let results = retriever.retrieve("search", &options).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.chunk_id, 1);

        let options = RetrieveOptions::top_k(5).with_bloom("understand");
        assert!(retriever.retrieve("search", &options).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_filtered_results_keep_search_order() {
        let retriever = ready_retriever().await;
        let unfiltered = retriever
            .retrieve("informed search", &RetrieveOptions::top_k(5))
            .await
            .unwrap();
        let filtered = retriever
            .retrieve("informed search", &RetrieveOptions::top_k(5).with_unit("Unit-2"))
            .await
            .unwrap();

        let expected: Vec<u32> = unfiltered
            .iter()
            .filter(|r| r.chunk.unit == "Unit-2")
            .map(|r| r.chunk.chunk_id)
            .collect();
        let actual: Vec<u32> = filtered.iter().map(|r| r.chunk.chunk_id).collect();
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn test_retrieve_context_format() {
        let retriever = ready_retriever().await;
        let context = retriever
            .retrieve_context("planning and scheduling", Some(2))
            .await
            .unwrap();

        assert!(context.starts_with("[Chunk 1 - Unit-3]\nUnit 3 classical planning and scheduling"));
        assert!(context.contains("\n\n[Chunk 2 - "));
        assert_eq!(context.matches("[Chunk ").count(), 2);
    }

    #[test]
    fn test_format_context_empty() {
        assert_eq!(format_context(&[]), "");
    }

    #[tokio::test]
    async fn test_build_from_file_then_reopen() {
        let temp_dir = tempdir().unwrap();
        let source = temp_dir.path().join("syllabus.txt");
        std::fs::write(
            &source,
            "Unit 1 Introduction to agents. Unit 2 Search strategies and heuristics.",
        )
        .unwrap();
        let config = RagConfig::default()
            .with_artifact_dir(temp_dir.path().join("artifacts"))
            .with_window(6, 2);

        let mut retriever = Retriever::new(config.clone(), embedder());
        let stats = retriever.build_from_file(&source).await.unwrap();
        assert!(retriever.is_ready());
        assert_eq!(stats.chunk_count, retriever.index().len());
        assert!(config.index_path.is_file());
        assert!(config.chunks_path.is_file());

        let reopened = Retriever::open(config, embedder());
        assert!(reopened.is_ready());
        assert_eq!(reopened.index().chunks(), retriever.index().chunks());

        let status = reopened.status();
        assert!(status.ready);
        assert_eq!(status.chunk_count, stats.chunk_count);
        assert_eq!(status.source_fingerprint, stats.source_fingerprint);
        assert_eq!(status.units.get("Unit-1"), Some(&1));
    }

    #[tokio::test]
    async fn test_failed_build_keeps_ready_index() {
        let temp_dir = tempdir().unwrap();
        let config = RagConfig::default().with_artifact_dir(temp_dir.path());
        let mut index = VectorIndex::new(embedder());
        index.build(chunks()).await.unwrap();
        let mut retriever = Retriever::from_index(config, index);

        let empty = temp_dir.path().join("empty.txt");
        std::fs::write(&empty, "   ").unwrap();
        assert!(matches!(
            retriever.build_from_file(&empty).await,
            Err(RetrieverError::EmptyInput)
        ));
        assert!(retriever.is_ready());
        assert_eq!(retriever.index().len(), 5);
    }

    #[tokio::test]
    async fn test_status_when_not_ready() {
        let temp_dir = tempdir().unwrap();
        let config = RagConfig::default().with_artifact_dir(temp_dir.path());
        let status = Retriever::new(config, embedder()).status();
        assert!(!status.ready);
        assert_eq!(status.chunk_count, 0);
        assert_eq!(status.dimension, None);
        assert_eq!(status.model_id, "hashing:fnv-hashing-256:256");
        assert!(!status.index_exists);
        assert!(status.units.is_empty());
    }

    #[tokio::test]
    async fn test_context_source_trait_object() {
        let source: Box<dyn ContextSource> = Box::new(ready_retriever().await);
        assert!(source.is_ready());
        let results = source
            .retrieve("agents", &RetrieveOptions::top_k(2))
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.chunk_id, 0);
    }
}
