//! Properties that hold for any syllabus, checked over small generated inputs.

use anyhow::Result;
use std::sync::Arc;
use syllabus_rag_context::{UnitDetector, WordWindowChunker, expected_chunk_count};
use syllabus_rag_embed::HashingEmbedProvider;
use syllabus_rag_retriever::{Chunk, Ingestor, RagConfig, RetrieveOptions, Retriever, VectorIndex};
use tempfile::tempdir;

fn numbered_words(n: usize) -> String {
    (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
}

fn course_chunks() -> Vec<Chunk> {
    let topics = [
        ("Unit-1", "agents rationality environments percepts"),
        ("Unit-1", "agent architectures reflex goal utility"),
        ("Unit-2", "breadth first depth first uniform cost search"),
        ("Unit-2", "greedy best first and A star heuristic search"),
        ("Unit-2", "local search hill climbing simulated annealing"),
        ("Unit-3", "constraint satisfaction backtracking search"),
        ("Unit-3", "propositional logic inference resolution"),
        ("Unit-4", "classical planning STRIPS graphplan"),
    ];
    topics
        .iter()
        .enumerate()
        .map(|(i, (unit, text))| Chunk::new(i as u32, *text).with_unit(*unit))
        .collect()
}

async fn course_retriever() -> Result<Retriever> {
    let mut index = VectorIndex::new(Arc::new(HashingEmbedProvider::new(512)?));
    index.build(course_chunks()).await?;
    Ok(Retriever::from_index(RagConfig::default(), index))
}

#[test]
fn test_chunk_count_law() {
    for (chunk_size, overlap) in [(200, 40), (10, 0), (10, 9), (7, 3), (1, 0)] {
        let chunker = WordWindowChunker::new(chunk_size, overlap).unwrap();
        for words in [1, 2, 9, 10, 11, 57, 200, 201, 900] {
            let chunks = chunker.chunk(&numbered_words(words));
            let expected = if words <= chunk_size {
                1
            } else {
                (words - overlap).div_ceil(chunk_size - overlap)
            };
            assert_eq!(
                chunks.len(),
                expected,
                "W={words} S={chunk_size} O={overlap}"
            );
            assert_eq!(expected_chunk_count(words, chunk_size, overlap), expected);
            assert!(chunks.iter().all(|c| !c.text.trim().is_empty()));
        }
    }
}

#[test]
fn test_chunks_cover_every_word() {
    let ingestor = Ingestor::new(&RagConfig::default().with_window(7, 3)).unwrap();
    let text = numbered_words(40);
    let chunks = ingestor.ingest_text(&text);

    for i in 0..40 {
        let word = format!("w{i}");
        assert!(
            chunks
                .iter()
                .any(|c| c.text.split_whitespace().any(|w| w == word)),
            "{word} missing"
        );
    }
    let ids: Vec<u32> = chunks.iter().map(|c| c.chunk_id).collect();
    assert_eq!(ids, (0..chunks.len() as u32).collect::<Vec<_>>());
}

#[test]
fn test_unit_detection_is_idempotent() {
    let detector = UnitDetector::default();
    for text in [
        "Unit 2 covers informed search",
        "unit-3: planning",
        "Chapter 4 Logic",
        "Grading policy and attendance",
    ] {
        assert_eq!(detector.detect(text), detector.detect(text));
    }
    assert_eq!(detector.detect("Unit 2 covers informed search"), "Unit-2");
    assert_eq!(detector.detect("Grading policy and attendance"), "Unknown");
}

/// Row `i` of the index was embedded from `chunks[i].text`: querying with a
/// chunk's own text finds that chunk at distance zero.
#[tokio::test]
async fn test_rows_align_with_chunks() -> Result<()> {
    let retriever = course_retriever().await?;
    let chunks = retriever.index().chunks().to_vec();
    assert_eq!(chunks, course_chunks());

    for chunk in &chunks {
        let results = retriever
            .retrieve(&chunk.text, &RetrieveOptions::top_k(1))
            .await?;
        assert_eq!(results[0].chunk, *chunk);
        assert!(results[0].distance < 1e-3);
    }
    Ok(())
}

#[tokio::test]
async fn test_unit_filter_monotonicity() -> Result<()> {
    let retriever = course_retriever().await?;
    let query = "heuristic search strategies";

    for k in 1..=4 {
        for unit in ["unit-2", "UNIT-3", "Unit-1", "Unit-9"] {
            let filtered = retriever
                .retrieve(query, &RetrieveOptions::top_k(k).with_unit(unit))
                .await?;
            let wide = retriever
                .retrieve(query, &RetrieveOptions::top_k(2 * k))
                .await?;

            assert!(filtered.len() <= k);
            assert!(
                filtered
                    .iter()
                    .all(|r| r.chunk.unit.to_lowercase().contains(&unit.to_lowercase()))
            );

            let expected: Vec<u32> = wide
                .iter()
                .filter(|r| r.chunk.unit.to_lowercase().contains(&unit.to_lowercase()))
                .take(k)
                .map(|r| r.chunk.chunk_id)
                .collect();
            let actual: Vec<u32> = filtered.iter().map(|r| r.chunk.chunk_id).collect();
            assert_eq!(actual, expected, "k={k} unit={unit}");
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_not_ready_retriever_returns_nothing() -> Result<()> {
    let temp_dir = tempdir()?;
    let config = RagConfig::default().with_artifact_dir(temp_dir.path().join("never-built"));
    let retriever = Retriever::open(config, Arc::new(HashingEmbedProvider::default()));

    assert!(!retriever.is_ready());
    let options = RetrieveOptions::top_k(5)
        .with_unit("Unit-1")
        .with_bloom("Apply");
    assert!(retriever.retrieve("anything", &options).await?.is_empty());
    assert_eq!(retriever.retrieve_context("anything", None).await?, "");
    Ok(())
}

#[tokio::test]
async fn test_round_trip_is_exact() -> Result<()> {
    let temp_dir = tempdir()?;
    let index_path = temp_dir.path().join("rag_index.vec");
    let chunks_path = temp_dir.path().join("chunks.json");

    let embedder = Arc::new(HashingEmbedProvider::new(512)?);
    let mut index = VectorIndex::new(embedder.clone());
    index.build(course_chunks()).await?;
    index.save(&index_path, &chunks_path)?;

    let mut fresh = VectorIndex::new(embedder);
    fresh.load(&index_path, &chunks_path)?;
    assert_eq!(fresh.chunks(), index.chunks());
    assert_eq!(fresh.stats(), index.stats());

    let before = index.search("graph planning", 8).await?;
    let after = fresh.search("graph planning", 8).await?;
    assert_eq!(before.len(), 8);
    for (a, b) in before.iter().zip(&after) {
        assert_eq!(a.chunk, b.chunk);
        assert_eq!(a.distance.to_bits(), b.distance.to_bits());
    }
    Ok(())
}
