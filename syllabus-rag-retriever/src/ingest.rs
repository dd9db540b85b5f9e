//! Source document ingestion.
//!
//! Turns a syllabus file into labelled [`Chunk`]s: the text is loaded (plain
//! text, Markdown or PDF), split into overlapping word windows, and each
//! window is tagged with its detected unit, the configured taxonomy tag and
//! the page its first word came from.

use crate::config::RagConfig;
use crate::error::{Result, RetrieverError};
use crate::index::{Chunk, ChunkId};
use std::fs;
use std::path::{Path, PathBuf};
use syllabus_rag_context::{UnitDetector, WordWindowChunker};
use tracing::{debug, info, warn};

/// How a source file is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// `.txt` and `.md`
    PlainText,
    /// `.pdf`
    Pdf,
}

impl SourceKind {
    /// Classify a file by extension, case-insensitively.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("txt" | "md") => Ok(SourceKind::PlainText),
            Some("pdf") => Ok(SourceKind::Pdf),
            _ => Err(RetrieverError::UnsupportedSource {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Text of one PDF page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfPage {
    /// 1-based page number
    pub number: u32,
    pub text: String,
}

/// A source file turned into chunks.
#[derive(Debug, Clone)]
pub struct IngestedDocument {
    pub path: PathBuf,
    pub kind: SourceKind,
    /// blake3 hex digest of the file bytes
    pub fingerprint: String,
    pub chunks: Vec<Chunk>,
}

fn ensure_exists(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(RetrieverError::MissingSource {
            path: path.to_path_buf(),
        })
    }
}

/// Read a UTF-8 text file.
pub fn load_txt(path: &Path) -> Result<String> {
    ensure_exists(path)?;
    decode_txt(fs::read(path)?)
}

fn decode_txt(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e).into())
}

/// Extract the text of every non-empty page of a PDF.
///
/// Pages whose text cannot be extracted are logged and skipped.
pub fn load_pdf(path: &Path) -> Result<Vec<PdfPage>> {
    ensure_exists(path)?;
    decode_pdf(path, &fs::read(path)?)
}

/// [`load_pdf`] on bytes already read from `path`.
fn decode_pdf(path: &Path, bytes: &[u8]) -> Result<Vec<PdfPage>> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| RetrieverError::Pdf {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    debug!(page_count = page_numbers.len(), "Extracting text from PDF");

    let mut pages = Vec::with_capacity(page_numbers.len());
    for number in page_numbers {
        match doc.extract_text(&[number]) {
            Ok(text) if !text.trim().is_empty() => pages.push(PdfPage { number, text }),
            Ok(_) => debug!(page = number, "Skipping empty page"),
            Err(e) => warn!(page = number, error = %e, "Failed to extract page text, skipping"),
        }
    }
    Ok(pages)
}

/// blake3 hex digest of `bytes`.
pub fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(blake3::hash(bytes).as_bytes())
}

/// Chunks and labels documents according to a [`RagConfig`].
#[derive(Debug, Clone)]
pub struct Ingestor {
    chunker: WordWindowChunker,
    detector: UnitDetector,
    taxonomy_tag: String,
}

impl Ingestor {
    pub fn new(config: &RagConfig) -> Result<Self> {
        Ok(Self {
            chunker: config.chunker()?,
            detector: config.unit_detector()?,
            taxonomy_tag: config.default_taxonomy_tag.clone(),
        })
    }

    /// Chunk a single text; every chunk is on page 1.
    pub fn ingest_text(&self, text: &str) -> Vec<Chunk> {
        self.ingest_pages(&[PdfPage {
            number: 1,
            text: text.to_string(),
        }])
    }

    /// Chunk the concatenated pages. A chunk's page is the page holding its
    /// first word.
    pub fn ingest_pages(&self, pages: &[PdfPage]) -> Vec<Chunk> {
        // (first word offset, page number) for every page
        let mut page_starts = Vec::with_capacity(pages.len());
        let mut words = 0;
        for page in pages {
            page_starts.push((words, page.number));
            words += page.text.split_whitespace().count();
        }
        let page_of = |word: usize| {
            page_starts
                .iter()
                .take_while(|(start, _)| *start <= word)
                .last()
                .map_or(1, |(_, number)| *number)
        };

        let full_text = pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        self.chunker
            .chunk(&full_text)
            .into_iter()
            .enumerate()
            .map(|(i, window)| Chunk {
                chunk_id: i as ChunkId,
                unit: self.detector.detect(&window.text),
                taxonomy_tag: self.taxonomy_tag.clone(),
                page: page_of(window.start_word),
                text: window.text,
            })
            .collect()
    }

    /// Load, fingerprint and chunk a `.txt`, `.md` or `.pdf` file.
    ///
    /// The file is read once; the fingerprint and the chunks come from the
    /// same bytes.
    pub fn ingest_file(&self, path: &Path) -> Result<IngestedDocument> {
        let kind = SourceKind::from_path(path)?;
        ensure_exists(path)?;
        let bytes = fs::read(path)?;
        let fingerprint = fingerprint(&bytes);

        let chunks = match kind {
            SourceKind::PlainText => self.ingest_text(&decode_txt(bytes)?),
            SourceKind::Pdf => self.ingest_pages(&decode_pdf(path, &bytes)?),
        };
        info!("Ingested {} chunks from {}", chunks.len(), path.display());

        Ok(IngestedDocument {
            path: path.to_path_buf(),
            kind,
            fingerprint,
            chunks,
        })
    }
}
