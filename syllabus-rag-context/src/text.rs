//! This module splits raw syllabus text into overlapping word windows, the unit
//! of retrieval for the RAG index.
//!
//! A window is a run of at most `chunk_size` whitespace-separated words. Windows
//! start every `chunk_size - overlap` words, so consecutive windows share
//! `overlap` words of context. The last window may be shorter than `chunk_size`.
//!
//! The module defines two main items:
//! - [`WordWindowChunker`]: Holds a validated window configuration and produces
//!   windows from text.
//! - [`TextWindow`]: A single window of joined words with its word offsets.
//!
//! # Example
//!
//! ```
//! use syllabus_rag_context::text::WordWindowChunker;
//!
//! let chunker = WordWindowChunker::new(4, 1).unwrap();
//! let windows = chunker.chunk("one two three four five six seven");
//!
//! assert_eq!(windows.len(), 2);
//! assert_eq!(windows[0].text, "one two three four");
//! assert_eq!(windows[1].text, "four five six seven");
//! assert_eq!(windows[1].start_word, 3);
//! assert_eq!(windows[1].end_word, 7);
//! ```
use crate::error::ChunkingError;
use serde::Serialize;

/// Default window size in words.
pub const DEFAULT_CHUNK_SIZE: usize = 200;

/// Default number of words shared between consecutive windows.
pub const DEFAULT_CHUNK_OVERLAP: usize = 40;

/// A contiguous run of words cut from a document.
///
/// `start_word` is inclusive and `end_word` is exclusive, both counted in the
/// whitespace-split word sequence of the source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextWindow {
    /// The words of this window joined by single spaces.
    pub text: String,
    /// Index of the first word of the window.
    pub start_word: usize,
    /// Index one past the last word of the window.
    pub end_word: usize,
}

impl TextWindow {
    /// Number of words in this window.
    pub fn word_count(&self) -> usize {
        self.end_word - self.start_word
    }
}

/// Splits text into fixed-size overlapping word windows.
///
/// The configuration is validated on construction: a window must hold at
/// least one word and the overlap must be strictly smaller than the window,
/// otherwise the window start would never advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordWindowChunker {
    chunk_size: usize,
    overlap: usize,
}

impl WordWindowChunker {
    /// Creates a chunker producing windows of `chunk_size` words that share
    /// `overlap` words with their predecessor.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkingError::InvalidWindow`] when `chunk_size` is zero or
    /// `overlap >= chunk_size`.
    ///
    /// ```
    /// use syllabus_rag_context::text::WordWindowChunker;
    ///
    /// assert!(WordWindowChunker::new(200, 40).is_ok());
    /// assert!(WordWindowChunker::new(40, 40).is_err());
    /// assert!(WordWindowChunker::new(0, 0).is_err());
    /// ```
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkingError> {
        if chunk_size == 0 || overlap >= chunk_size {
            return Err(ChunkingError::InvalidWindow {
                chunk_size,
                overlap,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance in words between the starts of consecutive windows.
    pub fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }

    /// Splits `text` into windows, in document order.
    ///
    /// Text is split on any whitespace, so line breaks and repeated spaces
    /// collapse to a single space in the window text. Empty or
    /// whitespace-only input produces no windows. Chunking stops at the first
    /// window that reaches the end of the text.
    pub fn chunk(&self, text: &str) -> Vec<TextWindow> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let mut windows = Vec::with_capacity(expected_chunk_count(
            words.len(),
            self.chunk_size,
            self.overlap,
        ));

        let mut start = 0;
        while start < words.len() {
            let end = (start + self.chunk_size).min(words.len());
            let joined = words[start..end].join(" ");

            if !joined.trim().is_empty() {
                windows.push(TextWindow {
                    text: joined,
                    start_word: start,
                    end_word: end,
                });
            }

            // Any later window would be a suffix of this one.
            if end == words.len() {
                break;
            }
            start += self.step();
        }

        windows
    }
}

impl Default for WordWindowChunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Number of windows [`WordWindowChunker::chunk`] produces for `word_count`
/// words, i.e. `ceil((W - O) / (S - O))`, at least one for non-empty input.
///
/// Returns 0 for an invalid window configuration.
///
/// ```
/// use syllabus_rag_context::text::expected_chunk_count;
///
/// assert_eq!(expected_chunk_count(900, 200, 40), 6);
/// assert_eq!(expected_chunk_count(150, 200, 40), 1);
/// assert_eq!(expected_chunk_count(0, 200, 40), 0);
/// ```
pub fn expected_chunk_count(word_count: usize, chunk_size: usize, overlap: usize) -> usize {
    if word_count == 0 || chunk_size == 0 || overlap >= chunk_size {
        return 0;
    }
    if word_count <= chunk_size {
        return 1;
    }
    let step = chunk_size - overlap;
    (word_count - overlap).div_ceil(step)
}
