//! Text preparation for the syllabus retrieval index.
//!
//! - [`text`]: overlapping word-window chunking
//! - [`units`]: syllabus unit label detection from heading text

pub mod error;
pub mod text;
pub mod units;

pub use error::ChunkingError;
pub use text::{
    DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, TextWindow, WordWindowChunker, expected_chunk_count,
};
pub use units::{DEFAULT_UNIT_PATTERNS, UNKNOWN_UNIT, UnitDetector};
