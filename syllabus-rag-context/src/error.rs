//! Error types for chunking configuration

/// Errors raised while configuring the chunker or the unit detector.
///
/// Both variants describe caller-supplied configuration that can never
/// produce a valid result, so they are reported at construction time rather
/// than when text is processed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkingError {
    /// The window would not advance: `overlap` must be smaller than a
    /// non-zero `chunk_size`.
    #[error("invalid chunk window: chunk_size={chunk_size}, overlap={overlap} (overlap must be < chunk_size and chunk_size > 0)")]
    InvalidWindow { chunk_size: usize, overlap: usize },

    /// A unit heading pattern failed to compile.
    #[error("invalid unit pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },
}
