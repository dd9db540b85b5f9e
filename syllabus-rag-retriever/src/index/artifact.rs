//! On-disk formats for a persisted index.
//!
//! An index is saved as two files that must be written and read together.
//!
//! The vector artifact is binary:
//!
//! ```text
//! "SRAGVEC1" | header length (u32 LE) | header JSON | chunk ids | vectors
//! ```
//!
//! The header ([`VectorHeader`]) records the metric, dimension, row count,
//! embedding model, build id, source fingerprint and creation time. It is followed by
//! `count` `u32` chunk ids and `count * dimension` `f16` values, row-major,
//! both in the byte order named by the header.
//!
//! The chunk artifact is JSON ([`ChunkArtifact`]) with the chunks in row
//! order. Both files carry the build id of the index that wrote them, and a
//! pair with different build ids is never loaded together.

use super::{Chunk, ChunkId, EmbeddingModelMetadata};
use crate::error::{Result, RetrieverError};
use half::f16;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const VECTOR_MAGIC: &[u8; 8] = b"SRAGVEC1";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    L2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorHeader {
    pub format_version: u32,
    pub metric: DistanceMetric,
    pub byte_order: ByteOrder,
    pub dimension: usize,
    pub count: usize,
    pub model: EmbeddingModelMetadata,
    pub build_id: String,
    pub source_fingerprint: Option<String>,
    pub created_at: i64,
}

/// Decoded vector artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorArtifact {
    pub header: VectorHeader,
    pub chunk_ids: Vec<ChunkId>,
    /// `count * dimension` values, row-major
    pub vectors: Vec<f16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkArtifact {
    pub format_version: u32,
    pub build_id: String,
    pub chunks: Vec<Chunk>,
}

/// Serialize a header and its rows to bytes.
pub fn encode_vectors(
    header: &VectorHeader,
    chunk_ids: &[ChunkId],
    vectors: &[f16],
) -> Result<Vec<u8>> {
    let header = serde_json::to_vec(header).map_err(std::io::Error::from)?;
    let header_len = u32::try_from(header.len())
        .map_err(|_| std::io::Error::other("vector header too large"))?;

    let ids: &[u8] = bytemuck::cast_slice(chunk_ids);
    let vectors: &[u8] = bytemuck::cast_slice(vectors);

    let mut bytes =
        Vec::with_capacity(VECTOR_MAGIC.len() + 4 + header.len() + ids.len() + vectors.len());
    bytes.extend_from_slice(VECTOR_MAGIC);
    bytes.extend_from_slice(&header_len.to_le_bytes());
    bytes.extend_from_slice(&header);
    bytes.extend_from_slice(ids);
    bytes.extend_from_slice(vectors);
    Ok(bytes)
}

/// Parse a vector artifact. `path` is only used in error messages.
pub fn decode_vectors(path: &Path, bytes: &[u8]) -> Result<VectorArtifact> {
    let corrupt = |message: String| RetrieverError::corrupt(path, message);

    let rest = bytes
        .strip_prefix(VECTOR_MAGIC.as_slice())
        .ok_or_else(|| corrupt("not a vector index file".to_string()))?;
    if rest.len() < 4 {
        return Err(corrupt("truncated header length".to_string()));
    }
    let header_len = u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
    let rest = &rest[4..];
    if rest.len() < header_len {
        return Err(corrupt(format!(
            "header declares {header_len} bytes, only {} present",
            rest.len()
        )));
    }
    let (header_bytes, body) = rest.split_at(header_len);
    let header: VectorHeader = serde_json::from_slice(header_bytes)
        .map_err(|e| corrupt(format!("invalid header: {e}")))?;

    if header.format_version != FORMAT_VERSION {
        return Err(corrupt(format!(
            "unsupported format version {}",
            header.format_version
        )));
    }
    if header.byte_order != ByteOrder::native() {
        return Err(corrupt(format!(
            "written with {:?} byte order",
            header.byte_order
        )));
    }
    if header.count > 0 && header.dimension == 0 {
        return Err(corrupt("zero dimension".to_string()));
    }

    let ids_len = header
        .count
        .checked_mul(std::mem::size_of::<ChunkId>())
        .ok_or_else(|| corrupt("row count overflow".to_string()))?;
    let vectors_len = header
        .count
        .checked_mul(header.dimension)
        .and_then(|n| n.checked_mul(std::mem::size_of::<f16>()))
        .ok_or_else(|| corrupt("vector size overflow".to_string()))?;
    if body.len() != ids_len + vectors_len {
        return Err(corrupt(format!(
            "expected {} bytes of rows, found {}",
            ids_len + vectors_len,
            body.len()
        )));
    }

    let mut chunk_ids = vec![0 as ChunkId; header.count];
    bytemuck::cast_slice_mut::<ChunkId, u8>(&mut chunk_ids).copy_from_slice(&body[..ids_len]);
    let mut vectors = vec![f16::ZERO; header.count * header.dimension];
    bytemuck::cast_slice_mut::<f16, u8>(&mut vectors).copy_from_slice(&body[ids_len..]);

    Ok(VectorArtifact {
        header,
        chunk_ids,
        vectors,
    })
}

pub fn write_vectors(
    path: &Path,
    header: &VectorHeader,
    chunk_ids: &[ChunkId],
    vectors: &[f16],
) -> Result<()> {
    let bytes = encode_vectors(header, chunk_ids, vectors)?;
    write_replacing(path, &bytes)?;
    debug!(
        "Wrote {} vectors ({} bytes) to {}",
        header.count,
        bytes.len(),
        path.display()
    );
    Ok(())
}

pub fn read_vectors(path: &Path) -> Result<VectorArtifact> {
    decode_vectors(path, &read_artifact(path)?)
}

pub fn write_chunks(path: &Path, build_id: &str, chunks: &[Chunk]) -> Result<()> {
    let artifact = ChunkArtifact {
        format_version: FORMAT_VERSION,
        build_id: build_id.to_string(),
        chunks: chunks.to_vec(),
    };
    let bytes = serde_json::to_vec_pretty(&artifact).map_err(std::io::Error::from)?;
    write_replacing(path, &bytes)?;
    debug!("Wrote {} chunks to {}", chunks.len(), path.display());
    Ok(())
}

pub fn read_chunks(path: &Path) -> Result<ChunkArtifact> {
    let bytes = read_artifact(path)?;
    let artifact: ChunkArtifact = serde_json::from_slice(&bytes)
        .map_err(|e| RetrieverError::corrupt(path, format!("invalid chunk JSON: {e}")))?;
    if artifact.format_version != FORMAT_VERSION {
        return Err(RetrieverError::corrupt(
            path,
            format!("unsupported format version {}", artifact.format_version),
        ));
    }
    Ok(artifact)
}

/// [`RetrieverError::MissingArtifact`] unless `path` is a regular file.
pub fn ensure_present(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(RetrieverError::MissingArtifact {
            path: path.to_path_buf(),
        })
    }
}

fn read_artifact(path: &Path) -> Result<Vec<u8>> {
    ensure_present(path)?;
    Ok(fs::read(path)?)
}

/// Write through a sibling temp file and rename it into place, so readers
/// never observe a half-written artifact.
fn write_replacing(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = temp_path(path);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
