//! Chunked framing for WebSocket delivery.
//!
//! A serialized tree is split into fixed-size byte chunks. Each chunk is
//! sent as its own JSON text frame carrying its position, the total count,
//! an integer completion percentage and the base64-encoded bytes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;

/// Bytes of payload per frame
pub const CHUNK_SIZE: usize = 10240;

/// One frame of a chunked payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkFrame {
    pub index: usize,
    pub total_chunks: usize,
    /// `(index + 1) * 100 / total_chunks`, so the last frame reports 100
    pub progress: usize,
    /// Base64 of this chunk's bytes
    pub data: String,
}

/// Number of frames needed for `len` bytes
pub fn chunk_count(len: usize, chunk_size: usize) -> usize {
    len.div_ceil(chunk_size)
}

/// Split `payload` into frames of at most `chunk_size` bytes
pub fn frames(payload: &[u8], chunk_size: usize) -> impl Iterator<Item = ChunkFrame> + '_ {
    let chunk_size = chunk_size.max(1);
    let total_chunks = chunk_count(payload.len(), chunk_size);

    payload
        .chunks(chunk_size)
        .enumerate()
        .map(move |(index, chunk)| ChunkFrame {
            index,
            total_chunks,
            progress: (index + 1) * 100 / total_chunks,
            data: STANDARD.encode(chunk),
        })
}
