//! Compression half of the entry pipeline.
//!
//! Transforms are pure and deterministic for a fixed input and level,
//! which the writer's byte-identical-output contract relies on.  On
//! write an entry is compressed and then encrypted; read reverses the
//! order.  Decompression is validated against the uncompressed size
//! recorded in the TOC — a mismatch means the stored bytes are corrupt
//! (or were tampered with and survived decryption structurally).

use thiserror::Error;

/// Default zstd compression level.
pub const DEFAULT_LEVEL: i32 = 3;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Compression error: {0}")]
    Compression(String),
    #[error("Decompression error: {0}")]
    Decompression(String),
    #[error("Decompressed length {actual} does not match declared size {expected}")]
    LengthMismatch { expected: usize, actual: usize },
}

pub fn compress(data: &[u8], level: i32) -> Result<Vec<u8>, CodecError> {
    zstd::encode_all(data, level).map_err(|e| CodecError::Compression(e.to_string()))
}

/// Decompress `data`, failing unless exactly `expected_len` bytes come out.
pub fn decompress(data: &[u8], expected_len: usize) -> Result<Vec<u8>, CodecError> {
    let out = zstd::decode_all(data).map_err(|e| CodecError::Decompression(e.to_string()))?;
    if out.len() != expected_len {
        return Err(CodecError::LengthMismatch {
            expected: expected_len,
            actual: out.len(),
        });
    }
    Ok(out)
}
