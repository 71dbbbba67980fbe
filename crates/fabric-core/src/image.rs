//! Firmware image packing for the instruction store.

use crate::{ImageError, WORD_BYTES};

/// Packs a raw firmware byte stream into little-endian 32-bit words.
///
/// # Errors
///
/// Returns [`ImageError::UnalignedLength`] when the stream does not end on a
/// word boundary.
pub fn words_from_le_bytes(bytes: &[u8]) -> Result<Vec<u32>, ImageError> {
    let chunks = bytes.chunks_exact(WORD_BYTES as usize);
    if !chunks.remainder().is_empty() {
        return Err(ImageError::UnalignedLength { len: bytes.len() });
    }
    Ok(chunks
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
