//! Fixed-size overlapping window chunker.
//!
//! Text is split by advancing a window of `chunk_size` characters with a
//! stride of `chunk_size - overlap`, so adjacent chunks share exactly
//! `overlap` characters of source text. The final chunk is the remainder and
//! may be shorter. Splitting is purely positional and deterministic: the same
//! input and geometry always produce the same sequence.

use thiserror::Error;

/// Errors produced while validating chunker parameters.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// The window size was zero.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// The overlap left no forward stride.
    #[error("overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    OverlapTooLarge {
        /// Configured window size.
        chunk_size: usize,
        /// Configured overlap.
        overlap: usize,
    },
}

/// Split text into overlapping fixed-size character windows.
///
/// Window positions are measured in characters, not bytes, so multi-byte
/// input never splits a code point. Text that is empty after trimming yields
/// an empty sequence; callers must treat that as a rejected document rather
/// than a zero-chunk success.
pub fn chunk_text(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<String>, ChunkingError> {
    if chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    if overlap >= chunk_size {
        return Err(ChunkingError::OverlapTooLarge {
            chunk_size,
            overlap,
        });
    }
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    // Byte offset of every character boundary, including the end of text.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(text.len()))
        .collect();
    let total_chars = boundaries.len() - 1;
    let stride = chunk_size - overlap;

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < total_chars {
        let end = (start + chunk_size).min(total_chars);
        chunks.push(text[boundaries[start]..boundaries[end]].to_string());
        if end == total_chars {
            break;
        }
        start += stride;
    }

    Ok(chunks)
}
