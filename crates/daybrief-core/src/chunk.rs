//! Sentence-aware sliding-window text chunker.
//!
//! Splits ingested text into overlapping windows of at most `chunk_size`
//! characters. Each window prefers to end just after a period, as long as
//! that period sits in the second half of the window; otherwise the window
//! is hard-cut at `chunk_size`.
//!
//! # Algorithm
//!
//! 1. If the text fits in one window, return it unchanged.
//! 2. Otherwise set `end = start + chunk_size`.
//! 3. If `end` is inside the text, search backward from `end` for the last
//!    `.`; accept it only when it lies at or after `start + chunk_size / 2`,
//!    in which case the window ends right after the period.
//! 4. Trim the window and keep it unless it is empty.
//! 5. Next `start = end - overlap`. The last window ends the loop.
//!
//! Lengths are measured in characters, not bytes, so multi-byte text never
//! splits inside a code point.
//!
//! # Example
//!
//! ```rust
//! use daybrief_core::chunk::chunk_text;
//!
//! let chunks = chunk_text("Hello. World. ".repeat(5).as_str(), 20, 5).unwrap();
//! assert!(chunks.len() > 1);
//! ```

use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::Metadata;

/// Default window size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 500;
/// Default overlap between consecutive windows, in characters.
pub const DEFAULT_OVERLAP: usize = 50;

/// A validated chunker configuration.
///
/// Construction rejects `overlap >= chunk_size`, since the window start
/// would then never move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        validate(chunk_size, overlap)?;
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

    /// Split `text` into trimmed, non-empty windows.
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        split_windows(text, self.chunk_size, self.overlap)
    }

    /// Split `text` and pair every chunk with its own copy of `base`
    /// extended by `chunk_index`, `total_chunks` and `chunk_size`.
    ///
    /// Order matches chunk order and is deterministic for identical input.
    pub fn chunk_with_metadata(&self, text: &str, base: &Metadata) -> Vec<(String, Metadata)> {
        let chunks = self.chunk_text(text);
        let total = chunks.len();
        chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| {
                let mut metadata = base.clone();
                metadata.insert("chunk_index".into(), Value::from(i));
                metadata.insert("total_chunks".into(), Value::from(total));
                metadata.insert("chunk_size".into(), Value::from(chunk.chars().count()));
                (chunk, metadata)
            })
            .collect()
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

/// Split `text` into overlapping windows, validating the configuration first.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    Ok(Chunker::new(chunk_size, overlap)?.chunk_text(text))
}

fn validate(chunk_size: usize, overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(Error::InvalidChunking("chunk_size must be > 0".into()));
    }
    if overlap >= chunk_size {
        return Err(Error::InvalidChunking(format!(
            "overlap ({}) must be smaller than chunk_size ({})",
            overlap, chunk_size
        )));
    }
    Ok(())
}

fn split_windows(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    if len <= chunk_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < len {
        let mut end = start + chunk_size;

        if end < len {
            let midpoint = start + chunk_size / 2;
            if let Some(period) = chars[start..end].iter().rposition(|&c| c == '.') {
                let period = start + period;
                if period >= midpoint {
                    end = period + 1;
                }
            }
        } else {
            end = len;
        }

        let window: String = chars[start..end].iter().collect();
        let trimmed = window.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        if end >= len {
            break;
        }

        // A sentence cut can shorten the window below `overlap`; never step back.
        let next = end - overlap.min(end);
        start = if next > start { next } else { end };
    }

    chunks
}
