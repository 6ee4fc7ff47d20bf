//! Document chunking.
//!
//! Two interchangeable strategies sit behind [`ChunkStrategy`]:
//!
//! - **Sliding window**: fixed-size windows that advance by
//!   `target_size - overlap`, each end pulled back to the last sentence
//!   terminator or newline in the second half of the window.
//! - **Paragraph packing**: blank-line separated paragraphs, short ones
//!   dropped, consecutive survivors packed into buckets of at most
//!   `target_size`.
//!
//! Both are pure functions of their input: the same text and parameters
//! always produce the same chunk sequence. Offsets are byte offsets into
//! the source text and always land on `char` boundaries.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};

use tripleloop_shared::{Chunk, ChunkStrategyKind, ChunkingConfig, Result, TripleLoopError};

/// Bytes a sliding window may end after. All ASCII, so a match is never
/// inside a multi-byte character.
const BREAK_BYTES: &[u8] = b".!?\n";

/// Chunking strategy with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStrategy {
    /// Overlapping windows snapped to sentence ends.
    SlidingWindow {
        /// Window size in bytes.
        target_size: usize,
        /// Bytes shared between consecutive windows.
        overlap: usize,
        /// Trimmed windows with fewer characters are dropped.
        min_chunk_chars: usize,
    },
    /// Paragraphs packed into buckets.
    ParagraphPacking {
        /// Maximum bucket span in bytes (a longer paragraph stands alone).
        target_size: usize,
        /// Paragraphs with fewer characters are dropped.
        min_paragraph_chars: usize,
    },
}

impl ChunkStrategy {
    /// Sliding window that keeps every non-empty window.
    pub fn sliding_window(target_size: usize, overlap: usize) -> Result<Self> {
        validate_window(target_size, overlap)?;
        Ok(Self::SlidingWindow {
            target_size,
            overlap,
            min_chunk_chars: 1,
        })
    }

    /// Paragraph packing into buckets of `target_size`.
    pub fn paragraph_packing(target_size: usize, min_paragraph_chars: usize) -> Result<Self> {
        if target_size == 0 {
            return Err(TripleLoopError::config("target_size must be greater than 0"));
        }
        Ok(Self::ParagraphPacking {
            target_size,
            min_paragraph_chars,
        })
    }

    /// Short name for logs and CLI output.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SlidingWindow { .. } => "sliding_window",
            Self::ParagraphPacking { .. } => "paragraph_packing",
        }
    }

    /// Split `text` into an ordered chunk sequence. Empty input yields no chunks.
    #[instrument(skip_all, fields(strategy = self.name(), text_len = text.len()))]
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        let chunks = match *self {
            Self::SlidingWindow {
                target_size,
                overlap,
                min_chunk_chars,
            } => sliding_window(text, target_size, overlap, min_chunk_chars),
            Self::ParagraphPacking {
                target_size,
                min_paragraph_chars,
            } => paragraph_packing(text, target_size, min_paragraph_chars),
        };

        debug!(chunks = chunks.len(), "chunking complete");
        chunks
    }
}

impl TryFrom<&ChunkingConfig> for ChunkStrategy {
    type Error = TripleLoopError;

    fn try_from(config: &ChunkingConfig) -> Result<Self> {
        match config.strategy {
            ChunkStrategyKind::SlidingWindow => {
                validate_window(config.target_size, config.overlap)?;
                Ok(Self::SlidingWindow {
                    target_size: config.target_size,
                    overlap: config.overlap,
                    min_chunk_chars: config.min_chunk_chars,
                })
            }
            ChunkStrategyKind::ParagraphPacking => {
                Self::paragraph_packing(config.target_size, config.min_paragraph_chars)
            }
        }
    }
}

fn validate_window(target_size: usize, overlap: usize) -> Result<()> {
    if target_size == 0 {
        return Err(TripleLoopError::config("target_size must be greater than 0"));
    }
    if overlap >= target_size {
        return Err(TripleLoopError::config(format!(
            "overlap ({overlap}) must be smaller than target_size ({target_size})"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Sliding window
// ---------------------------------------------------------------------------

fn sliding_window(
    text: &str,
    target_size: usize,
    overlap: usize,
    min_chunk_chars: usize,
) -> Vec<Chunk> {
    let bytes = text.as_bytes();
    let len = text.len();
    let target_size = target_size.max(1);

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < len {
        let mut end = start + target_size;

        if end < len {
            // The byte at `end` itself may close the window.
            let window = &bytes[start..=end];
            if let Some(pos) = window.iter().rposition(|b| BREAK_BYTES.contains(b)) {
                let break_point = start + pos;
                if break_point > start + target_size / 2 {
                    end = break_point + 1;
                }
            }
            end = snap_end(text, end, start);
        } else {
            end = len;
        }

        push_trimmed(&mut chunks, text, start, end, min_chunk_chars);

        // Any further window would lie inside this one.
        if end >= len {
            break;
        }

        let next = end.saturating_sub(overlap);
        start = if next > start {
            ceil_char_boundary(text, next)
        } else {
            end
        };
    }

    chunks
}

/// Move `end` back onto a char boundary, or forward if that would empty the window.
fn snap_end(text: &str, end: usize, start: usize) -> usize {
    let mut snapped = end;
    while snapped > start && !text.is_char_boundary(snapped) {
        snapped -= 1;
    }
    if snapped > start {
        return snapped;
    }
    ceil_char_boundary(text, end)
}

fn ceil_char_boundary(text: &str, mut index: usize) -> usize {
    while !text.is_char_boundary(index) {
        index += 1;
    }
    index
}

fn push_trimmed(chunks: &mut Vec<Chunk>, text: &str, start: usize, end: usize, min_chars: usize) {
    let trimmed = text[start..end].trim();
    if trimmed.is_empty() || trimmed.chars().count() < min_chars {
        return;
    }
    chunks.push(Chunk {
        index: chunks.len(),
        text: trimmed.to_string(),
        start,
        end,
    });
}

// ---------------------------------------------------------------------------
// Paragraph packing
// ---------------------------------------------------------------------------

fn paragraph_packing(text: &str, target_size: usize, min_paragraph_chars: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut bucket: Option<(usize, usize)> = None;

    for (start, end) in paragraph_spans(text) {
        if text[start..end].chars().count() < min_paragraph_chars {
            // A dropped paragraph closes the bucket so chunk text stays a
            // contiguous slice of the document.
            if let Some((s, e)) = bucket.take() {
                push_trimmed(&mut chunks, text, s, e, 1);
            }
            continue;
        }

        bucket = match bucket {
            Some((s, _)) if end - s <= target_size => Some((s, end)),
            Some((s, e)) => {
                push_trimmed(&mut chunks, text, s, e, 1);
                Some((start, end))
            }
            None => Some((start, end)),
        };
    }

    if let Some((s, e)) = bucket {
        push_trimmed(&mut chunks, text, s, e, 1);
    }

    chunks
}

/// Trimmed, non-empty paragraph spans separated by blank lines.
fn paragraph_spans(text: &str) -> Vec<(usize, usize)> {
    static BLANK_LINE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n\s*\n").expect("valid regex"));

    let mut spans = Vec::new();
    let mut cursor = 0;
    let separators = BLANK_LINE_RE
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .chain(std::iter::once((text.len(), text.len())));

    for (sep_start, sep_end) in separators {
        let raw = &text[cursor..sep_start];
        let leading = raw.len() - raw.trim_start().len();
        let trimmed_len = raw.trim().len();
        if trimmed_len > 0 {
            let start = cursor + leading;
            spans.push((start, start + trimmed_len));
        }
        cursor = sep_end;
    }

    spans
}
