//! Core domain types for the knowledge source and its chunks.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// The full raw text of the knowledge source.
///
/// Read once at startup and never mutated afterwards; chunks borrow their
/// offsets from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    text: String,
}

impl Document {
    /// Wrap raw text as a document.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// The full document text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether the document holds any text at all.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// SHA-256 hex digest of the text, used to identify which source a
    /// running process was built from.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.text.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

// ---------------------------------------------------------------------------
// Chunk
// ---------------------------------------------------------------------------

/// A bounded passage of the document, the atomic unit of retrieval.
///
/// `start`/`end` are byte offsets into the document text (always on `char`
/// boundaries) recorded before whitespace trimming, so
/// `0 <= start < end <= document.len()` and `text` is the trimmed slice
/// `document[start..end]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position in the chunk sequence (document order).
    pub index: usize,
    /// Trimmed chunk text.
    pub text: String,
    /// Byte offset where the window starts.
    pub start: usize,
    /// Byte offset one past the window end.
    pub end: usize,
}

impl Chunk {
    /// Width of the untrimmed window in bytes.
    pub fn span_len(&self) -> usize {
        self.end - self.start
    }
}
