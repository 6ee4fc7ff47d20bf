//! Ranking and top-K selection with a document-order fallback.

use tracing::{debug, instrument, warn};

use tripleloop_shared::{Chunk, Result, RetrievalConfig, TripleLoopError};

use crate::scorer::ScoringPolicy;

/// How many chunks to select and which scores qualify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionConfig {
    /// Upper bound on returned chunks.
    pub top_k: usize,
    /// Leading chunks returned when nothing qualifies (capped at `top_k`).
    pub fallback_top_k: usize,
    /// Chunks must score strictly above this.
    pub min_chunk_score: u32,
}

impl SelectionConfig {
    /// `top_k` results, the same number as fallback, any positive score qualifies.
    pub fn new(top_k: usize) -> Self {
        Self {
            top_k,
            fallback_top_k: top_k,
            min_chunk_score: 0,
        }
    }
}

impl TryFrom<&RetrievalConfig> for SelectionConfig {
    type Error = TripleLoopError;

    fn try_from(config: &RetrievalConfig) -> Result<Self> {
        if config.top_k == 0 {
            return Err(TripleLoopError::config("top_k must be at least 1"));
        }
        if config.fallback_top_k == 0 {
            return Err(TripleLoopError::config("fallback_top_k must be at least 1"));
        }
        Ok(Self {
            top_k: config.top_k,
            fallback_top_k: config.fallback_top_k,
            min_chunk_score: config.min_chunk_score,
        })
    }
}

/// A chunk with its score for one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredChunk<'a> {
    pub chunk: &'a Chunk,
    pub score: u32,
}

/// Selected chunks for one question, best first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankedResults<'a> {
    pub chunks: Vec<ScoredChunk<'a>>,
    /// No chunk qualified; `chunks` are the leading chunks in document order.
    pub fallback: bool,
}

impl<'a> RankedResults<'a> {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunk texts in rank order.
    pub fn texts(&self) -> Vec<&'a str> {
        self.chunks.iter().map(|s| s.chunk.text.as_str()).collect()
    }

    /// Chunk texts joined into one context block. Empty when nothing was selected.
    pub fn context_block(&self, separator: &str) -> String {
        self.texts().join(separator)
    }
}

/// Score every chunk, keep those above the threshold, and return the best
/// `top_k` (equal scores keep document order). Falls back to the first
/// `fallback_top_k` chunks when nothing qualifies.
#[instrument(skip_all, fields(chunks = chunks.len(), top_k = selection.top_k))]
pub fn select<'a>(
    query: &str,
    chunks: &'a [Chunk],
    policy: &ScoringPolicy,
    selection: &SelectionConfig,
) -> RankedResults<'a> {
    let prepared = policy.prepare(query);

    let mut ranked: Vec<ScoredChunk<'a>> = chunks
        .iter()
        .map(|chunk| ScoredChunk {
            chunk,
            score: policy
                .score_prepared(&prepared, &chunk.text.to_lowercase())
                .total(),
        })
        .filter(|scored| scored.score > selection.min_chunk_score)
        .collect();

    if ranked.is_empty() {
        let take = selection.fallback_top_k.min(selection.top_k);
        if !chunks.is_empty() {
            warn!(
                tokens = prepared.tokens().len(),
                fallback = take.min(chunks.len()),
                "no chunk matched the query, falling back to document order"
            );
        }
        return RankedResults {
            chunks: chunks
                .iter()
                .take(take)
                .map(|chunk| ScoredChunk { chunk, score: 0 })
                .collect(),
            fallback: true,
        };
    }

    // `sort_by` is stable, so ties keep document order.
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked.truncate(selection.top_k);

    debug!(
        selected = ranked.len(),
        best = ranked.first().map(|s| s.score).unwrap_or_default(),
        "chunks ranked"
    );

    RankedResults {
        chunks: ranked,
        fallback: false,
    }
}

/// [`select`] reduced to the chunk texts.
pub fn select_texts<'a>(
    query: &str,
    chunks: &'a [Chunk],
    policy: &ScoringPolicy,
    selection: &SelectionConfig,
) -> Vec<&'a str> {
    select(query, chunks, policy, selection).texts()
}
