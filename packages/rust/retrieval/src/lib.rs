//! Lexical retrieval over a single immutable knowledge document.
//!
//! The document is split once into overlapping chunks ([`chunker`]), every
//! question is scored against every chunk with literal token and keyword
//! matching ([`scorer`]), and the best chunks are selected with a fallback
//! to document order when nothing matches ([`ranker`]). [`KnowledgeBase`]
//! and [`Retriever`] tie the three together for a request-handling layer.

pub mod chunker;
pub mod knowledge;
pub mod ranker;
pub mod scorer;

pub use chunker::ChunkStrategy;
pub use knowledge::{KnowledgeBase, Retriever};
pub use ranker::{RankedResults, ScoredChunk, SelectionConfig, select, select_texts};
pub use scorer::{
    Keyword, PhraseRule, PreparedQuery, QueryMatch, ScoreBreakdown, ScoringPolicy, TokenWeighting,
};
