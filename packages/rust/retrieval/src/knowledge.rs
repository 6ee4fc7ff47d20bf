//! The process-wide knowledge base and the per-request retriever.
//!
//! [`KnowledgeBase`] is built once at startup and never mutated; it is shared
//! behind an `Arc`. [`Retriever`] bundles it with the scoring policy and
//! selection settings, and is cheap to clone into every request handler.
//! Queries only read shared state, so any number may run concurrently.

use std::sync::Arc;

use tracing::{info, instrument};

use tripleloop_shared::{AppConfig, Chunk, Document, Result};

use crate::chunker::ChunkStrategy;
use crate::ranker::{self, RankedResults, SelectionConfig};
use crate::scorer::ScoringPolicy;

/// An immutable document with its chunk sequence.
#[derive(Debug)]
pub struct KnowledgeBase {
    document: Document,
    chunks: Vec<Chunk>,
    strategy: ChunkStrategy,
    fingerprint: String,
}

impl KnowledgeBase {
    /// Chunk `document` with `strategy`.
    #[instrument(skip_all, fields(strategy = strategy.name(), doc_len = document.len()))]
    pub fn build(document: Document, strategy: ChunkStrategy) -> Self {
        let chunks = strategy.chunk(document.text());
        let fingerprint = document.fingerprint();
        let short_fingerprint = &fingerprint[..12];

        info!(
            chunks = chunks.len(),
            fingerprint = short_fingerprint,
            "knowledge base loaded"
        );

        Self {
            document,
            chunks,
            strategy,
            fingerprint,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Chunks in document order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn strategy(&self) -> ChunkStrategy {
        self.strategy
    }

    /// SHA-256 of the source text.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

/// Read-only retrieval handle over a shared knowledge base.
#[derive(Debug, Clone)]
pub struct Retriever {
    knowledge: Arc<KnowledgeBase>,
    policy: Arc<ScoringPolicy>,
    selection: SelectionConfig,
    separator: String,
}

impl Retriever {
    pub fn new(
        knowledge: Arc<KnowledgeBase>,
        policy: Arc<ScoringPolicy>,
        selection: SelectionConfig,
    ) -> Self {
        Self {
            knowledge,
            policy,
            selection,
            separator: "\n\n---\n\n".into(),
        }
    }

    /// Build the knowledge base and retrieval settings from application config.
    pub fn from_config(document: Document, config: &AppConfig) -> Result<Self> {
        let strategy = ChunkStrategy::try_from(&config.chunking)?;
        let policy = ScoringPolicy::try_from(&config.scoring)?;
        let selection = SelectionConfig::try_from(&config.retrieval)?;

        let knowledge = KnowledgeBase::build(document, strategy);
        Ok(Self::new(Arc::new(knowledge), Arc::new(policy), selection)
            .with_separator(config.retrieval.context_separator.clone()))
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Override the number of selected chunks (and the fallback size with it).
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.selection.top_k = top_k.max(1);
        self.selection.fallback_top_k = self.selection.top_k;
        self
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    pub fn selection(&self) -> &SelectionConfig {
        &self.selection
    }

    /// Ranked chunks for one question.
    pub fn retrieve(&self, query: &str) -> RankedResults<'_> {
        ranker::select(query, self.knowledge.chunks(), &self.policy, &self.selection)
    }

    /// Selected chunk texts joined into a single context block.
    pub fn context_block(&self, query: &str) -> String {
        self.retrieve(query).context_block(&self.separator)
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }
}
