//! Shared types, error model, and configuration for the Triple Loop assistant.
//!
//! This crate is the foundation depended on by all other workspace crates.
//! It provides:
//! - [`TripleLoopError`]: the unified error type
//! - Domain types ([`Document`], [`Chunk`])
//! - Configuration ([`AppConfig`] and its sections, config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ChunkStrategyKind, ChunkingConfig, CompletionConfig, DEFAULT_PHRASE_BONUS,
    KeywordEntry, KnowledgeConfig, PhraseRuleEntry, QueryMatchKind, RetrievalConfig,
    ScoringConfig, TokenWeightingKind, config_dir, config_file_path, init_config, load_config,
    load_config_from, resolve_api_key,
};
pub use error::{Result, TripleLoopError};
pub use types::{Chunk, Document};
