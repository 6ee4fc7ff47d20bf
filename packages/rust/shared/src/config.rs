//! Application configuration for the Triple Loop assistant.
//!
//! User config lives at `~/.tripleloop/tripleloop.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, TripleLoopError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "tripleloop.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".tripleloop";

/// Bonus applied by a phrase rule that does not set its own.
pub const DEFAULT_PHRASE_BONUS: u32 = 10;

/// Terms rewarded when both the question and a passage mention them.
const DEFAULT_KEYWORDS: &[&str] = &[
    "triple loop",
    "change",
    "führung",
    "leadership",
    "veränderung",
    "organisation",
    "planung",
    "aktivierung",
    "verankerung",
    "enhancement",
    "engagement",
    "execution",
    "enforcement",
    "wirkung",
    "akzeptanz",
    "inhalt",
    "transformation",
    "loop 1",
    "loop 2",
    "loop 3",
    "enh",
    "eng",
    "exe",
    "enf",
];

/// Named loops and phases, the navigational backbone of the framework text.
const DEFAULT_PHRASES: &[&str] = &[
    "loop 1",
    "loop 2",
    "loop 3",
    "planung",
    "aktivierung",
    "verankerung",
];

// ---------------------------------------------------------------------------
// Config structs (matching tripleloop.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Knowledge source location.
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// How the document is split into chunks.
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// How many chunks are selected per question.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Lexical scoring policy.
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Completion endpoint settings.
    #[serde(default)]
    pub completion: CompletionConfig,
}

/// `[knowledge]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Plain-text knowledge source. When unset the bundled framework text is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_path: Option<PathBuf>,
}

/// Chunking strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStrategyKind {
    /// Fixed-size windows with overlap, snapped to sentence ends.
    #[default]
    SlidingWindow,
    /// Whole paragraphs packed into buckets of roughly `target_size`.
    ParagraphPacking,
}

/// `[chunking]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Which chunker to run.
    #[serde(default)]
    pub strategy: ChunkStrategyKind,

    /// Target chunk size in characters.
    #[serde(default = "default_target_size")]
    pub target_size: usize,

    /// Characters shared between consecutive sliding windows.
    #[serde(default = "default_overlap")]
    pub overlap: usize,

    /// Sliding window: trimmed chunks shorter than this are dropped.
    #[serde(default = "default_min_chunk_chars")]
    pub min_chunk_chars: usize,

    /// Paragraph packing: paragraphs shorter than this are dropped.
    #[serde(default = "default_min_paragraph_chars")]
    pub min_paragraph_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            strategy: ChunkStrategyKind::default(),
            target_size: default_target_size(),
            overlap: default_overlap(),
            min_chunk_chars: default_min_chunk_chars(),
            min_paragraph_chars: default_min_paragraph_chars(),
        }
    }
}

fn default_target_size() -> usize {
    1500
}
fn default_overlap() -> usize {
    200
}
fn default_min_chunk_chars() -> usize {
    1
}
fn default_min_paragraph_chars() -> usize {
    50
}

/// `[retrieval]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Maximum number of chunks handed to the completion step.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Number of leading chunks used when nothing scores.
    #[serde(default = "default_top_k")]
    pub fallback_top_k: usize,

    /// Chunks must score strictly above this to be selected.
    #[serde(default)]
    pub min_chunk_score: u32,

    /// Separator placed between chunk texts in the context block.
    #[serde(default = "default_context_separator")]
    pub context_separator: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            fallback_top_k: default_top_k(),
            min_chunk_score: 0,
            context_separator: default_context_separator(),
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_context_separator() -> String {
    "\n\n---\n\n".into()
}

/// How query-token hits are weighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenWeightingKind {
    /// `token_weight` per occurrence.
    #[default]
    Counted,
    /// `token_weight` once per token present.
    Binary,
}

/// How keyword and phrase rules are matched against the question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMatchKind {
    /// The whole term, bounded by non-alphanumeric characters.
    #[default]
    WholeWord,
    /// The term's first word anywhere in the question, as a substring.
    LeadingWord,
}

/// `[[scoring.keywords]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordEntry {
    /// Domain term, matched case-insensitively.
    pub term: String,
    /// Bonus weight; falls back to `default_keyword_bonus`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus: Option<u32>,
}

/// `[[scoring.phrase_rules]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseRuleEntry {
    /// Phrase the question must mention.
    pub query: String,
    /// Phrase the passage must contain verbatim (case-insensitive).
    pub chunk: String,
    /// Bonus weight; falls back to [`DEFAULT_PHRASE_BONUS`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus: Option<u32>,
}

/// `[scoring]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Counted (per occurrence) or binary (per token) token weighting.
    #[serde(default)]
    pub token_weighting: TokenWeightingKind,

    /// Weight for one token hit.
    #[serde(default = "default_token_weight")]
    pub token_weight: u32,

    /// Query tokens shorter than this (in characters) are ignored.
    #[serde(default = "default_min_token_chars")]
    pub min_token_chars: usize,

    /// Question-side matching rule for keywords and phrases.
    #[serde(default)]
    pub query_match: QueryMatchKind,

    /// Bonus for keywords without an explicit one.
    #[serde(default = "default_keyword_bonus")]
    pub default_keyword_bonus: u32,

    /// Keyword bonus table.
    #[serde(default = "default_keywords")]
    pub keywords: Vec<KeywordEntry>,

    /// High-value phrase rules.
    #[serde(default = "default_phrase_rules")]
    pub phrase_rules: Vec<PhraseRuleEntry>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            token_weighting: TokenWeightingKind::default(),
            token_weight: default_token_weight(),
            min_token_chars: default_min_token_chars(),
            query_match: QueryMatchKind::default(),
            default_keyword_bonus: default_keyword_bonus(),
            keywords: default_keywords(),
            phrase_rules: default_phrase_rules(),
        }
    }
}

fn default_token_weight() -> u32 {
    1
}
fn default_min_token_chars() -> usize {
    3
}
fn default_keyword_bonus() -> u32 {
    5
}
fn default_keywords() -> Vec<KeywordEntry> {
    DEFAULT_KEYWORDS
        .iter()
        .map(|term| KeywordEntry {
            term: (*term).into(),
            bonus: None,
        })
        .collect()
}
fn default_phrase_rules() -> Vec<PhraseRuleEntry> {
    DEFAULT_PHRASES
        .iter()
        .map(|phrase| PhraseRuleEntry {
            query: (*phrase).into(),
            chunk: (*phrase).into(),
            bonus: None,
        })
        .collect()
}

/// `[completion]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: Url,

    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Upper bound on generated tokens.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_key_env() -> String {
    "GROQ_API_KEY".into()
}
fn default_base_url() -> Url {
    Url::parse("https://api.groq.com/openai/v1").expect("valid default URL")
}
fn default_model() -> String {
    "llama-3.3-70b-versatile".into()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_timeout_secs() -> u64 {
    60
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.tripleloop/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TripleLoopError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.tripleloop/tripleloop.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TripleLoopError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        TripleLoopError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| TripleLoopError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| TripleLoopError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TripleLoopError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the completion API key from the configured env var.
pub fn resolve_api_key(config: &CompletionConfig) -> Result<String> {
    let var_name = &config.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(TripleLoopError::config(format!(
            "completion API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("target_size"));
        assert!(toml_str.contains("GROQ_API_KEY"));
        assert!(toml_str.contains("triple loop"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.chunking.target_size, 1500);
        assert_eq!(parsed.chunking.overlap, 200);
        assert_eq!(parsed.retrieval.top_k, 5);
        assert_eq!(parsed.scoring.keywords.len(), DEFAULT_KEYWORDS.len());
        assert_eq!(parsed.completion.model, "llama-3.3-70b-versatile");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[chunking]
strategy = "paragraph_packing"
target_size = 800

[scoring]
token_weighting = "binary"
token_weight = 3
query_match = "leading_word"

[[scoring.keywords]]
term = "loop 2"
bonus = 10
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.chunking.strategy, ChunkStrategyKind::ParagraphPacking);
        assert_eq!(config.chunking.target_size, 800);
        assert_eq!(config.chunking.overlap, 200);
        assert_eq!(config.scoring.token_weighting, TokenWeightingKind::Binary);
        assert_eq!(config.scoring.query_match, QueryMatchKind::LeadingWord);
        assert_eq!(
            config.scoring.keywords,
            vec![KeywordEntry {
                term: "loop 2".into(),
                bonus: Some(10),
            }]
        );
        // Untouched sections keep their defaults.
        assert_eq!(config.scoring.phrase_rules.len(), DEFAULT_PHRASES.len());
        assert_eq!(config.retrieval.context_separator, "\n\n---\n\n");
        assert!(config.knowledge.document_path.is_none());
    }

    #[test]
    fn load_config_from_missing_file_is_io_error() {
        let err = load_config_from(Path::new("/nonexistent/tripleloop.toml")).unwrap_err();
        assert!(matches!(err, TripleLoopError::Io { .. }));
    }

    #[test]
    fn api_key_resolution() {
        let mut config = CompletionConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.api_key_env = "TL_TEST_NONEXISTENT_KEY_12345".into();
        let result = resolve_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
