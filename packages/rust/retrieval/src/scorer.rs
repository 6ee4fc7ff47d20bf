//! Lexical relevance scoring.
//!
//! A chunk's score for a question is the sum of three literal signals, all
//! case-insensitive and without stemming or synonyms:
//!
//! 1. **Token hits**: each whitespace token of the question (edge punctuation
//!    stripped, at least `min_token_chars` long) found in the chunk, weighted
//!    per [`TokenWeighting`].
//! 2. **Keyword bonus**: each [`Keyword`] the question mentions (per
//!    [`QueryMatch`]) and the chunk contains.
//! 3. **Phrase bonus**: each [`PhraseRule`] whose question phrase is mentioned
//!    and whose chunk phrase the chunk contains verbatim.
//!
//! The policy is plain data injected by the caller, so tests and callers can
//! swap tables without touching the document.

use tripleloop_shared::{
    Chunk, DEFAULT_PHRASE_BONUS, QueryMatchKind, Result, ScoringConfig, TokenWeightingKind,
    TripleLoopError,
};

/// How query-token hits contribute to the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenWeighting {
    /// `weight` for every non-overlapping occurrence in the chunk.
    Counted { weight: u32 },
    /// `weight` once if the token occurs at all.
    Binary { weight: u32 },
}

impl Default for TokenWeighting {
    fn default() -> Self {
        Self::Counted { weight: 1 }
    }
}

/// How keyword and phrase rules are matched against the question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryMatch {
    /// The whole term, not preceded or followed by a letter or digit.
    #[default]
    WholeWord,
    /// The term's first word anywhere in the question, even inside a longer word.
    LeadingWord,
}

impl QueryMatch {
    /// Whether the lowercased question mentions the lowercased `term`.
    fn mentions(self, query: &str, term: &str) -> bool {
        match self {
            Self::WholeWord => contains_whole_word(query, term),
            Self::LeadingWord => term
                .split_whitespace()
                .next()
                .is_some_and(|first| query.contains(first)),
        }
    }
}

impl From<QueryMatchKind> for QueryMatch {
    fn from(kind: QueryMatchKind) -> Self {
        match kind {
            QueryMatchKind::WholeWord => Self::WholeWord,
            QueryMatchKind::LeadingWord => Self::LeadingWord,
        }
    }
}

/// A domain term with its bonus weight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword {
    term: String,
    bonus: u32,
}

impl Keyword {
    /// Build a keyword; the term is lowercased and must not be blank.
    pub fn new(term: &str, bonus: u32) -> Result<Self> {
        Ok(Self {
            term: normalize_term(term, "keyword")?,
            bonus,
        })
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn bonus(&self) -> u32 {
        self.bonus
    }
}

/// High-value rule: the question mentions `query_phrase` and the chunk
/// contains `chunk_phrase`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseRule {
    query_phrase: String,
    chunk_phrase: String,
    bonus: u32,
}

impl PhraseRule {
    /// Build a rule; both phrases are lowercased and must not be blank.
    pub fn new(query_phrase: &str, chunk_phrase: &str, bonus: u32) -> Result<Self> {
        Ok(Self {
            query_phrase: normalize_term(query_phrase, "phrase rule query")?,
            chunk_phrase: normalize_term(chunk_phrase, "phrase rule chunk")?,
            bonus,
        })
    }

    /// Rule matching the same phrase on both sides.
    pub fn exact(phrase: &str, bonus: u32) -> Result<Self> {
        Self::new(phrase, phrase, bonus)
    }
}

fn normalize_term(term: &str, what: &str) -> Result<String> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return Err(TripleLoopError::config(format!("{what} must not be empty")));
    }
    Ok(term)
}

/// Per-signal contributions to one chunk's score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreBreakdown {
    pub tokens: u32,
    pub keywords: u32,
    pub phrases: u32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u32 {
        self.tokens
            .saturating_add(self.keywords)
            .saturating_add(self.phrases)
    }
}

/// Question normalized once and scored against many chunks.
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    lowered: String,
    tokens: Vec<String>,
}

impl PreparedQuery {
    /// Surviving query tokens, lowercased.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

/// Complete scoring policy: token weighting plus keyword and phrase tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringPolicy {
    weighting: TokenWeighting,
    min_token_chars: usize,
    query_match: QueryMatch,
    keywords: Vec<Keyword>,
    phrase_rules: Vec<PhraseRule>,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self::new(TokenWeighting::default())
    }
}

impl ScoringPolicy {
    /// Policy with empty tables, whole-word question matching and a
    /// three-character token minimum.
    pub fn new(weighting: TokenWeighting) -> Self {
        Self {
            weighting,
            min_token_chars: 3,
            query_match: QueryMatch::default(),
            keywords: Vec::new(),
            phrase_rules: Vec::new(),
        }
    }

    pub fn with_min_token_chars(mut self, min_token_chars: usize) -> Self {
        self.min_token_chars = min_token_chars;
        self
    }

    pub fn with_query_match(mut self, query_match: QueryMatch) -> Self {
        self.query_match = query_match;
        self
    }

    pub fn with_keywords(mut self, keywords: impl IntoIterator<Item = Keyword>) -> Self {
        self.keywords.extend(keywords);
        self
    }

    pub fn with_phrase_rules(mut self, rules: impl IntoIterator<Item = PhraseRule>) -> Self {
        self.phrase_rules.extend(rules);
        self
    }

    pub fn keywords(&self) -> &[Keyword] {
        &self.keywords
    }

    pub fn phrase_rules(&self) -> &[PhraseRule] {
        &self.phrase_rules
    }

    /// Lowercase and tokenize a question.
    pub fn prepare(&self, query: &str) -> PreparedQuery {
        let lowered = query.to_lowercase();
        let tokens = lowered
            .split_whitespace()
            .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|token| !token.is_empty() && token.chars().count() >= self.min_token_chars)
            .map(String::from)
            .collect();

        PreparedQuery { lowered, tokens }
    }

    /// Score one chunk for a raw question.
    pub fn score(&self, query: &str, chunk: &Chunk) -> u32 {
        self.score_prepared(&self.prepare(query), &chunk.text.to_lowercase())
            .total()
    }

    /// Score a lowercased chunk text for a prepared question.
    pub fn score_prepared(&self, query: &PreparedQuery, chunk_lower: &str) -> ScoreBreakdown {
        let mut breakdown = ScoreBreakdown::default();

        for token in &query.tokens {
            let hits = match self.weighting {
                TokenWeighting::Counted { weight } => {
                    weight.saturating_mul(count_u32(chunk_lower.matches(token.as_str()).count()))
                }
                TokenWeighting::Binary { weight } if chunk_lower.contains(token.as_str()) => weight,
                TokenWeighting::Binary { .. } => 0,
            };
            breakdown.tokens = breakdown.tokens.saturating_add(hits);
        }

        for keyword in &self.keywords {
            if chunk_lower.contains(keyword.term.as_str())
                && self.query_match.mentions(&query.lowered, &keyword.term)
            {
                breakdown.keywords = breakdown.keywords.saturating_add(keyword.bonus);
            }
        }

        for rule in &self.phrase_rules {
            if chunk_lower.contains(rule.chunk_phrase.as_str())
                && self.query_match.mentions(&query.lowered, &rule.query_phrase)
            {
                breakdown.phrases = breakdown.phrases.saturating_add(rule.bonus);
            }
        }

        breakdown
    }
}

impl TryFrom<&ScoringConfig> for ScoringPolicy {
    type Error = TripleLoopError;

    fn try_from(config: &ScoringConfig) -> Result<Self> {
        let weighting = match config.token_weighting {
            TokenWeightingKind::Counted => TokenWeighting::Counted {
                weight: config.token_weight,
            },
            TokenWeightingKind::Binary => TokenWeighting::Binary {
                weight: config.token_weight,
            },
        };

        let keywords = config
            .keywords
            .iter()
            .map(|entry| {
                Keyword::new(
                    &entry.term,
                    entry.bonus.unwrap_or(config.default_keyword_bonus),
                )
            })
            .collect::<Result<Vec<_>>>()?;

        let phrase_rules = config
            .phrase_rules
            .iter()
            .map(|entry| {
                PhraseRule::new(
                    &entry.query,
                    &entry.chunk,
                    entry.bonus.unwrap_or(DEFAULT_PHRASE_BONUS),
                )
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(weighting)
            .with_min_token_chars(config.min_token_chars)
            .with_query_match(config.query_match.into())
            .with_keywords(keywords)
            .with_phrase_rules(phrase_rules))
    }
}

fn count_u32(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// `needle` occurs in `haystack` with no letter or digit directly before or after it.
fn contains_whole_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(pos, matched)| {
        let before = haystack[..pos].chars().next_back();
        let after = haystack[pos + matched.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str) -> Chunk {
        Chunk {
            index: 0,
            text: text.into(),
            start: 0,
            end: text.len(),
        }
    }

    #[test]
    fn counted_weighting_counts_occurrences() {
        let policy = ScoringPolicy::new(TokenWeighting::Counted { weight: 1 });
        let c = chunk("Change braucht Akzeptanz. Ohne Akzeptanz kein Change.");
        // "change" x2, "akzeptanz" x2, "ohne" x1
        assert_eq!(policy.score("change akzeptanz ohne", &c), 5);
    }

    #[test]
    fn binary_weighting_is_flat_per_token() {
        let policy = ScoringPolicy::new(TokenWeighting::Binary { weight: 3 });
        let c = chunk("Change braucht Akzeptanz. Ohne Akzeptanz kein Change.");
        assert_eq!(policy.score("change akzeptanz", &c), 6);
        assert_eq!(policy.score("nothing here", &c), 0);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let policy = ScoringPolicy::default();
        let c = chunk("LOOP 1 - PLANUNG (Der Leader als Stratege)");
        assert_eq!(policy.score("Planung", &c), 1);
        assert_eq!(policy.score("STRATEGE", &c), 1);
    }

    #[test]
    fn short_tokens_and_punctuation_are_dropped() {
        let policy = ScoringPolicy::default();
        let prepared = policy.prepare("Was ist Loop 2? (ENH)");
        assert_eq!(prepared.tokens(), ["was", "ist", "loop", "enh"]);

        let strict = ScoringPolicy::default().with_min_token_chars(4);
        assert_eq!(strict.prepare("Was ist Loop 2?").tokens(), ["loop"]);
    }

    #[test]
    fn umlaut_tokens_use_char_length() {
        // "übe" is three characters but four bytes.
        let policy = ScoringPolicy::default().with_min_token_chars(4);
        assert!(policy.prepare("übe").tokens().is_empty());
        assert_eq!(policy.prepare("Führung").tokens(), ["führung"]);
    }

    #[test]
    fn empty_query_scores_zero() {
        let policy = ScoringPolicy::default()
            .with_keywords([Keyword::new("change", 5).unwrap()]);
        let c = chunk("Change Management");
        assert_eq!(policy.score("", &c), 0);
        assert_eq!(policy.score("   ", &c), 0);
    }

    #[test]
    fn keyword_bonus_needs_both_sides() {
        let policy = ScoringPolicy::new(TokenWeighting::Counted { weight: 0 })
            .with_keywords([Keyword::new("Triple Loop", 5).unwrap()]);

        let with_term = chunk("Das Triple Loop of Change Framework");
        let without_term = chunk("Das Change Framework");

        assert_eq!(policy.score("Was ist der Triple Loop?", &with_term), 5);
        assert_eq!(policy.score("Was ist der Triple Loop?", &without_term), 0);
        assert_eq!(policy.score("Was ist Change?", &with_term), 0);
    }

    #[test]
    fn adding_a_shared_keyword_strictly_increases_score() {
        let base = ScoringPolicy::default();
        let with_keyword = ScoringPolicy::default()
            .with_keywords([Keyword::new("akzeptanz", 5).unwrap()]);

        let c = chunk("Wirkung = Inhalt × Akzeptanz");
        let query = "Warum ist Akzeptanz wichtig?";
        assert!(with_keyword.score(query, &c) > base.score(query, &c));
    }

    #[test]
    fn whole_word_matching_rejects_partial_words() {
        let policy = ScoringPolicy::new(TokenWeighting::Counted { weight: 0 })
            .with_keywords([
                Keyword::new("eng", 5).unwrap(),
                Keyword::new("change", 5).unwrap(),
            ]);
        let c = chunk("ENG (Engagement) ist Teil jedes Change-Prozesses.");

        assert_eq!(policy.score("Was bedeutet Engagement?", &c), 0);
        assert_eq!(policy.score("Was heißt Changemanagement?", &c), 0);
        assert_eq!(policy.score("Was bedeutet ENG?", &c), 5);
        assert_eq!(policy.score("change-prozess erklären", &c), 5);
    }

    #[test]
    fn leading_word_matching_keeps_loose_behavior() {
        let policy = ScoringPolicy::new(TokenWeighting::Counted { weight: 0 })
            .with_query_match(QueryMatch::LeadingWord)
            .with_keywords([
                Keyword::new("triple loop", 5).unwrap(),
                Keyword::new("eng", 5).unwrap(),
            ]);
        let c = chunk("Das Triple Loop Modell: ENG steht für Engagement.");

        // Only the first word of the term has to appear, even inside a longer word.
        assert_eq!(policy.score("triplexyz", &c), 5);
        assert_eq!(policy.score("Engagement?", &c), 5);
        assert_eq!(policy.score("Planung", &c), 0);
    }

    #[test]
    fn phrase_rules_add_high_value_bonus() {
        let policy = ScoringPolicy::new(TokenWeighting::Counted { weight: 0 })
            .with_phrase_rules([
                PhraseRule::exact("loop 2", 10).unwrap(),
                PhraseRule::new("enh", "enhancement", 10).unwrap(),
            ]);

        let loop2 = chunk("LOOP 2 - AKTIVIERUNG");
        let dimension = chunk("ENH (Enhancement) - Entwicklung & Verbesserung");

        assert_eq!(policy.score("Erkläre Loop 2", &loop2), 10);
        assert_eq!(policy.score("Erkläre Loop 20", &loop2), 0);
        assert_eq!(policy.score("Was heißt ENH?", &dimension), 10);
        assert_eq!(policy.score("Was heißt ENH?", &loop2), 0);
    }

    #[test]
    fn loop_keyword_breaks_equal_token_tie() {
        let policy = ScoringPolicy::default()
            .with_keywords([Keyword::new("loop 2", 10).unwrap()]);
        let query = "Was ist Loop 2?";
        let planning = chunk("Loop 1 is planning.");
        let activation = chunk("Loop 2 is activation.");

        let prepared = policy.prepare(query);
        let p = policy.score_prepared(&prepared, &planning.text.to_lowercase());
        let a = policy.score_prepared(&prepared, &activation.text.to_lowercase());
        assert_eq!(p.tokens, a.tokens);
        assert_eq!(a.keywords, 10);
        assert!(a.total() > p.total());
    }

    #[test]
    fn policy_from_config() {
        let config = ScoringConfig::default();
        let policy = ScoringPolicy::try_from(&config).unwrap();
        assert_eq!(policy.keywords().len(), config.keywords.len());
        assert!(policy.keywords().iter().all(|k| k.bonus() == 5));
        assert!(policy.phrase_rules().iter().all(|r| r.bonus == DEFAULT_PHRASE_BONUS));

        let c = chunk("LOOP 2 - AKTIVIERUNG (Der Leader als Kommunikator)");
        // token "loop" (1) + keyword "loop 2" (5) + phrase "loop 2" (10)
        assert_eq!(policy.score("Loop 2?", &c), 16);
    }

    #[test]
    fn blank_terms_are_rejected() {
        assert!(Keyword::new("  ", 5).is_err());
        assert!(PhraseRule::new("loop 1", "", 10).is_err());

        let mut config = ScoringConfig::default();
        config.keywords.push(tripleloop_shared::KeywordEntry {
            term: String::new(),
            bonus: None,
        });
        assert!(ScoringPolicy::try_from(&config).is_err());
    }

    #[test]
    fn whole_word_helper_boundaries() {
        assert!(contains_whole_word("loop 2", "loop 2"));
        assert!(contains_whole_word("(loop 2)", "loop 2"));
        assert!(!contains_whole_word("loop 23", "loop 2"));
        assert!(!contains_whole_word("xloop 2", "loop 2"));
        assert!(contains_whole_word("xloop 2 und loop 2", "loop 2"));
        assert!(contains_whole_word("über führung.", "führung"));
    }
}
