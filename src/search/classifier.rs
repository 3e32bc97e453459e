//! Search-relevance classification.
//!
//! A layered heuristic that decides whether a query should be answered with
//! live search results. Tiers are checked in a fixed order and the first hit
//! wins:
//!
//! 1. explicit requests ("search for", "look up", "google", ...)
//! 2. short follow-ups ("their email", "that website")
//! 3. factual wh-questions and recency markers, only for longer queries
//! 4. keyword substrings tied to external facts
//!
//! All pattern tables are plain data in [`ClassifierRules`] so they can be
//! extended from configuration.

use std::collections::HashSet;
use std::fmt;

use regex::{RegexSet, RegexSetBuilder};

use crate::config::ClassifierConfig;

// ---------------------------------------------------------------------------
// Default tables
// ---------------------------------------------------------------------------

const EXPLICIT_PATTERNS: &[&str] = &[
    r"\bsearch\s+(for|about|on|up)\b",
    r"\blook\s*(up|into)\b",
    r"\bfind\s+(me\s+)?(some\s+)?(info|information|details|data|out)\b",
    r"\bgoogle\b",
    r"\b(can|could)\s+you\s+(search|look|find|check|research)\b",
    r"\bshow\s+me\s+(about|some|the|what|who)\b",
    r"\bget\s+me\s+(some\s+)?(info|information|details|data)\b",
    r"\bresearch\s+(on|about|into)\b",
];

const FACTUAL_PATTERNS: &[&str] = &[
    r"\b(what|who|where|when|which)('s|\s+is|\s+are|\s+was|\s+were)\b",
    r"\bhow\s+(do|does|can|many|much|long|big|often)\b",
    r"\btell\s+me\s+(the|about)\b",
    r"\b(list|give\s+me)\s+(the\s+|some\s+)?(examples|types|kinds|names|top)\b",
    r"\b(compare|comparison|versus|vs|difference\s+between)\b",
    r"\b(current|recent|latest|today|this\s+week|this\s+month|this\s+year|trending|new)\b",
];

const KEYWORDS: &[&str] = &[
    // market research
    "market",
    "industry",
    "statistic",
    "report",
    "survey",
    "trend",
    "growth",
    "forecast",
    "benchmark",
    "research",
    "analysis",
    "insights",
    // funding and deals
    "investor",
    "funding",
    "valuation",
    "acquisition",
    "merger",
    // contact details
    "contact",
    "email",
    "phone",
    "address",
    "directory",
    // events
    "conference",
    "event",
    "schedule",
    "deadline",
    "announcement",
    "launched",
    "released",
    "news",
    // comparisons
    "competitor",
    "alternative",
    "ranking",
    "best",
    "versus",
    "regulation",
    "compliance",
    "top companies",
    "market leaders",
];

const CONTINUATION_WORDS: &[&str] = &[
    "their", "them", "they", "this", "that", "these", "those", "it", "its", "any", "the", "his",
    "her",
];

const INFO_NOUNS: &[&str] = &[
    "contact",
    "contacts",
    "email",
    "emails",
    "website",
    "site",
    "address",
    "phone",
    "number",
    "details",
    "info",
    "information",
    "link",
    "url",
];

/// Default short-query threshold, in whitespace tokens.
pub const DEFAULT_SHORT_QUERY_MAX_TOKENS: usize = 3;

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Pattern tables driving the classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierRules {
    /// Regexes for explicit search requests.
    pub explicit_patterns: Vec<String>,
    /// Regexes for factual questions, applied to longer queries only.
    pub factual_patterns: Vec<String>,
    /// Lowercase substrings that imply external facts.
    pub keywords: Vec<String>,
    /// First words that mark a short query as a follow-up.
    pub continuation_words: Vec<String>,
    /// Nouns that mark a short query as a lookup.
    pub info_nouns: Vec<String>,
    /// Queries with at most this many tokens use the short-query tier.
    pub short_query_max_tokens: usize,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self {
            explicit_patterns: owned(EXPLICIT_PATTERNS),
            factual_patterns: owned(FACTUAL_PATTERNS),
            keywords: owned(KEYWORDS),
            continuation_words: owned(CONTINUATION_WORDS),
            info_nouns: owned(INFO_NOUNS),
            short_query_max_tokens: DEFAULT_SHORT_QUERY_MAX_TOKENS,
        }
    }
}

impl ClassifierRules {
    /// Default tables extended with the `[classifier]` config section.
    pub fn from_config(config: &ClassifierConfig) -> Self {
        let mut rules = Self::default();
        rules
            .explicit_patterns
            .extend(config.extra_explicit_patterns.iter().cloned());
        rules
            .factual_patterns
            .extend(config.extra_factual_patterns.iter().cloned());
        rules
            .keywords
            .extend(config.extra_keywords.iter().map(|k| k.to_lowercase()));
        rules
            .continuation_words
            .extend(config.extra_continuation_words.iter().map(|w| w.to_lowercase()));
        rules
            .info_nouns
            .extend(config.extra_info_nouns.iter().map(|w| w.to_lowercase()));
        rules.short_query_max_tokens = config.short_query_max_tokens;
        rules
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Which tier decided that a query needs search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchTrigger {
    /// The user asked for a search outright.
    Explicit,
    /// Short follow-up referencing an earlier topic or asking for details.
    ShortFollowUp,
    /// Factual or recency question.
    Factual,
    /// Domain keyword.
    Keyword,
}

impl SearchTrigger {
    /// Stable label for logs.
    pub fn label(self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::ShortFollowUp => "short_follow_up",
            Self::Factual => "factual",
            Self::Keyword => "keyword",
        }
    }
}

impl fmt::Display for SearchTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Compiled search-relevance classifier.
#[derive(Debug, Clone)]
pub struct SearchClassifier {
    explicit: RegexSet,
    factual: RegexSet,
    keywords: Vec<String>,
    continuation_words: HashSet<String>,
    info_nouns: HashSet<String>,
    short_query_max_tokens: usize,
}

fn compile(patterns: &[String]) -> Result<RegexSet, regex::Error> {
    RegexSetBuilder::new(patterns)
        .case_insensitive(true)
        .build()
}

impl SearchClassifier {
    /// Compile a classifier from rule tables.
    ///
    /// # Errors
    ///
    /// Returns the regex error if any pattern fails to compile.
    pub fn new(rules: &ClassifierRules) -> Result<Self, regex::Error> {
        Ok(Self {
            explicit: compile(&rules.explicit_patterns)?,
            factual: compile(&rules.factual_patterns)?,
            keywords: rules.keywords.iter().map(|k| k.to_lowercase()).collect(),
            continuation_words: rules
                .continuation_words
                .iter()
                .map(|w| w.to_lowercase())
                .collect(),
            info_nouns: rules.info_nouns.iter().map(|w| w.to_lowercase()).collect(),
            short_query_max_tokens: rules.short_query_max_tokens,
        })
    }

    /// Whether `query` should be answered with search results.
    pub fn needs_search(&self, query: &str) -> bool {
        self.classify(query).is_some()
    }

    /// The tier that fires for `query`, or `None` when no search is needed.
    pub fn classify(&self, query: &str) -> Option<SearchTrigger> {
        if self.explicit.is_match(query) {
            return Some(SearchTrigger::Explicit);
        }

        let lowered = query.to_lowercase();
        let token_count = lowered.split_whitespace().count();

        if token_count <= self.short_query_max_tokens {
            let tokens: Vec<&str> = lowered
                .split_whitespace()
                .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
                .filter(|t| !t.is_empty())
                .collect();
            if self.is_short_follow_up(&tokens) {
                return Some(SearchTrigger::ShortFollowUp);
            }
        } else if self.factual.is_match(query) {
            return Some(SearchTrigger::Factual);
        }

        if self.keywords.iter().any(|k| lowered.contains(k.as_str())) {
            return Some(SearchTrigger::Keyword);
        }

        None
    }

    fn is_short_follow_up(&self, tokens: &[&str]) -> bool {
        let Some(first) = tokens.first() else {
            return false;
        };
        self.continuation_words.contains(*first)
            || tokens.iter().any(|t| self.info_nouns.contains(*t))
    }
}
