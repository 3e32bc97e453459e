//! Post-generation text transforms.
//!
//! Every chunk of generated text passes through a [`TransformChain`] before
//! it reaches the caller. The stock transform is [`ReplacementFilter`], a
//! whole-word, case-insensitive word replacement table used to soften
//! profanity.

use std::collections::{BTreeMap, HashMap};

use regex::{Captures, Regex, RegexBuilder};

/// A pure text-to-text rewrite.
pub trait TextTransform: Send + Sync {
    /// Rewrite `text`.
    fn apply(&self, text: &str) -> String;
}

/// Errors building a [`ReplacementFilter`].
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// A key contains whitespace and could be split across chunks.
    #[error("replacement key {0:?} must be a single word")]
    MultiWordKey(String),
    /// The combined pattern failed to compile.
    #[error("replacement pattern failed to compile: {0}")]
    Regex(#[from] regex::Error),
}

/// Whole-word replacement table.
///
/// Keys are single words. Matching ignores case. When the matched word
/// starts with an uppercase letter, so does its replacement.
#[derive(Debug, Clone)]
pub struct ReplacementFilter {
    pattern: Option<Regex>,
    replacements: HashMap<String, String>,
}

impl ReplacementFilter {
    /// Build a filter from a `word -> replacement` table.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::MultiWordKey`] for a key containing whitespace,
    /// or [`FilterError::Regex`] if the combined pattern cannot be compiled.
    pub fn new(table: &BTreeMap<String, String>) -> Result<Self, FilterError> {
        if let Some(key) = table.keys().find(|k| k.trim().contains(char::is_whitespace)) {
            return Err(FilterError::MultiWordKey(key.trim().to_owned()));
        }

        let replacements: HashMap<String, String> = table
            .iter()
            .filter(|(word, _)| !word.trim().is_empty())
            .map(|(word, replacement)| (word.trim().to_lowercase(), replacement.clone()))
            .collect();

        if replacements.is_empty() {
            return Ok(Self {
                pattern: None,
                replacements,
            });
        }

        // Longest first so a key wins over its prefixes.
        let mut words: Vec<&String> = replacements.keys().collect();
        words.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let alternation = words
            .iter()
            .map(|w| regex::escape(w))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = RegexBuilder::new(&format!(r"\b(?:{alternation})\b"))
            .case_insensitive(true)
            .build()?;

        Ok(Self {
            pattern: Some(pattern),
            replacements,
        })
    }

    fn replacement_for(&self, matched: &str) -> String {
        let Some(replacement) = self.replacements.get(&matched.to_lowercase()) else {
            return matched.to_owned();
        };
        if matched.chars().next().is_some_and(char::is_uppercase) {
            let mut chars = replacement.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        } else {
            replacement.clone()
        }
    }
}

impl TextTransform for ReplacementFilter {
    fn apply(&self, text: &str) -> String {
        match &self.pattern {
            Some(pattern) => pattern
                .replace_all(text, |caps: &Captures<'_>| {
                    caps.get(0)
                        .map(|m| self.replacement_for(m.as_str()))
                        .unwrap_or_default()
                })
                .into_owned(),
            None => text.to_owned(),
        }
    }
}

/// Ordered sequence of transforms.
#[derive(Default)]
pub struct TransformChain {
    transforms: Vec<Box<dyn TextTransform>>,
}

impl std::fmt::Debug for TransformChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformChain")
            .field("transforms", &self.transforms.len())
            .finish()
    }
}

impl TransformChain {
    /// Empty chain (identity).
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transform.
    #[must_use]
    pub fn with(mut self, transform: impl TextTransform + 'static) -> Self {
        self.transforms.push(Box::new(transform));
        self
    }

    /// Whether the chain has no transforms.
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Apply every transform in order.
    pub fn apply(&self, text: &str) -> String {
        self.transforms
            .iter()
            .fold(text.to_owned(), |acc, transform| transform.apply(&acc))
    }
}
