//! Growth hypothesis generation.
//!
//! One model call asks for a JSON record describing target segments, value
//! propositions, growth levers, and success metrics. Model output is parsed
//! leniently; anything unusable is replaced by [`GrowthHypothesis::fallback`]
//! so onboarding always completes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::{prompts, GenerationSettings};
use crate::profile::ProfileRecord;
use crate::providers::LlmProvider;

/// Structured first take on how the startup could grow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GrowthHypothesis {
    /// One-sentence restatement of the startup.
    pub description: String,
    /// Customer segments to target first.
    pub target_segments: Vec<String>,
    /// Value proposition per segment, as returned by the model.
    pub value_propositions: Value,
    /// Most promising growth channels.
    pub growth_levers: Vec<String>,
    /// Metrics that would confirm the hypothesis.
    pub success_metrics: Vec<String>,
}

impl GrowthHypothesis {
    /// Record used when the model's answer cannot be used.
    pub fn fallback() -> Self {
        Self {
            description: String::new(),
            target_segments: vec![
                "Early-stage SaaS founders".to_owned(),
                "Technical founders transitioning to CEO role".to_owned(),
            ],
            value_propositions: serde_json::json!({
                "Early-stage SaaS founders": "Accelerated time-to-market and founder-market fit",
                "Technical founders": "Business skill acquisition without expensive MBA",
            }),
            growth_levers: vec![
                "Product-led growth".to_owned(),
                "Community building".to_owned(),
                "Content marketing".to_owned(),
            ],
            success_metrics: vec![
                "User acquisition cost".to_owned(),
                "Activation rate".to_owned(),
                "30-day retention".to_owned(),
            ],
        }
    }
}

/// Why model output could not be turned into a hypothesis.
#[derive(Debug, thiserror::Error)]
pub enum HypothesisError {
    /// No `{ ... }` object in the text.
    #[error("no JSON object in model output")]
    NoObject,
    /// The extracted object is not valid JSON.
    #[error("invalid hypothesis JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Valid JSON, but neither segments nor levers.
    #[error("hypothesis has no segments and no growth levers")]
    Empty,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Outermost `{ ... }` span of `text`, ignoring code fences and prose.
fn extract_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    text.get(start..=end)
}

/// `Target Segments`, `target-segments` and `targetSegments` all become
/// `target_segments`.
fn normalize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut prev: Option<char> = None;
    for c in key.trim().chars() {
        if c == ' ' || c == '-' {
            out.push('_');
        } else if c.is_uppercase() {
            // Only a lower-to-upper boundary starts a new word.
            if prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit()) {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
        prev = Some(c);
    }
    out
}

fn field<'a>(object: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    object
        .iter()
        .find(|(key, _)| names.contains(&normalize_key(key).as_str()))
        .map(|(_, value)| value)
}

/// Human label for one list entry: a string, or the first naming field of an
/// object.
fn label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_owned()).filter(|s| !s.is_empty()),
        Value::Object(object) => ["name", "segment", "lever", "channel", "metric", "title"]
            .iter()
            .find_map(|key| object.get(*key).and_then(label))
            .or_else(|| object.values().find_map(label)),
        _ => None,
    }
}

fn labels(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(label).collect(),
        Some(Value::Object(object)) => object.keys().cloned().collect(),
        Some(other) => label(other).into_iter().collect(),
        None => Vec::new(),
    }
}

/// Parse model output into a hypothesis.
///
/// Tolerates Markdown code fences, surrounding prose, differently cased keys,
/// and list entries given as objects.
///
/// # Errors
///
/// Returns [`HypothesisError`] when no usable record can be extracted.
pub fn parse_hypothesis(text: &str) -> Result<GrowthHypothesis, HypothesisError> {
    let raw = extract_object(text).ok_or(HypothesisError::NoObject)?;
    let value: Value = serde_json::from_str(raw)?;
    let Value::Object(object) = value else {
        return Err(HypothesisError::NoObject);
    };

    let hypothesis = GrowthHypothesis {
        description: field(&object, &["description", "summary", "restatement"])
            .and_then(label)
            .unwrap_or_default(),
        target_segments: labels(field(
            &object,
            &["target_segments", "target_customer_segments", "segments", "target_segment"],
        )),
        value_propositions: field(
            &object,
            &["value_propositions", "key_value_propositions", "value_proposition"],
        )
        .cloned()
        .unwrap_or(Value::Null),
        growth_levers: labels(field(&object, &["growth_levers", "levers", "channels"])),
        success_metrics: labels(field(
            &object,
            &["success_metrics", "initial_success_metrics", "metrics"],
        )),
    };

    if hypothesis.target_segments.is_empty() && hypothesis.growth_levers.is_empty() {
        return Err(HypothesisError::Empty);
    }
    Ok(hypothesis)
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Ask the model for a hypothesis about `profile`. Never fails.
pub async fn generate(
    llm: &dyn LlmProvider,
    profile: &ProfileRecord,
    settings: &GenerationSettings,
) -> GrowthHypothesis {
    let request = settings.request(&prompts::hypothesis_prompt(profile));
    let text = match llm.complete(request).await {
        Ok(response) => response.text,
        Err(e) => {
            warn!(error = %e, "hypothesis generation failed, using fallback");
            return GrowthHypothesis::fallback();
        }
    };

    match parse_hypothesis(&text) {
        Ok(hypothesis) => {
            info!(
                segments = hypothesis.target_segments.len(),
                levers = hypothesis.growth_levers.len(),
                "growth hypothesis generated"
            );
            hypothesis
        }
        Err(e) => {
            warn!(error = %e, "failed to parse hypothesis, using fallback");
            debug!(raw = %text, "unparsed hypothesis");
            GrowthHypothesis::fallback()
        }
    }
}
