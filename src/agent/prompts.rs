//! Prompt templates.
//!
//! Pure string assembly: the advisor persona, the tone reminder appended to
//! every prompt, the two advice templates (standard and search-augmented),
//! the hypothesis request, and the outbound search query.

use chrono::NaiveDate;

use crate::profile::{ProfileRecord, Stage};
use crate::search::SearchResult;

/// Appended to every prompt sent to the model.
pub const TONE_REMINDER: &str =
    "Remember to keep your tone casual but professional, avoiding any vulgar language.";

const PERSONA: &str = "\
You are a straight-talking growth advisor for SaaS entrepreneurs. You have direct, no-nonsense advice based on your experience with hundreds of successful startups.

Your communication style is:
1. Direct and clear - you don't waste time with corporate speak
2. Evidence-based - you reference what actually works
3. Motivational but real - you push founders with honest feedback
4. Casual but professional - avoid profanity or inappropriate language

You know the playbooks from Y Combinator, Andreessen Horowitz, First Round Capital, and other top accelerators and VCs. When you speak, it's with the authority of someone who's seen it all.

Use casual language, contractions, and a conversational tone. Feel free to use slang, but avoid vulgar language or profanity. Be direct but respectful.

Today's date is {date_today}. Use this to ensure your advice is timely and relevant.";

/// Advisor system prompt for `today`.
pub fn system_prompt(today: NaiveDate) -> String {
    PERSONA.replace("{date_today}", &today.format("%Y-%m-%d").to_string())
}

/// `prompt` followed by the tone reminder.
pub fn with_tone_reminder(prompt: &str) -> String {
    format!("{prompt}\n\n{TONE_REMINDER}")
}

fn profile_context(profile: &ProfileRecord) -> String {
    Stage::ALL
        .iter()
        .map(|stage| {
            format!(
                "- {}: {}",
                stage.field_label(),
                profile.answer_or_placeholder(*stage)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Template for a direct answer from the founder's profile.
pub fn standard_advice_prompt(
    profile: &ProfileRecord,
    query: &str,
    max_sentences: Option<u32>,
) -> String {
    let length = match max_sentences {
        Some(n) => format!("Keep it to {n} sentences max."),
        None => "Be concise and practical.".to_owned(),
    };
    format!(
        "As a growth advisor for a SaaS founder:

Founder profile:
{context}

Their question/input: {query}

Provide personalized, actionable growth advice that:
1. Addresses their specific query directly
2. Matches their learning style and stated philosophy
3. Incorporates startup growth best practices from YC, A16Z, and First Round
4. Closes with 1-3 concrete next steps they can take today

Use a casual but professional tone. {length}",
        context = profile_context(profile),
    )
}

/// Template grounding the answer in search results.
pub fn search_augmented_prompt(
    profile: &ProfileRecord,
    query: &str,
    results: &[SearchResult],
) -> String {
    let serialized = serde_json::to_string_pretty(results).unwrap_or_default();
    format!(
        "As a growth advisor for a SaaS founder:

Founder profile:
{context}

Their question/input: {query}

Recent search results:
{serialized}

Answer their question using the search results above:
1. Address their specific query directly
2. Draw on the most relevant results, with a brief attribution to each source you use
3. Finish with one specific action step they can take today

When citing search results, include only short quotes (under 25 words) if needed.",
        context = profile_context(profile),
    )
}

/// Request for a structured growth hypothesis.
pub fn hypothesis_prompt(profile: &ProfileRecord) -> String {
    format!(
        "Based on the founder's input:
{context}

Generate a structured growth hypothesis with these elements:
1. A one-sentence restatement of what the startup does
2. Target customer segments (2-3 specific segments)
3. Key value propositions for each segment
4. Growth levers (2-3 most promising channels)
5. Initial success metrics

Respond with only a JSON object using exactly these keys:
\"description\" (string), \"target_segments\" (array of strings),
\"value_propositions\" (object mapping segment to proposition),
\"growth_levers\" (array of strings), \"success_metrics\" (array of strings).",
        context = profile_context(profile),
    )
}

/// Query sent to the search backend for `query`.
pub fn search_query(query: &str, profile: &ProfileRecord) -> String {
    let idea = profile.answer(Stage::StartupIdea).unwrap_or_default();
    format!("{query} SaaS startup {idea}").trim_end().to_owned()
}
