//! Canned onboarding messages.

use crate::profile::{ProfileRecord, Stage};

use super::hypothesis::GrowthHypothesis;

/// First-contact greeting, which also asks the first question.
pub const GREETING: &str = "Hey Founder! I'm excited to build with you. To provide personalized growth advice, I'd like to learn about your startup. What's your SaaS startup idea? Tell me about the problem you're solving and how.";

/// Message asking the question for `stage`.
pub fn question_for(stage: Stage) -> &'static str {
    match stage {
        Stage::StartupIdea => GREETING,
        Stage::Experience => "Great! Thanks for sharing your startup idea. Now, can you tell me about your previous entrepreneurship experience? What businesses have you built or worked on before?",
        Stage::Philosophy => "Thanks for sharing your background. What's your philosophy of change? How do you believe innovation happens and businesses succeed in creating value?",
        Stage::LearningStyle => "Interesting perspective! Last question - what's your learning style? How do you prefer to receive feedback and advice? For example, do you prefer direct feedback, examples, analogies, etc.?",
    }
}

/// Closing message once the profile is complete.
///
/// Restates the startup (the hypothesis description, else the founder's own
/// words), lists two segments and two levers with placeholders when the
/// hypothesis has fewer, and asks where to start.
pub fn completion_message(profile: &ProfileRecord, hypothesis: &GrowthHypothesis) -> String {
    let description = if hypothesis.description.trim().is_empty() {
        profile.answer_or_placeholder(Stage::StartupIdea)
    } else {
        hypothesis.description.trim()
    };
    let nth = |items: &[String], i: usize, placeholder: &'static str| -> String {
        items
            .get(i)
            .map(String::as_str)
            .unwrap_or(placeholder)
            .to_owned()
    };

    format!(
        "Thanks for sharing all that information! Based on what you've told me, I've created an initial growth hypothesis for your startup.

In short: {description}

Target Customer Segments:
1. {segment_1}
2. {segment_2}

Key Growth Levers:
1. {lever_1}
2. {lever_2}

Now, let's start working on your growth strategy. What specific aspect of growing your SaaS business would you like advice on first? (e.g., pricing, marketing, product-market fit, customer retention)",
        segment_1 = nth(&hypothesis.target_segments, 0, "Primary target market"),
        segment_2 = nth(&hypothesis.target_segments, 1, "Secondary target market"),
        lever_1 = nth(&hypothesis.growth_levers, 0, "Customer acquisition channel"),
        lever_2 = nth(&hypothesis.growth_levers, 1, "Retention strategy"),
    )
}
