//! Prompt template tests.

use chrono::NaiveDate;

use growth_advisor::agent::prompts::{
    hypothesis_prompt, search_augmented_prompt, search_query, standard_advice_prompt,
    system_prompt, with_tone_reminder, TONE_REMINDER,
};
use growth_advisor::profile::{OnboardingFlow, ProfileRecord, Stage};
use growth_advisor::search::SearchResult;

fn full_profile() -> ProfileRecord {
    let mut profile = ProfileRecord::new(OnboardingFlow::Full);
    for answer in [
        "Invoice chasing for agencies",
        "Ran a studio for 5 years",
        "Ship small, learn fast",
        "Blunt feedback with examples",
    ] {
        profile.record_answer(answer, 3).expect("recorded");
    }
    profile
}

#[test]
fn system_prompt_carries_todays_date() {
    let date = NaiveDate::from_ymd_opt(2025, 3, 14).expect("valid date");
    let prompt = system_prompt(date);
    assert!(prompt.contains("Today's date is 2025-03-14."));
    assert!(!prompt.contains("{date_today}"));
}

#[test]
fn tone_reminder_is_appended() {
    let prompt = with_tone_reminder("Question");
    assert!(prompt.starts_with("Question"));
    assert!(prompt.ends_with(TONE_REMINDER));
}

#[test]
fn standard_prompt_includes_profile_and_length_hint() {
    let profile = full_profile();

    let open = standard_advice_prompt(&profile, "How do I price?", None);
    assert!(open.contains("- Startup idea: Invoice chasing for agencies"));
    assert!(open.contains("- Learning style: Blunt feedback with examples"));
    assert!(open.contains("Their question/input: How do I price?"));
    assert!(open.contains("1-3 concrete next steps"));
    assert!(open.ends_with("Be concise and practical."));

    let capped = standard_advice_prompt(&profile, "How do I price?", Some(4));
    assert!(capped.ends_with("Keep it to 4 sentences max."));
}

#[test]
fn unanswered_stages_show_placeholder() {
    let mut profile = ProfileRecord::new(OnboardingFlow::Short);
    profile.record_answer("Invoice chasing", 3).expect("recorded");
    let prompt = standard_advice_prompt(&profile, "q", None);
    assert!(prompt.contains("- Experience: Not specified"));
    assert!(prompt.contains("- Philosophy: Not specified"));
}

#[test]
fn search_prompt_embeds_results_and_asks_for_attribution() {
    let results = vec![SearchResult {
        title: "Agency payments report".to_owned(),
        url: "https://example.com/report".to_owned(),
        snippet: "Late payments cost agencies 12%".to_owned(),
    }];
    let prompt = search_augmented_prompt(&full_profile(), "Is this a big market?", &results);
    assert!(prompt.contains("Recent search results:"));
    assert!(prompt.contains("\"url\": \"https://example.com/report\""));
    assert!(prompt.contains("brief attribution"));
    assert!(prompt.contains("one specific action step"));
}

#[test]
fn hypothesis_prompt_names_expected_keys() {
    let prompt = hypothesis_prompt(&full_profile());
    for key in ["description", "target_segments", "value_propositions", "growth_levers", "success_metrics"] {
        assert!(prompt.contains(&format!("\"{key}\"")), "missing {key}");
    }
    assert!(prompt.contains("Ran a studio for 5 years"));
}

#[test]
fn search_query_appends_startup_context() {
    let profile = full_profile();
    assert_eq!(
        search_query("pricing benchmarks", &profile),
        "pricing benchmarks SaaS startup Invoice chasing for agencies"
    );

    let blank = ProfileRecord::new(OnboardingFlow::Short);
    assert_eq!(blank.answer(Stage::StartupIdea), None);
    assert_eq!(search_query("pricing", &blank), "pricing SaaS startup");
}
