//! Line-oriented chat session tests.

use std::sync::Arc;

use tokio::io::BufReader;

use growth_advisor::adapters::cli::{render_event, run_session, RenderMode};
use growth_advisor::agent::onboarding::GREETING;
use growth_advisor::messaging::response::SEARCH_NOTIFICATION;
use growth_advisor::messaging::ResponseEvent;
use growth_advisor::profile::{InMemoryProfileStore, OnboardingFlow, ProfileStore};

use crate::mock::{config, harness_with, onboarded_store, result, text};

async fn run(input: &str, harness: &crate::mock::Harness, mode: RenderMode) -> String {
    let mut output: Vec<u8> = Vec::new();
    let reader = BufReader::new(input.as_bytes());
    if let Err(err) = run_session(&harness.advisor, "cli", reader, &mut output, mode).await {
        panic!("session should not fail: {err}");
    }
    String::from_utf8(output).expect("utf-8 output")
}

#[tokio::test]
async fn session_answers_each_line_until_quit() {
    let store = Arc::new(InMemoryProfileStore::new(OnboardingFlow::Full));
    let h = harness_with(&config(OnboardingFlow::Full), Arc::clone(&store), vec![], vec![]);

    let output = run("hello\n\n   \nScheduling for freelancers\n/quit\nnever read\n", &h, RenderMode::Text).await;

    assert!(output.starts_with(GREETING));
    assert!(output.contains("entrepreneurship experience"));
    let profile = store.snapshot("cli").await.expect("profile");
    // Greeting, then one recorded answer; blank lines and text after /quit are skipped.
    assert!(profile.answer(growth_advisor::profile::Stage::StartupIdea).is_some());
    assert_eq!(profile.answer(growth_advisor::profile::Stage::Experience), None);
}

#[tokio::test]
async fn text_mode_renders_blocks_results_and_answer() {
    let h = harness_with(
        &config(OnboardingFlow::Short),
        onboarded_store("cli").await,
        vec![text("Try a waitlist.")],
        vec![Ok(vec![result(1), result(2)])],
    );

    let output = run("search for waitlist tools\n", &h, RenderMode::Text).await;

    assert!(output.contains(&format!("[{SEARCH_NOTIFICATION}] Researching")));
    assert!(output.contains("  1. Result 1 <https://techcrunch.com/1>\n"));
    assert!(output.contains("  2. Result 2 <https://techcrunch.com/2>\n"));
    assert!(output.ends_with("Try a waitlist.\n"));
}

#[tokio::test]
async fn json_mode_writes_one_event_per_line() {
    let h = harness_with(
        &config(OnboardingFlow::Full),
        Arc::new(InMemoryProfileStore::new(OnboardingFlow::Full)),
        vec![],
        vec![],
    );

    let output = run("hi\n", &h, RenderMode::Json).await;

    let events: Vec<ResponseEvent> = output
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid event json"))
        .collect();
    assert_eq!(events.last(), Some(&ResponseEvent::Done));
    let greeting: String = events
        .iter()
        .filter_map(|e| match e {
            ResponseEvent::TextChunk { content, .. } => Some(content.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(greeting, GREETING);
}

#[test]
fn text_mode_rendering_of_each_event_kind() {
    let block = ResponseEvent::TextBlock {
        event_name: "SEARCH_ERROR".to_owned(),
        content: "fallback".to_owned(),
    };
    assert_eq!(
        render_event(&block, RenderMode::Text).as_deref(),
        Some("[SEARCH_ERROR] fallback\n")
    );

    let error = ResponseEvent::Error {
        message: "boom".to_owned(),
    };
    assert_eq!(render_event(&error, RenderMode::Text).as_deref(), Some("[ERROR] boom\n"));

    let close = ResponseEvent::StreamComplete {
        stream_id: "s".to_owned(),
        event_name: "FINAL_RESPONSE".to_owned(),
    };
    assert_eq!(render_event(&close, RenderMode::Text).as_deref(), Some("\n"));

    let other_json = ResponseEvent::Json {
        event_name: "META".to_owned(),
        payload: serde_json::json!({"k": 1}),
    };
    assert_eq!(
        render_event(&other_json, RenderMode::Text).as_deref(),
        Some("[META] {\"k\":1}\n")
    );
}
