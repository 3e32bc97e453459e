//! Search-relevance classifier tests.

use growth_advisor::config::ClassifierConfig;
use growth_advisor::search::classifier::{ClassifierRules, SearchClassifier, SearchTrigger};

fn default_classifier() -> SearchClassifier {
    match SearchClassifier::new(&ClassifierRules::default()) {
        Ok(classifier) => classifier,
        Err(err) => panic!("default rules should compile: {err}"),
    }
}

fn classifier_with(config: &ClassifierConfig) -> SearchClassifier {
    SearchClassifier::new(&ClassifierRules::from_config(config)).expect("rules compile")
}

#[test]
fn explicit_requests_win_without_keywords() {
    let c = default_classifier();
    for query in [
        "can you search for office hours",
        "LOOK UP Stripe Atlas",
        "google Notion pricing",
        "please find me some information on onboarding flows",
        "research into PLG motions please",
    ] {
        assert_eq!(c.classify(query), Some(SearchTrigger::Explicit), "{query}");
    }
}

#[test]
fn short_follow_ups_trigger_search() {
    let c = default_classifier();
    assert_eq!(c.classify("their email"), Some(SearchTrigger::ShortFollowUp));
    assert_eq!(c.classify("THEIR EMAIL"), Some(SearchTrigger::ShortFollowUp));
    assert_eq!(c.classify("Their website?"), Some(SearchTrigger::ShortFollowUp));
    assert_eq!(c.classify("phone number please"), Some(SearchTrigger::ShortFollowUp));
    assert_eq!(c.classify("it"), Some(SearchTrigger::ShortFollowUp));
}

#[test]
fn short_queries_skip_factual_patterns() {
    let c = default_classifier();
    assert_eq!(c.classify("what is pmf"), None);
    assert_eq!(c.classify("what is pmf for founders"), Some(SearchTrigger::Factual));
}

#[test]
fn detached_punctuation_counts_as_a_token() {
    let c = default_classifier();
    assert_eq!(c.classify("what is it ?"), Some(SearchTrigger::Factual));
    assert_eq!(c.classify("who is she ?"), Some(SearchTrigger::Factual));
    assert_eq!(c.classify("what is it?"), None);
}

#[test]
fn short_queries_still_reach_keywords() {
    let c = default_classifier();
    assert_eq!(c.classify("best CRM"), Some(SearchTrigger::Keyword));
}

#[test]
fn factual_and_recency_questions_trigger_search() {
    let c = default_classifier();
    for query in [
        "who is the CEO of Linear",
        "how many seats should I sell",
        "anything exciting in devtools this year",
        "Linear vs Jira for startups",
    ] {
        assert_eq!(c.classify(query), Some(SearchTrigger::Factual), "{query}");
    }
}

#[test]
fn keyword_substrings_trigger_search() {
    let c = default_classifier();
    assert_eq!(
        c.classify("I need help with my pricing strategy and market positioning"),
        Some(SearchTrigger::Keyword)
    );
    assert_eq!(
        c.classify("I keep hearing about competitors undercutting me"),
        Some(SearchTrigger::Keyword)
    );
}

#[test]
fn conversational_queries_do_not_search() {
    let c = default_classifier();
    assert!(!c.needs_search("thanks that helps a lot"));
    assert!(!c.needs_search("ok"));
    assert!(!c.needs_search(""));
    assert!(!c.needs_search("   "));
}

#[test]
fn config_extends_keyword_table() {
    let query = "I worry about churn lately";
    assert_eq!(default_classifier().classify(query), None);

    let config = ClassifierConfig {
        extra_keywords: vec!["Churn".to_owned()],
        ..ClassifierConfig::default()
    };
    assert_eq!(classifier_with(&config).classify(query), Some(SearchTrigger::Keyword));
}

#[test]
fn config_extends_short_query_vocabulary() {
    let config = ClassifierConfig {
        extra_info_nouns: vec!["linkedin".to_owned()],
        ..ClassifierConfig::default()
    };
    assert_eq!(
        classifier_with(&config).classify("founder's LinkedIn"),
        Some(SearchTrigger::ShortFollowUp)
    );
}

#[test]
fn short_query_threshold_is_configurable() {
    let config = ClassifierConfig {
        short_query_max_tokens: 0,
        ..ClassifierConfig::default()
    };
    // No longer short, so only the keyword tier can fire.
    assert_eq!(
        classifier_with(&config).classify("their email"),
        Some(SearchTrigger::Keyword)
    );
}

#[test]
fn invalid_extra_pattern_is_rejected() {
    let config = ClassifierConfig {
        extra_factual_patterns: vec!["(unclosed".to_owned()],
        ..ClassifierConfig::default()
    };
    assert!(SearchClassifier::new(&ClassifierRules::from_config(&config)).is_err());
}

#[test]
fn trigger_labels_are_stable() {
    assert_eq!(SearchTrigger::Explicit.to_string(), "explicit");
    assert_eq!(SearchTrigger::ShortFollowUp.label(), "short_follow_up");
}
