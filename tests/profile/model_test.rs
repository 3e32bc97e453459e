//! Onboarding state machine tests.

use growth_advisor::profile::{
    OnboardingError, OnboardingFlow, ProfileRecord, Stage, Transition, NOT_SPECIFIED,
};

#[test]
fn new_profile_starts_at_idea_and_incomplete() {
    let profile = ProfileRecord::new(OnboardingFlow::Full);
    assert_eq!(profile.stage(), Stage::StartupIdea);
    assert!(!profile.is_complete());
    assert_eq!(profile.flow(), OnboardingFlow::Full);
    for stage in Stage::ALL {
        assert_eq!(profile.answer(stage), None);
        assert_eq!(profile.answer_or_placeholder(stage), NOT_SPECIFIED);
    }
}

#[test]
fn full_flow_stages_only_move_forward() {
    let mut profile = ProfileRecord::new(OnboardingFlow::Full);
    let created_at = profile.created_at();
    let mut seen = vec![profile.stage()];

    let transitions: Vec<Transition> = ["idea text", "experience", "philosophy", "learning"]
        .into_iter()
        .map(|answer| match profile.record_answer(answer, 3) {
            Ok(transition) => {
                seen.push(profile.stage());
                transition
            }
            Err(err) => panic!("answer should be accepted: {err}"),
        })
        .collect();

    assert_eq!(
        transitions,
        vec![
            Transition::Next(Stage::Experience),
            Transition::Next(Stage::Philosophy),
            Transition::Next(Stage::LearningStyle),
            Transition::Completed,
        ]
    );
    assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(profile.is_complete());
    assert_eq!(profile.stage(), Stage::LearningStyle);
    assert_eq!(profile.created_at(), created_at);
}

#[test]
fn short_flow_completes_after_idea() {
    let mut profile = ProfileRecord::new(OnboardingFlow::Short);
    assert_eq!(
        profile.record_answer("Scheduling for freelancers", 3),
        Ok(Transition::Completed)
    );
    assert!(profile.is_complete());
    assert_eq!(profile.answer(Stage::Experience), None);
}

#[test]
fn answers_after_completion_are_rejected_and_state_kept() {
    let mut profile = ProfileRecord::new(OnboardingFlow::Short);
    profile.record_answer("first idea", 3).expect("accepted");
    let before = profile.clone();

    assert_eq!(
        profile.record_answer("second idea", 3),
        Err(OnboardingError::AlreadyComplete)
    );
    assert_eq!(profile, before);
    assert_eq!(profile.answer(Stage::StartupIdea), Some("first idea"));
}

#[test]
fn short_answers_become_placeholder_but_still_advance() {
    let mut profile = ProfileRecord::new(OnboardingFlow::Full);
    assert_eq!(profile.record_answer("  no ", 3), Ok(Transition::Next(Stage::Experience)));
    assert_eq!(profile.answer(Stage::StartupIdea), Some(NOT_SPECIFIED));

    assert_eq!(profile.record_answer("", 3), Ok(Transition::Next(Stage::Philosophy)));
    assert_eq!(profile.answer(Stage::Experience), Some(NOT_SPECIFIED));
}

#[test]
fn answers_are_trimmed_and_length_counts_chars() {
    let mut profile = ProfileRecord::new(OnboardingFlow::Full);
    profile.record_answer("  Scheduling app \n", 3).expect("accepted");
    assert_eq!(profile.answer(Stage::StartupIdea), Some("Scheduling app"));

    profile.record_answer("éèê", 3).expect("accepted");
    assert_eq!(profile.answer(Stage::Experience), Some("éèê"));
}

#[test]
fn zero_threshold_keeps_empty_answer() {
    let mut profile = ProfileRecord::new(OnboardingFlow::Short);
    profile.record_answer("", 0).expect("accepted");
    assert_eq!(profile.answer(Stage::StartupIdea), Some(""));
}
