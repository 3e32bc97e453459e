//! Founder profile and the onboarding state machine.
//!
//! A profile walks forward through the stages of its [`OnboardingFlow`],
//! storing one answer per stage. Once the last stage is answered the profile
//! is complete and stays complete.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored in place of answers shorter than the configured minimum, and used
/// by prompts for stages the flow never asked.
pub const NOT_SPECIFIED: &str = "Not specified";

/// One onboarding question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// What the startup does.
    StartupIdea,
    /// Previous entrepreneurship experience.
    Experience,
    /// Philosophy of change.
    Philosophy,
    /// Preferred way of receiving advice.
    LearningStyle,
}

impl Stage {
    /// Every stage, in asking order.
    pub const ALL: [Stage; 4] = [
        Stage::StartupIdea,
        Stage::Experience,
        Stage::Philosophy,
        Stage::LearningStyle,
    ];

    /// Human-readable field name used in prompts.
    pub fn field_label(self) -> &'static str {
        match self {
            Self::StartupIdea => "Startup idea",
            Self::Experience => "Experience",
            Self::Philosophy => "Philosophy",
            Self::LearningStyle => "Learning style",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::StartupIdea => "startup_idea",
            Self::Experience => "experience",
            Self::Philosophy => "philosophy",
            Self::LearningStyle => "learning_style",
        };
        f.write_str(s)
    }
}

/// Which onboarding questions are asked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnboardingFlow {
    /// All four questions.
    #[default]
    Full,
    /// The startup idea only.
    Short,
}

impl OnboardingFlow {
    /// Stages asked by this flow, in order.
    pub fn stages(self) -> &'static [Stage] {
        match self {
            Self::Full => &Stage::ALL,
            Self::Short => &[Stage::StartupIdea],
        }
    }

    /// The stage following `stage`, or `None` if `stage` is the last one.
    pub fn next_after(self, stage: Stage) -> Option<Stage> {
        let stages = self.stages();
        let pos = stages.iter().position(|s| *s == stage)?;
        stages.get(pos.saturating_add(1)).copied()
    }
}

impl std::str::FromStr for OnboardingFlow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "short" => Ok(Self::Short),
            other => Err(format!("unknown onboarding flow: {other}")),
        }
    }
}

/// Errors from the onboarding state machine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OnboardingError {
    /// An answer was recorded after the last stage.
    #[error("onboarding already complete")]
    AlreadyComplete,
}

/// Result of recording an onboarding answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Onboarding continues with this stage.
    Next(Stage),
    /// The last stage was answered.
    Completed,
}

/// Per-session founder profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    flow: OnboardingFlow,
    stage: Stage,
    complete: bool,
    answers: BTreeMap<Stage, String>,
    created_at: DateTime<Utc>,
}

impl ProfileRecord {
    /// Fresh profile positioned at the first stage of `flow`.
    pub fn new(flow: OnboardingFlow) -> Self {
        Self {
            flow,
            stage: Stage::StartupIdea,
            complete: false,
            answers: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Flow this profile was created with.
    pub fn flow(&self) -> OnboardingFlow {
        self.flow
    }

    /// Stage whose question is pending. Stays on the last stage once complete.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Whether onboarding is finished.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Creation time. Never changes.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Stored answer for `stage`, if it was asked.
    pub fn answer(&self, stage: Stage) -> Option<&str> {
        self.answers.get(&stage).map(String::as_str)
    }

    /// Stored answer for `stage`, or [`NOT_SPECIFIED`].
    pub fn answer_or_placeholder(&self, stage: Stage) -> &str {
        self.answer(stage).unwrap_or(NOT_SPECIFIED)
    }

    /// Store `answer` for the pending stage and advance.
    ///
    /// Answers whose trimmed length is below `min_answer_chars` are stored as
    /// [`NOT_SPECIFIED`]. Every answer is accepted; a stage is never re-asked.
    ///
    /// # Errors
    ///
    /// Returns [`OnboardingError::AlreadyComplete`] once the profile is complete.
    pub fn record_answer(
        &mut self,
        answer: &str,
        min_answer_chars: usize,
    ) -> Result<Transition, OnboardingError> {
        if self.complete {
            return Err(OnboardingError::AlreadyComplete);
        }

        let trimmed = answer.trim();
        let stored = if trimmed.chars().count() < min_answer_chars {
            NOT_SPECIFIED.to_owned()
        } else {
            trimmed.to_owned()
        };
        self.answers.insert(self.stage, stored);

        match self.flow.next_after(self.stage) {
            Some(next) => {
                self.stage = next;
                Ok(Transition::Next(next))
            }
            None => {
                self.complete = true;
                Ok(Transition::Completed)
            }
        }
    }
}
