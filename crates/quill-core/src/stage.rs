//! Workflow stages and the legal transitions between them

use crate::error::WorkflowError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a task is in the article pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    InitialResearch,
    Planning,
    /// Suspended until the outline is accepted or revised
    AwaitingOutlineFeedback,
    SectionFanOut,
    Compiling,
    /// Suspended until the report is accepted or revised
    AwaitingFinalFeedback,
    Revising,
    Done,
}

impl Stage {
    /// Whether the engine waits for human input here
    #[inline]
    #[must_use]
    pub fn is_suspend_point(self) -> bool {
        matches!(self, Self::AwaitingOutlineFeedback | Self::AwaitingFinalFeedback)
    }

    /// Whether `advance` has work to do from here
    #[inline]
    #[must_use]
    pub fn is_automatic(self) -> bool {
        !self.is_suspend_point() && self != Self::Done
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InitialResearch => "initial_research",
            Self::Planning => "planning",
            Self::AwaitingOutlineFeedback => "awaiting_outline_feedback",
            Self::SectionFanOut => "section_fan_out",
            Self::Compiling => "compiling",
            Self::AwaitingFinalFeedback => "awaiting_final_feedback",
            Self::Revising => "revising",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Stages reachable in one step from `from`
#[must_use]
pub fn allowed_transitions(from: Stage) -> Vec<Stage> {
    use Stage::*;
    match from {
        InitialResearch => vec![Planning],
        Planning => vec![AwaitingOutlineFeedback],
        AwaitingOutlineFeedback => vec![Planning, SectionFanOut],
        SectionFanOut => vec![Compiling],
        Compiling => vec![AwaitingFinalFeedback],
        AwaitingFinalFeedback => vec![Revising, Done],
        Revising => vec![AwaitingFinalFeedback],
        Done => vec![],
    }
}

/// Check a single transition
///
/// # Errors
/// `WorkflowError::InvalidTransition` if `to` is not reachable from `from`.
pub fn validate_transition(from: Stage, to: Stage) -> Result<(), WorkflowError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(WorkflowError::InvalidTransition {
            from,
            reason: format!("{to} is not reachable"),
        })
    }
}
