//! Error types for the workflow engine
//!
//! Provides error handling for:
//! - Task and feedback validation
//! - Stage failures that halt a task
//! - Per-section failures that only degrade one section
//! - Illegal or unknown-task control calls

use crate::stage::Stage;
use crate::types::TaskId;
use quill_llm::LlmError;
use quill_research::ResearchError;
use quill_retry::Retryable;
use quill_types::{SectionNumber, ValidationError};

/// Main workflow error type
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Task or feedback rejected before any stage ran
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// No task with this id is registered
    #[error("unknown task: {0}")]
    UnknownTask(TaskId),

    /// Control call not legal in the current stage
    #[error("invalid transition from {from}: {reason}")]
    InvalidTransition { from: Stage, reason: String },

    /// A stage failed after retries; the task keeps its last committed stage
    #[error("task {task_id} stage {stage} failed: {source}")]
    FatalOrchestration {
        task_id: TaskId,
        stage: Stage,
        #[source]
        source: StageError,
    },
}

impl WorkflowError {
    /// Whether calling `advance` (or resuming again) may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::FatalOrchestration { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Stage at which the failure happened, for fatal errors
    #[inline]
    #[must_use]
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            Self::FatalOrchestration { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Cause of a stage failure
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("llm failed: {0}")]
    Llm(#[from] LlmError),

    #[error("research failed: {0}")]
    Research(#[from] ResearchError),

    /// Planner returned no sections
    #[error("planner produced an empty outline")]
    EmptyOutline,

    /// Stage needs an outline but none is committed
    #[error("no outline available")]
    MissingOutline,

    /// Stage needs the compiled report but none is committed
    #[error("no compiled report available")]
    MissingReport,

    #[error("section merge failed: {0}")]
    Merge(#[from] MergeError),
}

impl Retryable for StageError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Llm(e) => e.is_retryable(),
            Self::Research(e) => e.is_retryable(),
            Self::EmptyOutline => true,
            Self::MissingOutline | Self::MissingReport | Self::Merge(_) => false,
        }
    }
}

/// One section unit failed; the section is degraded, never propagated
#[derive(Debug, thiserror::Error)]
pub enum SectionError {
    #[error("section {section} research failed: {source}")]
    Research {
        section: SectionNumber,
        #[source]
        source: ResearchError,
    },

    #[error("section {section} writing failed: {source}")]
    Write {
        section: SectionNumber,
        #[source]
        source: LlmError,
    },
}

/// Keyed merge rejected its input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    #[error("duplicate section number {0}")]
    DuplicateSection(SectionNumber),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_llm_outage_is_retryable() {
        let task_id = TaskId::new();
        let err = WorkflowError::FatalOrchestration {
            task_id,
            stage: Stage::Planning,
            source: StageError::Llm(LlmError::Unavailable("503".into())),
        };
        assert!(err.is_retryable());
        assert_eq!(err.failed_stage(), Some(Stage::Planning));
        assert_eq!(
            err.to_string(),
            format!("task {task_id} stage planning failed: llm failed: service unavailable: 503")
        );
    }

    #[test]
    fn validation_is_not_retryable() {
        let err = WorkflowError::from(ValidationError::EmptyFeedback);
        assert!(!err.is_retryable());
        assert_eq!(err.failed_stage(), None);
    }

    #[test]
    fn merge_failure_is_not_retryable() {
        let err = StageError::Merge(MergeError::DuplicateSection(2));
        assert!(!err.is_retryable());
    }
}
