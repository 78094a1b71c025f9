//! Task definition and validation

use serde::{Deserialize, Serialize};

/// Default cap on planned sections
pub const DEFAULT_MAX_SECTIONS: usize = 5;

/// Missing or malformed task fields
///
/// Raised before any workflow stage executes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Required text field is empty or whitespace
    #[error("task field `{0}` must not be empty")]
    EmptyField(&'static str),

    /// Section cap of zero
    #[error("max_sections must be at least 1")]
    ZeroSections,

    /// Feedback text is empty or whitespace
    #[error("feedback must not be empty")]
    EmptyFeedback,
}

/// An article request
///
/// Immutable once a workflow has started on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Subject of the article
    pub topic: String,
    /// Free-form requirements the article must satisfy
    pub requirements: String,
    /// Upper bound on planned sections
    #[serde(default = "default_max_sections")]
    pub max_sections: usize,
    /// Optional style guidelines passed to the writer
    #[serde(default)]
    pub writing_guidelines: Option<String>,
}

fn default_max_sections() -> usize {
    DEFAULT_MAX_SECTIONS
}

impl Task {
    /// Create new task with the default section cap
    #[inline]
    #[must_use]
    pub fn new(topic: impl Into<String>, requirements: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            requirements: requirements.into(),
            max_sections: DEFAULT_MAX_SECTIONS,
            writing_guidelines: None,
        }
    }

    /// With section cap
    #[inline]
    #[must_use]
    pub fn with_max_sections(mut self, max_sections: usize) -> Self {
        self.max_sections = max_sections;
        self
    }

    /// With writing guidelines
    #[inline]
    #[must_use]
    pub fn with_guidelines(mut self, guidelines: impl Into<String>) -> Self {
        self.writing_guidelines = Some(guidelines.into());
        self
    }

    /// Check required fields
    ///
    /// # Errors
    /// - `ValidationError::EmptyField` if topic or requirements are blank
    /// - `ValidationError::ZeroSections` if `max_sections == 0`
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.topic.trim().is_empty() {
            return Err(ValidationError::EmptyField("topic"));
        }
        if self.requirements.trim().is_empty() {
            return Err(ValidationError::EmptyField("requirements"));
        }
        if self.max_sections == 0 {
            return Err(ValidationError::ZeroSections);
        }
        Ok(())
    }
}
