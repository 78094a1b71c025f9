//! Core types for the workflow engine

use crate::stage::Stage;
use chrono::{DateTime, NaiveDate, Utc};
use quill_llm::{Message, UsageTotals};
use quill_retry::RetryPolicy;
use quill_types::{Article, Document, Outline, Section, SectionNumber, SectionPlan, Task};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ulid::Ulid;

/// Feedback text that accepts the current outline or report
pub const ACCEPT_FEEDBACK: &str = "ok";

/// Default outline guidance handed to the planner
pub const DEFAULT_REPORT_STRUCTURE: &str = "The report structure should break down the topic:

1. Introduction (no research needed)
   - Brief overview of the topic area

2. Main body sections
   - Each section covers one sub-topic
   - Include key concepts and definitions
   - Provide real-world examples or case studies where applicable

3. Conclusion
   - One structural element (a list or a table) that distills the main body
   - A concise summary of the report";

/// Default style rules handed to section writers
pub const DEFAULT_WRITING_GUIDELINES: &str = "- Strict 200 word limit
- Start with your most important insight in **bold**";

/// Unique task identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Ulid);

impl TaskId {
    /// Generate new task ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}

/// Workflow engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Search queries generated for initial research and for each revision
    pub number_of_queries: usize,
    /// Results requested per provider per query
    pub max_results: usize,
    /// Sub-queries per research section
    pub num_sub_queries: usize,
    /// Section units running at once
    pub max_concurrent_sections: usize,
    /// Outline guidance for the planner
    pub report_structure: String,
    /// Used when the task carries no guidelines of its own
    pub writing_guidelines: String,
    /// Applied to every planner, writer and reviser call
    pub llm_retry: RetryPolicy,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            number_of_queries: 2,
            max_results: 5,
            num_sub_queries: 2,
            max_concurrent_sections: 4,
            report_structure: DEFAULT_REPORT_STRUCTURE.to_string(),
            writing_guidelines: DEFAULT_WRITING_GUIDELINES.to_string(),
            llm_retry: RetryPolicy::default(),
        }
    }
}

impl WorkflowConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With number of generated search queries
    #[inline]
    #[must_use]
    pub fn with_number_of_queries(mut self, n: usize) -> Self {
        self.number_of_queries = n;
        self
    }

    /// With results per provider call
    #[inline]
    #[must_use]
    pub fn with_max_results(mut self, n: usize) -> Self {
        self.max_results = n;
        self
    }

    /// With sub-queries per research section
    #[inline]
    #[must_use]
    pub fn with_num_sub_queries(mut self, n: usize) -> Self {
        self.num_sub_queries = n;
        self
    }

    /// With section concurrency limit
    #[inline]
    #[must_use]
    pub fn with_max_concurrent_sections(mut self, n: usize) -> Self {
        self.max_concurrent_sections = n;
        self
    }

    /// With LLM retry policy
    #[inline]
    #[must_use]
    pub fn with_llm_retry(mut self, policy: RetryPolicy) -> Self {
        self.llm_retry = policy;
        self
    }
}

/// Structured planner output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlinePlan {
    pub title: String,
    pub sections: Vec<SectionPlan>,
}

/// Full per-task workflow state
///
/// Snapshots are clones; mutating one has no effect on the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub task_id: TaskId,
    pub task: Task,
    pub stage: Stage,
    /// Date the article is written for, fixed at task start
    pub date: NaiveDate,
    pub outline: Option<Outline>,
    /// Written sections keyed by section number
    pub sections: BTreeMap<SectionNumber, Section>,
    pub initial_research: Vec<Document>,
    /// Text shown to the human at the current suspend point
    pub pending_feedback_prompt: Option<String>,
    /// Outline revision instructions awaiting the next planning run
    pub outline_feedback: Option<String>,
    /// Prompts shown and feedback received, in order
    pub message_history: Vec<Message>,
    pub final_report: Option<String>,
    pub article: Option<Article>,
    pub cumulative_usage: UsageTotals,
    pub created_at: DateTime<Utc>,
}

impl WorkflowState {
    /// Fresh state for a validated task
    #[must_use]
    pub fn new(task_id: TaskId, task: Task) -> Self {
        let created_at = Utc::now();
        Self {
            task_id,
            task,
            stage: Stage::InitialResearch,
            date: created_at.date_naive(),
            outline: None,
            sections: BTreeMap::new(),
            initial_research: Vec::new(),
            pending_feedback_prompt: None,
            outline_feedback: None,
            message_history: Vec::new(),
            final_report: None,
            article: None,
            cumulative_usage: UsageTotals::default(),
            created_at,
        }
    }

    /// Whether `advance` would run stages before the next suspend point
    #[inline]
    #[must_use]
    pub fn has_pending_automatic_steps(&self) -> bool {
        self.stage.is_automatic()
    }
}

/// Returned when the workflow suspends for human input
#[derive(Debug, Clone)]
pub struct PendingFeedback {
    pub task_id: TaskId,
    pub stage: Stage,
    /// Text to show the human
    pub prompt: String,
    pub snapshot: WorkflowState,
}

/// Returned when the human accepts the final report
#[derive(Debug, Clone)]
pub struct CompletedArticle {
    pub task_id: TaskId,
    /// Structured article as compiled
    pub article: Article,
    /// Accepted markdown, including any revisions
    pub report: String,
    pub usage: UsageTotals,
}

/// Outcome of a control call
#[derive(Debug, Clone)]
pub enum Progress {
    Pending(PendingFeedback),
    Completed(CompletedArticle),
}

impl Progress {
    /// The pending value, if suspended
    #[must_use]
    pub fn pending(self) -> Option<PendingFeedback> {
        match self {
            Self::Pending(p) => Some(p),
            Self::Completed(_) => None,
        }
    }

    /// The completed article, if done
    #[must_use]
    pub fn completed(self) -> Option<CompletedArticle> {
        match self {
            Self::Completed(c) => Some(c),
            Self::Pending(_) => None,
        }
    }
}
