//! Quill Core - Article Workflow Engine
//!
//! Turns a task description into a researched, reviewed article:
//! - Researches the topic and plans an outline
//! - Suspends for human feedback on the outline and on the final report
//! - Researches and writes sections concurrently, merging by section number
//! - Compiles the article and applies tool-driven revisions
//!
//! # Core Concepts
//!
//! - **Stage**: where a task is; every move is checked against [`allowed_transitions`]
//! - **Suspend point**: the engine returns [`PendingFeedback`] and holds nothing open
//! - **Commit**: a stage's changes land only if the stage succeeds
//!
//! # Example
//!
//! ```rust,ignore
//! use quill_core::{Progress, Task, WorkflowConfig, WorkflowEngine};
//!
//! # async fn example(engine: WorkflowEngine) -> Result<(), Box<dyn std::error::Error>> {
//! let pending = engine.start(Task::new("Rust async", "for backend engineers")).await?;
//! println!("{}", pending.prompt);
//!
//! let progress = engine.resume(pending.task_id, "ok").await?;
//! if let Progress::Pending(report) = progress {
//!     let done = engine.resume(report.task_id, "ok").await?;
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod compile;
pub mod engine;
pub mod error;
pub mod merge;
pub mod stage;
pub mod types;

mod agents;
mod fanout;
mod prompts;

// Re-exports for convenience
pub use compile::{compile_article, ReportStructure};
pub use engine::WorkflowEngine;
pub use error::{MergeError, SectionError, StageError, WorkflowError};
pub use merge::merge_sections;
pub use stage::{allowed_transitions, validate_transition, Stage};
pub use types::{
    CompletedArticle, OutlinePlan, PendingFeedback, Progress, TaskId, WorkflowConfig,
    WorkflowState, ACCEPT_FEEDBACK, DEFAULT_REPORT_STRUCTURE, DEFAULT_WRITING_GUIDELINES,
};

pub use quill_types::{Article, Outline, Section, Task};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the workflow engine
    pub use crate::{
        CompletedArticle, PendingFeedback, Progress, Stage, Task, TaskId, WorkflowConfig,
        WorkflowEngine, WorkflowError, WorkflowState,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
