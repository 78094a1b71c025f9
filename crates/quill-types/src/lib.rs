//! Quill data model
//!
//! One canonical schema shared by every stage of the article pipeline.
//!
//! # Core Concepts
//!
//! - [`Task`]: The immutable request a workflow is started with
//! - [`Outline`] / [`Section`]: Planned structure, filled in progressively
//! - [`RetrieverResult`] / [`Document`]: Search stubs and the fetched units they become
//! - [`ResearchResult`]: Documents plus provenance and cost metadata
//! - [`Article`]: The compiled output artifact
//! - [`models`]: Static registry of model identifiers and their aliases
//!
//! # Example
//!
//! ```rust,ignore
//! use quill_types::{Task, Outline};
//!
//! let task = Task::new("Rust async runtimes", "Compare tokio and smol");
//! task.validate()?;
//!
//! let outline = Outline::from_plan("Async Rust", plan.sections, task.max_sections);
//! println!("{}", outline.render());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod article;
mod document;
mod outline;
mod task;

pub mod models;

// Re-exports
pub use article::{Article, ArticleSection};
pub use document::{Document, ResearchMetadata, ResearchResult, RetrieverResult, Source};
pub use outline::{Outline, Section, SectionNumber, SectionPlan};
pub use task::{Task, ValidationError, DEFAULT_MAX_SECTIONS};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
