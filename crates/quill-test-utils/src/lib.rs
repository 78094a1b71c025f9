//! Testing utilities for the Quill workspace
//!
//! Shared fakes and fixtures: a scripted LLM, in-memory search providers and
//! scrapers, and a researcher wired over them.

#![allow(missing_docs)]

mod llm;
mod research;

pub use llm::{markers, outline_json, ScriptedLlm};
pub use research::{FakeProvider, FakeScraper, TestWorld};

use quill_types::Task;

/// A valid task with the default section cap
#[must_use]
pub fn sample_task() -> Task {
    Task::new("Rust ownership", "Explain ownership and borrowing to backend engineers")
}
