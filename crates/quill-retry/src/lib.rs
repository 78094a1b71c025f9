//! Quill retry executor
//!
//! Wraps calls to unreliable services (LLMs, search APIs, scrapers) in a
//! bounded exponential backoff loop.
//!
//! # Core Concepts
//!
//! - [`RetryPolicy`]: Attempt bound and initial delay; the delay doubles per retry
//! - [`Retryable`]: Error classification; non-retryable errors fail immediately
//! - [`RetryExecutor`]: Runs an async operation under a policy, labelled by call site
//!
//! After the final attempt the last error is handed back unchanged, so callers
//! keep matching on their own error types.
//!
//! # Example
//!
//! ```rust,ignore
//! use quill_retry::{RetryExecutor, RetryPolicy};
//!
//! let retry = RetryExecutor::new(RetryPolicy::default());
//! let response = retry.run("planner", || llm.invoke(request.clone())).await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod executor;
mod policy;

// Re-exports
pub use executor::RetryExecutor;
pub use policy::{RetryPolicy, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_RETRIES};

/// Classification of an error as transient
///
/// Implemented by every error type that crosses an external-service boundary.
pub trait Retryable {
    /// Whether another attempt may succeed
    fn is_retryable(&self) -> bool;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
