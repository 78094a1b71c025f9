//! Quill LLM interface
//!
//! The narrow boundary between the pipeline and any chat model.
//!
//! # Core Concepts
//!
//! - [`LlmClient`]: One request in, one response with token counts out
//! - [`LlmClientExt::invoke_structured`]: Parse a JSON reply into a typed value
//! - [`UsageAccumulator`]: Lock-free token and call counters fed by observers
//! - [`ObservedLlm`]: Wraps any client and notifies [`LlmObserver`]s after each call
//!
//! # Example
//!
//! ```rust,ignore
//! use quill_llm::{LlmClientExt, LlmRequest, ObservedLlm, UsageAccumulator};
//!
//! let usage = Arc::new(UsageAccumulator::new());
//! let llm = ObservedLlm::new(client).with_observer(usage.clone());
//!
//! let queries: Structured<Queries> = llm
//!     .invoke_structured(LlmRequest::new(system).with_user(prompt))
//!     .await?;
//! println!("{} tokens so far", usage.snapshot().total_tokens());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod client;
mod error;
mod observed;
mod structured;
mod types;
mod usage;

// Re-exports
pub use client::LlmClient;
pub use error::LlmError;
pub use observed::ObservedLlm;
pub use structured::{extract_json, LlmClientExt, Structured};
pub use types::{LlmRequest, LlmResponse, Message, Role};
pub use usage::{LlmObserver, UsageAccumulator, UsageTotals};

#[cfg(test)]
pub use client::MockLlmClient;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
