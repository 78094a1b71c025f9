//! LLM-backed roles used by the stages
//!
//! Every call goes through the retry executor. Planner roles decode
//! structured output; writer roles take the reply text as is.

use crate::error::StageError;
use crate::prompts;
use crate::types::OutlinePlan;
use chrono::NaiveDate;
use quill_llm::{LlmClient, LlmClientExt, LlmError, LlmRequest};
use quill_research::Queries;
use quill_retry::{RetryExecutor, RetryPolicy};
use quill_types::{Document, Outline, Section, Task};
use std::sync::Arc;
use tracing::debug;

/// Planner, writer and reviser over one LLM handle
#[derive(Clone)]
pub(crate) struct Agents {
    llm: Arc<dyn LlmClient>,
    retry: RetryExecutor,
}

impl Agents {
    pub(crate) fn new(llm: Arc<dyn LlmClient>, policy: RetryPolicy) -> Self {
        Self {
            llm,
            retry: RetryExecutor::new(policy),
        }
    }

    async fn structured<T>(&self, label: &str, request: LlmRequest) -> Result<T, LlmError>
    where
        T: serde::de::DeserializeOwned + Send,
    {
        let structured = self
            .retry
            .run(label, || self.llm.invoke_structured::<T>(request.clone()))
            .await?;
        Ok(structured.value)
    }

    async fn text(&self, label: &str, request: LlmRequest) -> Result<String, LlmError> {
        let response = self
            .retry
            .run(label, || self.llm.invoke(request.clone()))
            .await?;
        Ok(response.content.trim().to_string())
    }

    /// Background search queries for a new task
    pub(crate) async fn research_queries(
        &self,
        task: &Task,
        count: usize,
    ) -> Result<Vec<String>, LlmError> {
        let request = LlmRequest::new(prompts::QUERY_PLANNER)
            .with_user(prompts::query_request(task, count));
        let queries: Queries = self.structured("planner:queries", request).await?;
        Ok(queries.take(count))
    }

    /// Plan an outline, optionally revising a previous one
    ///
    /// # Errors
    /// - `StageError::Llm` if the planner fails after retries
    /// - `StageError::EmptyOutline` if the plan has no sections
    pub(crate) async fn plan_outline(
        &self,
        task: &Task,
        date: NaiveDate,
        report_structure: &str,
        research: &[Document],
        revision: Option<(&Outline, &str)>,
    ) -> Result<Outline, StageError> {
        let request = LlmRequest::new(prompts::OUTLINE_PLANNER).with_user(
            prompts::outline_request(task, date, report_structure, research, revision),
        );
        let plan: OutlinePlan = self.structured("planner:outline", request).await?;
        let outline = Outline::from_plan(plan.title, plan.sections, task.max_sections);
        if outline.is_empty() {
            return Err(StageError::EmptyOutline);
        }
        debug!(title = %outline.title, sections = outline.sections.len(), "outline planned");
        Ok(outline)
    }

    /// Body of one research section from its documents
    pub(crate) async fn write_section(
        &self,
        task: &Task,
        section: &Section,
        guidelines: &str,
    ) -> Result<String, LlmError> {
        let request = LlmRequest::new(prompts::SECTION_WRITER)
            .with_user(prompts::section_request(task, section, guidelines));
        self.text("writer:section", request).await
    }

    /// Body of an introduction or conclusion, written from the finished body
    pub(crate) async fn write_framing_section(
        &self,
        task: &Task,
        section: &Section,
        body: &[&Section],
        guidelines: &str,
    ) -> Result<String, LlmError> {
        let request = LlmRequest::new(prompts::FRAMING_WRITER)
            .with_user(prompts::framing_request(task, section, body, guidelines));
        self.text("writer:framing", request).await
    }

    /// Search queries that would help address report feedback
    pub(crate) async fn revision_queries(
        &self,
        report: &str,
        feedback: &str,
        count: usize,
    ) -> Result<Vec<String>, LlmError> {
        let request = LlmRequest::new(prompts::REVISION_PLANNER)
            .with_user(prompts::revision_query_request(report, feedback, count));
        let queries: Queries = self.structured("reviser:queries", request).await?;
        Ok(queries.take(count))
    }

    /// Rewrite the full report
    pub(crate) async fn revise(
        &self,
        report: &str,
        feedback: &str,
        research: &[Document],
    ) -> Result<String, LlmError> {
        let request = LlmRequest::new(prompts::REVISER)
            .with_user(prompts::revision_request(report, feedback, research));
        self.text("reviser:rewrite", request).await
    }
}
