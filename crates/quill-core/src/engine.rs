//! Resumable article workflow engine
//!
//! The engine owns one [`WorkflowState`] per task and moves it through the
//! stage table. It suspends by returning a [`PendingFeedback`] value and
//! picks up again on [`WorkflowEngine::resume`]; nothing waits in between.
//!
//! Every stage runs on a working copy of the state. Only a stage that
//! succeeds is committed, so a failure leaves the task at the last stage that
//! completed and [`WorkflowEngine::advance`] can pick it up again.

use crate::agents::Agents;
use crate::compile::{compile_article, ReportStructure};
use crate::error::{StageError, WorkflowError};
use crate::fanout::FanOut;
use crate::prompts;
use crate::stage::{validate_transition, Stage};
use crate::types::{
    CompletedArticle, PendingFeedback, Progress, TaskId, WorkflowConfig, WorkflowState,
    ACCEPT_FEEDBACK,
};
use dashmap::DashMap;
use futures::future::join_all;
use quill_llm::{LlmClient, Message, ObservedLlm, Role, UsageAccumulator, UsageTotals};
use quill_research::Researcher;
use quill_types::{Document, Task, ValidationError};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Per-task slot in the registry
#[derive(Clone)]
struct TaskEntry {
    state: Arc<Mutex<WorkflowState>>,
    usage: Arc<UsageAccumulator>,
}

/// Drives article tasks from request to accepted report
///
/// Tasks are independent: they share the researcher (and through it the
/// document cache) and the LLM handle, never their state or usage counters.
/// Calls on the same task are serialized; a call that finds the task busy
/// waits for the running transition to finish.
pub struct WorkflowEngine {
    config: WorkflowConfig,
    researcher: Arc<Researcher>,
    llm: Arc<dyn LlmClient>,
    tasks: DashMap<TaskId, TaskEntry>,
}

impl WorkflowEngine {
    /// Create engine
    #[must_use]
    pub fn new(config: WorkflowConfig, researcher: Arc<Researcher>, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            config,
            researcher,
            llm,
            tasks: DashMap::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Number of registered tasks
    #[inline]
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Register a task and run it to the outline checkpoint
    ///
    /// # Errors
    /// - `WorkflowError::Validation` if the task is rejected; nothing is registered
    /// - `WorkflowError::FatalOrchestration` if research or planning fails; the
    ///   task stays registered under the id carried by the error
    pub async fn start(&self, task: Task) -> Result<PendingFeedback, WorkflowError> {
        task.validate()?;

        let task_id = TaskId::new();
        let entry = TaskEntry {
            state: Arc::new(Mutex::new(WorkflowState::new(task_id, task))),
            usage: Arc::new(UsageAccumulator::new()),
        };
        self.tasks.insert(task_id, entry.clone());
        info!(%task_id, "task started");

        let mut state = entry.state.lock().await;
        self.drive(&mut state, &entry.usage).await?;
        Ok(pending(&state))
    }

    /// Hand human feedback to a suspended task
    ///
    /// `"ok"` accepts the outline or report. Any other text revises it.
    ///
    /// # Errors
    /// - `WorkflowError::Validation` for blank feedback
    /// - `WorkflowError::UnknownTask` if the id is not registered
    /// - `WorkflowError::InvalidTransition` if the task is not at a suspend point
    /// - `WorkflowError::FatalOrchestration` if a stage fails after retries
    pub async fn resume(&self, task_id: TaskId, feedback: &str) -> Result<Progress, WorkflowError> {
        let feedback = feedback.trim();
        if feedback.is_empty() {
            return Err(ValidationError::EmptyFeedback.into());
        }

        let entry = self.entry(task_id)?;
        let mut state = entry.state.lock().await;

        match state.stage {
            Stage::AwaitingOutlineFeedback => {
                self.resume_outline(&mut state, &entry.usage, feedback).await
            }
            Stage::AwaitingFinalFeedback => {
                self.resume_report(&mut state, &entry.usage, feedback).await
            }
            from => Err(WorkflowError::InvalidTransition {
                from,
                reason: "task is not awaiting feedback".to_string(),
            }),
        }
    }

    /// Run automatic stages up to the next suspend point
    ///
    /// A no-op for a task that is already suspended or done.
    ///
    /// # Errors
    /// - `WorkflowError::UnknownTask` if the id is not registered
    /// - `WorkflowError::FatalOrchestration` if a stage fails after retries
    pub async fn advance(&self, task_id: TaskId) -> Result<Progress, WorkflowError> {
        let entry = self.entry(task_id)?;
        let mut state = entry.state.lock().await;

        if state.stage == Stage::Done {
            return completed(&state).map(Progress::Completed);
        }
        self.drive(&mut state, &entry.usage).await?;
        Ok(Progress::Pending(pending(&state)))
    }

    /// Snapshot of the task state
    ///
    /// # Errors
    /// `WorkflowError::UnknownTask` if the id is not registered.
    pub async fn get_state(&self, task_id: TaskId) -> Result<WorkflowState, WorkflowError> {
        let entry = self.entry(task_id)?;
        let state = entry.state.lock().await;
        Ok(state.clone())
    }

    /// Cumulative LLM usage for the task
    ///
    /// Reads the live counters; does not wait for a running stage.
    ///
    /// # Errors
    /// `WorkflowError::UnknownTask` if the id is not registered.
    pub fn usage(&self, task_id: TaskId) -> Result<UsageTotals, WorkflowError> {
        self.entry(task_id).map(|entry| entry.usage.snapshot())
    }

    /// Drop the task and its state
    ///
    /// # Errors
    /// `WorkflowError::UnknownTask` if the id is not registered.
    pub fn discard(&self, task_id: TaskId) -> Result<(), WorkflowError> {
        if self.tasks.remove(&task_id).is_none() {
            return Err(WorkflowError::UnknownTask(task_id));
        }
        info!(%task_id, "task discarded");
        Ok(())
    }

    fn entry(&self, task_id: TaskId) -> Result<TaskEntry, WorkflowError> {
        self.tasks
            .get(&task_id)
            .map(|entry| entry.value().clone())
            .ok_or(WorkflowError::UnknownTask(task_id))
    }

    async fn resume_outline(
        &self,
        state: &mut WorkflowState,
        usage: &Arc<UsageAccumulator>,
        feedback: &str,
    ) -> Result<Progress, WorkflowError> {
        let next = if feedback == ACCEPT_FEEDBACK {
            Stage::SectionFanOut
        } else {
            Stage::Planning
        };
        validate_transition(state.stage, next)?;
        info!(task_id = %state.task_id, from = %state.stage, to = %next, "feedback received");

        // The checkpoint stays committed until the first stage after it succeeds
        let mut working = state.clone();
        working.message_history.push(Message::user(feedback));
        working.pending_feedback_prompt = None;
        if next == Stage::Planning {
            working.outline_feedback = Some(feedback.to_string());
        }
        working.stage = next;
        self.step(state, working, usage).await?;

        self.drive(state, usage).await?;
        Ok(Progress::Pending(pending(state)))
    }

    async fn resume_report(
        &self,
        state: &mut WorkflowState,
        usage: &Arc<UsageAccumulator>,
        feedback: &str,
    ) -> Result<Progress, WorkflowError> {
        if feedback == ACCEPT_FEEDBACK {
            validate_transition(state.stage, Stage::Done)?;
            state.cumulative_usage = usage.snapshot();
            let done = completed(state)?;
            state.message_history.push(Message::user(feedback));
            state.pending_feedback_prompt = None;
            state.stage = Stage::Done;
            info!(task_id = %state.task_id, "report accepted");
            return Ok(Progress::Completed(done));
        }

        validate_transition(state.stage, Stage::Revising)?;
        let mut working = state.clone();
        working.message_history.push(Message::user(feedback));
        working.stage = Stage::Revising;
        self.step(state, working, usage).await?;
        Ok(Progress::Pending(pending(state)))
    }

    /// Run automatic stages, committing each one that succeeds
    async fn drive(
        &self,
        state: &mut WorkflowState,
        usage: &Arc<UsageAccumulator>,
    ) -> Result<(), WorkflowError> {
        while state.stage.is_automatic() {
            let working = state.clone();
            self.step(state, working, usage).await?;
        }
        Ok(())
    }

    /// Run the stage `working` is at and commit the result into `state`
    async fn step(
        &self,
        state: &mut WorkflowState,
        mut working: WorkflowState,
        usage: &Arc<UsageAccumulator>,
    ) -> Result<(), WorkflowError> {
        let from = working.stage;
        if let Err(source) = self.run_stage(&mut working, usage).await {
            error!(task_id = %state.task_id, stage = %from, error = %source, "stage failed");
            state.cumulative_usage = usage.snapshot();
            return Err(WorkflowError::FatalOrchestration {
                task_id: state.task_id,
                stage: from,
                source,
            });
        }
        validate_transition(from, working.stage)?;

        working.cumulative_usage = usage.snapshot();
        info!(task_id = %working.task_id, from = %from, to = %working.stage, "stage committed");
        *state = working;
        Ok(())
    }

    async fn run_stage(
        &self,
        working: &mut WorkflowState,
        usage: &Arc<UsageAccumulator>,
    ) -> Result<(), StageError> {
        let observed = ObservedLlm::new(Arc::clone(&self.llm)).with_observer(usage.clone());
        let agents = Agents::new(Arc::new(observed), self.config.llm_retry.clone());

        match working.stage {
            Stage::InitialResearch => self.initial_research(&agents, working).await,
            Stage::Planning => self.plan(&agents, working).await,
            Stage::SectionFanOut => self.fan_out(&agents, working, Arc::clone(usage)).await,
            Stage::Compiling => compile(working),
            Stage::Revising => self.revise(&agents, working).await,
            Stage::AwaitingOutlineFeedback | Stage::AwaitingFinalFeedback | Stage::Done => Ok(()),
        }
    }

    async fn initial_research(
        &self,
        agents: &Agents,
        working: &mut WorkflowState,
    ) -> Result<(), StageError> {
        let queries = agents
            .research_queries(&working.task, self.config.number_of_queries)
            .await?;
        working.initial_research = self.search_all(&queries).await;
        working.stage = Stage::Planning;
        Ok(())
    }

    async fn plan(&self, agents: &Agents, working: &mut WorkflowState) -> Result<(), StageError> {
        let revision = working
            .outline
            .as_ref()
            .zip(working.outline_feedback.as_deref());
        let outline = agents
            .plan_outline(
                &working.task,
                working.date,
                &self.config.report_structure,
                &working.initial_research,
                revision,
            )
            .await?;

        let prompt = prompts::outline_feedback_prompt(&outline);
        working.message_history.push(Message::assistant(prompt.clone()));
        working.pending_feedback_prompt = Some(prompt);
        working.outline = Some(outline);
        working.outline_feedback = None;
        working.sections.clear();
        working.stage = Stage::AwaitingOutlineFeedback;
        Ok(())
    }

    async fn fan_out(
        &self,
        agents: &Agents,
        working: &mut WorkflowState,
        usage: Arc<UsageAccumulator>,
    ) -> Result<(), StageError> {
        let outline = working.outline.as_ref().ok_or(StageError::MissingOutline)?;
        let guidelines = working
            .task
            .writing_guidelines
            .as_deref()
            .unwrap_or(self.config.writing_guidelines.as_str());

        let researcher = self.researcher.observed_by(usage);
        let fan_out = FanOut {
            agents,
            researcher: &researcher,
            task: &working.task,
            guidelines,
            max_results: self.config.max_results,
            num_sub_queries: self.config.num_sub_queries,
            max_concurrent: self.config.max_concurrent_sections,
        };
        let sections = fan_out.run(outline).await?;

        working.sections = sections;
        working.stage = Stage::Compiling;
        Ok(())
    }

    async fn revise(&self, agents: &Agents, working: &mut WorkflowState) -> Result<(), StageError> {
        let report = working.final_report.clone().ok_or(StageError::MissingReport)?;
        let feedback = working
            .message_history
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();

        let queries = agents
            .revision_queries(&report, &feedback, self.config.number_of_queries)
            .await?;
        let research = self.search_all(&queries).await;
        let revised = agents.revise(&report, &feedback, &research).await?;

        if ReportStructure::parse(&revised) == ReportStructure::parse(&report) {
            working.final_report = Some(revised);
        } else {
            warn!(
                task_id = %working.task_id,
                "revision changed the title or section headings; keeping previous report"
            );
        }

        let current = working.final_report.as_deref().unwrap_or(&report);
        let prompt = prompts::report_feedback_prompt(current);
        working.message_history.push(Message::assistant(prompt.clone()));
        working.pending_feedback_prompt = Some(prompt);
        working.stage = Stage::AwaitingFinalFeedback;
        Ok(())
    }

    /// `simple_search` every query concurrently, unique documents in query order
    async fn search_all(&self, queries: &[String]) -> Vec<Document> {
        let results = join_all(
            queries
                .iter()
                .map(|query| self.researcher.simple_search(query, self.config.max_results)),
        )
        .await;

        let mut seen = HashSet::new();
        results
            .into_iter()
            .flat_map(|result| result.documents)
            .filter(|doc| seen.insert(doc.source_url.clone()))
            .collect()
    }
}

impl std::fmt::Debug for WorkflowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowEngine")
            .field("config", &self.config)
            .field("researcher", &self.researcher)
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

fn compile(working: &mut WorkflowState) -> Result<(), StageError> {
    let outline = working.outline.as_ref().ok_or(StageError::MissingOutline)?;
    let article = compile_article(&outline.title, working.date, working.sections.values().cloned());
    let report = article.render_markdown();

    let prompt = prompts::report_feedback_prompt(&report);
    working.message_history.push(Message::assistant(prompt.clone()));
    working.pending_feedback_prompt = Some(prompt);
    working.final_report = Some(report);
    working.article = Some(article);
    working.stage = Stage::AwaitingFinalFeedback;
    Ok(())
}

fn pending(state: &WorkflowState) -> PendingFeedback {
    PendingFeedback {
        task_id: state.task_id,
        stage: state.stage,
        prompt: state.pending_feedback_prompt.clone().unwrap_or_default(),
        snapshot: state.clone(),
    }
}

fn completed(state: &WorkflowState) -> Result<CompletedArticle, WorkflowError> {
    match (&state.article, &state.final_report) {
        (Some(article), Some(report)) => Ok(CompletedArticle {
            task_id: state.task_id,
            article: article.clone(),
            report: report.clone(),
            usage: state.cumulative_usage,
        }),
        _ => Err(WorkflowError::FatalOrchestration {
            task_id: state.task_id,
            stage: state.stage,
            source: StageError::MissingReport,
        }),
    }
}
