//! Per-section fan-out
//!
//! Research sections run as independent units under a concurrency limit.
//! Each unit researches its description and writes its body; a unit that
//! fails leaves its section empty and never fails the batch. Framing
//! sections (research = false) are written afterwards from the finished
//! research sections.

use crate::agents::Agents;
use crate::error::{SectionError, StageError};
use crate::merge::merge_sections;
use futures::stream::{FuturesUnordered, StreamExt};
use quill_research::Researcher;
use quill_types::{Outline, Section, SectionNumber, Task};
use std::collections::BTreeMap;
use std::future::Future;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Run `unit` over every item, at most `limit` at a time
///
/// Results come back in completion order. A `limit` of zero is treated as one.
pub(crate) async fn run_bounded<I, F, Fut, T>(limit: usize, items: I, unit: F) -> Vec<T>
where
    I: IntoIterator,
    F: Fn(I::Item) -> Fut,
    Fut: Future<Output = T>,
{
    let semaphore = Semaphore::new(limit.max(1));
    let semaphore = &semaphore;
    let unit = &unit;

    let mut pending: FuturesUnordered<_> = items
        .into_iter()
        .map(|item| async move {
            let _permit = semaphore.acquire().await;
            unit(item).await
        })
        .collect();

    let mut results = Vec::new();
    while let Some(result) = pending.next().await {
        results.push(result);
    }
    results
}

/// Everything a section unit reads
pub(crate) struct FanOut<'a> {
    pub(crate) agents: &'a Agents,
    pub(crate) researcher: &'a Researcher,
    pub(crate) task: &'a Task,
    pub(crate) guidelines: &'a str,
    pub(crate) max_results: usize,
    pub(crate) num_sub_queries: usize,
    pub(crate) max_concurrent: usize,
}

impl FanOut<'_> {
    /// Write every section of `outline`
    ///
    /// # Errors
    /// `StageError::Merge` if two units report the same section number.
    pub(crate) async fn run(
        &self,
        outline: &Outline,
    ) -> Result<BTreeMap<SectionNumber, Section>, StageError> {
        let research: Vec<&Section> = outline.research_sections().collect();
        info!(
            research_units = research.len(),
            total = outline.sections.len(),
            "section fan-out started"
        );

        let written = run_bounded(self.max_concurrent, research, |stub| async move {
            match self.research_section(stub).await {
                Ok(section) => section,
                Err(e) => degraded(stub, &e),
            }
        })
        .await;

        let mut sections = BTreeMap::new();
        merge_sections(&mut sections, written)?;

        let body: Vec<&Section> = sections.values().filter(|s| s.is_written()).collect();
        let framing: Vec<&Section> = outline.sections.iter().filter(|s| !s.research).collect();
        let framed = run_bounded(self.max_concurrent, framing, |stub| {
            let body = &body;
            async move {
                match self.framing_section(stub, body).await {
                    Ok(section) => section,
                    Err(e) => degraded(stub, &e),
                }
            }
        })
        .await;

        merge_sections(&mut sections, framed)?;
        Ok(sections)
    }

    async fn research_section(&self, stub: &Section) -> Result<Section, SectionError> {
        let number = stub.section_number;
        let result = self
            .researcher
            .deep_search(
                &stub.description,
                Some(self.task.topic.as_str()),
                self.max_results,
                self.num_sub_queries,
            )
            .await
            .map_err(|source| SectionError::Research {
                section: number,
                source,
            })?;

        let mut section = stub.clone();
        section.sources = result.sources();
        section.documents = result.documents;
        section.content = self
            .agents
            .write_section(self.task, &section, self.guidelines)
            .await
            .map_err(|source| SectionError::Write {
                section: number,
                source,
            })?;

        debug!(section = number, sources = section.sources.len(), "section written");
        Ok(section)
    }

    async fn framing_section(
        &self,
        stub: &Section,
        body: &[&Section],
    ) -> Result<Section, SectionError> {
        let mut section = stub.clone();
        section.content = self
            .agents
            .write_framing_section(self.task, stub, body, self.guidelines)
            .await
            .map_err(|source| SectionError::Write {
                section: stub.section_number,
                source,
            })?;
        Ok(section)
    }
}

fn degraded(stub: &Section, error: &SectionError) -> Section {
    warn!(section = stub.section_number, error = %error, "section degraded");
    let mut section = stub.clone();
    section.degrade();
    section
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn run_bounded_caps_concurrency() {
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        let results = run_bounded(2, 0..6, |i| {
            let active = &active;
            let peak = &peak;
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                i
            }
        })
        .await;

        assert_eq!(results.len(), 6);
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn run_bounded_returns_in_completion_order() {
        let results = run_bounded(3, [30u64, 10, 20], |ms| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            ms
        })
        .await;
        assert_eq!(results, vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn run_bounded_zero_limit_still_runs() {
        let results = run_bounded(0, vec![1, 2], |i| async move { i * 2 }).await;
        assert_eq!(results.len(), 2);
    }
}
