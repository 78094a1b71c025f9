//! Scripted LLM double
//!
//! Replies are chosen by a marker substring of the system prompt. Each rule
//! can queue one-shot replies ahead of a standing reply, and every request is
//! recorded for later inspection.

use async_trait::async_trait;
use parking_lot::Mutex;
use quill_llm::{LlmClient, LlmError, LlmRequest, LlmResponse};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

type Responder = Arc<dyn Fn(&LlmRequest) -> Result<String, LlmError> + Send + Sync>;
type Latency = Arc<dyn Fn(&LlmRequest) -> Duration + Send + Sync>;

/// System prompt markers for the roles used across the workspace
pub mod markers {
    pub const SUB_QUERIES: &str = "research assistant";
    pub const RESEARCH_QUERIES: &str = "planning the research";
    pub const OUTLINE: &str = "outline of an article";
    pub const SECTION: &str = "one section";
    pub const FRAMING: &str = "framing section";
    pub const REVISION_QUERIES: &str = "applying reviewer feedback";
    pub const REVISER: &str = "rewriting a finished article";
}

struct Rule {
    marker: String,
    queued: VecDeque<Result<String, LlmError>>,
    standing: Option<Responder>,
    latency: Option<Latency>,
}

impl Rule {
    fn new(marker: &str) -> Self {
        Self {
            marker: marker.to_string(),
            queued: VecDeque::new(),
            standing: None,
            latency: None,
        }
    }
}

/// LLM that replies from a script
pub struct ScriptedLlm {
    rules: Mutex<Vec<Rule>>,
    requests: Mutex<Vec<LlmRequest>>,
    input_tokens: u64,
    output_tokens: u64,
}

impl Default for ScriptedLlm {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedLlm {
    /// Empty script; every call is rejected until rules are added
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            input_tokens: 10,
            output_tokens: 5,
        }
    }

    /// Script covering every role with well-formed replies
    ///
    /// The outline has four sections: an introduction, two research
    /// sections and a conclusion. The reviser appends a line and keeps all
    /// headings.
    #[must_use]
    pub fn article_defaults() -> Self {
        Self::new()
            .on(markers::SUB_QUERIES, r#"{"queries": ["sub one", "sub two", "sub three"]}"#)
            .on(markers::RESEARCH_QUERIES, r#"{"queries": ["background one", "background two"]}"#)
            .on(markers::OUTLINE, &outline_json("A Guide to the Topic", &[
                ("Introduction", false),
                ("Foundations", true),
                ("Practice", true),
                ("Conclusion", false),
            ]))
            .on(markers::SECTION, "Researched section body.")
            .on(markers::FRAMING, "Framing section body.")
            .on(markers::REVISION_QUERIES, r#"{"queries": ["revision lookup"]}"#)
            .respond(markers::REVISER, |request| Ok(append_to_article(request)))
    }

    /// Tokens reported per reply
    #[must_use]
    pub fn with_usage(mut self, input_tokens: u64, output_tokens: u64) -> Self {
        self.input_tokens = input_tokens;
        self.output_tokens = output_tokens;
        self
    }

    /// Standing text reply for `marker`
    #[must_use]
    pub fn on(self, marker: &str, reply: &str) -> Self {
        let reply = reply.to_string();
        self.respond(marker, move |_| Ok(reply.clone()))
    }

    /// Standing computed reply for `marker`
    #[must_use]
    pub fn respond<F>(self, marker: &str, responder: F) -> Self
    where
        F: Fn(&LlmRequest) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        self.with_rule(marker, |rule| rule.standing = Some(Arc::new(responder)));
        self
    }

    /// Standing failure for `marker`
    #[must_use]
    pub fn failing(self, marker: &str, error: LlmError) -> Self {
        self.respond(marker, move |_| Err(error.clone()))
    }

    /// Simulated latency for `marker`, computed per request
    #[must_use]
    pub fn with_latency<F>(self, marker: &str, latency: F) -> Self
    where
        F: Fn(&LlmRequest) -> Duration + Send + Sync + 'static,
    {
        self.with_rule(marker, |rule| rule.latency = Some(Arc::new(latency)));
        self
    }

    /// Queue a one-shot reply served before the standing one
    pub fn push(&self, marker: &str, reply: Result<String, LlmError>) {
        self.with_rule(marker, |rule| rule.queued.push_back(reply));
    }

    /// Replace the standing reply for `marker`
    pub fn set(&self, marker: &str, reply: Result<String, LlmError>) {
        self.with_rule(marker, |rule| {
            rule.standing = Some(Arc::new(move |_| reply.clone()));
        });
    }

    /// Every request seen so far
    #[must_use]
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().clone()
    }

    /// Requests whose system prompt contains `marker`
    #[must_use]
    pub fn requests_for(&self, marker: &str) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.system_prompt.contains(marker))
            .cloned()
            .collect()
    }

    /// Number of calls whose system prompt contains `marker`
    #[must_use]
    pub fn calls(&self, marker: &str) -> usize {
        self.requests_for(marker).len()
    }

    fn with_rule(&self, marker: &str, edit: impl FnOnce(&mut Rule)) {
        let mut rules = self.rules.lock();
        if let Some(rule) = rules.iter_mut().find(|r| r.marker == marker) {
            edit(rule);
        } else {
            let mut rule = Rule::new(marker);
            edit(&mut rule);
            rules.push(rule);
        }
    }

    fn reply_for(&self, request: &LlmRequest) -> (Result<String, LlmError>, Duration) {
        let mut rules = self.rules.lock();
        let Some(rule) = rules
            .iter_mut()
            .find(|r| request.system_prompt.contains(&r.marker))
        else {
            return (
                Err(LlmError::Rejected("no scripted reply for prompt".to_string())),
                Duration::ZERO,
            );
        };

        let latency = rule
            .latency
            .as_ref()
            .map_or(Duration::ZERO, |latency| latency(request));
        let reply = match rule.queued.pop_front() {
            Some(reply) => reply,
            None => match &rule.standing {
                Some(responder) => responder(request),
                None => Err(LlmError::Rejected(format!("script for '{}' exhausted", rule.marker))),
            },
        };
        (reply, latency)
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn invoke(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().push(request.clone());
        let (reply, latency) = self.reply_for(&request);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        reply.map(|content| LlmResponse::new(content, self.input_tokens, self.output_tokens))
    }
}

/// Planner reply for an outline with the given `(name, research)` sections
#[must_use]
pub fn outline_json(title: &str, sections: &[(&str, bool)]) -> String {
    let sections: Vec<_> = sections
        .iter()
        .map(|(name, research)| {
            serde_json::json!({
                "name": name,
                "description": format!("All about {name}"),
                "research": research,
            })
        })
        .collect();
    serde_json::json!({ "title": title, "sections": sections }).to_string()
}

/// The article text handed to the reviser, with one line appended
fn append_to_article(request: &LlmRequest) -> String {
    let message = request.last_user_message().unwrap_or_default();
    let article = message
        .strip_prefix("Article:\n")
        .and_then(|rest| rest.split_once("\n\nFeedback:\n"))
        .map_or(message, |(article, _)| article);
    format!("{article}\nRevised per feedback.\n")
}
