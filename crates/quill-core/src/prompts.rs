//! Prompt construction for planner, writer and reviser calls
//!
//! Wording is not a contract. Each role has its own system prompt so that a
//! reply can be traced back to the call that asked for it.

use chrono::NaiveDate;
use quill_types::{Document, Outline, Section, Task};
use std::fmt::Write as _;

pub(crate) const QUERY_PLANNER: &str = "You are an expert technical writer planning the \
research for an article. Generate web search queries that gather background for the topic. \
Reply with JSON of the form {\"queries\": [\"...\"]}.";

pub(crate) const OUTLINE_PLANNER: &str = "You are an expert technical writer drafting the \
outline of an article. Reply with JSON of the form {\"title\": \"...\", \"sections\": \
[{\"name\": \"...\", \"description\": \"...\", \"research\": true}]}. Set research to false \
for introduction and conclusion sections.";

pub(crate) const SECTION_WRITER: &str = "You are an expert technical writer composing one \
section of an article from the supplied sources. Reply with the section body in markdown, \
without a heading.";

pub(crate) const FRAMING_WRITER: &str = "You are an expert technical writer composing a \
framing section (introduction or conclusion) of an article from its finished body sections. \
Reply with the section body in markdown, without a heading.";

pub(crate) const REVISION_PLANNER: &str = "You are an editor deciding what to look up before \
applying reviewer feedback to a finished article. Reply with JSON of the form \
{\"queries\": [\"...\"]}.";

pub(crate) const REVISER: &str = "You are an editor rewriting a finished article to address \
reviewer feedback. Keep the title and every section heading exactly as they are. Reply with \
the full revised article in markdown.";

const DOCUMENT_EXCERPT_CHARS: usize = 2_000;

pub(crate) fn query_request(task: &Task, count: usize) -> String {
    format!(
        "Topic: {}\nRequirements: {}\n\nGenerate {count} search queries.",
        task.topic, task.requirements
    )
}

pub(crate) fn outline_request(
    task: &Task,
    date: NaiveDate,
    report_structure: &str,
    research: &[Document],
    revision: Option<(&Outline, &str)>,
) -> String {
    let mut out = format!(
        "Topic: {}\nRequirements: {}\nToday's date: {date}\nAt most {} sections.\n\n\
         Report structure:\n{report_structure}\n\nBackground research:\n",
        task.topic, task.requirements, task.max_sections
    );
    push_digest(&mut out, research);
    if let Some((previous, feedback)) = revision {
        let _ = write!(
            out,
            "\nPrevious outline:\n{}\nRevise it according to this feedback:\n{feedback}\n",
            previous.render()
        );
    }
    out
}

pub(crate) fn section_request(task: &Task, section: &Section, guidelines: &str) -> String {
    let mut out = format!(
        "Article topic: {}\nSection: {}\nDescription: {}\n\nWriting guidelines:\n{guidelines}\n\nSources:\n",
        task.topic, section.name, section.description
    );
    push_digest(&mut out, &section.documents);
    out
}

pub(crate) fn framing_request(
    task: &Task,
    section: &Section,
    body: &[&Section],
    guidelines: &str,
) -> String {
    let mut out = format!(
        "Article topic: {}\nSection: {}\nDescription: {}\n\nWriting guidelines:\n{guidelines}\n\nBody sections:\n",
        task.topic, section.name, section.description
    );
    for written in body {
        let _ = write!(out, "\n## {}\n{}\n", written.name, written.content);
    }
    out
}

pub(crate) fn revision_query_request(report: &str, feedback: &str, count: usize) -> String {
    format!("Article:\n{report}\n\nFeedback:\n{feedback}\n\nGenerate {count} search queries.")
}

pub(crate) fn revision_request(report: &str, feedback: &str, research: &[Document]) -> String {
    let mut out = format!("Article:\n{report}\n\nFeedback:\n{feedback}\n\nSearch results:\n");
    push_digest(&mut out, research);
    out
}

/// Text shown to the human when the outline is ready
pub(crate) fn outline_feedback_prompt(outline: &Outline) -> String {
    format!(
        "{}\nReply \"ok\" to accept this outline, or describe the changes you want.",
        outline.render()
    )
}

/// Text shown to the human when the report is ready
pub(crate) fn report_feedback_prompt(report: &str) -> String {
    format!("{report}\nReply \"ok\" to accept this article, or describe the changes you want.")
}

fn push_digest(out: &mut String, documents: &[Document]) {
    if documents.is_empty() {
        out.push_str("(none)\n");
        return;
    }
    for doc in documents {
        let excerpt: String = doc.content.chars().take(DOCUMENT_EXCERPT_CHARS).collect();
        let _ = write!(out, "\n[{}]({})\n{excerpt}\n", doc.title, doc.source_url);
    }
}
