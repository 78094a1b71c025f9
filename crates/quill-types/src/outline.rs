//! Planned article structure
//!
//! An [`Outline`] is produced by planning and replaced wholesale on every
//! revision. Section numbers are assigned by position, so two outlines built
//! from the same plan number their sections identically.

use crate::document::{Document, Source};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Section identity within one outline
pub type SectionNumber = u32;

/// One planned section as emitted by the planner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionPlan {
    pub name: String,
    pub description: String,
    /// Whether this section gets its own research pass
    #[serde(default)]
    pub research: bool,
}

impl SectionPlan {
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>, research: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            research,
        }
    }
}

/// A section stub, progressively filled by research and writing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub section_number: SectionNumber,
    pub name: String,
    pub description: String,
    pub research: bool,
    /// Written body; empty until the section is written
    #[serde(default)]
    pub content: String,
    /// Citations in first-seen order
    #[serde(default)]
    pub sources: Vec<Source>,
    /// Research material backing `content`
    #[serde(default)]
    pub documents: Vec<Document>,
}

impl Section {
    /// Build an unwritten section from its plan
    #[must_use]
    pub fn from_plan(section_number: SectionNumber, plan: SectionPlan) -> Self {
        Self {
            section_number,
            name: plan.name,
            description: plan.description,
            research: plan.research,
            content: String::new(),
            sources: Vec::new(),
            documents: Vec::new(),
        }
    }

    /// Whether writing has produced any content
    #[inline]
    #[must_use]
    pub fn is_written(&self) -> bool {
        !self.content.trim().is_empty()
    }

    /// Drop written output, keeping the plan fields
    pub fn degrade(&mut self) {
        self.content.clear();
        self.sources.clear();
        self.documents.clear();
    }
}

/// Title plus ordered section stubs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline {
    pub title: String,
    pub sections: Vec<Section>,
}

impl Outline {
    /// Build an outline from a plan
    ///
    /// Sections beyond `max_sections` are dropped. Numbers run `1..=n` in plan order.
    #[must_use]
    pub fn from_plan(title: impl Into<String>, plans: Vec<SectionPlan>, max_sections: usize) -> Self {
        let sections = plans
            .into_iter()
            .take(max_sections)
            .zip(1..)
            .map(|(plan, number)| Section::from_plan(number, plan))
            .collect();
        Self {
            title: title.into(),
            sections,
        }
    }

    /// Sections that need their own research pass
    pub fn research_sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter().filter(|s| s.research)
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Human-readable outline shown when asking for feedback
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = format!("Title: {}\n", self.title);
        for section in &self.sections {
            let _ = writeln!(out, "{}. {}", section.section_number, section.name);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn plans(n: usize) -> Vec<SectionPlan> {
        (0..n)
            .map(|i| SectionPlan::new(format!("S{i}"), format!("about {i}"), i % 2 == 1))
            .collect()
    }

    #[test]
    fn from_plan_numbers_sections_by_position() {
        let outline = Outline::from_plan("T", plans(3), 5);
        let numbers: Vec<_> = outline.sections.iter().map(|s| s.section_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(outline.sections[1].name, "S1");
    }

    #[test]
    fn from_plan_truncates_to_max_sections() {
        let outline = Outline::from_plan("T", plans(8), 5);
        assert_eq!(outline.sections.len(), 5);
        assert_eq!(outline.sections[4].name, "S4");
    }

    #[test]
    fn research_sections_filters_flag() {
        let outline = Outline::from_plan("T", plans(4), 5);
        let names: Vec<_> = outline.research_sections().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["S1", "S3"]);
    }

    #[test]
    fn render_lists_title_and_numbered_sections() {
        let outline = Outline::from_plan(
            "Async Rust",
            vec![
                SectionPlan::new("Introduction", "", false),
                SectionPlan::new("Runtimes", "tokio vs smol", true),
            ],
            5,
        );
        assert_eq!(outline.render(), "Title: Async Rust\n1. Introduction\n2. Runtimes\n");
    }

    #[test]
    fn degrade_clears_written_output() {
        let mut section = Section::from_plan(1, SectionPlan::new("A", "a", true));
        section.content = "text".into();
        section.sources.push(Source::new("x", "https://x.example"));
        assert!(section.is_written());
        section.degrade();
        assert!(!section.is_written());
        assert!(section.sources.is_empty());
        assert_eq!(section.name, "A");
    }

    #[test]
    fn plan_research_defaults_to_false() {
        let plan: SectionPlan =
            serde_json::from_str(r#"{"name":"Intro","description":"d"}"#).unwrap();
        assert!(!plan.research);
    }

    proptest! {
        #[test]
        fn numbers_are_unique_and_stable(n in 0usize..20, max in 1usize..10) {
            let a = Outline::from_plan("T", plans(n), max);
            let b = Outline::from_plan("T", plans(n), max);
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a.sections.len(), n.min(max));
            let mut numbers: Vec<_> = a.sections.iter().map(|s| s.section_number).collect();
            numbers.dedup();
            prop_assert_eq!(numbers.len(), a.sections.len());
        }
    }
}
