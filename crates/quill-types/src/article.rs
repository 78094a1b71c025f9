//! Compiled article artifact

use crate::document::Source;
use crate::outline::{Section, SectionNumber};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Body section of a compiled article
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSection {
    pub section_number: SectionNumber,
    pub name: String,
    pub content: String,
    pub sources: Vec<Source>,
}

impl From<&Section> for ArticleSection {
    fn from(section: &Section) -> Self {
        Self {
            section_number: section.section_number,
            name: section.name.clone(),
            content: section.content.clone(),
            sources: section.sources.clone(),
        }
    }
}

/// The final output of a workflow
///
/// The fields are the contract; [`Article::render_markdown`] is one
/// presentation of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub date: NaiveDate,
    pub introduction: String,
    /// Body sections in ascending section number
    pub sections: Vec<ArticleSection>,
    /// Citations flattened across sections, unique by URL
    pub references: Vec<Source>,
}

impl Article {
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        date: NaiveDate,
        introduction: String,
        sections: Vec<ArticleSection>,
        references: Vec<Source>,
    ) -> Self {
        Self {
            title: title.into(),
            date,
            introduction,
            sections,
            references,
        }
    }

    /// Render as markdown
    ///
    /// Layout: `# title`, date line, introduction, one `## name` block per
    /// section, then a `## References` list when any citations exist.
    #[must_use]
    pub fn render_markdown(&self) -> String {
        let mut out = format!("# {}\n\n_{}_\n", self.title, self.date.format("%Y-%m-%d"));

        if !self.introduction.trim().is_empty() {
            let _ = write!(out, "\n{}\n", self.introduction.trim());
        }

        for section in &self.sections {
            let _ = write!(out, "\n## {}\n\n{}\n", section.name, section.content.trim());
        }

        if !self.references.is_empty() {
            out.push_str("\n## References\n\n");
            for source in &self.references {
                let _ = writeln!(out, "- [{}]({})", source.title, source.url);
            }
        }

        out
    }

    /// Headings of the body, in order
    #[must_use]
    pub fn headings(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 11, 3).unwrap()
    }

    #[test]
    fn renders_full_layout() {
        let article = Article::new(
            "Rust",
            date(),
            "Intro text.".into(),
            vec![ArticleSection {
                section_number: 2,
                name: "Ownership".into(),
                content: "Moves and borrows.".into(),
                sources: vec![],
            }],
            vec![Source::new("Book", "https://doc.rust-lang.org/book")],
        );

        assert_eq!(
            article.render_markdown(),
            "# Rust\n\n_2024-11-03_\n\nIntro text.\n\n## Ownership\n\nMoves and borrows.\n\n\
             ## References\n\n- [Book](https://doc.rust-lang.org/book)\n"
        );
    }

    #[test]
    fn omits_empty_introduction_and_references() {
        let article = Article::new("Rust", date(), "  ".into(), vec![], vec![]);
        assert_eq!(article.render_markdown(), "# Rust\n\n_2024-11-03_\n");
    }

    #[test]
    fn section_conversion_keeps_sources() {
        let mut section = Section::from_plan(
            3,
            crate::outline::SectionPlan::new("Traits", "generic code", true),
        );
        section.content = "dyn and impl".into();
        section.sources.push(Source::new("Ref", "https://r.example"));

        let converted = ArticleSection::from(&section);
        assert_eq!(converted.section_number, 3);
        assert_eq!(converted.sources.len(), 1);
    }
}
