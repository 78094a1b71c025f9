//! Final article compilation
//!
//! Pure: the same title, date and sections always give the same article,
//! whatever order the sections arrive in.

use chrono::NaiveDate;
use quill_types::{Article, ArticleSection, Section, Source};
use std::collections::HashSet;

/// Build the article from written sections
///
/// Sections are ordered by section number. When section 1 is a non-research
/// section its content becomes the introduction and it is left out of the
/// body. References are flattened in section order, first occurrence of each
/// URL wins.
#[must_use]
pub fn compile_article(
    title: &str,
    date: NaiveDate,
    sections: impl IntoIterator<Item = Section>,
) -> Article {
    let mut sections: Vec<Section> = sections.into_iter().collect();
    sections.sort_by_key(|s| s.section_number);

    let mut seen = HashSet::new();
    let references: Vec<Source> = sections
        .iter()
        .flat_map(|s| s.sources.iter())
        .filter(|source| seen.insert(source.url.clone()))
        .cloned()
        .collect();

    let introduction = match sections.first() {
        Some(first) if first.section_number == 1 && !first.research => {
            sections.remove(0).content
        }
        _ => String::new(),
    };

    Article::new(
        title,
        date,
        introduction,
        sections.iter().map(ArticleSection::from).collect(),
        references,
    )
}

/// Title and second-level headings of a markdown report
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReportStructure {
    pub title: Option<String>,
    pub headings: Vec<String>,
}

impl ReportStructure {
    /// Scan `# ` and `## ` lines
    #[must_use]
    pub fn parse(markdown: &str) -> Self {
        let mut structure = Self::default();
        for line in markdown.lines().map(str::trim_end) {
            if let Some(heading) = line.strip_prefix("## ") {
                structure.headings.push(heading.trim().to_string());
            } else if let Some(title) = line.strip_prefix("# ") {
                if structure.title.is_none() {
                    structure.title = Some(title.trim().to_string());
                }
            }
        }
        structure
    }
}
