//! Heading-structured document parsing.
//!
//! Turns requirements text into an ordered tree of [`Section`]s: `##`
//! headings open top-level sections, `###` headings open child sections
//! under the current top-level section, and `-` list items become
//! criteria. Fenced code blocks are skipped entirely.

use serde::{Deserialize, Serialize};

const FENCE: &str = "```";
const LEVEL2: &str = "## ";
const LEVEL3: &str = "### ";

/// A document section with its body text and extracted criteria.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub body: Vec<String>,
    pub criteria: Vec<String>,
    pub children: Vec<Section>,
}

impl Section {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.trim().to_string(),
            ..Self::default()
        }
    }
}

/// Where the next body line or criterion goes.
enum Target {
    Section,
    Child,
}

/// Split document text into top-level sections.
///
/// A document without `##` headings yields an empty list.
pub fn sectionize(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current: Option<Section> = None;
    let mut target = Target::Section;
    let mut in_code_block = false;

    for line in text.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with(FENCE) {
            in_code_block = !in_code_block;
            continue;
        }
        if in_code_block || trimmed.is_empty() {
            continue;
        }

        if let Some(title) = line.strip_prefix(LEVEL2) {
            if let Some(done) = current.take() {
                sections.push(done);
            }
            current = Some(Section::new(title));
            target = Target::Section;
            continue;
        }

        let Some(section) = current.as_mut() else {
            continue;
        };

        if let Some(title) = line.strip_prefix(LEVEL3) {
            section.children.push(Section::new(title));
            target = Target::Child;
            continue;
        }

        let active: &mut Section = match target {
            Target::Child if !section.children.is_empty() => {
                let last = section.children.len() - 1;
                &mut section.children[last]
            }
            _ => section,
        };

        if let Some(item) = trimmed.strip_prefix('-') {
            let criterion = item.trim();
            if !criterion.is_empty() {
                active.criteria.push(criterion.to_string());
            }
        } else {
            active.body.push(trimmed.to_string());
        }
    }

    if let Some(done) = current {
        sections.push(done);
    }

    sections
}
