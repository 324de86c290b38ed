//! Section → Task synthesis.
//!
//! Each section and child section yields at most one [`Task`]. Sections
//! whose title and criteria match no file rule are dropped.

use tracing::debug;

use super::rules::{infer_priority, infer_role, infer_target_files, InferenceText};
use super::sectionizer::Section;
use crate::core::task::{Task, TaskIdSequence};

/// Convert sections into tasks in document order: each top-level section
/// first, then its children. Identifiers come from `ids` and are only
/// consumed by sections that produce a task.
pub fn synthesize(sections: &[Section], ids: &mut TaskIdSequence) -> Vec<Task> {
    let mut tasks = Vec::new();

    for section in sections {
        if let Some(task) = section_to_task(section, None, ids) {
            tasks.push(task);
        }
        for child in &section.children {
            if let Some(task) = section_to_task(child, Some(section), ids) {
                tasks.push(task);
            }
        }
    }

    debug!(
        sections = sections.len(),
        tasks = tasks.len(),
        "synthesized tasks from sections"
    );
    tasks
}

/// Build the task for one section, with its parent as context for child
/// sections.
pub fn section_to_task(
    section: &Section,
    parent: Option<&Section>,
    ids: &mut TaskIdSequence,
) -> Option<Task> {
    let context_title = match parent {
        Some(parent) => format!("{} - {}", parent.title, section.title),
        None => section.title.clone(),
    };
    let text = InferenceText::new(&context_title, &section.criteria);
    let target_files = infer_target_files(&text);

    if target_files.is_empty() {
        debug!(title = %section.title, "section has no inferable target files, dropping");
        return None;
    }

    let role = infer_role(&target_files);
    let task = Task::new(ids.next_id(), &section.title, &describe(section, parent))
        .with_priority(infer_priority(&section.title))
        .with_role(role)
        .with_target_files(target_files)
        .with_criteria(section.criteria.clone());

    debug!(
        id = %task.id,
        title = %task.title,
        files = task.target_files.len(),
        "task synthesized"
    );
    Some(task)
}

fn describe(section: &Section, parent: Option<&Section>) -> String {
    let summary = match parent {
        Some(parent) => format!("Implement {} as part of {}", section.title, parent.title),
        None if section.criteria.is_empty() => section.title.clone(),
        None => format!("Implement {}", section.title),
    };
    if section.body.is_empty() {
        summary
    } else {
        format!("{}\n\n{}", summary, section.body.join("\n"))
    }
}
