//! Default chapter selection when the editor opens.
//!
//! Steers normal use toward order-preserving publication: the editor lands
//! on the chapter right after the last published one.

use crate::lifecycle::engine::last_published;
use crate::model::chapter::{Chapter, ChapterId, ProjectId};

/// How the editor was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorEntry {
    /// No chapter requested; apply the default policy.
    Default,
    /// A specific chapter was requested.
    Explicit(ChapterId),
    /// Reopen the chapter remembered for this project, if it still exists.
    Resume,
}

/// Title used for the very first placeholder of an empty project.
pub const FIRST_CHAPTER_TITLE: &str = "第一章";

/// Picks the chapter to open when none was requested.
///
/// Returns a clone of an existing chapter, or a placeholder with no id.
pub fn default_chapter(project_id: ProjectId, chapters: &[Chapter]) -> Chapter {
    if let Some(last) = last_published(chapters) {
        let target = last.chapter_number + 1;
        return chapters
            .iter()
            .find(|chapter| chapter.chapter_number == target)
            .cloned()
            .unwrap_or_else(|| Chapter::placeholder(project_id, target, format!("第{target}章")));
    }

    let by_number = |chapter: &&Chapter| chapter.chapter_number;
    chapters
        .iter()
        .filter(|chapter| chapter.is_draft())
        .min_by_key(by_number)
        .or_else(|| chapters.iter().min_by_key(by_number))
        .cloned()
        .unwrap_or_else(|| Chapter::placeholder(project_id, 1, FIRST_CHAPTER_TITLE))
}

/// Remembered chapter when it is still in the set, else the default pick.
pub fn resume_chapter(
    project_id: ProjectId,
    chapters: &[Chapter],
    remembered: Option<ChapterId>,
) -> Chapter {
    remembered
        .and_then(|id| chapters.iter().find(|chapter| chapter.id == Some(id)))
        .cloned()
        .unwrap_or_else(|| default_chapter(project_id, chapters))
}
