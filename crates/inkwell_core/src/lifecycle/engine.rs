//! Chapter lifecycle decisions.
//!
//! # Responsibility
//! - Decide whether save/publish/create/unlock is legal for a chapter.
//! - Compute the request body or the affected chapter set for each action.
//!
//! # Invariants
//! - Functions are pure; they read a snapshot and never mutate it.
//! - The publication frontier is re-derived on every call.
//! - Unlocking chapter N reverts N and every later chapter, whatever their status.
//! - Publication order is not enforced; `is_out_of_order` only reports it.

use crate::model::chapter::{
    Chapter, ChapterDraft, ChapterId, ChapterPatch, ChapterStatus, NewChapter,
};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Client-side lifecycle violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidTransition {
    /// Chapter was never saved, so it has no server identity.
    Unsaved,
    BlankTitle,
    AlreadyPublished(ChapterId),
    /// Published content is frozen until unlocked.
    Locked(ChapterId),
    /// Placeholder number was taken since the placeholder was built.
    NumberTaken(i64),
}

impl Display for InvalidTransition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsaved => write!(f, "章节尚未保存，请先保存后再发布"),
            Self::BlankTitle => write!(f, "章节标题不能为空"),
            Self::AlreadyPublished(id) => write!(f, "章节已发布: {id}"),
            Self::Locked(id) => write!(f, "章节已发布，需先解锁才能编辑: {id}"),
            Self::NumberTaken(number) => write!(f, "第{number}章已存在"),
        }
    }
}

impl Error for InvalidTransition {}

/// Inspectable fan-out of one cascading unlock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockPlan {
    pub from_chapter_number: i64,
    /// Every saved chapter numbered `>= from_chapter_number`, ascending.
    pub affected: Vec<ChapterId>,
    /// Subset of `affected` currently published, ascending.
    pub reverts: Vec<ChapterId>,
}

impl UnlockPlan {
    /// Nothing would change on the server.
    pub fn is_noop(&self) -> bool {
        self.reverts.is_empty()
    }
}

/// Validates a save of `draft` over `chapter`; status stays as it is.
pub fn plan_save(
    chapter: &Chapter,
    draft: &ChapterDraft,
) -> Result<(ChapterId, ChapterPatch), InvalidTransition> {
    let chapter_id = chapter.id.ok_or(InvalidTransition::Unsaved)?;
    if chapter.is_published() {
        return Err(InvalidTransition::Locked(chapter_id));
    }
    ensure_title(&draft.title)?;
    Ok((chapter_id, ChapterPatch::from_draft(draft)))
}

/// Validates `draft -> published`.
///
/// With a draft, the editor's fields are written in the same request so the
/// frozen content is exactly what was on screen.
pub fn plan_publish(
    chapter: &Chapter,
    draft: Option<&ChapterDraft>,
) -> Result<(ChapterId, ChapterPatch), InvalidTransition> {
    let chapter_id = chapter.id.ok_or(InvalidTransition::Unsaved)?;
    if chapter.is_published() {
        return Err(InvalidTransition::AlreadyPublished(chapter_id));
    }

    let patch = match draft {
        Some(draft) => {
            ensure_title(&draft.title)?;
            ChapterPatch::from_draft(draft).with_status(ChapterStatus::Published)
        }
        None => {
            ensure_title(&chapter.title)?;
            ChapterPatch::status(ChapterStatus::Published)
        }
    };
    Ok((chapter_id, patch))
}

/// Builds the create body for a new chapter appended after the last one.
pub fn plan_create(chapters: &[Chapter], title: &str) -> Result<NewChapter, InvalidTransition> {
    ensure_title(title)?;
    Ok(NewChapter {
        title: title.trim().to_string(),
        content: String::new(),
        outline: String::new(),
        status: ChapterStatus::Draft,
        chapter_number: next_chapter_number(chapters),
    })
}

/// Builds the create body that turns a placeholder into a saved chapter.
pub fn plan_materialize(
    chapters: &[Chapter],
    placeholder: &Chapter,
    draft: &ChapterDraft,
) -> Result<NewChapter, InvalidTransition> {
    ensure_title(&draft.title)?;
    if chapters
        .iter()
        .any(|chapter| chapter.chapter_number == placeholder.chapter_number)
    {
        return Err(InvalidTransition::NumberTaken(placeholder.chapter_number));
    }
    Ok(NewChapter {
        title: draft.title.trim().to_string(),
        content: draft.content.clone(),
        outline: draft.outline.clone().unwrap_or_default(),
        status: ChapterStatus::Draft,
        chapter_number: placeholder.chapter_number,
    })
}

/// Computes which chapters an unlock of `chapter_number` touches.
pub fn plan_unlock(chapters: &[Chapter], chapter_number: i64) -> UnlockPlan {
    let mut later: Vec<&Chapter> = chapters
        .iter()
        .filter(|chapter| chapter.id.is_some() && chapter.chapter_number >= chapter_number)
        .collect();
    later.sort_by_key(|chapter| (chapter.chapter_number, chapter.id));

    UnlockPlan {
        from_chapter_number: chapter_number,
        affected: later.iter().filter_map(|chapter| chapter.id).collect(),
        reverts: later
            .iter()
            .filter(|chapter| chapter.is_published())
            .filter_map(|chapter| chapter.id)
            .collect(),
    }
}

/// Post-unlock snapshot: the state the server holds once the plan executed.
pub fn apply_unlock(chapters: &[Chapter], plan: &UnlockPlan) -> Vec<Chapter> {
    chapters
        .iter()
        .cloned()
        .map(|mut chapter| {
            if chapter.chapter_number >= plan.from_chapter_number {
                chapter.status = ChapterStatus::Draft;
            }
            chapter
        })
        .collect()
}

/// Published chapter with the highest number.
pub fn last_published(chapters: &[Chapter]) -> Option<&Chapter> {
    chapters
        .iter()
        .filter(|chapter| chapter.is_published())
        .max_by_key(|chapter| chapter.chapter_number)
}

/// Highest chapter number of the contiguous published prefix from 1; 0 when empty.
pub fn frontier(chapters: &[Chapter]) -> i64 {
    let mut end = 0;
    loop {
        let next = end + 1;
        let published = chapters
            .iter()
            .any(|chapter| chapter.chapter_number == next && chapter.is_published());
        if !published {
            return end;
        }
        end = next;
    }
}

/// Number a newly created chapter receives.
pub fn next_chapter_number(chapters: &[Chapter]) -> i64 {
    chapters
        .iter()
        .map(|chapter| chapter.chapter_number)
        .max()
        .map_or(1, |max| max + 1)
}

/// True when publishing `chapter` would skip past the frontier's successor.
pub fn is_out_of_order(chapters: &[Chapter], chapter: &Chapter) -> bool {
    chapter.chapter_number > frontier(chapters) + 1
}

fn ensure_title(title: &str) -> Result<(), InvalidTransition> {
    if title.trim().is_empty() {
        return Err(InvalidTransition::BlankTitle);
    }
    Ok(())
}
