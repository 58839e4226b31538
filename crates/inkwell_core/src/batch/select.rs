//! Batch selection helpers.
//!
//! Pure filters over a chapter snapshot. Every helper returns draft chapter
//! ids in chapter order, ready to hand to the batch publisher.

use crate::model::chapter::{Chapter, ChapterId, UnpublishedChapter};

/// Only the current chapter, when it is a saved draft.
pub fn select_current(chapters: &[Chapter], current: ChapterId) -> Vec<ChapterId> {
    chapters
        .iter()
        .filter(|chapter| chapter.id == Some(current) && chapter.is_draft())
        .filter_map(|chapter| chapter.id)
        .collect()
}

/// The current chapter and every draft numbered before it.
pub fn select_through_current(chapters: &[Chapter], current: ChapterId) -> Vec<ChapterId> {
    let Some(limit) = chapters
        .iter()
        .find(|chapter| chapter.id == Some(current))
        .map(|chapter| chapter.chapter_number)
    else {
        return Vec::new();
    };
    drafts_where(chapters, |chapter| chapter.chapter_number <= limit)
}

/// Drafts numbered between `a` and `b`, inclusive, in either order.
pub fn select_range(chapters: &[Chapter], a: i64, b: i64) -> Vec<ChapterId> {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    drafts_where(chapters, |chapter| {
        (low..=high).contains(&chapter.chapter_number)
    })
}

pub fn select_all_unpublished(chapters: &[Chapter]) -> Vec<ChapterId> {
    drafts_where(chapters, |_| true)
}

/// Same as `select_through_current`, over the server's unpublished listing.
///
/// Takes the listing prefix up to and including the entry flagged current.
pub fn select_listing_through_current(listing: &[UnpublishedChapter]) -> Vec<ChapterId> {
    let mut sorted: Vec<&UnpublishedChapter> = listing.iter().collect();
    sorted.sort_by_key(|entry| (entry.chapter_number, entry.id));
    match sorted.iter().position(|entry| entry.is_current) {
        Some(index) => sorted[..=index].iter().map(|entry| entry.id).collect(),
        None => Vec::new(),
    }
}

fn drafts_where(chapters: &[Chapter], keep: impl Fn(&Chapter) -> bool) -> Vec<ChapterId> {
    let mut selected: Vec<&Chapter> = chapters
        .iter()
        .filter(|chapter| chapter.is_draft() && keep(chapter))
        .collect();
    selected.sort_by_key(|chapter| (chapter.chapter_number, chapter.id));
    selected.iter().filter_map(|chapter| chapter.id).collect()
}
