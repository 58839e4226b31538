//! Batch chapter publication.
//!
//! # Responsibility
//! - Publish a caller-selected list of chapters one at a time.
//! - Turn each attempt into a result entry and summarize the run.
//!
//! # Invariants
//! - One publish request in flight at a time, in input order.
//! - A failed chapter never stops the batch.
//! - Without cancellation `success_count + error_count == total_chapters`.
//! - Duplicate ids are dropped; the first occurrence keeps its position.

use crate::api::ChapterApi;
use crate::batch::pipeline::{CancelFlag, PipelineProgress, SequentialPipeline};
use crate::lifecycle::engine::{is_out_of_order, plan_publish};
use crate::model::chapter::ChapterId;
use crate::store::chapter_store::{ChapterStore, StoreError};
use log::{info, warn};
use std::collections::HashSet;

/// Progress after each completed attempt.
pub type BatchProgress = PipelineProgress;

/// Outcome of one chapter in a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterPublishResult {
    pub chapter_id: ChapterId,
    pub success: bool,
    /// Human-readable failure text; `None` on success.
    pub error: Option<String>,
}

impl ChapterPublishResult {
    fn ok(chapter_id: ChapterId) -> Self {
        Self {
            chapter_id,
            success: true,
            error: None,
        }
    }

    fn failed(chapter_id: ChapterId, error: impl Into<String>) -> Self {
        Self {
            chapter_id,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Summary of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchPublishReport {
    pub success_count: usize,
    pub error_count: usize,
    /// Ids never attempted because the run was cancelled.
    pub skipped_count: usize,
    pub total_chapters: usize,
    /// One entry per attempted chapter, in attempt order.
    pub results: Vec<ChapterPublishResult>,
}

impl BatchPublishReport {
    pub fn failed(&self) -> impl Iterator<Item = &ChapterPublishResult> {
        self.results.iter().filter(|result| !result.success)
    }

    pub fn published_ids(&self) -> Vec<ChapterId> {
        self.results
            .iter()
            .filter(|result| result.success)
            .map(|result| result.chapter_id)
            .collect()
    }
}

/// Sequential batch publisher over a chapter store.
#[derive(Debug, Clone, Default)]
pub struct BatchPublisher {
    pipeline: SequentialPipeline,
}

impl BatchPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops the run before the next chapter once `cancel` is raised.
    pub fn with_cancel(cancel: CancelFlag) -> Self {
        Self {
            pipeline: SequentialPipeline::new().with_cancel(cancel),
        }
    }

    /// Publishes `chapter_ids` in order, reporting progress after each attempt.
    pub fn publish<A, P>(
        &self,
        store: &mut ChapterStore<A>,
        chapter_ids: &[ChapterId],
        on_progress: P,
    ) -> BatchPublishReport
    where
        A: ChapterApi,
        P: FnMut(BatchProgress),
    {
        let ids = dedup_ids(chapter_ids);
        let total_chapters = ids.len();
        info!("event=batch_publish module=batch status=start total={total_chapters}");

        let outcome = self.pipeline.run(
            ids,
            |chapter_id| publish_one(store, *chapter_id),
            on_progress,
        );

        let success_count = outcome
            .completed
            .iter()
            .filter(|result| result.success)
            .count();
        let report = BatchPublishReport {
            success_count,
            error_count: outcome.completed.len() - success_count,
            skipped_count: outcome.skipped.len(),
            total_chapters,
            results: outcome.completed,
        };

        if report.skipped_count > 0 {
            warn!(
                "event=batch_publish module=batch status=cancelled success={} failed={} skipped={}",
                report.success_count, report.error_count, report.skipped_count
            );
        } else {
            info!(
                "event=batch_publish module=batch status=ok success={} failed={}",
                report.success_count, report.error_count
            );
        }
        report
    }
}

fn publish_one<A: ChapterApi>(
    store: &mut ChapterStore<A>,
    chapter_id: ChapterId,
) -> ChapterPublishResult {
    let Some(chapter) = store.get(chapter_id) else {
        return ChapterPublishResult::failed(
            chapter_id,
            StoreError::UnknownChapter(chapter_id).to_string(),
        );
    };
    let patch = match plan_publish(chapter, None) {
        Ok((_, patch)) => patch,
        Err(err) => return ChapterPublishResult::failed(chapter_id, err.to_string()),
    };
    if is_out_of_order(store.chapters(), chapter) {
        warn!(
            "event=chapter_publish module=batch status=out_of_order chapter_id={chapter_id} chapter_number={}",
            chapter.chapter_number
        );
    }

    match store.save(chapter_id, &patch) {
        Ok(_) => ChapterPublishResult::ok(chapter_id),
        Err(err) => ChapterPublishResult::failed(chapter_id, err.to_string()),
    }
}

fn dedup_ids(chapter_ids: &[ChapterId]) -> Vec<ChapterId> {
    let mut seen = HashSet::with_capacity(chapter_ids.len());
    chapter_ids
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect()
}
