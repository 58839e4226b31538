//! Execution of a confirmed cascading unlock.
//!
//! # Invariants
//! - Per-chapter mode reverts from the highest chapter number down, so an
//!   interrupted run never leaves a published chapter after a draft one.
//! - Per-chapter mode stops at the first failure.
//! - A no-op plan issues no requests.

use crate::api::ChapterApi;
use crate::config::UnlockMode;
use crate::lifecycle::engine::UnlockPlan;
use crate::model::chapter::{ChapterId, ChapterStatus};
use crate::store::chapter_store::{ChapterStore, StoreError, StoreResult};
use log::{error, info};

/// Chapters whose status moved back to draft.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnlockOutcome {
    pub reverted: Vec<ChapterId>,
}

/// Runs `plan` against the store using `mode`.
pub fn execute_unlock<A: ChapterApi>(
    store: &mut ChapterStore<A>,
    plan: &UnlockPlan,
    mode: UnlockMode,
) -> StoreResult<UnlockOutcome> {
    if plan.is_noop() {
        return Ok(UnlockOutcome::default());
    }
    info!(
        "event=chapter_unlock module=service status=start from_number={} reverts={} mode={mode:?}",
        plan.from_chapter_number,
        plan.reverts.len()
    );

    let outcome = match mode {
        UnlockMode::PerChapter => unlock_per_chapter(store, plan),
        UnlockMode::BatchEndpoint => unlock_with_batch_endpoint(store, plan),
    };

    match &outcome {
        Ok(done) => info!(
            "event=chapter_unlock module=service status=ok from_number={} reverted={}",
            plan.from_chapter_number,
            done.reverted.len()
        ),
        Err(err) => error!(
            "event=chapter_unlock module=service status=error from_number={} error={err}",
            plan.from_chapter_number
        ),
    }
    outcome
}

fn unlock_per_chapter<A: ChapterApi>(
    store: &mut ChapterStore<A>,
    plan: &UnlockPlan,
) -> StoreResult<UnlockOutcome> {
    let mut reverted = Vec::with_capacity(plan.reverts.len());
    for chapter_id in plan.reverts.iter().rev() {
        store.unpublish(*chapter_id)?;
        reverted.push(*chapter_id);
    }
    Ok(UnlockOutcome { reverted })
}

fn unlock_with_batch_endpoint<A: ChapterApi>(
    store: &mut ChapterStore<A>,
    plan: &UnlockPlan,
) -> StoreResult<UnlockOutcome> {
    let project_id = store.project_id().ok_or(StoreError::NotLoaded)?;
    store.update_status_from(project_id, plan.from_chapter_number, ChapterStatus::Draft)?;
    Ok(UnlockOutcome {
        reverted: plan.reverts.clone(),
    })
}
