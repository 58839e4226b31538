//! Chapter workflow use-cases.
//!
//! # Responsibility
//! - Compose store calls and lifecycle decisions into editor actions.
//! - Surface every outcome through the `Notify` port.
//! - Gate irreversible actions behind the `Confirm` port.
//!
//! # Invariants
//! - Lifecycle checks run before any request is sent.
//! - A declined confirmation sends nothing and changes nothing.
//! - After publish, unlock, and batch publish the chapter list is reloaded
//!   and the current chapter re-selected by the default policy.
//! - A failed reload after server-side success is a warning; the result of
//!   the completed work is still returned.
//! - A materialized placeholder becomes current before any later step runs.

use crate::api::ChapterApi;
use crate::batch::driver::{BatchProgress, BatchPublishReport, BatchPublisher};
use crate::batch::pipeline::CancelFlag;
use crate::config::UnlockMode;
use crate::lifecycle::engine::{
    is_out_of_order, plan_create, plan_materialize, plan_publish, plan_save, plan_unlock,
    InvalidTransition,
};
use crate::lifecycle::selection::{default_chapter, resume_chapter, EditorEntry};
use crate::model::chapter::{Chapter, ChapterDraft, ChapterId, ProjectId, UnpublishedChapter};
use crate::service::ports::{Confirm, ConfirmPrompt, Notify};
use crate::service::unlock::{execute_unlock, UnlockOutcome};
use crate::store::chapter_store::{ChapterStore, StoreError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type WorkflowResult<T> = Result<T, WorkflowError>;

const DELETE_PROMPT: &str = "确定要删除这个章节吗？此操作不可撤销。";

/// Workflow failure surfaced to the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    Transition(InvalidTransition),
    Store(StoreError),
    /// Confirmation was declined.
    Cancelled,
    NoProject,
    NoCurrentChapter,
}

impl Display for WorkflowError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transition(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Cancelled => write!(f, "操作已取消"),
            Self::NoProject => write!(f, "尚未打开项目"),
            Self::NoCurrentChapter => write!(f, "尚未选择章节"),
        }
    }
}

impl Error for WorkflowError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transition(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<InvalidTransition> for WorkflowError {
    fn from(value: InvalidTransition) -> Self {
        Self::Transition(value)
    }
}

impl From<StoreError> for WorkflowError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Editor-level chapter actions over one open project.
pub struct ChapterWorkflow<A: ChapterApi, C: Confirm, N: Notify> {
    store: ChapterStore<A>,
    confirm: C,
    notify: N,
    unlock_mode: UnlockMode,
}

impl<A: ChapterApi, C: Confirm, N: Notify> ChapterWorkflow<A, C, N> {
    pub fn new(store: ChapterStore<A>, confirm: C, notify: N) -> Self {
        Self {
            store,
            confirm,
            notify,
            unlock_mode: UnlockMode::default(),
        }
    }

    pub fn with_unlock_mode(mut self, unlock_mode: UnlockMode) -> Self {
        self.unlock_mode = unlock_mode;
        self
    }

    pub fn store(&self) -> &ChapterStore<A> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ChapterStore<A> {
        &mut self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notify
    }

    pub fn into_store(self) -> ChapterStore<A> {
        self.store
    }

    pub fn current(&self) -> Option<&Chapter> {
        self.store.current()
    }

    /// Loads the project and opens the chapter chosen by `entry`.
    pub fn open_project(
        &mut self,
        project_id: ProjectId,
        entry: EditorEntry,
    ) -> WorkflowResult<Chapter> {
        let outcome = self.open_project_inner(project_id, entry);
        self.notify_failure(outcome)
    }

    fn open_project_inner(
        &mut self,
        project_id: ProjectId,
        entry: EditorEntry,
    ) -> WorkflowResult<Chapter> {
        self.store.load_all(project_id)?;
        let chapters = self.store.chapters();
        let picked = match entry {
            EditorEntry::Default => default_chapter(project_id, chapters),
            EditorEntry::Explicit(chapter_id) => self
                .store
                .get(chapter_id)
                .cloned()
                .ok_or(StoreError::UnknownChapter(chapter_id))?,
            EditorEntry::Resume => {
                let remembered = self.store.session().last_chapter(project_id);
                resume_chapter(project_id, chapters, remembered)
            }
        };
        self.enter(picked)
    }

    /// Appends a new draft chapter after the highest-numbered one.
    pub fn create_chapter(&mut self, title: &str) -> WorkflowResult<Chapter> {
        let outcome = self.create_chapter_inner(title);
        let created = self.notify_failure(outcome)?;
        self.notify.success("新章节已创建");
        Ok(created)
    }

    fn create_chapter_inner(&mut self, title: &str) -> WorkflowResult<Chapter> {
        let project_id = self.project_id()?;
        let body = plan_create(self.store.chapters(), title)?;
        let created = self.store.create(project_id, &body)?;
        self.select(created.clone());
        Ok(created)
    }

    /// Saves the editor content into the current chapter.
    ///
    /// A placeholder is materialized on the server by this call.
    pub fn save_current(&mut self, draft: &ChapterDraft) -> WorkflowResult<Chapter> {
        let outcome = self.save_current_inner(draft);
        let saved = self.notify_failure(outcome)?;
        self.notify.success("内容已保存");
        Ok(saved)
    }

    fn save_current_inner(&mut self, draft: &ChapterDraft) -> WorkflowResult<Chapter> {
        let current = self.current_chapter()?;
        let saved = if current.is_placeholder() {
            self.materialize(&current, draft)?
        } else {
            let (chapter_id, patch) = plan_save(&current, draft)?;
            self.store.save(chapter_id, &patch)?
        };
        self.select(saved.clone());
        Ok(saved)
    }

    /// Publishes the current chapter, writing `draft` in the same request when given.
    pub fn publish_current(&mut self, draft: Option<&ChapterDraft>) -> WorkflowResult<Chapter> {
        let outcome = self.publish_current_inner(draft);
        let published = self.notify_failure(outcome)?;
        self.notify.success("章节已发布");
        Ok(published)
    }

    fn publish_current_inner(&mut self, draft: Option<&ChapterDraft>) -> WorkflowResult<Chapter> {
        let mut current = self.current_chapter()?;
        let mut draft = draft;
        if current.is_placeholder() {
            let editor = draft.ok_or(InvalidTransition::Unsaved)?;
            current = self.materialize(&current, editor)?;
            draft = None;
        }

        let (chapter_id, patch) = plan_publish(&current, draft)?;
        if is_out_of_order(self.store.chapters(), &current) {
            warn!(
                "event=chapter_publish module=service status=out_of_order chapter_id={chapter_id} chapter_number={}",
                current.chapter_number
            );
        }
        let published = self.store.save(chapter_id, &patch)?;
        info!("event=chapter_publish module=service status=ok chapter_id={chapter_id}");

        self.resync();
        Ok(published)
    }

    /// Reverts chapter `chapter_number` and every later chapter to draft.
    ///
    /// Asks for confirmation unless nothing would change.
    pub fn unlock(&mut self, chapter_number: i64) -> WorkflowResult<UnlockOutcome> {
        let outcome = self.unlock_inner(chapter_number);
        match &outcome {
            Ok(done) if !done.reverted.is_empty() => {
                self.notify.success(&format!(
                    "已解锁第{chapter_number}章，{} 个章节恢复为草稿",
                    done.reverted.len()
                ));
            }
            Ok(_) | Err(WorkflowError::Cancelled) => {}
            Err(err) => self.notify.error(&err.to_string()),
        }
        outcome
    }

    fn unlock_inner(&mut self, chapter_number: i64) -> WorkflowResult<UnlockOutcome> {
        self.project_id()?;
        let plan = plan_unlock(self.store.chapters(), chapter_number);
        if plan.is_noop() {
            info!(
                "event=chapter_unlock module=service status=noop from_number={chapter_number}"
            );
            return Ok(UnlockOutcome::default());
        }

        let prompt = ConfirmPrompt::new(
            "解锁章节",
            format!(
                "解锁第{chapter_number}章会将其及之后的 {} 个已发布章节恢复为草稿，确定继续吗？",
                plan.reverts.len()
            ),
        );
        if !self.confirm.confirm(&prompt) {
            return Err(WorkflowError::Cancelled);
        }

        // Per-chapter mode may have reverted a suffix before failing.
        let executed = execute_unlock(&mut self.store, &plan, self.unlock_mode);
        self.resync();
        Ok(executed?)
    }

    /// Publishes `chapter_ids` sequentially and notifies a summary.
    pub fn batch_publish<P>(
        &mut self,
        chapter_ids: &[ChapterId],
        on_progress: P,
    ) -> WorkflowResult<BatchPublishReport>
    where
        P: FnMut(BatchProgress),
    {
        self.batch_publish_with(BatchPublisher::new(), chapter_ids, on_progress)
    }

    /// Same as `batch_publish`, stopping before the next chapter once `cancel` is raised.
    pub fn batch_publish_cancellable<P>(
        &mut self,
        chapter_ids: &[ChapterId],
        cancel: CancelFlag,
        on_progress: P,
    ) -> WorkflowResult<BatchPublishReport>
    where
        P: FnMut(BatchProgress),
    {
        self.batch_publish_with(BatchPublisher::with_cancel(cancel), chapter_ids, on_progress)
    }

    fn batch_publish_with<P>(
        &mut self,
        publisher: BatchPublisher,
        chapter_ids: &[ChapterId],
        on_progress: P,
    ) -> WorkflowResult<BatchPublishReport>
    where
        P: FnMut(BatchProgress),
    {
        if chapter_ids.is_empty() {
            self.notify.warning("请至少选择一个要发布的章节");
            return Ok(BatchPublishReport::default());
        }
        let project = self.project_id();
        self.notify_failure(project)?;

        let report = publisher.publish(&mut self.store, chapter_ids, on_progress);
        self.resync();

        let mut summary = format!("成功发布 {} 个章节", report.success_count);
        if report.error_count > 0 {
            summary.push_str(&format!("，{} 个章节发布失败", report.error_count));
        }
        if report.skipped_count > 0 {
            summary.push_str(&format!("，{} 个章节未执行", report.skipped_count));
        }
        if report.error_count == 0 && report.skipped_count == 0 {
            self.notify.success(&summary);
        } else {
            self.notify.warning(&summary);
        }
        Ok(report)
    }

    /// Deletes a chapter after confirmation.
    pub fn delete_chapter(&mut self, chapter_id: ChapterId) -> WorkflowResult<String> {
        let prompt = ConfirmPrompt::new("删除章节", DELETE_PROMPT);
        if !self.confirm.confirm(&prompt) {
            return Err(WorkflowError::Cancelled);
        }

        let outcome = self.delete_chapter_inner(chapter_id);
        let message = self.notify_failure(outcome)?;
        self.notify.success("章节删除成功");
        Ok(message)
    }

    fn delete_chapter_inner(&mut self, chapter_id: ChapterId) -> WorkflowResult<String> {
        let message = self.store.delete(chapter_id)?;
        if self.store.current().is_none() {
            if let Some(project_id) = self.store.project_id() {
                let next = default_chapter(project_id, self.store.chapters());
                self.enter(next)?;
            }
        }
        Ok(message)
    }

    /// Server-side unpublished listing, flagged against the current chapter.
    pub fn unpublished_chapters(&mut self) -> WorkflowResult<Vec<UnpublishedChapter>> {
        let outcome = self.project_id().and_then(|project_id| {
            let current_id = self.store.current().and_then(|chapter| chapter.id);
            Ok(self.store.list_unpublished(project_id, current_id)?)
        });
        self.notify_failure(outcome)
    }

    fn materialize(&mut self, placeholder: &Chapter, draft: &ChapterDraft) -> WorkflowResult<Chapter> {
        let project_id = self.project_id()?;
        let body = plan_materialize(self.store.chapters(), placeholder, draft)?;
        let created = self.store.create(project_id, &body)?;
        self.select(created.clone());
        Ok(created)
    }

    /// Reloads and re-selects; on failure falls back to the cached list.
    fn resync(&mut self) {
        let Err(err) = self.reload_and_reselect() else {
            return;
        };
        warn!("event=chapter_resync module=service status=error error={err}");
        self.notify.warning(&format!("章节列表刷新失败：{err}"));
        if let Ok(project_id) = self.project_id() {
            let next = default_chapter(project_id, self.store.chapters());
            self.select(next);
        }
    }

    fn reload_and_reselect(&mut self) -> WorkflowResult<Chapter> {
        let project_id = self.project_id()?;
        self.store.load_all(project_id)?;
        let next = default_chapter(project_id, self.store.chapters());
        self.enter(next)
    }

    /// Fetches fresh content for a saved chapter and makes it current.
    fn enter(&mut self, chapter: Chapter) -> WorkflowResult<Chapter> {
        let chapter = match chapter.id {
            Some(chapter_id) => self.store.load_one(chapter_id)?,
            None => chapter,
        };
        self.select(chapter.clone());
        Ok(chapter)
    }

    fn select(&mut self, chapter: Chapter) {
        if let Some(chapter_id) = chapter.id {
            self.store
                .session_mut()
                .remember_chapter(chapter.project_id, chapter_id);
        }
        self.store.set_current(Some(chapter));
    }

    fn project_id(&self) -> WorkflowResult<ProjectId> {
        self.store.project_id().ok_or(WorkflowError::NoProject)
    }

    fn current_chapter(&self) -> WorkflowResult<Chapter> {
        self.store
            .current()
            .cloned()
            .ok_or(WorkflowError::NoCurrentChapter)
    }

    fn notify_failure<T>(&mut self, outcome: WorkflowResult<T>) -> WorkflowResult<T> {
        if let Err(err) = &outcome {
            self.notify.error(&err.to_string());
        }
        outcome
    }
}
