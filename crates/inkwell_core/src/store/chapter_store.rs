//! Client-side chapter cache for one open project.
//!
//! # Responsibility
//! - Own the in-memory chapter set and the current-chapter selection.
//! - Issue chapter REST calls and fold their results into the cache.
//!
//! # Invariants
//! - The cache is kept sorted by `chapter_number`, then id.
//! - `load_all` replaces the cache atomically; a failed load keeps the old one.
//! - Cache writes happen only after the server answered successfully.
//! - No retries. Concurrent writes to one chapter: last response wins.

use crate::api::{ApiError, ChapterApi};
use crate::model::chapter::{
    BatchStatusRequest, Chapter, ChapterId, ChapterPatch, ChapterStatus, NewChapter, ProjectId,
    UnpublishedChapter,
};
use crate::session::Session;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Chapter store failures, one variant per operation family.
///
/// `Display` renders the human-readable message only, so it can be shown
/// to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    Fetch { message: String, source: ApiError },
    /// `chapter_id` is `None` for project-wide status updates.
    Save {
        chapter_id: Option<ChapterId>,
        message: String,
        source: ApiError,
    },
    Create { message: String, source: ApiError },
    Delete {
        chapter_id: ChapterId,
        message: String,
        source: ApiError,
    },
    /// Operation needs `load_all` to have succeeded first.
    NotLoaded,
    /// Chapter id is not in the loaded set.
    UnknownChapter(ChapterId),
}

impl StoreError {
    fn fetch(source: ApiError) -> Self {
        Self::Fetch {
            message: source.message().to_string(),
            source,
        }
    }

    fn save(chapter_id: Option<ChapterId>, source: ApiError) -> Self {
        Self::Save {
            chapter_id,
            message: source.message().to_string(),
            source,
        }
    }

    /// Underlying API failure, when the error came from the server side.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Fetch { source, .. }
            | Self::Save { source, .. }
            | Self::Create { source, .. }
            | Self::Delete { source, .. } => Some(source),
            Self::NotLoaded | Self::UnknownChapter(_) => None,
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch { message, .. }
            | Self::Save { message, .. }
            | Self::Create { message, .. }
            | Self::Delete { message, .. } => f.write_str(message),
            Self::NotLoaded => write!(f, "尚未加载项目章节"),
            Self::UnknownChapter(id) => write!(f, "章节不存在: {id}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.api_error().map(|err| err as &(dyn Error + 'static))
    }
}

/// In-memory view of one project's chapters, backed by a `ChapterApi`.
pub struct ChapterStore<A: ChapterApi> {
    api: A,
    session: Session,
    project_id: Option<ProjectId>,
    chapters: Vec<Chapter>,
    current: Option<Chapter>,
}

impl<A: ChapterApi> ChapterStore<A> {
    /// Creates an empty store; nothing is fetched until `load_all`.
    pub fn new(api: A, session: Session) -> Self {
        Self {
            api,
            session,
            project_id: None,
            chapters: Vec::new(),
            current: None,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn project_id(&self) -> Option<ProjectId> {
        self.project_id
    }

    /// Cached chapters in chapter order.
    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn get(&self, chapter_id: ChapterId) -> Option<&Chapter> {
        self.chapters
            .iter()
            .find(|chapter| chapter.id == Some(chapter_id))
    }

    pub fn find_by_number(&self, chapter_number: i64) -> Option<&Chapter> {
        self.chapters
            .iter()
            .find(|chapter| chapter.chapter_number == chapter_number)
    }

    /// Chapter open in the editor; may be an unsaved placeholder.
    pub fn current(&self) -> Option<&Chapter> {
        self.current.as_ref()
    }

    pub fn set_current(&mut self, chapter: Option<Chapter>) {
        self.current = chapter;
    }

    /// Fetches the full chapter set and replaces the cache.
    pub fn load_all(&mut self, project_id: ProjectId) -> StoreResult<&[Chapter]> {
        let mut chapters = self
            .api
            .list_chapters(&self.session, project_id)
            .map_err(|err| {
                error!(
                    "event=chapters_load module=store status=error project_id={project_id} error={err}"
                );
                StoreError::fetch(err)
            })?;
        sort_chapters(&mut chapters);

        if self.project_id != Some(project_id) {
            self.current = None;
        }
        self.project_id = Some(project_id);
        self.chapters = chapters;
        self.refresh_current();

        info!(
            "event=chapters_load module=store status=ok project_id={project_id} count={}",
            self.chapters.len()
        );
        Ok(&self.chapters)
    }

    /// Fetches one chapter with full content and folds it into the cache.
    pub fn load_one(&mut self, chapter_id: ChapterId) -> StoreResult<Chapter> {
        let chapter = self
            .api
            .get_chapter(&self.session, chapter_id)
            .map_err(|err| {
                error!(
                    "event=chapter_load module=store status=error chapter_id={chapter_id} error={err}"
                );
                StoreError::fetch(err)
            })?;
        self.upsert(chapter.clone());
        Ok(chapter)
    }

    /// Sends a partial update; the server's representation replaces the cache entry.
    pub fn save(&mut self, chapter_id: ChapterId, patch: &ChapterPatch) -> StoreResult<Chapter> {
        let chapter = self
            .api
            .update_chapter(&self.session, chapter_id, patch)
            .map_err(|err| {
                error!(
                    "event=chapter_save module=store status=error chapter_id={chapter_id} error={err}"
                );
                StoreError::save(Some(chapter_id), err)
            })?;
        info!(
            "event=chapter_save module=store status=ok chapter_id={chapter_id} chapter_status={}",
            chapter.status
        );
        self.upsert(chapter.clone());
        Ok(chapter)
    }

    pub fn publish(&mut self, chapter_id: ChapterId) -> StoreResult<Chapter> {
        self.save(chapter_id, &ChapterPatch::status(ChapterStatus::Published))
    }

    pub fn unpublish(&mut self, chapter_id: ChapterId) -> StoreResult<Chapter> {
        self.save(chapter_id, &ChapterPatch::status(ChapterStatus::Draft))
    }

    /// Allocates a chapter on the server and appends it to the cache.
    pub fn create(&mut self, project_id: ProjectId, chapter: &NewChapter) -> StoreResult<Chapter> {
        let created = self
            .api
            .create_chapter(&self.session, project_id, chapter)
            .map_err(|err| {
                error!(
                    "event=chapter_create module=store status=error project_id={project_id} error={err}"
                );
                StoreError::Create {
                    message: err.message().to_string(),
                    source: err,
                }
            })?;
        info!(
            "event=chapter_create module=store status=ok project_id={project_id} chapter_number={}",
            created.chapter_number
        );
        if self.project_id.is_none() || self.project_id == Some(project_id) {
            self.project_id = Some(project_id);
            self.upsert(created.clone());
        }
        Ok(created)
    }

    /// Deletes a chapter; the cache changes only after the server confirms.
    pub fn delete(&mut self, chapter_id: ChapterId) -> StoreResult<String> {
        let message = self
            .api
            .delete_chapter(&self.session, chapter_id)
            .map_err(|err| {
                error!(
                    "event=chapter_delete module=store status=error chapter_id={chapter_id} error={err}"
                );
                StoreError::Delete {
                    chapter_id,
                    message: err.message().to_string(),
                    source: err,
                }
            })?;

        self.chapters
            .retain(|chapter| chapter.id != Some(chapter_id));
        if self.current.as_ref().and_then(|chapter| chapter.id) == Some(chapter_id) {
            self.current = None;
        }
        if let Some(project_id) = self.project_id {
            self.session.forget_chapter(project_id, chapter_id);
        }
        info!("event=chapter_delete module=store status=ok chapter_id={chapter_id}");
        Ok(message)
    }

    /// Moves every chapter numbered `>= from_number` to `status` in one call.
    ///
    /// Returns the ids whose cached status changed.
    pub fn update_status_from(
        &mut self,
        project_id: ProjectId,
        from_number: i64,
        status: ChapterStatus,
    ) -> StoreResult<Vec<ChapterId>> {
        let request = BatchStatusRequest {
            project_id,
            from_chapter_number: from_number,
            new_status: status,
        };
        self.api
            .batch_update_status(&self.session, &request)
            .map_err(|err| {
                error!(
                    "event=chapter_batch_status module=store status=error project_id={project_id} from_number={from_number} error={err}"
                );
                StoreError::save(None, err)
            })?;

        let mut changed = Vec::new();
        if self.project_id == Some(project_id) {
            for chapter in &mut self.chapters {
                if chapter.chapter_number >= from_number && chapter.status != status {
                    chapter.status = status;
                    if let Some(id) = chapter.id {
                        changed.push(id);
                    }
                }
            }
            self.refresh_current();
        }
        info!(
            "event=chapter_batch_status module=store status=ok project_id={project_id} from_number={from_number} changed={}",
            changed.len()
        );
        Ok(changed)
    }

    /// Server-side unpublished listing, flagged against `current_chapter_id`.
    pub fn list_unpublished(
        &self,
        project_id: ProjectId,
        current_chapter_id: Option<ChapterId>,
    ) -> StoreResult<Vec<UnpublishedChapter>> {
        self.api
            .list_unpublished(&self.session, project_id, current_chapter_id)
            .map_err(StoreError::fetch)
    }

    fn upsert(&mut self, chapter: Chapter) {
        match self
            .chapters
            .iter_mut()
            .find(|cached| cached.id.is_some() && cached.id == chapter.id)
        {
            Some(cached) => *cached = chapter.clone(),
            None => self.chapters.push(chapter.clone()),
        }
        sort_chapters(&mut self.chapters);

        if let Some(current) = &mut self.current {
            if current.id.is_some() && current.id == chapter.id {
                *current = chapter;
            }
        }
    }

    /// Re-points `current` at the freshly cached copy of the same chapter.
    fn refresh_current(&mut self) {
        let Some(current_id) = self.current.as_ref().and_then(|chapter| chapter.id) else {
            return;
        };
        self.current = self.get(current_id).cloned();
    }
}

fn sort_chapters(chapters: &mut [Chapter]) {
    chapters.sort_by_key(|chapter| (chapter.chapter_number, chapter.id));
}
