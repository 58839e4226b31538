#![allow(dead_code)]

use inkwell_core::api::ApiResult;
use inkwell_core::model::chapter::{estimate_word_count, BatchStatusRequest};
use inkwell_core::{
    ApiError, Chapter, ChapterApi, ChapterId, ChapterPatch, ChapterStatus, Confirm, ConfirmPrompt,
    NewChapter, Notify, ProjectId, Session, UnpublishedChapter,
};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

pub const PROJECT: ProjectId = ProjectId(1);

pub use inkwell_core::ChapterStatus::{Draft as D, Published as P};

/// One call received by the fake, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(ProjectId),
    Get(ChapterId),
    Create(ProjectId, NewChapter),
    Update(ChapterId, ChapterPatch),
    Delete(ChapterId),
    BatchStatus(BatchStatusRequest),
    Unpublished(ProjectId, Option<ChapterId>),
}

#[derive(Default)]
struct FakeState {
    chapters: Vec<Chapter>,
    next_id: i64,
    calls: Vec<Call>,
    tokens: Vec<Option<String>>,
    list_failure: Option<ApiError>,
    create_failure: Option<ApiError>,
    batch_failure: Option<ApiError>,
    update_failures: HashMap<ChapterId, ApiError>,
    delete_failures: HashMap<ChapterId, ApiError>,
}

/// In-memory chapter server with failure injection and a call log.
pub struct FakeChapterApi {
    state: RefCell<FakeState>,
}

impl FakeChapterApi {
    /// Seeds chapters as `(id, chapter_number, status)`.
    pub fn with_chapters(seed: &[(i64, i64, ChapterStatus)]) -> Self {
        let chapters: Vec<Chapter> = seed
            .iter()
            .map(|(id, number, status)| chapter(*id, *number, *status))
            .collect();
        let next_id = seed.iter().map(|(id, _, _)| *id).max().unwrap_or(0) + 1;
        Self {
            state: RefCell::new(FakeState {
                chapters,
                next_id,
                ..FakeState::default()
            }),
        }
    }

    pub fn empty() -> Self {
        Self::with_chapters(&[])
    }

    pub fn fail_list(&self, err: ApiError) {
        self.state.borrow_mut().list_failure = Some(err);
    }

    pub fn clear_list_failure(&self) {
        self.state.borrow_mut().list_failure = None;
    }

    pub fn fail_create(&self, err: ApiError) {
        self.state.borrow_mut().create_failure = Some(err);
    }

    pub fn fail_batch(&self, err: ApiError) {
        self.state.borrow_mut().batch_failure = Some(err);
    }

    pub fn fail_update(&self, chapter_id: i64, err: ApiError) {
        self.state
            .borrow_mut()
            .update_failures
            .insert(ChapterId(chapter_id), err);
    }

    pub fn clear_update_failure(&self, chapter_id: i64) {
        self.state
            .borrow_mut()
            .update_failures
            .remove(&ChapterId(chapter_id));
    }

    pub fn fail_delete(&self, chapter_id: i64, err: ApiError) {
        self.state
            .borrow_mut()
            .delete_failures
            .insert(ChapterId(chapter_id), err);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    /// Ids of chapters updated, in request order.
    pub fn updated_ids(&self) -> Vec<ChapterId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Update(id, _) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn tokens(&self) -> Vec<Option<String>> {
        self.state.borrow().tokens.clone()
    }

    /// Server-side `(chapter_number, status)` pairs in chapter order.
    pub fn statuses(&self) -> Vec<(i64, ChapterStatus)> {
        let mut pairs: Vec<(i64, ChapterStatus)> = self
            .state
            .borrow()
            .chapters
            .iter()
            .map(|chapter| (chapter.chapter_number, chapter.status))
            .collect();
        pairs.sort_by_key(|(number, _)| *number);
        pairs
    }

    pub fn server_chapter(&self, chapter_id: i64) -> Option<Chapter> {
        self.state
            .borrow()
            .chapters
            .iter()
            .find(|chapter| chapter.id == Some(ChapterId(chapter_id)))
            .cloned()
    }

    pub fn set_content(&self, chapter_id: i64, content: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(chapter) = state
            .chapters
            .iter_mut()
            .find(|chapter| chapter.id == Some(ChapterId(chapter_id)))
        {
            chapter.content = content.to_string();
            chapter.word_count = estimate_word_count(content);
        }
    }

    fn record(&self, session: &Session, call: Call) {
        let mut state = self.state.borrow_mut();
        state.tokens.push(session.token().map(str::to_string));
        state.calls.push(call);
    }

    fn not_found(chapter_id: ChapterId) -> ApiError {
        ApiError::Status {
            status: 404,
            message: format!("Chapter {chapter_id} not found"),
        }
    }
}

impl ChapterApi for FakeChapterApi {
    fn list_chapters(&self, session: &Session, project_id: ProjectId) -> ApiResult<Vec<Chapter>> {
        self.record(session, Call::List(project_id));
        let state = self.state.borrow();
        if let Some(err) = &state.list_failure {
            return Err(err.clone());
        }
        Ok(state
            .chapters
            .iter()
            .filter(|chapter| chapter.project_id == project_id)
            .cloned()
            .collect())
    }

    fn get_chapter(&self, session: &Session, chapter_id: ChapterId) -> ApiResult<Chapter> {
        self.record(session, Call::Get(chapter_id));
        self.state
            .borrow()
            .chapters
            .iter()
            .find(|chapter| chapter.id == Some(chapter_id))
            .cloned()
            .ok_or_else(|| Self::not_found(chapter_id))
    }

    fn create_chapter(
        &self,
        session: &Session,
        project_id: ProjectId,
        new_chapter: &NewChapter,
    ) -> ApiResult<Chapter> {
        self.record(session, Call::Create(project_id, new_chapter.clone()));
        let mut state = self.state.borrow_mut();
        if let Some(err) = &state.create_failure {
            return Err(err.clone());
        }
        let id = state.next_id;
        state.next_id += 1;

        let mut created = chapter(id, new_chapter.chapter_number, new_chapter.status);
        created.project_id = project_id;
        created.title = new_chapter.title.clone();
        created.content = new_chapter.content.clone();
        created.outline = Some(new_chapter.outline.clone());
        created.word_count = estimate_word_count(&new_chapter.content);
        state.chapters.push(created.clone());
        Ok(created)
    }

    fn update_chapter(
        &self,
        session: &Session,
        chapter_id: ChapterId,
        patch: &ChapterPatch,
    ) -> ApiResult<Chapter> {
        self.record(session, Call::Update(chapter_id, patch.clone()));
        let mut state = self.state.borrow_mut();
        if let Some(err) = state.update_failures.get(&chapter_id) {
            return Err(err.clone());
        }
        let chapter = state
            .chapters
            .iter_mut()
            .find(|chapter| chapter.id == Some(chapter_id))
            .ok_or_else(|| Self::not_found(chapter_id))?;

        if let Some(title) = &patch.title {
            chapter.title = title.clone();
        }
        if let Some(content) = &patch.content {
            chapter.content = content.clone();
            chapter.word_count = estimate_word_count(content);
        }
        if let Some(outline) = &patch.outline {
            chapter.outline = Some(outline.clone());
        }
        if let Some(number) = patch.chapter_number {
            chapter.chapter_number = number;
        }
        if let Some(status) = patch.status {
            chapter.status = status;
        }
        Ok(chapter.clone())
    }

    fn delete_chapter(&self, session: &Session, chapter_id: ChapterId) -> ApiResult<String> {
        self.record(session, Call::Delete(chapter_id));
        let mut state = self.state.borrow_mut();
        if let Some(err) = state.delete_failures.get(&chapter_id) {
            return Err(err.clone());
        }
        let before = state.chapters.len();
        state.chapters.retain(|chapter| chapter.id != Some(chapter_id));
        if state.chapters.len() == before {
            return Err(Self::not_found(chapter_id));
        }
        Ok("Chapter deleted successfully".to_string())
    }

    fn batch_update_status(
        &self,
        session: &Session,
        request: &BatchStatusRequest,
    ) -> ApiResult<()> {
        self.record(session, Call::BatchStatus(request.clone()));
        let mut state = self.state.borrow_mut();
        if let Some(err) = &state.batch_failure {
            return Err(err.clone());
        }
        for chapter in &mut state.chapters {
            if chapter.project_id == request.project_id
                && chapter.chapter_number >= request.from_chapter_number
            {
                chapter.status = request.new_status;
            }
        }
        Ok(())
    }

    fn list_unpublished(
        &self,
        session: &Session,
        project_id: ProjectId,
        current_chapter_id: Option<ChapterId>,
    ) -> ApiResult<Vec<UnpublishedChapter>> {
        self.record(session, Call::Unpublished(project_id, current_chapter_id));
        let state = self.state.borrow();
        let mut drafts: Vec<&Chapter> = state
            .chapters
            .iter()
            .filter(|chapter| chapter.project_id == project_id && chapter.is_draft())
            .collect();
        drafts.sort_by_key(|chapter| chapter.chapter_number);
        Ok(drafts
            .into_iter()
            .filter_map(|chapter| {
                let id = chapter.id?;
                Some(UnpublishedChapter {
                    id,
                    title: chapter.title.clone(),
                    chapter_number: chapter.chapter_number,
                    word_count: chapter.word_count,
                    is_current: Some(id) == current_chapter_id,
                })
            })
            .collect())
    }
}

pub fn chapter(id: i64, number: i64, status: ChapterStatus) -> Chapter {
    let mut chapter = Chapter::placeholder(PROJECT, number, format!("第{number}章"));
    chapter.id = Some(ChapterId(id));
    chapter.status = status;
    chapter
}

pub fn ids(raw: &[i64]) -> Vec<ChapterId> {
    raw.iter().copied().map(ChapterId).collect()
}

pub fn server_error(message: &str) -> ApiError {
    ApiError::Status {
        status: 500,
        message: message.to_string(),
    }
}

/// Answers prompts from a script; an exhausted script declines.
#[derive(Default)]
pub struct ScriptedConfirm {
    answers: VecDeque<bool>,
    pub prompts: Vec<ConfirmPrompt>,
}

impl ScriptedConfirm {
    pub fn answering(answers: &[bool]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
            prompts: Vec::new(),
        }
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm(&mut self, prompt: &ConfirmPrompt) -> bool {
        self.prompts.push(prompt.clone());
        self.answers.pop_front().unwrap_or(false)
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub successes: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl Notify for RecordingNotifier {
    fn success(&mut self, message: &str) {
        self.successes.push(message.to_string());
    }

    fn warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    fn error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
}
