//! REST boundary for chapter endpoints.
//!
//! # Responsibility
//! - Define the chapter API contract the store depends on.
//! - Carry server error text to callers unchanged.
//!
//! # Invariants
//! - Every chapter returned by an implementation passed `Chapter::validate()`.
//! - Implementations never retry; one call is one request.
//!
//! # See also
//! - `api::http` for the HTTPS implementation.

pub mod http;

use crate::model::chapter::{
    BatchStatusRequest, Chapter, ChapterId, ChapterPatch, NewChapter, ProjectId,
    UnpublishedChapter,
};
use crate::session::Session;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use http::HttpChapterApi;

pub type ApiResult<T> = Result<T, ApiError>;

/// Failure of one REST call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Request never produced a response (DNS, TLS, timeout, reset).
    Transport(String),
    /// Non-2xx response; `message` is the server's `detail`/`message` or a fallback.
    Status { status: u16, message: String },
    /// 2xx response whose body failed decoding or validation.
    InvalidResponse(String),
    /// Client could not be built from configuration.
    Config(String),
}

impl ApiError {
    /// Human-readable text suitable for a notification.
    pub fn message(&self) -> &str {
        match self {
            Self::Transport(message)
            | Self::InvalidResponse(message)
            | Self::Config(message) => message,
            Self::Status { message, .. } => message,
        }
    }

    /// HTTP status for server-side failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "network error: {message}"),
            Self::Status { status, message } => write!(f, "server error {status}: {message}"),
            Self::InvalidResponse(message) => write!(f, "invalid server response: {message}"),
            Self::Config(message) => write!(f, "client configuration error: {message}"),
        }
    }
}

impl Error for ApiError {}

/// Chapter REST operations consumed by the chapter store.
///
/// The session is passed per call so the token is never read from ambient
/// storage.
pub trait ChapterApi {
    fn list_chapters(&self, session: &Session, project_id: ProjectId) -> ApiResult<Vec<Chapter>>;
    fn get_chapter(&self, session: &Session, chapter_id: ChapterId) -> ApiResult<Chapter>;
    fn create_chapter(
        &self,
        session: &Session,
        project_id: ProjectId,
        chapter: &NewChapter,
    ) -> ApiResult<Chapter>;
    fn update_chapter(
        &self,
        session: &Session,
        chapter_id: ChapterId,
        patch: &ChapterPatch,
    ) -> ApiResult<Chapter>;
    /// Returns the server's confirmation message.
    fn delete_chapter(&self, session: &Session, chapter_id: ChapterId) -> ApiResult<String>;
    fn batch_update_status(
        &self,
        session: &Session,
        request: &BatchStatusRequest,
    ) -> ApiResult<()>;
    fn list_unpublished(
        &self,
        session: &Session,
        project_id: ProjectId,
        current_chapter_id: Option<ChapterId>,
    ) -> ApiResult<Vec<UnpublishedChapter>>;
}

impl<T: ChapterApi + ?Sized> ChapterApi for &T {
    fn list_chapters(&self, session: &Session, project_id: ProjectId) -> ApiResult<Vec<Chapter>> {
        (**self).list_chapters(session, project_id)
    }

    fn get_chapter(&self, session: &Session, chapter_id: ChapterId) -> ApiResult<Chapter> {
        (**self).get_chapter(session, chapter_id)
    }

    fn create_chapter(
        &self,
        session: &Session,
        project_id: ProjectId,
        chapter: &NewChapter,
    ) -> ApiResult<Chapter> {
        (**self).create_chapter(session, project_id, chapter)
    }

    fn update_chapter(
        &self,
        session: &Session,
        chapter_id: ChapterId,
        patch: &ChapterPatch,
    ) -> ApiResult<Chapter> {
        (**self).update_chapter(session, chapter_id, patch)
    }

    fn delete_chapter(&self, session: &Session, chapter_id: ChapterId) -> ApiResult<String> {
        (**self).delete_chapter(session, chapter_id)
    }

    fn batch_update_status(
        &self,
        session: &Session,
        request: &BatchStatusRequest,
    ) -> ApiResult<()> {
        (**self).batch_update_status(session, request)
    }

    fn list_unpublished(
        &self,
        session: &Session,
        project_id: ProjectId,
        current_chapter_id: Option<ChapterId>,
    ) -> ApiResult<Vec<UnpublishedChapter>> {
        (**self).list_unpublished(session, project_id, current_chapter_id)
    }
}
