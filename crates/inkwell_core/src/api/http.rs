//! HTTPS implementation of `ChapterApi` on a blocking reqwest client.
//!
//! # Responsibility
//! - Map each chapter operation to its method, path and body.
//! - Turn non-2xx bodies into user-visible error text.
//! - Validate decoded chapters before they reach the store.
//!
//! # Invariants
//! - The `Authorization` header is sent only when the session has a token.
//! - Every request carries a fresh `X-Request-Id`, logged with the outcome.
//! - Chapter content and tokens are never logged.

use super::{ApiError, ApiResult, ChapterApi};
use crate::config::ClientConfig;
use crate::model::chapter::{
    BatchStatusRequest, Chapter, ChapterId, ChapterPatch, ChapterStatus, NewChapter, ProjectId,
    UnpublishedChapter,
};
use crate::session::Session;
use log::{debug, info, warn};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};
use uuid::Uuid;

const REQUEST_ID_HEADER: &str = "X-Request-Id";
const MAX_RAW_ERROR_CHARS: usize = 200;

/// One logical chapter call; drives log event names and fallback text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    List,
    Get,
    Create,
    Update,
    Publish,
    Unpublish,
    Delete,
    BatchStatus,
    ListUnpublished,
}

impl Operation {
    fn event(self) -> &'static str {
        match self {
            Self::List => "chapter_list",
            Self::Get => "chapter_get",
            Self::Create => "chapter_create",
            Self::Update => "chapter_update",
            Self::Publish => "chapter_publish",
            Self::Unpublish => "chapter_unpublish",
            Self::Delete => "chapter_delete",
            Self::BatchStatus => "chapter_batch_status",
            Self::ListUnpublished => "chapter_list_unpublished",
        }
    }

    fn fallback_message(self) -> &'static str {
        match self {
            Self::List => "获取章节列表失败",
            Self::Get => "获取章节详情失败",
            Self::Create => "创建章节失败",
            Self::Update => "更新章节失败",
            Self::Publish => "发布章节失败",
            Self::Unpublish => "取消发布章节失败",
            Self::Delete => "删除章节失败",
            Self::BatchStatus => "批量更新章节状态失败",
            Self::ListUnpublished => "获取未发布章节失败",
        }
    }

    /// Status-only patches are publish/unpublish calls from the caller's view.
    fn for_patch(patch: &ChapterPatch) -> Self {
        match (patch.is_status_only(), patch.status) {
            (true, Some(ChapterStatus::Published)) => Self::Publish,
            (true, Some(ChapterStatus::Draft)) => Self::Unpublish,
            _ => Self::Update,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct UnpublishedEnvelope {
    #[serde(default)]
    chapters: Vec<UnpublishedChapter>,
}

/// Chapter REST client bound to one API base URL.
pub struct HttpChapterApi {
    client: Client,
    base_url: String,
}

impl HttpChapterApi {
    /// Builds the client from validated configuration.
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        config
            .validate()
            .map_err(|err| ApiError::Config(err.to_string()))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("inkwell/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| ApiError::Config(err.to_string()))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
    }

    /// Sends one request and returns the body of a 2xx response.
    fn execute(
        &self,
        session: &Session,
        builder: RequestBuilder,
        operation: Operation,
    ) -> ApiResult<String> {
        let request_id = Uuid::new_v4();
        let started_at = Instant::now();
        let event = operation.event();
        debug!("event={event} module=api status=start request_id={request_id}");

        let mut builder = builder
            .header(ACCEPT, "application/json")
            .header(REQUEST_ID_HEADER, request_id.to_string());
        if let Some(bearer) = session.bearer() {
            builder = builder.header(AUTHORIZATION, bearer);
        }

        let response = builder.send().map_err(|err| {
            warn!(
                "event={event} module=api status=error request_id={request_id} duration_ms={} error_code=transport timeout={}",
                started_at.elapsed().as_millis(),
                err.is_timeout()
            );
            ApiError::Transport(format!("{}: {err}", operation.fallback_message()))
        })?;

        let status = response.status();
        let body = response.text().map_err(|err| {
            ApiError::Transport(format!("{}: {err}", operation.fallback_message()))
        })?;

        if !status.is_success() {
            warn!(
                "event={event} module=api status=error request_id={request_id} duration_ms={} http_status={}",
                started_at.elapsed().as_millis(),
                status.as_u16()
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message_from_body(&body, operation.fallback_message()),
            });
        }

        info!(
            "event={event} module=api status=ok request_id={request_id} duration_ms={} http_status={}",
            started_at.elapsed().as_millis(),
            status.as_u16()
        );
        Ok(body)
    }

    fn fetch_chapter(
        &self,
        session: &Session,
        builder: RequestBuilder,
        operation: Operation,
    ) -> ApiResult<Chapter> {
        let body = self.execute(session, builder, operation)?;
        checked_chapter(decode(&body, operation)?, operation)
    }
}

impl ChapterApi for HttpChapterApi {
    fn list_chapters(&self, session: &Session, project_id: ProjectId) -> ApiResult<Vec<Chapter>> {
        let operation = Operation::List;
        let builder = self.request(Method::GET, &format!("/api/projects/{project_id}/chapters"));
        let body = self.execute(session, builder, operation)?;
        decode::<Vec<Chapter>>(&body, operation)?
            .into_iter()
            .map(|chapter| checked_chapter(chapter, operation))
            .collect()
    }

    fn get_chapter(&self, session: &Session, chapter_id: ChapterId) -> ApiResult<Chapter> {
        let builder = self.request(Method::GET, &format!("/api/chapters/{chapter_id}"));
        self.fetch_chapter(session, builder, Operation::Get)
    }

    fn create_chapter(
        &self,
        session: &Session,
        project_id: ProjectId,
        chapter: &NewChapter,
    ) -> ApiResult<Chapter> {
        let builder = self
            .request(Method::POST, &format!("/api/projects/{project_id}/chapters"))
            .json(chapter);
        self.fetch_chapter(session, builder, Operation::Create)
    }

    fn update_chapter(
        &self,
        session: &Session,
        chapter_id: ChapterId,
        patch: &ChapterPatch,
    ) -> ApiResult<Chapter> {
        let builder = self
            .request(Method::PUT, &format!("/api/chapters/{chapter_id}"))
            .json(patch);
        self.fetch_chapter(session, builder, Operation::for_patch(patch))
    }

    fn delete_chapter(&self, session: &Session, chapter_id: ChapterId) -> ApiResult<String> {
        let operation = Operation::Delete;
        let builder = self.request(Method::DELETE, &format!("/api/chapters/{chapter_id}"));
        let body = self.execute(session, builder, operation)?;
        Ok(decode::<MessageResponse>(&body, operation)?.message)
    }

    fn batch_update_status(
        &self,
        session: &Session,
        request: &BatchStatusRequest,
    ) -> ApiResult<()> {
        let builder = self
            .request(Method::POST, "/api/chapters/batch_update_status")
            .json(request);
        self.execute(session, builder, Operation::BatchStatus)?;
        Ok(())
    }

    fn list_unpublished(
        &self,
        session: &Session,
        project_id: ProjectId,
        current_chapter_id: Option<ChapterId>,
    ) -> ApiResult<Vec<UnpublishedChapter>> {
        let operation = Operation::ListUnpublished;
        let mut builder = self.request(
            Method::GET,
            &format!("/api/projects/{project_id}/chapters/unpublished"),
        );
        if let Some(current) = current_chapter_id {
            builder = builder.query(&[("current_chapter_id", current.0)]);
        }
        let body = self.execute(session, builder, operation)?;
        Ok(decode::<UnpublishedEnvelope>(&body, operation)?.chapters)
    }
}

fn decode<T: DeserializeOwned>(body: &str, operation: Operation) -> ApiResult<T> {
    serde_json::from_str(body)
        .map_err(|err| ApiError::InvalidResponse(format!("{}: {err}", operation.event())))
}

fn checked_chapter(chapter: Chapter, operation: Operation) -> ApiResult<Chapter> {
    chapter.validate().map_err(|err| {
        ApiError::InvalidResponse(format!(
            "{}: chapter {}: {err}",
            operation.event(),
            chapter
                .id
                .map_or_else(|| "<unsaved>".to_string(), |id| id.to_string())
        ))
    })?;
    Ok(chapter)
}

/// Extracts user-visible text from a non-2xx body.
///
/// Order: JSON `detail` (string, or first `msg` of a validation array),
/// JSON `message`, raw non-JSON text, then `fallback`.
pub(crate) fn error_message_from_body(body: &str, fallback: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return fallback.to_string();
    }

    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(value) => detail_text(&value).unwrap_or_else(|| fallback.to_string()),
        Err(_) => {
            let mut text: String = trimmed.chars().take(MAX_RAW_ERROR_CHARS).collect();
            if trimmed.chars().count() > MAX_RAW_ERROR_CHARS {
                text.push_str("...");
            }
            text
        }
    }
}

fn detail_text(value: &serde_json::Value) -> Option<String> {
    fn non_blank(text: &str) -> Option<String> {
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    match value.get("detail") {
        Some(serde_json::Value::String(text)) => {
            if let Some(text) = non_blank(text.as_str()) {
                return Some(text);
            }
        }
        Some(serde_json::Value::Array(items)) => {
            if let Some(text) = items
                .iter()
                .find_map(|item| item.get("msg").and_then(|msg| msg.as_str()))
                .and_then(non_blank)
            {
                return Some(text);
            }
        }
        _ => {}
    }

    value
        .get("message")
        .and_then(|message| message.as_str())
        .and_then(non_blank)
}
