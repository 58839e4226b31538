//! Chapter domain model.
//!
//! # Responsibility
//! - Define the canonical chapter record shared by store, engine and driver.
//! - Define the request shapes sent to the chapter REST endpoints.
//! - Decode server payloads leniently on optional fields and strictly on
//!   the fields the lifecycle depends on.
//!
//! # Invariants
//! - `id` is `None` only for placeholders that were never saved.
//! - `chapter_number` is positive and orders chapters within a project.
//! - `title` is never blank after `Chapter::validate()`.
//!
//! # See also
//! - docs/architecture/chapter-lifecycle.md

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::num::ParseIntError;
use std::str::FromStr;

/// Server-assigned chapter identity, opaque to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChapterId(pub i64);

/// Server-assigned project identity, opaque to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub i64);

impl Display for ChapterId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0.to_string())
    }
}

impl Display for ProjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChapterId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl FromStr for ProjectId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Publication state of one chapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterStatus {
    /// Editable by the author, not visible to readers.
    #[default]
    Draft,
    /// Frozen and visible to readers until unlocked.
    Published,
}

impl ChapterStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }
}

impl Display for ChapterStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Validation failures for chapter invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChapterValidationError {
    BlankTitle,
    NonPositiveNumber(i64),
}

impl Display for ChapterValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle => write!(f, "chapter title must not be blank"),
            Self::NonPositiveNumber(value) => {
                write!(f, "chapter number must be positive, got {value}")
            }
        }
    }
}

impl Error for ChapterValidationError {}

/// Canonical chapter record as cached by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    /// Absent on placeholders that only materialize on first save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ChapterId>,
    pub project_id: ProjectId,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default)]
    pub outline: Option<String>,
    /// Serialized as `order_index` to match the server schema.
    #[serde(rename = "order_index", alias = "chapter_number")]
    pub chapter_number: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: ChapterStatus,
    /// Server-derived; the client never recomputes it for saved chapters.
    #[serde(default, deserialize_with = "null_as_default")]
    pub word_count: u64,
    #[serde(default, with = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Chapter {
    /// Builds a transient `draft` chapter that has no server identity yet.
    pub fn placeholder(
        project_id: ProjectId,
        chapter_number: i64,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            project_id,
            title: title.into(),
            content: String::new(),
            outline: None,
            chapter_number,
            status: ChapterStatus::Draft,
            word_count: 0,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.id.is_none()
    }

    pub fn is_published(&self) -> bool {
        self.status == ChapterStatus::Published
    }

    pub fn is_draft(&self) -> bool {
        self.status == ChapterStatus::Draft
    }

    /// Checks the invariants every cached chapter must satisfy.
    pub fn validate(&self) -> Result<(), ChapterValidationError> {
        if self.title.trim().is_empty() {
            return Err(ChapterValidationError::BlankTitle);
        }
        if self.chapter_number < 1 {
            return Err(ChapterValidationError::NonPositiveNumber(
                self.chapter_number,
            ));
        }
        Ok(())
    }
}

/// Editor-side working copy of one chapter's editable fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChapterDraft {
    pub title: String,
    pub content: String,
    pub outline: Option<String>,
}

impl ChapterDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            outline: None,
        }
    }

    pub fn with_outline(mut self, outline: impl Into<String>) -> Self {
        self.outline = Some(outline.into());
        self
    }

    /// Seeds a working copy from the chapter currently on screen.
    pub fn from_chapter(chapter: &Chapter) -> Self {
        Self {
            title: chapter.title.clone(),
            content: chapter.content.clone(),
            outline: chapter.outline.clone(),
        }
    }
}

/// Partial update body for `PUT /api/chapters/{id}`.
///
/// Only fields that are set are serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChapterPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outline: Option<String>,
    #[serde(rename = "order_index", skip_serializing_if = "Option::is_none")]
    pub chapter_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ChapterStatus>,
}

impl ChapterPatch {
    /// Patch that only moves the chapter to `status`.
    pub fn status(status: ChapterStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Patch that writes the editor's fields back, leaving status alone.
    pub fn from_draft(draft: &ChapterDraft) -> Self {
        Self {
            title: Some(draft.title.trim().to_string()),
            content: Some(draft.content.clone()),
            outline: Some(draft.outline.clone().unwrap_or_default()),
            chapter_number: None,
            status: None,
        }
    }

    pub fn with_status(mut self, status: ChapterStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Returns true when the patch carries nothing but a status change.
    pub fn is_status_only(&self) -> bool {
        self.status.is_some()
            && self.title.is_none()
            && self.content.is_none()
            && self.outline.is_none()
            && self.chapter_number.is_none()
    }
}

/// Create body for `POST /api/projects/{id}/chapters`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewChapter {
    pub title: String,
    pub content: String,
    pub outline: String,
    pub status: ChapterStatus,
    #[serde(rename = "order_index")]
    pub chapter_number: i64,
}

/// Body for `POST /api/chapters/batch_update_status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchStatusRequest {
    pub project_id: ProjectId,
    #[serde(rename = "from_order_index")]
    pub from_chapter_number: i64,
    pub new_status: ChapterStatus,
}

/// One row of the server-side unpublished listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UnpublishedChapter {
    pub id: ChapterId,
    pub title: String,
    #[serde(rename = "order_index", alias = "chapter_number")]
    pub chapter_number: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub word_count: u64,
    /// Set by the server on the row matching `current_chapter_id`.
    #[serde(default)]
    pub is_current: bool,
}

/// Estimates word count the way the server computes it (one per character).
///
/// Display-only; saved chapters keep the server's value.
pub fn estimate_word_count(content: &str) -> u64 {
    content.chars().count() as u64
}

/// Parses server timestamps with or without a UTC offset.
///
/// Naive timestamps are interpreted as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

mod timestamp {
    use super::parse_timestamp;
    use chrono::{DateTime, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(at) => serializer.serialize_some(&at.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse_timestamp(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid timestamp `{raw}`"))),
            None => Ok(None),
        }
    }
}
