//! Explicit client session passed into the chapter store.
//!
//! # Responsibility
//! - Carry the bearer token used on every REST call.
//! - Remember the last opened chapter per project.
//!
//! # Invariants
//! - A stored token is never blank; blank input clears it.
//! - The session is a plain value; persistence lives in `session::repo`.

pub mod repo;

use crate::model::chapter::{ChapterId, ProjectId};
use std::collections::BTreeMap;

/// Token plus per-project chapter memory for one signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
    last_chapters: BTreeMap<ProjectId, ChapterId>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let mut session = Self::default();
        session.set_token(Some(token.into()));
        session
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Replaces the token; `None` or blank input signs the session out.
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
    }

    /// `Authorization` header value, or `None` when signed out.
    pub fn bearer(&self) -> Option<String> {
        self.token.as_ref().map(|token| format!("Bearer {token}"))
    }

    pub fn remember_chapter(&mut self, project_id: ProjectId, chapter_id: ChapterId) {
        self.last_chapters.insert(project_id, chapter_id);
    }

    pub fn last_chapter(&self, project_id: ProjectId) -> Option<ChapterId> {
        self.last_chapters.get(&project_id).copied()
    }

    /// Drops the remembered chapter when it is the given one.
    pub fn forget_chapter(&mut self, project_id: ProjectId, chapter_id: ChapterId) {
        if self.last_chapter(project_id) == Some(chapter_id) {
            self.last_chapters.remove(&project_id);
        }
    }

    pub fn last_chapters(&self) -> impl Iterator<Item = (ProjectId, ChapterId)> + '_ {
        self.last_chapters
            .iter()
            .map(|(project_id, chapter_id)| (*project_id, *chapter_id))
    }
}
