//! Core chapter lifecycle and batch publication logic for Inkwell.
//! This crate is the single source of truth for chapter workflow invariants.

pub mod api;
pub mod batch;
pub mod config;
pub mod db;
pub mod lifecycle;
pub mod logging;
pub mod model;
pub mod service;
pub mod session;
pub mod store;

pub use api::{ApiError, ChapterApi, HttpChapterApi};
pub use batch::driver::{BatchProgress, BatchPublishReport, BatchPublisher, ChapterPublishResult};
pub use batch::pipeline::CancelFlag;
pub use config::{load_config, ClientConfig, ConfigError, LogConfig, UnlockMode};
pub use db::{open_db, open_db_in_memory, DbError};
pub use lifecycle::engine::{InvalidTransition, UnlockPlan};
pub use lifecycle::selection::EditorEntry;
pub use logging::{default_log_level, init_from_config, init_logging, logging_status, LoggingError};
pub use model::chapter::{
    Chapter, ChapterDraft, ChapterId, ChapterPatch, ChapterStatus, NewChapter, ProjectId,
    UnpublishedChapter,
};
pub use service::chapter_workflow::{ChapterWorkflow, WorkflowError, WorkflowResult};
pub use service::ports::{AlwaysConfirm, Confirm, ConfirmPrompt, Notify};
pub use service::unlock::UnlockOutcome;
pub use session::repo::{SessionError, SessionRepository, SqliteSessionRepository};
pub use session::Session;
pub use store::chapter_store::{ChapterStore, StoreError, StoreResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
