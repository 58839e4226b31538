//! Session persistence contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist the bearer token and per-project last chapter across runs.
//! - Keep SQL details inside the local persistence boundary.
//!
//! # Invariants
//! - Repositories only accept connections whose schema is fully migrated.
//! - Read paths reject invalid persisted rows instead of masking them.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::chapter::{ChapterId, ProjectId};
use crate::session::Session;
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};

const TOKEN_KEY: &str = "auth_token";

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug)]
pub enum SessionError {
    Db(DbError),
    /// Connection schema does not match this binary.
    SchemaMismatch { found: u32, expected: u32 },
    InvalidData(String),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::SchemaMismatch { found, expected } => write!(
                f,
                "session schema version {found} does not match expected {expected}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted session data: {message}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for SessionError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SessionError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for session persistence.
pub trait SessionRepository {
    fn load_session(&self) -> SessionResult<Session>;
    fn save_token(&self, token: Option<&str>) -> SessionResult<()>;
    fn save_last_chapter(&self, project_id: ProjectId, chapter_id: ChapterId)
        -> SessionResult<()>;
    fn clear_last_chapter(&self, project_id: ProjectId) -> SessionResult<()>;

    /// Writes the whole session value: token and every remembered chapter.
    fn save_session(&self, session: &Session) -> SessionResult<()> {
        self.save_token(session.token())?;
        for (project_id, chapter_id) in session.last_chapters() {
            self.save_last_chapter(project_id, chapter_id)?;
        }
        Ok(())
    }
}

/// SQLite-backed session repository.
pub struct SqliteSessionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSessionRepository<'conn> {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    pub fn try_new(conn: &'conn Connection) -> SessionResult<Self> {
        let found = current_user_version(conn)?;
        let expected = latest_version();
        if found != expected {
            return Err(SessionError::SchemaMismatch { found, expected });
        }
        Ok(Self { conn })
    }
}

impl SessionRepository for SqliteSessionRepository<'_> {
    fn load_session(&self) -> SessionResult<Session> {
        let token: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM session_values WHERE key = ?1;",
                [TOKEN_KEY],
                |row| row.get(0),
            )
            .optional()?;

        let mut session = Session::new();
        session.set_token(token);

        let mut stmt = self
            .conn
            .prepare("SELECT project_id, chapter_id FROM last_chapters ORDER BY project_id;")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let project_id: i64 = row.get("project_id")?;
            let chapter_id: i64 = row.get("chapter_id")?;
            if chapter_id < 1 {
                return Err(SessionError::InvalidData(format!(
                    "invalid chapter id `{chapter_id}` in last_chapters.chapter_id"
                )));
            }
            session.remember_chapter(ProjectId(project_id), ChapterId(chapter_id));
        }

        Ok(session)
    }

    fn save_token(&self, token: Option<&str>) -> SessionResult<()> {
        match token.map(str::trim).filter(|value| !value.is_empty()) {
            Some(value) => {
                self.conn.execute(
                    "INSERT INTO session_values (key, value)
                     VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        updated_at = (strftime('%s', 'now') * 1000);",
                    params![TOKEN_KEY, value],
                )?;
            }
            None => {
                self.conn
                    .execute("DELETE FROM session_values WHERE key = ?1;", [TOKEN_KEY])?;
            }
        }
        Ok(())
    }

    fn save_last_chapter(
        &self,
        project_id: ProjectId,
        chapter_id: ChapterId,
    ) -> SessionResult<()> {
        self.conn.execute(
            "INSERT INTO last_chapters (project_id, chapter_id)
             VALUES (?1, ?2)
             ON CONFLICT(project_id) DO UPDATE SET
                chapter_id = excluded.chapter_id,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![project_id.0, chapter_id.0],
        )?;
        Ok(())
    }

    fn clear_last_chapter(&self, project_id: ProjectId) -> SessionResult<()> {
        self.conn.execute(
            "DELETE FROM last_chapters WHERE project_id = ?1;",
            [project_id.0],
        )?;
        Ok(())
    }
}
