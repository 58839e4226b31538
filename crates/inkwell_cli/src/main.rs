//! `inkwell` command line client.
//!
//! # Responsibility
//! - Drive the chapter workflow from the terminal.
//! - Persist the bearer token and last opened chapters between runs.
//!
//! # Invariants
//! - Irreversible actions prompt on stdin unless `--yes` is given.
//! - Notifications go to stderr; listings go to stdout.

mod ui;

use clap::{Args, Parser, Subcommand};
use inkwell_core::batch::select::{select_all_unpublished, select_range, select_through_current};
use inkwell_core::{
    load_config, open_db, ApiError, Chapter, ChapterId, ChapterStore, ChapterWorkflow,
    ClientConfig, ConfigError, DbError, EditorEntry, HttpChapterApi, ProjectId, Session,
    SessionError, SessionRepository, SqliteSessionRepository, WorkflowError,
};
use log::{info, warn};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::process::ExitCode;
use ui::{StderrNotifier, StdinConfirm};

#[derive(Debug, Parser)]
#[command(name = "inkwell", version, about = "Chapter lifecycle client for Inkwell projects")]
struct Cli {
    /// Config file; defaults to `<config_dir>/inkwell/config.toml`.
    #[arg(long, env = "INKWELL_CONFIG")]
    config: Option<PathBuf>,
    /// Overrides `api_base_url` from the config file.
    #[arg(long, env = "INKWELL_API_BASE_URL")]
    api_base_url: Option<String>,
    /// Bearer token for this run only; not persisted.
    #[arg(long, env = "INKWELL_TOKEN", hide_env_values = true)]
    token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct ProjectArg {
    #[arg(long, short = 'p')]
    project: ProjectId,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Checks core linkage and prints the version.
    Ping,
    /// Lists chapters of a project.
    List {
        #[command(flatten)]
        project: ProjectArg,
        /// Uses the server's unpublished listing instead.
        #[arg(long)]
        unpublished: bool,
    },
    /// Opens a project and prints the chapter the editor would show.
    Open {
        #[command(flatten)]
        project: ProjectArg,
        #[arg(long, conflicts_with = "resume")]
        chapter: Option<ChapterId>,
        /// Reopens the chapter remembered from the last run.
        #[arg(long)]
        resume: bool,
    },
    /// Appends a new draft chapter.
    Create {
        #[command(flatten)]
        project: ProjectArg,
        title: String,
    },
    /// Publishes one chapter.
    Publish {
        #[command(flatten)]
        project: ProjectArg,
        id: ChapterId,
    },
    /// Reverts a chapter and every later chapter to draft.
    Unlock {
        #[command(flatten)]
        project: ProjectArg,
        number: i64,
        #[arg(long)]
        yes: bool,
    },
    /// Publishes several draft chapters one after another.
    BatchPublish {
        #[command(flatten)]
        project: ProjectArg,
        #[command(flatten)]
        selection: BatchSelection,
    },
    /// Deletes a chapter.
    Delete {
        #[command(flatten)]
        project: ProjectArg,
        id: ChapterId,
        #[arg(long)]
        yes: bool,
    },
    /// Stores a bearer token for later runs.
    Login {
        #[arg(long)]
        token: String,
    },
    /// Forgets the stored bearer token.
    Logout,
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct BatchSelection {
    /// Explicit chapter ids, comma separated.
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    ids: Vec<ChapterId>,
    /// Current chapter and every earlier draft.
    #[arg(long)]
    through_current: bool,
    /// Drafts numbered between two chapter numbers, inclusive.
    #[arg(long, num_args = 2, value_names = ["FROM", "TO"])]
    range: Vec<i64>,
    /// Every unpublished chapter.
    #[arg(long)]
    all: bool,
}

#[derive(Debug)]
enum CliError {
    Config(ConfigError),
    Db(DbError),
    Session(SessionError),
    Api(ApiError),
    /// Already reported through the notifier.
    Workflow(WorkflowError),
    Usage(String),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Session(err) => write!(f, "{err}"),
            Self::Api(err) => write!(f, "{err}"),
            Self::Workflow(err) => write!(f, "{err}"),
            Self::Usage(message) => f.write_str(message),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<SessionError> for CliError {
    fn from(value: SessionError) -> Self {
        Self::Session(value)
    }
}

impl From<ApiError> for CliError {
    fn from(value: ApiError) -> Self {
        Self::Api(value)
    }
}

impl From<WorkflowError> for CliError {
    fn from(value: WorkflowError) -> Self {
        Self::Workflow(value)
    }
}

type Workflow = ChapterWorkflow<HttpChapterApi, StdinConfirm, StderrNotifier>;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Workflow(WorkflowError::Cancelled)) => {
            eprintln!("已取消");
            ExitCode::from(2)
        }
        Err(CliError::Workflow(_)) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    if matches!(cli.command, Command::Ping) {
        println!("inkwell_core ping={}", inkwell_core::ping());
        println!("inkwell_core version={}", inkwell_core::core_version());
        return Ok(());
    }

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(base_url) = cli.api_base_url {
        config.api_base_url = base_url;
    }
    config.validate()?;

    if let Err(err) = inkwell_core::init_from_config(&config.log) {
        eprintln!("[warn] file logging disabled: {err}");
    }

    let db_path = config
        .session_db_path()
        .ok_or_else(|| CliError::Usage("no data directory for the session database".to_string()))?;
    let conn = open_db(&db_path)?;
    let repo = SqliteSessionRepository::try_new(&conn)?;

    match &cli.command {
        Command::Login { token } => {
            repo.save_token(Some(token.as_str()))?;
            info!("event=session_login module=cli status=ok");
            eprintln!("[ok] 已登录");
            return Ok(());
        }
        Command::Logout => {
            repo.save_token(None)?;
            info!("event=session_logout module=cli status=ok");
            eprintln!("[ok] 已退出登录");
            return Ok(());
        }
        _ => {}
    }

    let mut session = repo.load_session()?;
    let loaded_projects: Vec<ProjectId> = session.last_chapters().map(|(id, _)| id).collect();
    let stored_token = session.token().map(str::to_string);
    if let Some(token) = cli.token {
        session.set_token(Some(token));
    }

    let assume_yes = matches!(
        cli.command,
        Command::Unlock { yes: true, .. } | Command::Delete { yes: true, .. }
    );
    let mut workflow = build_workflow(&config, session, assume_yes)?;
    let outcome = dispatch(&mut workflow, cli.command);

    // The per-run token override never reaches the database.
    let mut session = workflow.into_store().session().clone();
    session.set_token(stored_token);
    if let Err(err) = persist_session(&repo, &session, &loaded_projects) {
        warn!("event=session_save module=cli status=error error={err}");
    }
    outcome
}

/// Saves the session and drops chapters the workflow forgot (deleted ones).
fn persist_session(
    repo: &SqliteSessionRepository<'_>,
    session: &Session,
    loaded_projects: &[ProjectId],
) -> Result<(), SessionError> {
    repo.save_session(session)?;
    for project_id in loaded_projects {
        if session.last_chapter(*project_id).is_none() {
            repo.clear_last_chapter(*project_id)?;
        }
    }
    Ok(())
}

fn build_workflow(
    config: &ClientConfig,
    session: Session,
    assume_yes: bool,
) -> Result<Workflow, CliError> {
    let api = HttpChapterApi::new(config)?;
    let store = ChapterStore::new(api, session);
    Ok(ChapterWorkflow::new(store, StdinConfirm::new(assume_yes), StderrNotifier)
        .with_unlock_mode(config.unlock_mode))
}

fn dispatch(workflow: &mut Workflow, command: Command) -> Result<(), CliError> {
    match command {
        Command::List {
            project,
            unpublished,
        } => {
            workflow.open_project(project.project, EditorEntry::Resume)?;
            if unpublished {
                for entry in workflow.unpublished_chapters()? {
                    let marker = if entry.is_current { "*" } else { " " };
                    println!(
                        "{marker} {:>4}  #{:<6} {}  ({} 字)",
                        entry.chapter_number, entry.id, entry.title, entry.word_count
                    );
                }
            } else {
                let current_id = workflow.current().and_then(|chapter| chapter.id);
                for chapter in workflow.store().chapters() {
                    print_chapter(chapter, chapter.id.is_some() && chapter.id == current_id);
                }
            }
        }
        Command::Open {
            project,
            chapter,
            resume,
        } => {
            let entry = match (chapter, resume) {
                (Some(chapter_id), _) => EditorEntry::Explicit(chapter_id),
                (None, true) => EditorEntry::Resume,
                (None, false) => EditorEntry::Default,
            };
            let opened = workflow.open_project(project.project, entry)?;
            print_chapter(&opened, true);
        }
        Command::Create { project, title } => {
            workflow.open_project(project.project, EditorEntry::Default)?;
            let created = workflow.create_chapter(&title)?;
            print_chapter(&created, true);
        }
        Command::Publish { project, id } => {
            workflow.open_project(project.project, EditorEntry::Explicit(id))?;
            let published = workflow.publish_current(None)?;
            print_chapter(&published, false);
        }
        Command::Unlock {
            project, number, ..
        } => {
            workflow.open_project(project.project, EditorEntry::Resume)?;
            let outcome = workflow.unlock(number)?;
            if outcome.reverted.is_empty() {
                eprintln!("[ok] 第{number}章及之后没有已发布章节");
            }
        }
        Command::BatchPublish { project, selection } => {
            workflow.open_project(project.project, EditorEntry::Resume)?;
            let ids = resolve_selection(workflow, &selection);
            let report = workflow.batch_publish(&ids, |progress| {
                eprintln!("[{}/{}]", progress.current, progress.total);
            })?;
            for result in &report.results {
                match &result.error {
                    None => println!("#{} ok", result.chapter_id),
                    Some(error) => println!("#{} failed: {error}", result.chapter_id),
                }
            }
        }
        Command::Delete { project, id, .. } => {
            workflow.open_project(project.project, EditorEntry::Resume)?;
            workflow.delete_chapter(id)?;
        }
        Command::Ping | Command::Login { .. } | Command::Logout => {}
    }
    Ok(())
}

fn resolve_selection(workflow: &Workflow, selection: &BatchSelection) -> Vec<ChapterId> {
    let chapters = workflow.store().chapters();
    if !selection.ids.is_empty() {
        return selection.ids.clone();
    }
    if let [from, to] = selection.range.as_slice() {
        return select_range(chapters, *from, *to);
    }
    if selection.through_current {
        return workflow
            .current()
            .and_then(|chapter| chapter.id)
            .map(|current| select_through_current(chapters, current))
            .unwrap_or_default();
    }
    select_all_unpublished(chapters)
}

fn print_chapter(chapter: &Chapter, current: bool) {
    let marker = if current { "*" } else { " " };
    let id = chapter
        .id
        .map_or_else(|| "new".to_string(), |id| id.to_string());
    println!(
        "{marker} {:>4}  #{:<6} {:<9} {}  ({} 字)",
        chapter.chapter_number, id, chapter.status, chapter.title, chapter.word_count
    );
}
