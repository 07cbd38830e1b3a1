//! One invocation of the tool: load state, run one command, save.

use std::path::PathBuf;

use tracing::debug;

use crate::commands::{completion, ContextCommand, ContextCommands};
use crate::comparison::local_today;
use crate::config::Config;
use crate::confirm::Confirm;
use crate::errors::{ContextError, Result};
use crate::filter::parse_filter;
use crate::inject::{default_attributes, effective_filter};
use crate::parser::join_args;
use crate::store::ContextStore;
use crate::tasks::{render_report, Modifications, Status, Task, TaskList};

const TASKS_FILE: &str = "tasks.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `context <args...>`
    Context(Vec<String>),
    /// `_context`
    CompletionContext,
    Add(Vec<String>),
    Log(Vec<String>),
    List { report: String, filter: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct App {
    rc: PathBuf,
    data: Option<PathBuf>,
}

pub fn default_rc_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".taskrc"))
}

impl App {
    /// `data` is the directory holding the task file; when absent,
    /// `data.location` from the rc file and then `~/.task` are tried.
    pub fn new(rc: impl Into<PathBuf>, data: Option<PathBuf>) -> Self {
        Self {
            rc: rc.into(),
            data,
        }
    }

    fn tasks_path(&self, config: &Config) -> Result<PathBuf> {
        let dir = self
            .data
            .clone()
            .or_else(|| config.get("data.location").map(PathBuf::from))
            .or_else(|| dirs::home_dir().map(|home| home.join(".task")))
            .ok_or_else(|| {
                ContextError::Validation(
                    "Cannot determine the data directory; use --data.".into(),
                )
            })?;
        Ok(dir.join(TASKS_FILE))
    }

    /// Runs `command` and returns what should be printed on stdout.
    pub fn run(&self, command: Command, confirm: &mut dyn Confirm) -> Result<String> {
        let config = Config::load(&self.rc)?;
        let tasks_path = self.tasks_path(&config)?;
        let mut store = ContextStore::new(config);
        debug!(?command, rc = %self.rc.display(), "running");
        match command {
            Command::Context(args) => {
                let cmd = ContextCommand::parse(&args)?;
                let tasks = match cmd {
                    ContextCommand::Define { .. } => TaskList::load(tasks_path)?,
                    _ => TaskList::default(),
                };
                let mutates = cmd.mutates();
                let confirmation = store.config().get_bool("confirmation").unwrap_or(true);
                let out = ContextCommands {
                    store: &mut store,
                    tasks: &tasks,
                    confirm,
                    confirmation,
                }
                .execute(cmd)?;
                if mutates {
                    store.save()?;
                }
                Ok(out)
            }
            Command::CompletionContext => Ok(completion(&store)),
            Command::Add(args) => create(&store, tasks_path, &args, Status::Pending),
            Command::Log(args) => create(&store, tasks_path, &args, Status::Completed),
            Command::List { report, filter } => {
                let tasks = TaskList::load(tasks_path)?;
                let active = store.active_context()?;
                let enabled = store
                    .config()
                    .get_bool(&format!("report.{report}.context"))
                    .unwrap_or(true);
                let user = parse_filter(&join_args(&filter))?;
                let filter = effective_filter(user, active.as_ref(), enabled)?;
                Ok(render_report(&tasks.pending_matching(&filter)))
            }
        }
    }
}

fn create(
    store: &ContextStore,
    tasks_path: PathBuf,
    args: &[String],
    status: Status,
) -> Result<String> {
    let active = store.active_context()?;
    let defaults = default_attributes(active.as_ref())?;
    let today = local_today();
    let mut task = Task::new(status);
    defaults.apply(&mut task, today);
    Modifications::parse(args).apply(&mut task, today);
    if task.description.trim().is_empty() {
        return Err(ContextError::Validation(
            "Additional text must be provided.".into(),
        ));
    }
    let mut tasks = TaskList::load(tasks_path)?;
    let message = match tasks.add(task).id {
        Some(id) => format!("Created task {id}."),
        None => "Logged task.".to_string(),
    };
    tasks.save()?;
    Ok(message)
}
