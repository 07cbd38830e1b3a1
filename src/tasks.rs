//! Minimal task records: just enough storage for contexts to scope reports
//! and stamp defaults onto new tasks.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::comparison::resolve_named_date;
use crate::errors::{ContextError, Result};
use crate::filter::{
    is_date_attribute, split_attribute, FilterExpr, Record, ATTRIBUTES, READ_ONLY_ATTRIBUTES,
};
use crate::table::render_table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Completed,
}

impl Status {
    fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub uuid: Uuid,
    pub status: Status,
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, String>,
    /// Position among pending tasks, assigned on load.
    #[serde(skip)]
    pub id: Option<u64>,
}

impl Task {
    pub fn new(status: Status) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            status,
            description: String::new(),
            tags: BTreeSet::new(),
            attributes: BTreeMap::new(),
            id: None,
        }
    }

    /// Sets `name` to `value`, resolving named dates; an empty value removes
    /// the attribute. `id`, `uuid` and `status` are left alone: they live in
    /// their own fields and must not reappear in the flattened map.
    pub fn set_attribute(&mut self, name: &str, value: &str, today: NaiveDate) {
        if READ_ONLY_ATTRIBUTES.contains(&name) {
            warn!(attribute = name, value, "attribute is assigned by the task list, ignored");
        } else if name == "description" {
            self.description = value.to_string();
        } else if value.is_empty() {
            self.attributes.remove(name);
        } else if is_date_attribute(name) {
            self.attributes
                .insert(name.to_string(), resolve_named_date(value, today));
        } else {
            self.attributes.insert(name.to_string(), value.to_string());
        }
    }
}

impl Record for Task {
    fn attribute(&self, name: &str) -> Option<String> {
        match name {
            "description" => Some(self.description.clone()),
            "status" => Some(self.status.as_str().to_string()),
            "uuid" => Some(self.uuid.to_string()),
            "id" => self.id.map(|id| id.to_string()),
            _ => self.attributes.get(name).cloned(),
        }
    }

    fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    fn id(&self) -> Option<u64> {
        self.id
    }

    fn uuid(&self) -> String {
        self.uuid.to_string()
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Attribute assignments, tag edits and description words from the
/// command line, e.g. `add project:Home +errand buy milk`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Modifications {
    pub attributes: BTreeMap<String, String>,
    pub tags_added: BTreeSet<String>,
    pub tags_removed: BTreeSet<String>,
    pub words: Vec<String>,
}

impl Modifications {
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Self {
        let mut mods = Modifications::default();
        for arg in args {
            let arg: &str = arg.as_ref();
            if let Some(tag) = arg.strip_prefix('+').filter(|t| is_tag(t)) {
                mods.tags_added.insert(tag.to_string());
                continue;
            }
            if let Some(tag) = arg.strip_prefix('-').filter(|t| is_tag(t)) {
                mods.tags_removed.insert(tag.to_string());
                continue;
            }
            match split_attribute(arg) {
                Some((name, None, value))
                    if ATTRIBUTES.contains(&name.as_str())
                        && !READ_ONLY_ATTRIBUTES.contains(&name.as_str()) =>
                {
                    mods.attributes.insert(name, value);
                }
                _ => mods.words.push(arg.to_string()),
            }
        }
        mods
    }

    /// Explicit values replace whatever is already on the task.
    pub fn apply(&self, task: &mut Task, today: NaiveDate) {
        for (name, value) in &self.attributes {
            task.set_attribute(name, value, today);
        }
        for tag in &self.tags_removed {
            task.tags.remove(tag);
        }
        task.tags.extend(self.tags_added.iter().cloned());
        if !self.words.is_empty() {
            task.description = self.words.join(" ");
        }
    }
}

fn is_tag(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_')
        && !s.contains(':')
        && !s.contains('=')
        && !s.contains(char::is_whitespace)
}

/// All tasks, read from and written to one JSON file.
#[derive(Debug, Clone, Default)]
pub struct TaskList {
    path: PathBuf,
    tasks: Vec<Task>,
}

impl TaskList {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let tasks: Vec<Task> = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => Vec::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|source| ContextError::Data {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(ContextError::io(path, e)),
        };
        let mut list = Self { path, tasks };
        list.renumber();
        debug!(path = %list.path.display(), count = list.tasks.len(), "tasks loaded");
        Ok(list)
    }

    fn renumber(&mut self) {
        let mut next = 1;
        for task in &mut self.tasks {
            task.id = match task.status {
                Status::Pending => {
                    next += 1;
                    Some(next - 1)
                }
                Status::Completed => None,
            };
        }
    }

    pub fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| ContextError::io(dir, e))?;
        }
        let body = serde_json::to_string_pretty(&self.tasks).map_err(|source| {
            ContextError::Data {
                path: self.path.clone(),
                source,
            }
        })?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, body).map_err(|e| ContextError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| ContextError::io(&self.path, e))?;
        Ok(())
    }

    /// Appends `task` and returns it with its ID assigned.
    pub fn add(&mut self, task: Task) -> &Task {
        self.tasks.push(task);
        self.renumber();
        let last = self.tasks.len() - 1;
        &self.tasks[last]
    }

    pub fn all(&self) -> &[Task] {
        &self.tasks
    }

    pub fn pending_matching(&self, filter: &FilterExpr) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.status == Status::Pending && filter.matches(*t))
            .collect()
    }
}

/// Plain table of ID, project, tags, due date and description.
pub fn render_report(tasks: &[&Task]) -> String {
    if tasks.is_empty() {
        return "No matches.\n".to_string();
    }
    let rows: Vec<Vec<String>> = tasks
        .iter()
        .map(|t| {
            vec![
                t.id.map(|id| id.to_string()).unwrap_or_default(),
                t.attributes.get("project").cloned().unwrap_or_default(),
                t.tags.iter().join(" "),
                t.attributes.get("due").cloned().unwrap_or_default(),
                t.description.clone(),
            ]
        })
        .collect();
    let mut out = render_table(&["ID", "Project", "Tags", "Due", "Description"], &rows);
    out.push_str(&format!(
        "\n{} {}\n",
        rows.len(),
        if rows.len() == 1 { "task" } else { "tasks" }
    ));
    out
}
