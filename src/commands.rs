//! The `context` subcommands.
//!
//! Handlers only edit the in-memory store; the caller saves it once the
//! handler has returned `Ok`, so a declined prompt or an error leaves the rc
//! file untouched.

use crate::classify::WriteSafety;
use crate::confirm::Confirm;
use crate::errors::{ContextError, Result};
use crate::filter::{parse_filter, FilterExpr};
use crate::parser::join_args;
use crate::store::{Context, ContextStore};
use crate::table::render_table;
use crate::tasks::TaskList;
use crate::PROGRAM;

const RESERVED_NAMES: &[&str] = &["define", "delete", "list", "none", "show"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextCommand {
    Define { name: String, filter: String },
    Delete { name: String },
    List,
    Show,
    Set { name: String },
    Unset,
}

impl ContextCommand {
    /// Interprets the words after `context`. Filter words are joined with
    /// single spaces, re-quoting any that hold whitespace; anything that is
    /// not a subcommand is a context name.
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        let words: Vec<&str> = args.iter().map(|a| a.as_ref()).collect();
        let Some((first, rest)) = words.split_first() else {
            return Ok(ContextCommand::Show);
        };
        match *first {
            "define" => {
                let name = rest.first().map(|n| n.trim()).unwrap_or_default();
                let filter = join_args(rest.get(1..).unwrap_or_default());
                if name.is_empty() || filter.trim().is_empty() {
                    return Err(ContextError::Validation(
                        "Both context name and its definition must be provided.".into(),
                    ));
                }
                Ok(ContextCommand::Define {
                    name: name.to_string(),
                    filter: filter.trim().to_string(),
                })
            }
            "delete" => {
                let name = rest.join(" ");
                if name.trim().is_empty() {
                    return Err(ContextError::Validation(
                        "Context name needs to be specified.".into(),
                    ));
                }
                Ok(ContextCommand::Delete {
                    name: name.trim().to_string(),
                })
            }
            "list" => Ok(ContextCommand::List),
            "show" => Ok(ContextCommand::Show),
            "none" => Ok(ContextCommand::Unset),
            _ => Ok(ContextCommand::Set {
                name: words.join(" "),
            }),
        }
    }

    /// Whether a successful run changes the rc file.
    pub fn mutates(&self) -> bool {
        matches!(
            self,
            ContextCommand::Define { .. }
                | ContextCommand::Delete { .. }
                | ContextCommand::Set { .. }
                | ContextCommand::Unset
        )
    }
}

pub struct ContextCommands<'a> {
    pub store: &'a mut ContextStore,
    pub tasks: &'a TaskList,
    pub confirm: &'a mut dyn Confirm,
    /// The `confirmation` setting.
    pub confirmation: bool,
}

impl ContextCommands<'_> {
    pub fn execute(&mut self, cmd: ContextCommand) -> Result<String> {
        match cmd {
            ContextCommand::Define { name, filter } => self.define(&name, &filter),
            ContextCommand::Delete { name } => self.delete(&name),
            ContextCommand::List => self.list(),
            ContextCommand::Show => Ok(self.show()),
            ContextCommand::Set { name } => self.set(&name),
            ContextCommand::Unset => {
                self.store.clear_active()?;
                Ok("Context unset.".to_string())
            }
        }
    }

    fn define(&mut self, name: &str, filter: &str) -> Result<String> {
        validate_name(name)?;
        if filter.contains(['\n', '\r']) {
            return Err(ContextError::Validation(
                "A context definition must fit on one line.".into(),
            ));
        }
        let expr = parse_filter(filter)?;
        if self.confirmation && self.count_pending(&expr) == 0 {
            let question = format!(
                "The filter '{filter}' matches 0 pending tasks. Do you wish to continue?"
            );
            if !self.confirm.confirm(&question) {
                return Err(ContextError::ConfirmationDeclined(format!(
                    "Context '{name}' not defined."
                )));
            }
        }
        let validated = self.store.define(name, filter)?;
        Ok(match validated.safety {
            WriteSafety::Safe => format!(
                "Context '{name}' defined (read, write). Use '{PROGRAM} context {name}' to activate."
            ),
            WriteSafety::Unsafe(reason) => format!(
                "Context '{name}' defined (read only). Use '{PROGRAM} context {name}' to activate.\n\
                 No write filter was stored because {reason}."
            ),
        })
    }

    fn count_pending(&self, expr: &FilterExpr) -> usize {
        self.tasks.pending_matching(expr).len()
    }

    fn delete(&mut self, name: &str) -> Result<String> {
        if !self.store.has_keys(name) {
            return Err(ContextError::NotFound(name.to_string()));
        }
        if self.confirmation && !self.confirm.confirm(&format!("Delete context '{name}'?")) {
            return Err(ContextError::ConfirmationDeclined(format!(
                "Context '{name}' not deleted."
            )));
        }
        let was_active = self.store.delete(name)?;
        let mut out = format!("Context '{name}' deleted.");
        if was_active {
            out.push_str("\nContext unset.");
        }
        Ok(out)
    }

    fn set(&mut self, name: &str) -> Result<String> {
        self.store.set_active(name)?;
        Ok(format!(
            "Context '{name}' set. Use '{PROGRAM} context none' to remove."
        ))
    }

    fn show(&self) -> String {
        let Some(name) = self.store.active() else {
            return "No context is currently applied.".to_string();
        };
        match self.store.resolve(name) {
            Ok(context) => describe(&context),
            Err(_) => format!(
                "Context '{name}' is set but not defined. Use '{PROGRAM} context none' to remove."
            ),
        }
    }

    fn list(&self) -> Result<String> {
        let active = self.store.active();
        let mut rows = Vec::new();
        for context in self.store.list()? {
            let flag = if active == Some(context.name.as_str()) {
                "yes"
            } else {
                "no"
            };
            let write = context.write.unwrap_or_default();
            rows.push(vec![context.name, "read".into(), context.read, flag.into()]);
            rows.push(vec![String::new(), "write".into(), write, flag.into()]);
        }
        Ok(render_table(&["Name", "Type", "Definition", "Active"], &rows)
            .trim_end()
            .to_string())
    }
}

fn describe(context: &Context) -> String {
    let write = match &context.write {
        Some(w) => format!("'{w}'"),
        None => "none".to_string(),
    };
    format!(
        "Context '{}' with\n\n* read filter: '{}'\n* write filter: {write}\n\nis currently applied.",
        context.name, context.read
    )
}

fn validate_name(name: &str) -> Result<()> {
    if RESERVED_NAMES.contains(&name) {
        return Err(ContextError::Validation(format!(
            "Context name '{name}' is reserved."
        )));
    }
    if name.contains(['=', '\n', '\r']) {
        return Err(ContextError::Validation(format!(
            "Context name '{name}' may not contain '=' or line breaks."
        )));
    }
    Ok(())
}

/// Defined context names, one per line, for shell completion.
pub fn completion(store: &ContextStore) -> String {
    store
        .names()
        .into_iter()
        .map(|name| name + "\n")
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::tasks::{Modifications, Status, Task};
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;

    /// Replays canned answers and records the questions.
    #[derive(Default)]
    struct Scripted {
        answers: VecDeque<bool>,
        asked: Vec<String>,
    }

    impl Confirm for Scripted {
        fn confirm(&mut self, question: &str) -> bool {
            self.asked.push(question.to_string());
            self.answers.pop_front().unwrap_or(false)
        }
    }

    struct Harness {
        store: ContextStore,
        tasks: TaskList,
        confirm: Scripted,
        confirmation: bool,
    }

    impl Harness {
        fn new(rc: &str) -> Self {
            Self {
                store: ContextStore::new(Config::parse(rc)),
                tasks: TaskList::default(),
                confirm: Scripted::default(),
                confirmation: false,
            }
        }

        fn answer(&mut self, answers: &[bool]) -> &mut Self {
            self.confirm.answers = answers.iter().copied().collect();
            self
        }

        fn run(&mut self, args: &str) -> Result<String> {
            let words: Vec<&str> = args.split_whitespace().collect();
            let cmd = ContextCommand::parse(&words)?;
            ContextCommands {
                store: &mut self.store,
                tasks: &self.tasks,
                confirm: &mut self.confirm,
                confirmation: self.confirmation,
            }
            .execute(cmd)
        }

        fn rc(&self) -> String {
            self.store.config().render()
        }
    }

    #[test]
    fn parse_subcommands() {
        assert_eq!(ContextCommand::parse::<&str>(&[]).unwrap(), ContextCommand::Show);
        assert_eq!(
            ContextCommand::parse(&["define", "urgent", "due:today", "or", "+next"]).unwrap(),
            ContextCommand::Define {
                name: "urgent".into(),
                filter: "due:today or +next".into()
            }
        );
        assert_eq!(
            ContextCommand::parse(&["define", "mw", "project:My Work", "+x"]).unwrap(),
            ContextCommand::Define {
                name: "mw".into(),
                filter: "project:'My Work' +x".into()
            }
        );
        assert_eq!(
            ContextCommand::parse(&["one two"]).unwrap(),
            ContextCommand::Set {
                name: "one two".into()
            }
        );
        assert_eq!(ContextCommand::parse(&["none"]).unwrap(), ContextCommand::Unset);
    }

    #[test]
    fn missing_arguments() {
        let err = ContextCommand::parse(&["define"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Both context name and its definition must be provided."
        );
        let err = ContextCommand::parse(&["define", "work"]).unwrap_err();
        assert!(matches!(err, ContextError::Validation(_)));
        let err = ContextCommand::parse(&["delete"]).unwrap_err();
        assert_eq!(err.to_string(), "Context name needs to be specified.");
    }

    #[test]
    fn define_messages() {
        let mut h = Harness::new("");
        assert_eq!(
            h.run("define work +work").unwrap(),
            "Context 'work' defined (read, write). Use 'tctx context work' to activate."
        );
        assert_eq!(
            h.run("define urgent due:today or +next").unwrap(),
            "Context 'urgent' defined (read only). Use 'tctx context urgent' to activate.\n\
             No write filter was stored because the filter contains an 'or' operator."
        );
        assert!(h.confirm.asked.is_empty());
    }

    #[test]
    fn define_with_no_matches_asks_first() {
        let mut h = Harness::new("");
        h.confirmation = true;
        h.answer(&[false]);
        let err = h.run("define work project:Work").unwrap_err();
        assert!(matches!(err, ContextError::ConfirmationDeclined(_)));
        assert_eq!(
            h.confirm.asked,
            vec!["The filter 'project:Work' matches 0 pending tasks. Do you wish to continue?"]
        );
        assert_eq!(h.rc(), "");

        h.answer(&[true]);
        h.run("define work project:Work").unwrap();
        assert_eq!(
            h.rc(),
            "context.work.read=project:Work\ncontext.work.write=project:Work\n"
        );
    }

    #[test]
    fn define_with_matches_does_not_ask() {
        let mut h = Harness::new("");
        h.confirmation = true;
        let mut task = Task::new(Status::Pending);
        Modifications::parse(&["+home", "sweep"]).apply(&mut task, crate::comparison::local_today());
        h.tasks.add(task);
        h.run("define home +home").unwrap();
        assert!(h.confirm.asked.is_empty());
    }

    #[test]
    fn define_rejects_reserved_and_bad_filters() {
        let mut h = Harness::new("");
        assert!(matches!(h.run("define none +x"), Err(ContextError::Validation(_))));
        assert!(matches!(h.run("define a=b +x"), Err(ContextError::Validation(_))));
        assert!(matches!(h.run("define x (+a"), Err(ContextError::Parse(_))));
        assert_eq!(h.rc(), "");
    }

    #[test]
    fn delete_flow() {
        let mut h = Harness::new("");
        h.run("define work project:Work").unwrap();
        h.run("work").unwrap();
        h.confirmation = true;

        h.answer(&[false]);
        assert!(matches!(h.run("delete work"), Err(ContextError::ConfirmationDeclined(_))));
        assert!(h.rc().contains("context.work.read=project:Work\n"));

        h.answer(&[true]);
        assert_eq!(
            h.run("delete work").unwrap(),
            "Context 'work' deleted.\nContext unset."
        );
        assert_eq!(h.rc(), "");
        assert_eq!(h.run("show").unwrap(), "No context is currently applied.");
    }

    #[test]
    fn delete_undefined_does_not_prompt() {
        let mut h = Harness::new("");
        h.confirmation = true;
        let err = h.run("delete foo").unwrap_err();
        assert_eq!(err.to_string(), "Context 'foo' not found.");
        assert!(h.confirm.asked.is_empty());
    }

    #[test]
    fn set_show_unset() {
        let mut h = Harness::new("");
        h.run("define work +work").unwrap();
        assert_eq!(
            h.run("work").unwrap(),
            "Context 'work' set. Use 'tctx context none' to remove."
        );
        assert_eq!(
            h.run("show").unwrap(),
            "Context 'work' with\n\n* read filter: '+work'\n* write filter: '+work'\n\nis currently applied."
        );
        assert_eq!(h.run("none").unwrap(), "Context unset.");
        assert_eq!(h.run("none").unwrap_err().to_string(), "Context not unset.");
        assert_eq!(h.run("missing").unwrap_err().to_string(), "Context 'missing' not found.");
    }

    #[test]
    fn show_dangling_marker() {
        let mut h = Harness::new("context=gone\n");
        assert_eq!(
            h.run("show").unwrap(),
            "Context 'gone' is set but not defined. Use 'tctx context none' to remove."
        );
        h.run("none").unwrap();
        assert_eq!(h.rc(), "");
    }

    #[test]
    fn list_table() {
        let mut h = Harness::new("context.old=project:Old\n");
        assert!(h.run("define work project:Work").is_ok());
        h.run("define home +home").unwrap();
        h.run("home").unwrap();
        assert_eq!(
            h.run("list").unwrap(),
            "Name Type  Definition   Active\n\
             home read  +home        yes\n     \
             write +home        yes\n\
             old  read  project:Old  no\n     \
             write              no\n\
             work read  project:Work no\n     \
             write project:Work no"
        );
    }

    #[test]
    fn list_empty() {
        let mut h = Harness::new("");
        assert_eq!(h.run("list").unwrap_err().to_string(), "No contexts defined.");
    }

    #[test]
    fn completion_ignores_activity() {
        let mut h = Harness::new("");
        h.run("define work project:Work").unwrap();
        h.run("define home +home").unwrap();
        assert_eq!(completion(&h.store), "home\nwork\n");
        h.run("work").unwrap();
        assert_eq!(completion(&h.store), "home\nwork\n");
    }
}
