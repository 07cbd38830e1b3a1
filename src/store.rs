//! Persistent named contexts and the active context marker.
//!
//! Keys, one per line in the rc file:
//!
//! ```text
//! context.<name>.read=<filter>    modern form
//! context.<name>.write=<filter>   only when the filter is write-safe
//! context.<name>=<filter>         legacy form, read only, never written
//! context=<name>                  active marker
//! ```
//!
//! Every mutation edits the in-memory key set; nothing reaches disk until
//! [`ContextStore::save`], so a command that fails half way persists nothing.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::classify::{classify, WriteSafety};
use crate::config::Config;
use crate::errors::{ContextError, Result};
use crate::filter::parse_filter;

const PREFIX: &str = "context.";
const ACTIVE_KEY: &str = "context";

/// How a context is spelled in the rc file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Definition {
    Legacy(String),
    Modern { read: String, write: Option<String> },
}

/// A context with its filters resolved, whatever form it was stored in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    pub name: String,
    pub read: String,
    pub write: Option<String>,
    pub legacy: bool,
}

impl Context {
    fn resolve(name: &str, definition: Definition) -> Self {
        match definition {
            Definition::Legacy(read) => Context {
                name: name.to_string(),
                read,
                write: None,
                legacy: true,
            },
            Definition::Modern { read, write } => Context {
                name: name.to_string(),
                read,
                write,
                legacy: false,
            },
        }
    }
}

/// Result of a successful `define`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedContext {
    pub context: Context,
    pub safety: WriteSafety,
}

fn read_key(name: &str) -> String {
    format!("{PREFIX}{name}.read")
}

fn write_key(name: &str) -> String {
    format!("{PREFIX}{name}.write")
}

fn legacy_key(name: &str) -> String {
    format!("{PREFIX}{name}")
}

pub struct ContextStore {
    config: Config,
}

impl ContextStore {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn save(&self) -> Result<()> {
        self.config.save()
    }

    /// Collects every definition, keyed by name. A modern read key shadows a
    /// legacy key of the same name.
    fn definitions(&self) -> BTreeMap<String, Definition> {
        let mut reads: BTreeMap<String, String> = BTreeMap::new();
        let mut writes: BTreeMap<String, String> = BTreeMap::new();
        let mut legacy: BTreeMap<String, String> = BTreeMap::new();
        for (key, value) in self.config.entries() {
            let Some(rest) = key.strip_prefix(PREFIX) else {
                continue;
            };
            if let Some(name) = rest.strip_suffix(".read") {
                reads.insert(name.to_string(), value.to_string());
            } else if let Some(name) = rest.strip_suffix(".write") {
                writes.insert(name.to_string(), value.to_string());
            } else if !rest.is_empty() {
                legacy.insert(rest.to_string(), value.to_string());
            }
        }
        let mut out: BTreeMap<String, Definition> = legacy
            .into_iter()
            .map(|(name, read)| (name, Definition::Legacy(read)))
            .collect();
        for (name, read) in reads {
            let write = writes.remove(&name);
            out.insert(name, Definition::Modern { read, write });
        }
        for name in writes.keys() {
            warn!(name = %name, "write filter without a read filter, ignored");
        }
        out
    }

    /// True if any key of `name` is present, including a stray write key
    /// that does not make a context on its own.
    pub fn has_keys(&self, name: &str) -> bool {
        [read_key(name), write_key(name), legacy_key(name)]
            .iter()
            .any(|key| self.config.get(key).is_some())
    }

    pub fn definition(&self, name: &str) -> Option<Definition> {
        if let Some(read) = self.config.get(&read_key(name)) {
            return Some(Definition::Modern {
                read: read.to_string(),
                write: self.config.get(&write_key(name)).map(str::to_string),
            });
        }
        self.config
            .get(&legacy_key(name))
            .map(|read| Definition::Legacy(read.to_string()))
    }

    pub fn resolve(&self, name: &str) -> Result<Context> {
        self.definition(name)
            .map(|d| Context::resolve(name, d))
            .ok_or_else(|| ContextError::NotFound(name.to_string()))
    }

    /// All contexts sorted by name.
    pub fn list(&self) -> Result<Vec<Context>> {
        let contexts = self
            .definitions()
            .into_iter()
            .map(|(name, d)| Context::resolve(&name, d))
            .collect::<Vec<_>>();
        if contexts.is_empty() {
            return Err(ContextError::NoContextsDefined);
        }
        Ok(contexts)
    }

    pub fn names(&self) -> Vec<String> {
        self.definitions().into_keys().collect()
    }

    /// Stores `filter` as the read filter and, when it is write-safe, as the
    /// write filter too. Replaces any earlier definition of `name`.
    pub fn define(&mut self, name: &str, filter: &str) -> Result<ValidatedContext> {
        let safety = classify(&parse_filter(filter)?);
        self.config.remove(&legacy_key(name));
        self.config.set(&read_key(name), filter);
        let write = if safety.is_safe() {
            self.config.set(&write_key(name), filter);
            Some(filter.to_string())
        } else {
            self.config.remove(&write_key(name));
            None
        };
        debug!(name, filter, write_safe = safety.is_safe(), "context defined");
        Ok(ValidatedContext {
            context: Context {
                name: name.to_string(),
                read: filter.to_string(),
                write,
                legacy: false,
            },
            safety,
        })
    }

    /// Removes every key for `name`. Returns whether it was the active
    /// context, in which case the marker is gone too.
    pub fn delete(&mut self, name: &str) -> Result<bool> {
        if !self.has_keys(name) {
            return Err(ContextError::NotFound(name.to_string()));
        }
        self.config.remove(&read_key(name));
        self.config.remove(&write_key(name));
        self.config.remove(&legacy_key(name));
        let was_active = self.active() == Some(name);
        if was_active {
            self.config.remove(ACTIVE_KEY);
        }
        debug!(name, was_active, "context deleted");
        Ok(was_active)
    }

    /// Name held by the active marker, whether or not it is still defined.
    pub fn active(&self) -> Option<&str> {
        self.config.get(ACTIVE_KEY).filter(|name| !name.is_empty())
    }

    /// The active context, resolved. A marker naming an undefined context
    /// is an error rather than an unscoped run.
    pub fn active_context(&self) -> Result<Option<Context>> {
        match self.active() {
            Some(name) => self.resolve(name).map(Some),
            None => Ok(None),
        }
    }

    pub fn set_active(&mut self, name: &str) -> Result<()> {
        self.resolve(name)?;
        self.config.set(ACTIVE_KEY, name);
        debug!(name, "context activated");
        Ok(())
    }

    pub fn clear_active(&mut self) -> Result<()> {
        if self.active().is_none() {
            return Err(ContextError::NotUnset);
        }
        self.config.remove(ACTIVE_KEY);
        debug!("context cleared");
        Ok(())
    }
}
