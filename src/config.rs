//! Line-oriented `key=value` configuration file.
//!
//! The whole file is read once, edited in memory and written back in one go.
//! Comments and blank lines survive a rewrite; keys are unique afterwards.

use std::fs;
use std::path::PathBuf;

use tracing::debug;

use crate::errors::{ContextError, Result};

#[derive(Debug, Clone, PartialEq)]
enum Line {
    Entry { key: String, value: String },
    Other(String),
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    path: PathBuf,
    lines: Vec<Line>,
}

impl Config {
    /// Reads `path`; a missing file is an empty configuration.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(ContextError::io(path, e)),
        };
        let mut config = Self::parse(&text);
        config.path = path;
        Ok(config)
    }

    pub fn parse(text: &str) -> Self {
        let lines = text
            .lines()
            .map(|raw| {
                let trimmed = raw.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    return Line::Other(raw.to_string());
                }
                match trimmed.split_once('=') {
                    Some((key, value)) => Line::Entry {
                        key: key.trim().to_string(),
                        value: value.trim().to_string(),
                    },
                    None => Line::Other(raw.to_string()),
                }
            })
            .collect();
        Self {
            path: PathBuf::new(),
            lines,
        }
    }

    /// Writes the whole file through a sibling temp file and a rename.
    pub fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| ContextError::io(dir, e))?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, self.render()).map_err(|e| ContextError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| ContextError::io(&self.path, e))?;
        debug!(path = %self.path.display(), "configuration saved");
        Ok(())
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Entry { key, value } => {
                    out.push_str(key);
                    out.push('=');
                    out.push_str(value);
                }
                Line::Other(raw) => out.push_str(raw),
            }
            out.push('\n');
        }
        out
    }

    /// Last occurrence wins, as when the file is read top to bottom.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().rev().find_map(|line| match line {
            Line::Entry { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(parse_bool)
    }

    /// Replaces the first occurrence of `key` in place and drops any others;
    /// appends when the key is new.
    pub fn set(&mut self, key: &str, value: &str) {
        let mut seen = false;
        self.lines.retain_mut(|line| match line {
            Line::Entry { key: k, value: v } if k.as_str() == key => {
                if seen {
                    return false;
                }
                seen = true;
                *v = value.to_string();
                true
            }
            _ => true,
        });
        if !seen {
            self.lines.push(Line::Entry {
                key: key.to_string(),
                value: value.to_string(),
            });
        }
    }

    /// Removes every occurrence of `key`; returns whether anything was removed.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.lines.len();
        self.lines
            .retain(|line| !matches!(line, Line::Entry { key: k, .. } if k == key));
        self.lines.len() != before
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.lines.iter().filter_map(|line| match line {
            Line::Entry { key, value } => Some((key.as_str(), value.as_str())),
            Line::Other(_) => None,
        })
    }
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "yes" | "y" | "true" | "1" => Some(true),
        "off" | "no" | "n" | "false" | "0" => Some(false),
        _ => None,
    }
}
