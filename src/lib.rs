//! Named contexts for a task list: saved filters that scope every report
//! and stamp defaults onto new tasks.

pub mod app;
pub mod classify;
pub mod commands;
pub mod comparison;
pub mod config;
pub mod confirm;
pub mod errors;
pub mod filter;
pub mod inject;
pub mod parser;
pub mod store;
mod table;
pub mod tasks;

/// Command name used in user-facing hints.
pub const PROGRAM: &str = "tctx";

pub use app::{App, Command};
pub use classify::{classify, classify_str, UnsafeReason, WriteSafety};
pub use confirm::{Confirm, Prompt};
pub use errors::{ContextError, Result};
pub use filter::{parse_filter, FilterExpr};
pub use inject::{default_attributes, effective_filter, WriteDefaults};
pub use store::{Context, ContextStore, Definition};
