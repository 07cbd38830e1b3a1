//! Where the active context meets the rest of the tool: scoping report
//! filters and defaulting attributes on new tasks.
//!
//! Both entry points take the active context as an argument and read no
//! other state.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::classify::{classify, WriteSafety};
use crate::errors::Result;
use crate::filter::{parse_filter, FilterExpr, Modifier};
use crate::store::Context;
use crate::tasks::Task;

/// True if the filter selects tasks by ID or UUID anywhere in it.
pub fn has_identifier_selector(filter: &FilterExpr) -> bool {
    filter.any_node(&|n| matches!(n, FilterExpr::Ids(_) | FilterExpr::Uuid(_)))
}

/// The filter a report should evaluate: `user`, intersected with the active
/// context's read filter unless the report opts out of contexts or the user
/// named tasks explicitly.
pub fn effective_filter(
    user: FilterExpr,
    active: Option<&Context>,
    report_context_enabled: bool,
) -> Result<FilterExpr> {
    let Some(context) = active else {
        return Ok(user);
    };
    if !report_context_enabled {
        debug!(context = %context.name, "context disabled for this report");
        return Ok(user);
    }
    if has_identifier_selector(&user) {
        debug!(context = %context.name, "explicit ID or UUID, context not applied");
        return Ok(user);
    }
    let read = parse_filter(&context.read)?;
    debug!(context = %context.name, read = %context.read, "context applied");
    Ok(FilterExpr::and(read, user))
}

/// Attribute values and tags implied by a write filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteDefaults {
    pub attributes: BTreeMap<String, String>,
    pub tags: BTreeSet<String>,
}

impl WriteDefaults {
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.tags.is_empty()
    }

    /// Stamps the defaults onto `task`. Call before applying the user's own
    /// modifications so that those win.
    pub fn apply(&self, task: &mut Task, today: NaiveDate) {
        for (name, value) in &self.attributes {
            task.set_attribute(name, value, today);
        }
        task.tags.extend(self.tags.iter().cloned());
    }
}

pub fn default_attributes(active: Option<&Context>) -> Result<WriteDefaults> {
    let Some(write) = active.and_then(|c| c.write.as_deref()) else {
        return Ok(WriteDefaults::default());
    };
    let expr = parse_filter(write)?;
    if let WriteSafety::Unsafe(reason) = classify(&expr) {
        // Only reachable when the rc file was edited by hand.
        warn!(filter = write, %reason, "ignoring write filter");
        return Ok(WriteDefaults::default());
    }
    let mut defaults = WriteDefaults::default();
    collect(&expr, &mut defaults);
    Ok(defaults)
}

fn collect(expr: &FilterExpr, out: &mut WriteDefaults) {
    match expr {
        FilterExpr::And(l, r) => {
            collect(l, out);
            collect(r, out);
        }
        FilterExpr::Attribute(p) if matches!(p.modifier, None | Some(Modifier::Is)) => {
            out.attributes.insert(p.name.clone(), p.value.clone());
        }
        FilterExpr::Tag {
            name,
            include: true,
        } => {
            out.tags.insert(name.clone());
        }
        _ => {}
    }
}
