//! Write-safety classification of filter expressions.
//!
//! A filter is write-safe when it reduces to a conjunction of
//! `attribute = literal` predicates and positive tags, so that it can be
//! stamped onto a new task without ambiguity.

use std::fmt;

use crate::errors::Result;
use crate::filter::{parse_filter, FilterExpr, Modifier, READ_ONLY_ATTRIBUTES};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteSafety {
    Safe,
    Unsafe(UnsafeReason),
}

impl WriteSafety {
    pub fn is_safe(&self) -> bool {
        matches!(self, WriteSafety::Safe)
    }
}

/// The first term that disqualified a filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsafeReason {
    Disjunction,
    Negation,
    TagExclusion(String),
    Modifier { attribute: String, modifier: Modifier },
    EmptyValue(String),
    /// `id`, `uuid` or `status`, which the task list assigns itself.
    ReadOnlyAttribute(String),
    Identifier,
    Pattern(String),
}

impl fmt::Display for UnsafeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnsafeReason::Disjunction => write!(f, "the filter contains an 'or' operator"),
            UnsafeReason::Negation => write!(f, "the filter contains a 'not' operator"),
            UnsafeReason::TagExclusion(tag) => {
                write!(f, "the filter excludes tag '{tag}'")
            }
            UnsafeReason::Modifier {
                attribute,
                modifier,
            } => write!(
                f,
                "the filter uses modifier '{}' on '{attribute}'",
                modifier.as_str()
            ),
            UnsafeReason::EmptyValue(attribute) => {
                write!(f, "the filter requires '{attribute}' to be empty")
            }
            UnsafeReason::ReadOnlyAttribute(attribute) => {
                write!(f, "the filter constrains '{attribute}', which a new task cannot inherit")
            }
            UnsafeReason::Identifier => write!(f, "the filter selects tasks by ID or UUID"),
            UnsafeReason::Pattern(p) => write!(f, "the filter matches description text '{p}'"),
        }
    }
}

pub fn classify(expr: &FilterExpr) -> WriteSafety {
    match first_unsafe(expr) {
        Some(reason) => WriteSafety::Unsafe(reason),
        None => WriteSafety::Safe,
    }
}

/// Parses `text` and classifies it. The text itself is never rewritten.
pub fn classify_str(text: &str) -> Result<WriteSafety> {
    Ok(classify(&parse_filter(text)?))
}

fn first_unsafe(expr: &FilterExpr) -> Option<UnsafeReason> {
    match expr {
        FilterExpr::All => None,
        FilterExpr::And(l, r) => first_unsafe(l).or_else(|| first_unsafe(r)),
        FilterExpr::Or(..) | FilterExpr::Xor(..) => Some(UnsafeReason::Disjunction),
        FilterExpr::Not(inner) => {
            // An `or` hidden under `not` is still reported as a disjunction.
            if inner.any_node(&|n| matches!(n, FilterExpr::Or(..) | FilterExpr::Xor(..))) {
                Some(UnsafeReason::Disjunction)
            } else {
                Some(UnsafeReason::Negation)
            }
        }
        FilterExpr::Attribute(p) if READ_ONLY_ATTRIBUTES.contains(&p.name.as_str()) => {
            Some(UnsafeReason::ReadOnlyAttribute(p.name.clone()))
        }
        FilterExpr::Attribute(p) => match p.modifier {
            None | Some(Modifier::Is) if p.value.is_empty() => {
                Some(UnsafeReason::EmptyValue(p.name.clone()))
            }
            None | Some(Modifier::Is) => None,
            Some(modifier) => Some(UnsafeReason::Modifier {
                attribute: p.name.clone(),
                modifier,
            }),
        },
        FilterExpr::Tag { include: true, .. } => None,
        FilterExpr::Tag {
            name,
            include: false,
        } => Some(UnsafeReason::TagExclusion(name.clone())),
        FilterExpr::Ids(_) | FilterExpr::Uuid(_) => Some(UnsafeReason::Identifier),
        FilterExpr::Pattern(p) => Some(UnsafeReason::Pattern(p.clone())),
    }
}
