use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::comparison::{cmp_values, local_today, resolve_named_date};
use crate::parser::{ParseError, Parser, Token};

/// Attributes a filter may name with `attr:value`. Anything else followed by
/// a colon is treated as a plain description word.
pub const ATTRIBUTES: &[&str] = &[
    "description",
    "due",
    "end",
    "entry",
    "id",
    "priority",
    "project",
    "recur",
    "scheduled",
    "start",
    "status",
    "until",
    "uuid",
    "wait",
];

/// Attributes a filter may test but a task never takes from a context or
/// a modification: they are assigned by the task list itself.
pub const READ_ONLY_ATTRIBUTES: &[&str] = &["id", "status", "uuid"];

const DATE_ATTRIBUTES: &[&str] = &["due", "end", "entry", "scheduled", "start", "until", "wait"];

pub fn is_date_attribute(name: &str) -> bool {
    DATE_ATTRIBUTES.contains(&name)
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// The empty filter; matches every record.
    All,
    And(Box<FilterExpr>, Box<FilterExpr>),
    Or(Box<FilterExpr>, Box<FilterExpr>),
    Xor(Box<FilterExpr>, Box<FilterExpr>),
    Not(Box<FilterExpr>),
    Attribute(AttrPredicate),
    Tag { name: String, include: bool },
    Ids(Vec<IdRange>),
    Uuid(String),
    /// Description substring: bare words, quoted literals and `/pattern/`.
    Pattern(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttrPredicate {
    pub name: String,
    pub modifier: Option<Modifier>,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Is,
    Not,
    Before,
    After,
    Contains,
    Hasnt,
    StartsWith,
    EndsWith,
    Word,
    NoWord,
    Any,
    None,
}

impl Modifier {
    pub fn parse(s: &str) -> Option<Modifier> {
        Some(match s {
            "is" | "equals" => Modifier::Is,
            "not" | "isnt" => Modifier::Not,
            "before" | "below" | "under" => Modifier::Before,
            "after" | "above" | "over" => Modifier::After,
            "contains" | "has" => Modifier::Contains,
            "hasnt" => Modifier::Hasnt,
            "startswith" | "left" => Modifier::StartsWith,
            "endswith" | "right" => Modifier::EndsWith,
            "word" => Modifier::Word,
            "noword" => Modifier::NoWord,
            "any" => Modifier::Any,
            "none" => Modifier::None,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Modifier::Is => "is",
            Modifier::Not => "not",
            Modifier::Before => "before",
            Modifier::After => "after",
            Modifier::Contains => "contains",
            Modifier::Hasnt => "hasnt",
            Modifier::StartsWith => "startswith",
            Modifier::EndsWith => "endswith",
            Modifier::Word => "word",
            Modifier::NoWord => "noword",
            Modifier::Any => "any",
            Modifier::None => "none",
        }
    }
}

/// Inclusive range of positional task IDs; a single ID has `start == end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdRange {
    pub start: u64,
    pub end: u64,
}

impl IdRange {
    pub fn contains(&self, id: u64) -> bool {
        self.start <= id && id <= self.end
    }
}

/// What the evaluator needs to know about a record.
pub trait Record {
    fn attribute(&self, name: &str) -> Option<String>;
    fn has_tag(&self, tag: &str) -> bool;
    fn id(&self) -> Option<u64>;
    fn uuid(&self) -> String;
    fn description(&self) -> &str;
}

impl FilterExpr {
    /// Conjunction that drops `All` operands.
    pub fn and(left: FilterExpr, right: FilterExpr) -> FilterExpr {
        match (left, right) {
            (FilterExpr::All, r) => r,
            (l, FilterExpr::All) => l,
            (l, r) => FilterExpr::And(Box::new(l), Box::new(r)),
        }
    }

    /// True if `pred` holds for this node or any node beneath it.
    pub fn any_node(&self, pred: &dyn Fn(&FilterExpr) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        match self {
            FilterExpr::And(l, r) | FilterExpr::Or(l, r) | FilterExpr::Xor(l, r) => {
                l.any_node(pred) || r.any_node(pred)
            }
            FilterExpr::Not(inner) => inner.any_node(pred),
            _ => false,
        }
    }

    pub fn matches<R: Record + ?Sized>(&self, rec: &R) -> bool {
        eval_filter(self, rec, local_today())
    }
}

struct TokenStream {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenStream {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn peek_keyword(&self, kw: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w == kw)
    }

    fn eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }
}

/// Parses a complete filter expression. Empty input yields `FilterExpr::All`.
pub fn parse_filter(input: &str) -> Result<FilterExpr, ParseError> {
    let tokens = Parser::new(input).tokenize()?;
    if tokens.is_empty() {
        return Ok(FilterExpr::All);
    }
    let mut ts = TokenStream { tokens, pos: 0 };
    let expr = parse_filter_or(&mut ts)?;
    if !ts.eof() {
        return Err(ParseError::InvalidSyntax("unexpected ')'".into()));
    }
    Ok(expr)
}

fn parse_filter_or(ts: &mut TokenStream) -> Result<FilterExpr, ParseError> {
    let mut left = parse_filter_and(ts)?;
    loop {
        if ts.peek_keyword("or") {
            ts.next();
            let right = parse_filter_and(ts)?;
            left = FilterExpr::Or(Box::new(left), Box::new(right));
        } else if ts.peek_keyword("xor") {
            ts.next();
            let right = parse_filter_and(ts)?;
            left = FilterExpr::Xor(Box::new(left), Box::new(right));
        } else {
            break;
        }
    }
    Ok(left)
}

// Adjacent terms without an operator are an implicit `and`.
fn parse_filter_and(ts: &mut TokenStream) -> Result<FilterExpr, ParseError> {
    let mut terms = vec![parse_filter_not(ts)?];
    loop {
        if ts.peek_keyword("and") {
            ts.next();
        } else if ts.eof()
            || ts.peek() == Some(&Token::RParen)
            || ts.peek_keyword("or")
            || ts.peek_keyword("xor")
        {
            break;
        }
        terms.push(parse_filter_not(ts)?);
    }
    Ok(conjoin(terms))
}

// IDs and UUIDs within one conjunction form a union: `1 2 +home` is
// `(1 or 2) and +home`.
fn conjoin(terms: Vec<FilterExpr>) -> FilterExpr {
    let (selectors, rest): (Vec<_>, Vec<_>) = terms
        .into_iter()
        .partition(|t| matches!(t, FilterExpr::Ids(_) | FilterExpr::Uuid(_)));
    let selection = selectors.into_iter().reduce(|a, b| match (a, b) {
        (FilterExpr::Ids(mut x), FilterExpr::Ids(y)) => {
            x.extend(y);
            FilterExpr::Ids(x)
        }
        (a, b) => FilterExpr::Or(Box::new(a), Box::new(b)),
    });
    selection
        .into_iter()
        .chain(rest)
        .reduce(|a, b| FilterExpr::And(Box::new(a), Box::new(b)))
        .unwrap_or(FilterExpr::All)
}

fn parse_filter_not(ts: &mut TokenStream) -> Result<FilterExpr, ParseError> {
    if ts.peek_keyword("not") {
        ts.next();
        let inner = parse_filter_not(ts)?;
        Ok(FilterExpr::Not(Box::new(inner)))
    } else {
        parse_filter_term(ts)
    }
}

fn parse_filter_term(ts: &mut TokenStream) -> Result<FilterExpr, ParseError> {
    match ts.next() {
        Some(Token::LParen) => {
            let inner = parse_filter_or(ts)?;
            match ts.next() {
                Some(Token::RParen) => Ok(inner),
                _ => Err(ParseError::InvalidSyntax("expected ')'".into())),
            }
        }
        Some(Token::RParen) => Err(ParseError::InvalidSyntax("unexpected ')'".into())),
        Some(Token::Literal(s)) => Ok(FilterExpr::Pattern(s)),
        Some(Token::Word(w)) => parse_term(&w),
        None => Err(ParseError::InvalidSyntax("expression expected".into())),
    }
}

fn parse_term(word: &str) -> Result<FilterExpr, ParseError> {
    if word.len() >= 2 && word.starts_with('/') && word.ends_with('/') {
        return Ok(FilterExpr::Pattern(word[1..word.len() - 1].to_string()));
    }
    if let Some(tag) = word.strip_prefix('+') {
        if is_tag_name(tag) {
            return Ok(FilterExpr::Tag {
                name: tag.to_string(),
                include: true,
            });
        }
    }
    if let Some(tag) = word.strip_prefix('-') {
        if is_tag_name(tag) {
            return Ok(FilterExpr::Tag {
                name: tag.to_string(),
                include: false,
            });
        }
    }
    // A dash after eight hex digits makes `12345678-9abc` a UUID, not a range.
    if word.len() > 8 && is_uuid_prefix(word) {
        return Ok(FilterExpr::Uuid(word.to_ascii_lowercase()));
    }
    if let Some(ranges) = parse_ids(word) {
        return Ok(FilterExpr::Ids(ranges));
    }
    if is_uuid_prefix(word) {
        return Ok(FilterExpr::Uuid(word.to_ascii_lowercase()));
    }
    if let Some((name, modifier, value)) = split_attribute(word) {
        if ATTRIBUTES.contains(&name.as_str()) {
            let modifier = match modifier {
                Some(m) => Some(Modifier::parse(&m).ok_or_else(|| {
                    ParseError::InvalidSyntax(format!("unknown modifier '{m}' on '{name}'"))
                })?),
                None => None,
            };
            if modifier.is_none() || modifier == Some(Modifier::Is) {
                if name == "id" {
                    if let Some(ranges) = parse_ids(&value) {
                        return Ok(FilterExpr::Ids(ranges));
                    }
                }
                if name == "uuid" && is_uuid_prefix(&value) {
                    return Ok(FilterExpr::Uuid(value.to_ascii_lowercase()));
                }
            }
            return Ok(FilterExpr::Attribute(AttrPredicate {
                name,
                modifier,
                value,
            }));
        }
    }
    Ok(FilterExpr::Pattern(word.to_string()))
}

fn is_tag_name(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_')
        && !s.contains(':')
        && !s.contains('=')
}

/// Splits `name[.modifier](:|=)value`. The name is lowercased.
pub fn split_attribute(word: &str) -> Option<(String, Option<String>, String)> {
    let mut p = Parser::new(word);
    let name = p.parse_identifier().ok()?;
    let modifier = if p.consume_char('.') {
        Some(p.parse_identifier().ok()?)
    } else {
        None
    };
    if !(p.consume_char(':') || p.consume_char('=')) {
        return None;
    }
    Some((name.to_ascii_lowercase(), modifier, p.rest().to_string()))
}

/// `1`, `1,3`, `2-4`, `1,5-7`. Returns `None` for anything else.
pub fn parse_ids(word: &str) -> Option<Vec<IdRange>> {
    if !word.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let mut ranges = Vec::new();
    for part in word.split(',') {
        let mut p = Parser::new(part);
        let start = p.parse_int().ok()?;
        let end = if p.consume_char('-') {
            p.parse_int().ok()?
        } else {
            start
        };
        if !p.eof() || end < start || start == 0 {
            return None;
        }
        ranges.push(IdRange { start, end });
    }
    Some(ranges)
}

const UUID_SHAPE: &str = "xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx";

/// Full UUIDs and prefixes of at least eight hex digits.
pub fn is_uuid_prefix(word: &str) -> bool {
    word.len() >= 8
        && word.len() <= UUID_SHAPE.len()
        && word
            .chars()
            .zip(UUID_SHAPE.chars())
            .all(|(c, shape)| match shape {
                'x' => c.is_ascii_hexdigit(),
                _ => c == '-',
            })
}

pub fn eval_filter<R: Record + ?Sized>(expr: &FilterExpr, rec: &R, today: NaiveDate) -> bool {
    match expr {
        FilterExpr::All => true,
        FilterExpr::And(l, r) => eval_filter(l, rec, today) && eval_filter(r, rec, today),
        FilterExpr::Or(l, r) => eval_filter(l, rec, today) || eval_filter(r, rec, today),
        FilterExpr::Xor(l, r) => eval_filter(l, rec, today) != eval_filter(r, rec, today),
        FilterExpr::Not(i) => !eval_filter(i, rec, today),
        FilterExpr::Attribute(p) => eval_attribute(p, rec, today),
        FilterExpr::Tag { name, include } => rec.has_tag(name) == *include,
        FilterExpr::Ids(ranges) => rec
            .id()
            .is_some_and(|id| ranges.iter().any(|r| r.contains(id))),
        FilterExpr::Uuid(prefix) => rec.uuid().starts_with(prefix.as_str()),
        FilterExpr::Pattern(p) => rec.description().contains(p.as_str()),
    }
}

fn eval_attribute<R: Record + ?Sized>(p: &AttrPredicate, rec: &R, today: NaiveDate) -> bool {
    let actual = rec.attribute(&p.name).filter(|a| !a.is_empty());
    let expected = if is_date_attribute(&p.name) {
        resolve_named_date(&p.value, today)
    } else {
        p.value.clone()
    };
    let equal = || match &actual {
        Some(a) => !expected.is_empty() && cmp_values(a, &expected, |o| o == Ordering::Equal),
        None => expected.is_empty(),
    };
    match p.modifier {
        None | Some(Modifier::Is) => equal(),
        Some(Modifier::Not) => !equal(),
        Some(Modifier::Before) => actual
            .as_deref()
            .is_some_and(|a| cmp_values(a, &expected, |o| o == Ordering::Less)),
        Some(Modifier::After) => actual
            .as_deref()
            .is_some_and(|a| cmp_values(a, &expected, |o| o == Ordering::Greater)),
        Some(Modifier::Contains) => actual.as_deref().is_some_and(|a| a.contains(&expected)),
        Some(Modifier::Hasnt) => !actual.as_deref().is_some_and(|a| a.contains(&expected)),
        Some(Modifier::StartsWith) => actual.as_deref().is_some_and(|a| a.starts_with(&expected)),
        Some(Modifier::EndsWith) => actual.as_deref().is_some_and(|a| a.ends_with(&expected)),
        Some(Modifier::Word) => actual
            .as_deref()
            .is_some_and(|a| a.split_whitespace().any(|w| w == expected)),
        Some(Modifier::NoWord) => !actual
            .as_deref()
            .is_some_and(|a| a.split_whitespace().any(|w| w == expected)),
        Some(Modifier::Any) => actual.is_some(),
        Some(Modifier::None) => actual.is_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    struct Rec {
        id: Option<u64>,
        uuid: &'static str,
        description: &'static str,
        tags: Vec<&'static str>,
        attrs: BTreeMap<&'static str, &'static str>,
    }

    impl Record for Rec {
        fn attribute(&self, name: &str) -> Option<String> {
            self.attrs.get(name).map(|v| v.to_string())
        }
        fn has_tag(&self, tag: &str) -> bool {
            self.tags.contains(&tag)
        }
        fn id(&self) -> Option<u64> {
            self.id
        }
        fn uuid(&self) -> String {
            self.uuid.to_string()
        }
        fn description(&self) -> &str {
            self.description
        }
    }

    fn rec() -> Rec {
        Rec {
            id: Some(2),
            uuid: "8c4b2e1a-0d6f-4a55-9e3b-2f1c7d9a6b10",
            description: "home today task",
            tags: vec!["home"],
            attrs: BTreeMap::from([("project", "Home"), ("due", "2024-03-01")]),
        }
    }

    fn eval(src: &str) -> bool {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        eval_filter(&parse_filter(src).unwrap(), &rec(), today)
    }

    fn attr(name: &str, modifier: Option<Modifier>, value: &str) -> FilterExpr {
        FilterExpr::Attribute(AttrPredicate {
            name: name.into(),
            modifier,
            value: value.into(),
        })
    }

    #[test]
    fn empty_input_is_all() {
        assert_eq!(parse_filter("   ").unwrap(), FilterExpr::All);
    }

    #[test]
    fn implicit_and_binds_tighter_than_or() {
        let parsed = parse_filter("due:today +next or project:Home").unwrap();
        let expected = FilterExpr::Or(
            Box::new(FilterExpr::And(
                Box::new(attr("due", None, "today")),
                Box::new(FilterExpr::Tag {
                    name: "next".into(),
                    include: true,
                }),
            )),
            Box::new(attr("project", None, "Home")),
        );
        assert_eq!(parsed, expected);
    }

    #[test]
    fn modifiers_and_aliases() {
        assert_eq!(
            parse_filter("due.under:today").unwrap(),
            attr("due", Some(Modifier::Before), "today")
        );
        assert_eq!(
            parse_filter("project.equals:Work").unwrap(),
            attr("project", Some(Modifier::Is), "Work")
        );
        assert!(parse_filter("due.someday:x").is_err());
    }

    #[test]
    fn identifiers() {
        assert_eq!(
            parse_filter("1,3-5").unwrap(),
            FilterExpr::Ids(vec![
                IdRange { start: 1, end: 1 },
                IdRange { start: 3, end: 5 }
            ])
        );
        assert_eq!(
            parse_filter("8C4B2E1A-0d6f").unwrap(),
            FilterExpr::Uuid("8c4b2e1a-0d6f".into())
        );
        assert_eq!(
            parse_filter("id:2").unwrap(),
            FilterExpr::Ids(vec![IdRange { start: 2, end: 2 }])
        );
        assert_eq!(
            parse_filter("1 2 +home").unwrap(),
            FilterExpr::And(
                Box::new(FilterExpr::Ids(vec![
                    IdRange { start: 1, end: 1 },
                    IdRange { start: 2, end: 2 }
                ])),
                Box::new(FilterExpr::Tag {
                    name: "home".into(),
                    include: true
                })
            )
        );
        assert_eq!(
            parse_filter("12345678-1234").unwrap(),
            FilterExpr::Uuid("12345678-1234".into())
        );
        assert_eq!(
            parse_filter("beef").unwrap(),
            FilterExpr::Pattern("beef".into())
        );
    }

    #[test]
    fn unknown_attribute_is_a_word() {
        assert_eq!(
            parse_filter("http://example.com").unwrap(),
            FilterExpr::Pattern("http://example.com".into())
        );
    }

    #[test]
    fn unbalanced_parens() {
        assert!(parse_filter("(project:Home").is_err());
        assert!(parse_filter("project:Home)").is_err());
        assert!(parse_filter("project:Home or").is_err());
    }

    #[test]
    fn evaluates_against_record() {
        assert!(eval("+home"));
        assert!(!eval("-home"));
        assert!(eval("project:Home due:today"));
        assert!(!eval("project:Work"));
        assert!(eval("project:Work or +home"));
        assert!(eval("due.before:tomorrow"));
        assert!(!eval("due.after:today"));
        assert!(eval("priority:"));
        assert!(eval("priority.none:"));
        assert!(eval("project.not:Work"));
        assert!(eval("description.contains:today"));
        assert!(eval("2"));
        assert!(!eval("1,3"));
        assert!(eval("8c4b2e1a"));
        assert!(eval("/today/ and not +work"));
        assert!(eval("+home xor +work"));
    }
}
