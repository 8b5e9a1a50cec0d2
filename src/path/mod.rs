//! Field-path expressions
//!
//! This module is the one place path semantics are defined. Every component
//! that reads or writes a nested field - request building, item matching,
//! pagination tokens, drift comparison - goes through [`parse`], [`lookup`]
//! and [`set`].
//!
//! A path is a sequence of segments joined by dots (`spec.name`). A segment
//! whose field name contains a literal dot is written in bracket-quote form,
//! with either quote style: `metadata['app.kubernetes.io/name']` or
//! `metadata["app.kubernetes.io/name"]`. Dots inside brackets never split.

use crate::error::{Error, Result};
use serde_json::{Map, Value};

/// Scanner state for [`parse`]. Bracket and quote handling are explicit
/// sub-states rather than one big regex so the edge cases stay testable.
enum State {
    /// Expecting the first character of a new segment.
    SegStart,
    /// Inside a plain (unbracketed) segment.
    Plain,
    /// Just consumed `[`, expecting an opening quote.
    BracketOpen,
    /// Inside a quoted bracket segment; holds the opening quote character.
    Quoted(char),
    /// Consumed the closing quote, expecting `]`.
    QuoteClosed,
    /// Consumed `]`, expecting `.` or end of input.
    AfterBracket,
}

fn malformed(path: &str, reason: &str) -> Error {
    Error::MalformedPath {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse a field-path expression into its ordered segments.
///
/// The empty string is valid and parses to a single empty segment, used as
/// a "no-op" path that addresses the document itself.
pub fn parse(path: &str) -> Result<Vec<String>> {
    if path.is_empty() {
        return Ok(vec![String::new()]);
    }

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut state = State::SegStart;

    for c in path.chars() {
        state = match state {
            State::SegStart => match c {
                '.' => return Err(malformed(path, "empty segment (leading or doubled dot)")),
                '[' => State::BracketOpen,
                ']' => return Err(malformed(path, "unmatched closing bracket")),
                ' ' => return Err(malformed(path, "embedded space")),
                _ => {
                    current.push(c);
                    State::Plain
                }
            },
            State::Plain => match c {
                '.' => {
                    segments.push(std::mem::take(&mut current));
                    State::SegStart
                }
                '[' => {
                    // Bracket directly after an identifier starts a new
                    // segment: a['b.c'] is the two segments a, b.c.
                    segments.push(std::mem::take(&mut current));
                    State::BracketOpen
                }
                ']' => return Err(malformed(path, "unmatched closing bracket")),
                ' ' => return Err(malformed(path, "embedded space")),
                _ => {
                    current.push(c);
                    State::Plain
                }
            },
            State::BracketOpen => match c {
                '\'' | '"' => State::Quoted(c),
                ']' => return Err(malformed(path, "empty bracket content")),
                _ => return Err(malformed(path, "bracket content must be quoted")),
            },
            State::Quoted(quote) => {
                if c == quote {
                    if current.is_empty() {
                        return Err(malformed(path, "empty bracket content"));
                    }
                    State::QuoteClosed
                } else {
                    current.push(c);
                    State::Quoted(quote)
                }
            }
            State::QuoteClosed => match c {
                ']' => {
                    segments.push(std::mem::take(&mut current));
                    State::AfterBracket
                }
                _ => return Err(malformed(path, "expected ']' after closing quote")),
            },
            State::AfterBracket => match c {
                '.' => State::SegStart,
                '[' => return Err(malformed(path, "adjacent brackets without a separating dot")),
                _ => return Err(malformed(path, "expected '.' after bracket segment")),
            },
        };
    }

    match state {
        State::Plain => {
            segments.push(current);
            Ok(segments)
        }
        State::AfterBracket => Ok(segments),
        State::SegStart => Err(malformed(path, "trailing dot")),
        State::BracketOpen | State::QuoteClosed => Err(malformed(path, "unmatched bracket")),
        State::Quoted(_) => Err(malformed(path, "unterminated quote in bracket")),
    }
}

/// Resolve parsed segments against a document, returning the value they
/// address. A single empty segment addresses the document itself. Numeric
/// segments index into arrays.
pub fn lookup<'a>(document: &'a Value, segments: &[String]) -> Option<&'a Value> {
    if segments.len() == 1 && segments[0].is_empty() {
        return Some(document);
    }

    let mut current = document;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Parse `path` and resolve it against `document` in one step.
pub fn lookup_path<'a>(document: &'a Value, path: &str) -> Result<Option<&'a Value>> {
    let segments = parse(path)?;
    Ok(lookup(document, &segments))
}

/// Write a value at a (possibly nested) position inside a document,
/// creating intermediate objects as needed. A scalar sitting where the
/// mapping declared a nested target is replaced by an object. A no-op path
/// writes nothing.
pub fn set(document: &mut Map<String, Value>, segments: &[String], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };
    if last.is_empty() && parents.is_empty() {
        return;
    }

    let mut current = document;
    for parent in parents {
        let slot = current
            .entry(parent.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        match slot {
            Value::Object(map) => current = map,
            _ => return,
        }
    }
    current.insert(last.clone(), value);
}
