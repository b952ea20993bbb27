//! Template string parser using winnow.
//!
//! Parses expression text into an AST. Handles:
//! - Literal text segments
//! - `${...}` interpolations holding one expression each
//! - Escape sequences: \$ \\ \`
//! - Back-tick template literals nested inside expressions

use winnow::combinator::{alt, cut_err, delimited, preceded, terminated};
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

use super::ast::{Segment, Template};
use super::error::ParseError;
use super::expression::{expression, ws};

/// Parse a template string into an AST.
///
/// # Example
///
/// ```
/// use lazyschema::parser::{Segment, parse_template};
///
/// let template = parse_template("Hello, ${name}!").unwrap();
/// assert_eq!(template.segments.len(), 3);
/// assert_eq!(template.segments[0], Segment::Literal("Hello, ".into()));
/// ```
pub fn parse_template(input: &str) -> Result<Template, ParseError> {
    let mut remaining = input;
    let parsed = template_body(&mut remaining, None);
    let (line, column) = calculate_position(input, remaining);
    match parsed {
        Ok(template) if remaining.is_empty() => Ok(template),
        Ok(_) => Err(ParseError::Syntax {
            line,
            column,
            message: format!(
                "unexpected character: '{}'",
                remaining.chars().next().unwrap_or('?')
            ),
        }),
        Err(_) if remaining.is_empty() => Err(ParseError::UnexpectedEof { line, column }),
        Err(_) => Err(ParseError::Syntax {
            line,
            column,
            message: format!("invalid expression near '{}'", snippet(remaining)),
        }),
    }
}

/// Calculate line and column from original input and remaining input.
fn calculate_position(original: &str, remaining: &str) -> (usize, usize) {
    let consumed = original.len() - remaining.len();
    let consumed_str = &original[..consumed];
    let line = consumed_str.chars().filter(|&c| c == '\n').count() + 1;
    let column = match consumed_str.rfind('\n') {
        Some(pos) => consumed - pos,
        None => consumed + 1,
    };
    (line, column)
}

fn snippet(remaining: &str) -> String {
    remaining.chars().take(12).collect()
}

/// Parse segments until end of input or the `closing` character.
pub(super) fn template_body(input: &mut &str, closing: Option<char>) -> ModalResult<Template> {
    let mut segments = Vec::new();
    while !input.is_empty() && !closing.is_some_and(|c| input.starts_with(c)) {
        let segment = alt((
            escape_sequence,
            interpolation,
            '$'.value(Segment::Literal("$".to_string())),
            '\\'.value(Segment::Literal("\\".to_string())),
            take_while(1.., move |c: char| c != '$' && c != '\\' && Some(c) != closing)
                .map(|text: &str| Segment::Literal(text.to_string())),
        ))
        .parse_next(input)?;
        segments.push(segment);
    }
    Ok(Template {
        segments: merge_literals(segments),
    })
}

/// Merge adjacent Literal segments into single segments.
fn merge_literals(segments: Vec<Segment>) -> Vec<Segment> {
    let mut result = Vec::with_capacity(segments.len());

    for segment in segments {
        match segment {
            Segment::Literal(text) => {
                if let Some(Segment::Literal(prev)) = result.last_mut() {
                    prev.push_str(&text);
                } else {
                    result.push(Segment::Literal(text));
                }
            }
            other => result.push(other),
        }
    }

    result
}

/// Parse escape sequences: \$ -> $, \\ -> \, \` -> `
fn escape_sequence(input: &mut &str) -> ModalResult<Segment> {
    preceded('\\', one_of(['$', '\\', '`']))
        .map(|c: char| Segment::Literal(c.to_string()))
        .parse_next(input)
}

/// Parse an interpolation. Once `${` is seen the span must be well formed.
fn interpolation(input: &mut &str) -> ModalResult<Segment> {
    preceded("${", cut_err(terminated(delimited(ws, expression, ws), '}')))
        .map(Segment::Interpolation)
        .parse_next(input)
}
