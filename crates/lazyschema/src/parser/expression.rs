//! Expression grammar for `${...}` spans.
//!
//! Precedence, loosest first: `?:`, `??`, `||`, `&&`, `== !=`,
//! `< <= > >=`, `+ -`, `* / %`, unary `! -`, then postfix `[i]` and `.key`.

use serde_json::Value;
use winnow::ascii::{digit1, multispace0};
use winnow::combinator::{alt, delimited, opt, preceded, repeat, separated, terminated};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::stream::Stream;
use winnow::token::{any, none_of, take_while};

use super::ast::{BinaryOp, Expr, LogicalOp, RefSegment, Reference, UnaryOp};
use super::template::template_body;

type Operand = fn(&mut &str) -> ModalResult<Expr>;

pub(super) fn ws(input: &mut &str) -> ModalResult<()> {
    multispace0.void().parse_next(input)
}

pub(super) fn expression(input: &mut &str) -> ModalResult<Expr> {
    let condition = coalesce(input)?;
    let branches = opt((
        delimited(ws, '?', ws),
        expression,
        delimited(ws, ':', ws),
        expression,
    ))
    .parse_next(input)?;
    Ok(match branches {
        Some((_, then, _, otherwise)) => Expr::Conditional {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        },
        None => condition,
    })
}

fn coalesce(input: &mut &str) -> ModalResult<Expr> {
    fold_logical(input, or, "??", LogicalOp::Coalesce)
}

fn or(input: &mut &str) -> ModalResult<Expr> {
    fold_logical(input, and, "||", LogicalOp::Or)
}

fn and(input: &mut &str) -> ModalResult<Expr> {
    fold_logical(input, equality, "&&", LogicalOp::And)
}

fn equality(input: &mut &str) -> ModalResult<Expr> {
    fold_binary(
        input,
        comparison,
        alt(("==".value(BinaryOp::Eq), "!=".value(BinaryOp::Ne))),
    )
}

fn comparison(input: &mut &str) -> ModalResult<Expr> {
    fold_binary(
        input,
        additive,
        alt((
            "<=".value(BinaryOp::Le),
            ">=".value(BinaryOp::Ge),
            '<'.value(BinaryOp::Lt),
            '>'.value(BinaryOp::Gt),
        )),
    )
}

fn additive(input: &mut &str) -> ModalResult<Expr> {
    fold_binary(
        input,
        multiplicative,
        alt(('+'.value(BinaryOp::Add), '-'.value(BinaryOp::Sub))),
    )
}

fn multiplicative(input: &mut &str) -> ModalResult<Expr> {
    fold_binary(
        input,
        unary,
        alt((
            '*'.value(BinaryOp::Mul),
            '/'.value(BinaryOp::Div),
            '%'.value(BinaryOp::Rem),
        )),
    )
}

fn fold_logical(
    input: &mut &str,
    operand: Operand,
    token: &'static str,
    op: LogicalOp,
) -> ModalResult<Expr> {
    let mut left = operand(input)?;
    while opt(delimited(ws, token, ws)).parse_next(input)?.is_some() {
        let right = operand(input)?;
        left = Expr::Logical {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
    }
    Ok(left)
}

fn fold_binary<'i>(
    input: &mut &'i str,
    operand: Operand,
    mut operator: impl Parser<&'i str, BinaryOp, ErrMode<ContextError>>,
) -> ModalResult<Expr> {
    let mut left = operand(input)?;
    while let Some(op) = opt(delimited(ws, operator.by_ref(), ws)).parse_next(input)? {
        let right = operand(input)?;
        left = Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
    }
    Ok(left)
}

fn unary(input: &mut &str) -> ModalResult<Expr> {
    let op = opt(terminated(
        alt(('!'.value(UnaryOp::Not), '-'.value(UnaryOp::Neg))),
        ws,
    ))
    .parse_next(input)?;
    match op {
        Some(op) => {
            let operand = unary(input)?;
            Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
            })
        }
        None => postfix(input),
    }
}

fn postfix(input: &mut &str) -> ModalResult<Expr> {
    let mut expr = primary(input)?;
    loop {
        if let Some(index) = opt(bracketed).parse_next(input)? {
            expr = Expr::Index {
                object: Box::new(expr),
                index: Box::new(index),
            };
        } else if let Some(key) = opt(preceded('.', key_segment)).parse_next(input)? {
            expr = Expr::Member {
                object: Box::new(expr),
                key: key.to_string(),
            };
        } else {
            return Ok(expr);
        }
    }
}

fn primary(input: &mut &str) -> ModalResult<Expr> {
    alt((
        number,
        quoted.map(|text| Expr::Literal(Value::String(text))),
        backtick,
        array,
        object,
        delimited(('(', ws), expression, (ws, ')')),
        parent_reference,
        named,
    ))
    .parse_next(input)
}

fn number(input: &mut &str) -> ModalResult<Expr> {
    (digit1, opt(('.', digit1)))
        .take()
        .try_map(serde_json::from_str::<Value>)
        .map(Expr::Literal)
        .parse_next(input)
}

/// Single or double quoted string with backslash escapes.
fn quoted(input: &mut &str) -> ModalResult<String> {
    alt((quoted_with('\''), quoted_with('"'))).parse_next(input)
}

fn quoted_with<'i>(quote: char) -> impl Parser<&'i str, String, ErrMode<ContextError>> {
    delimited(
        quote,
        repeat(
            0..,
            alt((preceded('\\', any).map(unescape), none_of([quote, '\\']))),
        ),
        quote,
    )
}

fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        other => other,
    }
}

fn backtick(input: &mut &str) -> ModalResult<Expr> {
    delimited('`', |i: &mut &str| template_body(i, Some('`')), '`')
        .map(Expr::Template)
        .parse_next(input)
}

fn array(input: &mut &str) -> ModalResult<Expr> {
    delimited(
        ('[', ws),
        separated(0.., delimited(ws, expression, ws), ','),
        (ws, ']'),
    )
    .map(Expr::Array)
    .parse_next(input)
}

fn object(input: &mut &str) -> ModalResult<Expr> {
    delimited(
        ('{', ws),
        separated(0.., object_entry, (ws, ',', ws)),
        (ws, '}'),
    )
    .map(Expr::Object)
    .parse_next(input)
}

fn object_entry(input: &mut &str) -> ModalResult<(String, Expr)> {
    let key = alt((quoted, identifier.map(str::to_string))).parse_next(input)?;
    (ws, ':', ws).void().parse_next(input)?;
    let value = expression(input)?;
    Ok((key, value))
}

fn bracketed(input: &mut &str) -> ModalResult<Expr> {
    delimited(('[', ws), expression, (ws, ']')).parse_next(input)
}

/// `^.` markers followed by a relative reference.
fn parent_reference(input: &mut &str) -> ModalResult<Expr> {
    let parents: usize = repeat(1.., parent_marker).parse_next(input)?;
    let first = key_segment(input)?;
    let mut segments = vec![RefSegment::Key(first.to_string())];
    segments.extend(reference_tail(input)?);
    Ok(Expr::Reference(Reference { parents, segments }))
}

fn parent_marker(input: &mut &str) -> ModalResult<()> {
    terminated('^', '.').void().parse_next(input)
}

/// Keyword, call or plain reference starting with an identifier.
fn named(input: &mut &str) -> ModalResult<Expr> {
    let first = identifier(input)?;
    match first {
        "true" => return Ok(Expr::Literal(Value::Bool(true))),
        "false" => return Ok(Expr::Literal(Value::Bool(false))),
        "null" => return Ok(Expr::Literal(Value::Null)),
        _ => {}
    }

    let checkpoint = input.checkpoint();
    let mut name = first.to_string();
    while let Some(part) = opt(preceded('.', identifier)).parse_next(input)? {
        name.push('.');
        name.push_str(part);
    }
    if opt(preceded(ws, '(')).parse_next(input)?.is_some() {
        let args: Vec<Expr> = terminated(
            separated(0.., delimited(ws, expression, ws), ','),
            (ws, ')'),
        )
        .parse_next(input)?;
        return Ok(call(name, args));
    }

    input.reset(&checkpoint);
    let mut segments = vec![RefSegment::Key(first.to_string())];
    segments.extend(reference_tail(input)?);
    Ok(Expr::Reference(Reference {
        parents: 0,
        segments,
    }))
}

fn call(name: String, args: Vec<Expr>) -> Expr {
    match args.as_slice() {
        [Expr::Reference(reference)] if name == "fresh" => Expr::Fresh(reference.clone()),
        _ => Expr::Call { name, args },
    }
}

fn reference_tail(input: &mut &str) -> ModalResult<Vec<RefSegment>> {
    repeat(
        0..,
        alt((
            preceded('.', key_segment).map(|key: &str| RefSegment::Key(key.to_string())),
            bracketed.map(|index| RefSegment::Index(Box::new(index))),
        )),
    )
    .parse_next(input)
}

fn identifier<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        take_while(1, |c: char| c.is_alphabetic() || c == '_' || c == '$'),
        take_while(0.., is_key_char),
    )
        .take()
        .parse_next(input)
}

/// A reference step after `.`; may be numeric.
fn key_segment<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    take_while(1.., is_key_char).parse_next(input)
}

fn is_key_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
