//! Public AST types for expression templates.
//!
//! These types are public to enable external tooling (linters, formatters, etc.).

use serde_json::Value;

/// A parsed template: literal text interleaved with `${...}` spans.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub segments: Vec<Segment>,
}

impl Template {
    /// The expression of a template that is exactly one span, if it is one.
    pub fn single_expression(&self) -> Option<&Expr> {
        match self.segments.as_slice() {
            [Segment::Interpolation(expr)] => Some(expr),
            _ => None,
        }
    }
}

/// A segment within a template.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Literal text (no interpolation).
    Literal(String),
    /// An interpolation: `${expr}`
    Interpolation(Expr),
}

/// An expression inside an interpolation span.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Number, string, boolean or null literal.
    Literal(Value),
    /// A back-tick template literal; always evaluates to a string.
    Template(Template),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    /// A path reference resolved against the document.
    Reference(Reference),
    /// `fresh(reference)`: re-evaluate the target and refresh its cache entry.
    Fresh(Reference),
    /// A built-in or registered resolver call by dotted name.
    Call { name: String, args: Vec<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Short-circuiting `&&`, `||` and `??`.
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// `.key` applied to a computed value.
    Member { object: Box<Expr>, key: String },
    /// `[index]` applied to a computed value.
    Index { object: Box<Expr>, index: Box<Expr> },
}

/// A reference to a document path, relative to the expression's node.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    /// Number of leading `^` markers; each climbs one level.
    pub parents: usize,
    pub segments: Vec<RefSegment>,
}

/// One step of a reference.
#[derive(Debug, Clone, PartialEq)]
pub enum RefSegment {
    /// `.name` or `.0`
    Key(String),
    /// `[expr]`, evaluated to a key or index.
    Index(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Coalesce,
}
