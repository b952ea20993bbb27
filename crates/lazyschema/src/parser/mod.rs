//! Expression template parser.
//!
//! Expression keys hold template text: literal runs mixed with `${...}`
//! spans. The parser produces an AST that the interpreter evaluates and
//! that external tooling can inspect.

pub mod ast;
pub mod error;
mod expression;
mod template;

pub use ast::*;
pub use error::ParseError;
pub use template::parse_template;
