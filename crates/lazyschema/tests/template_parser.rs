//! Integration tests for template parsing.

use lazyschema::parser::{
    BinaryOp, Expr, LogicalOp, ParseError, RefSegment, Reference, Segment, UnaryOp,
    parse_template,
};
use pretty_assertions::assert_eq;
use serde_json::json;

/// Parse a template that is exactly one `${...}` span.
fn expr(text: &str) -> Expr {
    let template = parse_template(&format!("${{{text}}}")).unwrap();
    template.single_expression().cloned().unwrap()
}

fn reference(parents: usize, keys: &[&str]) -> Expr {
    Expr::Reference(Reference {
        parents,
        segments: keys.iter().map(|k| RefSegment::Key(k.to_string())).collect(),
    })
}

fn number(n: i64) -> Expr {
    Expr::Literal(json!(n))
}

// =============================================================================
// Literals and segments
// =============================================================================

#[test]
fn test_pure_literal() {
    let t = parse_template("Hello, world!").unwrap();
    assert_eq!(t.segments, vec![Segment::Literal("Hello, world!".into())]);
}

#[test]
fn test_empty_string() {
    let t = parse_template("").unwrap();
    assert_eq!(t.segments, vec![]);
}

#[test]
fn test_interpolation_between_literals() {
    let t = parse_template("Hello, ${name}!").unwrap();
    assert_eq!(
        t.segments,
        vec![
            Segment::Literal("Hello, ".into()),
            Segment::Interpolation(reference(0, &["name"])),
            Segment::Literal("!".into()),
        ]
    );
    assert!(t.single_expression().is_none());
}

#[test]
fn test_escapes_merge_into_literal() {
    let t = parse_template(r"a \${b} \\ c").unwrap();
    assert_eq!(t.segments, vec![Segment::Literal(r"a ${b} \ c".into())]);
}

#[test]
fn test_lone_dollar_is_literal() {
    let t = parse_template("costs $5").unwrap();
    assert_eq!(t.segments, vec![Segment::Literal("costs $5".into())]);
}

#[test]
fn test_whitespace_inside_span() {
    assert_eq!(expr("  name  "), reference(0, &["name"]));
}

// =============================================================================
// Values
// =============================================================================

#[test]
fn test_scalar_literals() {
    assert_eq!(expr("42"), number(42));
    assert_eq!(expr("2.5"), Expr::Literal(json!(2.5)));
    assert_eq!(expr("true"), Expr::Literal(json!(true)));
    assert_eq!(expr("null"), Expr::Literal(json!(null)));
    assert_eq!(expr("'it\\'s'"), Expr::Literal(json!("it's")));
    assert_eq!(expr("\"a}b\""), Expr::Literal(json!("a}b")));
}

#[test]
fn test_array_and_object_literals() {
    assert_eq!(expr("[1, 2]"), Expr::Array(vec![number(1), number(2)]));
    assert_eq!(
        expr("{ a: 1, 'b c': x }"),
        Expr::Object(vec![
            ("a".to_string(), number(1)),
            ("b c".to_string(), reference(0, &["x"])),
        ])
    );
}

#[test]
fn test_backtick_template() {
    let Expr::Template(inner) = expr("`hi ${who}`") else {
        panic!("expected template");
    };
    assert_eq!(
        inner.segments,
        vec![
            Segment::Literal("hi ".into()),
            Segment::Interpolation(reference(0, &["who"])),
        ]
    );
}

// =============================================================================
// References
// =============================================================================

#[test]
fn test_dotted_reference() {
    assert_eq!(expr("user.name.first"), reference(0, &["user", "name", "first"]));
    assert_eq!(expr("items.0"), reference(0, &["items", "0"]));
}

#[test]
fn test_parent_reference() {
    assert_eq!(expr("^.site"), reference(1, &["site"]));
    assert_eq!(expr("^.^.a.b"), reference(2, &["a", "b"]));
}

#[test]
fn test_computed_index() {
    assert_eq!(
        expr("items[i]"),
        Expr::Reference(Reference {
            parents: 0,
            segments: vec![
                RefSegment::Key("items".into()),
                RefSegment::Index(Box::new(reference(0, &["i"]))),
            ],
        })
    );
}

#[test]
fn test_context_reference() {
    assert_eq!(expr("$context.lang"), reference(0, &["$context", "lang"]));
}

// =============================================================================
// Calls
// =============================================================================

#[test]
fn test_call_with_dotted_name() {
    assert_eq!(
        expr("fmt.date(when, 'short')"),
        Expr::Call {
            name: "fmt.date".into(),
            args: vec![reference(0, &["when"]), Expr::Literal(json!("short"))],
        }
    );
}

#[test]
fn test_call_without_arguments() {
    assert_eq!(
        expr("now()"),
        Expr::Call {
            name: "now".into(),
            args: vec![],
        }
    );
}

#[test]
fn test_fresh_becomes_its_own_node() {
    assert_eq!(
        expr("fresh(user.name)"),
        Expr::Fresh(Reference {
            parents: 0,
            segments: vec![RefSegment::Key("user".into()), RefSegment::Key("name".into())],
        })
    );
}

#[test]
fn test_member_on_call_result() {
    assert_eq!(
        expr("load().name"),
        Expr::Member {
            object: Box::new(Expr::Call {
                name: "load".into(),
                args: vec![],
            }),
            key: "name".into(),
        }
    );
}

// =============================================================================
// Operators
// =============================================================================

#[test]
fn test_precedence() {
    assert_eq!(
        expr("1 + 2 * 3"),
        Expr::Binary {
            op: BinaryOp::Add,
            left: Box::new(number(1)),
            right: Box::new(Expr::Binary {
                op: BinaryOp::Mul,
                left: Box::new(number(2)),
                right: Box::new(number(3)),
            }),
        }
    );
}

#[test]
fn test_subtraction_is_left_associative() {
    assert_eq!(
        expr("a - b - 1"),
        Expr::Binary {
            op: BinaryOp::Sub,
            left: Box::new(Expr::Binary {
                op: BinaryOp::Sub,
                left: Box::new(reference(0, &["a"])),
                right: Box::new(reference(0, &["b"])),
            }),
            right: Box::new(number(1)),
        }
    );
}

#[test]
fn test_unary_and_comparison() {
    assert_eq!(
        expr("!a == b"),
        Expr::Binary {
            op: BinaryOp::Eq,
            left: Box::new(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(reference(0, &["a"])),
            }),
            right: Box::new(reference(0, &["b"])),
        }
    );
    assert!(matches!(expr("a <= b"), Expr::Binary { op: BinaryOp::Le, .. }));
    assert!(matches!(expr("a != b"), Expr::Binary { op: BinaryOp::Ne, .. }));
}

#[test]
fn test_logical_operators() {
    assert!(matches!(expr("a ?? b"), Expr::Logical { op: LogicalOp::Coalesce, .. }));
    assert!(matches!(
        expr("a || b && c"),
        Expr::Logical { op: LogicalOp::Or, .. }
    ));
}

#[test]
fn test_ternary() {
    assert_eq!(
        expr("n == 1 ? 'one' : 'many'"),
        Expr::Conditional {
            condition: Box::new(Expr::Binary {
                op: BinaryOp::Eq,
                left: Box::new(reference(0, &["n"])),
                right: Box::new(number(1)),
            }),
            then: Box::new(Expr::Literal(json!("one"))),
            otherwise: Box::new(Expr::Literal(json!("many"))),
        }
    );
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_unterminated_span() {
    assert!(matches!(
        parse_template("Hello ${name"),
        Err(ParseError::UnexpectedEof { .. })
    ));
}

#[test]
fn test_dangling_operator() {
    let err = parse_template("${1 +}").unwrap_err();
    assert!(matches!(err, ParseError::Syntax { line: 1, .. }));
}

#[test]
fn test_error_line_tracking() {
    let err = parse_template("first line\nsecond ${ ) }").unwrap_err();
    let ParseError::Syntax { line, .. } = err else {
        panic!("expected syntax error");
    };
    assert_eq!(line, 2);
}
