use indoc::indoc;

use super::*;
use crate::ast::{self, BinaryOp, ExprKind, StmtKind};

fn module(src: &str) -> ast::Module<'_> {
  parse(src).unwrap_or_else(|errs| {
    for e in &errs {
      eprintln!("{e}");
    }
    panic!("failed to parse source, see errors above")
  })
}

fn fails(src: &str) {
  if parse(src).is_ok() {
    panic!("expected a parse error, got Ok");
  }
}

fn only_expr(m: &ast::Module<'_>) -> &ExprKind<'_> {
  assert_eq!(m.body.len(), 1, "expected exactly one top-level statement");
  match &*m.body[0] {
    StmtKind::Expr(e) => &**e,
    other => panic!("expected an expression statement, got {other:?}"),
  }
}

#[test]
fn import_paths() {
  // A bare identifier is a single-component path; a dotted path needs
  // quoting since `.` is ordinarily the field-access operator.
  let m = module(indoc! {r#"
    import a
    import "a.b"
    import "a.b.c" as x
  "#});
  assert_eq!(m.imports.len(), 3);
  assert_eq!(m.imports[0].path.as_ref(), "a");
  assert_eq!(m.imports[1].path.as_ref(), "a.b");
  assert_eq!(m.imports[2].alias.as_ref().map(|a| a.as_ref()), Some("x"));
}

#[test]
fn import_must_be_a_single_identifier_component() {
  fails("import {a, b}\n");
}

#[test]
fn designate_and_walrus() {
  let m = module("designate x = 1\ny := 2\n");
  assert!(matches!(&*m.body[0], StmtKind::Designate(d) if d.name.as_ref() == "x"));
  assert!(matches!(&*m.body[1], StmtKind::Designate(d) if d.name.as_ref() == "y"));
}

#[test]
fn binary_precedence() {
  let m = module("1 + 2 * 3\n");
  let ExprKind::Binary(b) = only_expr(&m) else {
    panic!("expected a binary expression")
  };
  assert_eq!(b.op, BinaryOp::Add);
  assert!(matches!(&*b.left, ExprKind::Literal(_)));
  assert!(matches!(&*b.right, ExprKind::Binary(_)));
}

#[test]
fn comparison_and_logical_operators() {
  for (src, op) in [
    ("a == b\n", BinaryOp::Eq),
    ("a != b\n", BinaryOp::Neq),
    ("a >= b\n", BinaryOp::MoreEq),
    ("a <= b\n", BinaryOp::LessEq),
    ("a && b\n", BinaryOp::And),
    ("a || b\n", BinaryOp::Or),
    ("a ?? b\n", BinaryOp::Maybe),
  ] {
    let m = module(src);
    let ExprKind::Binary(b) = only_expr(&m) else {
      panic!("expected a binary expression for `{src}`")
    };
    assert_eq!(b.op, op, "wrong operator for `{src}`");
  }
}

#[test]
fn unary_and_postfix() {
  let m = module("-a\n");
  assert!(matches!(only_expr(&m), ExprKind::Unary(_)));

  let m = module("a.b[c].d\n");
  assert!(matches!(only_expr(&m), ExprKind::GetField(_, name) if name.as_ref() == "d"));
}

#[test]
fn call_with_spread_and_trailing_comma() {
  let m = module("a(b, c, ...rest,)\n");
  let ExprKind::Call(call) = only_expr(&m) else {
    panic!("expected a call expression")
  };
  assert_eq!(call.args.len(), 3);
  assert!(matches!(call.args[2], ast::Arg::Spread(_)));
}

#[test]
fn literals() {
  let m = module(indoc! {r#"
    null
    true
    false
    1
    0.1
    1.5e3
  "#});
  assert_eq!(m.body.len(), 6);
}

#[test]
fn list_and_dict_literals() {
  let m = module("[0, 1, 2,]\n");
  assert!(matches!(
    only_expr(&m),
    ExprKind::Literal(lit) if matches!(&**lit, ast::Literal::List(items) if items.len() == 3)
  ));

  let m = module("{a: 1, b: 2}\n");
  assert!(matches!(
    only_expr(&m),
    ExprKind::Literal(lit) if matches!(&**lit, ast::Literal::Dict(entries) if entries.len() == 2)
  ));
}

#[test]
fn cycle_while() {
  let m = module(indoc! {"
    cycle while true:
        declare(1)
  "});
  assert!(matches!(&*m.body[0], StmtKind::CycleWhile(_)));
}

#[test]
fn cycle_through() {
  let m = module(indoc! {"
    cycle item through items:
        declare(item)
  "});
  assert!(matches!(&*m.body[0], StmtKind::CycleThrough(_)));
}

#[test]
fn cycle_from_to_with_step() {
  let m = module(indoc! {"
    cycle i from 0 to 10 where 2:
        declare(i)
  "});
  let StmtKind::CycleFromTo(c) = &*m.body[0] else {
    panic!("expected a `cycle from` statement")
  };
  assert!(c.step.is_some());
}

#[test]
fn protocol_and_sequence() {
  let m = module(indoc! {"
    protocol add(a, b):
        return a + b

    sequence counter(n):
        yield n
  "});
  assert!(matches!(&*m.body[0], StmtKind::Protocol(p) if !p.is_sequence && p.name.as_ref() == "add"));
  assert!(matches!(&*m.body[1], StmtKind::Protocol(p) if p.is_sequence && p.name.as_ref() == "counter"));
}

#[test]
fn async_protocol() {
  let m = module(indoc! {"
    async protocol fetch(url):
        return url
  "});
  assert!(matches!(&*m.body[0], StmtKind::Protocol(p) if p.is_async));
}

#[test]
fn entity_with_inheritance_and_ascend() {
  let m = module(indoc! {"
    entity Animal:
        protocol construct(name):
            self.name = name

    entity Dog inherits Animal:
        protocol construct(name):
            ascend construct(name)
  "});
  let StmtKind::Entity(dog) = &*m.body[1] else {
    panic!("expected an entity statement")
  };
  assert_eq!(dog.name.as_ref(), "Dog");
  assert_eq!(dog.parent.as_ref().map(|p| p.as_ref()), Some("Animal"));
}

#[test]
fn ascend_without_parent_is_a_parse_time_acceptance_and_runtime_error() {
  // `ascend` outside of an entity that declares a parent is rejected at
  // parse time (the context flag is threaded through the whole entity body).
  fails(indoc! {"
    entity Animal:
        protocol construct(name):
            ascend construct(name)
  "});
}

#[test]
fn manifest_expr() {
  let m = module(r#"manifest Dog("Rex")"#);
  assert!(matches!(only_expr(&m), ExprKind::Manifest(man) if man.class.as_ref() == "Dog"));
}

#[test]
fn attempt_recover() {
  let m = module(indoc! {"
    attempt:
        declare(1 / 0)
    recover e:
        declare(e)
  "});
  let StmtKind::Attempt(a) = &*m.body[0] else {
    panic!("expected an attempt statement")
  };
  assert_eq!(a.error_name.as_ref().map(|n| n.as_ref()), Some("e"));
}

#[test]
fn scheme_execute() {
  let m = module(indoc! {"
    scheme:
        declare(1)
    execute
  "});
  assert!(matches!(&*m.body[0], StmtKind::Scheme(_)));
}

#[test]
fn foresee_alternate_otherwise() {
  let m = module(indoc! {"
    foresee a:
        declare(1)
    alternate b:
        declare(2)
    otherwise:
        declare(3)
  "});
  let StmtKind::Foresee(f) = &*m.body[0] else {
    panic!("expected a foresee statement")
  };
  assert_eq!(f.alternates.len(), 1);
  assert!(f.otherwise.is_some());
}

#[test]
fn situation_alignment_otherwise() {
  let m = module(indoc! {"
    situation x:
        alignment 1, 2:
            declare(a)
        otherwise:
            declare(b)
  "});
  assert!(matches!(&*m.body[0], StmtKind::Situation(_)));
}

#[test]
fn list_and_generator_comprehensions() {
  let m = module("[x cycle through xs as x]\n");
  assert!(matches!(only_expr(&m), ExprKind::ListComp(_)));

  let m = module("(x for x through xs where x > 0)\n");
  assert!(matches!(only_expr(&m), ExprKind::GeneratorExpr(_)));
}

#[test]
fn indentation_must_match_a_preceding_block() {
  fails(indoc! {"
    import a
      import b
  "});
}

#[test]
fn bare_assignment_is_not_a_valid_call_argument() {
  // Call arguments are positional or spread only — there is no named-argument
  // form, so `=` inside a parenthesized argument list is a syntax error.
  fails("a(b=c, d)\n");
}

#[test]
fn dangling_operator_across_a_newline_is_an_error() {
  fails(indoc! {"
    a +
      b
  "});
}
