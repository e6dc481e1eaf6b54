#![allow(clippy::needless_lifetimes)]

use std::rc::Rc;

use beef::lean::Cow;
use span::{Span, Spanned};

pub type Ident<'src> = Spanned<Cow<'src, str>>;

#[cfg_attr(test, derive(Debug))]
pub struct Module<'src> {
  pub imports: Vec<Import<'src>>,
  pub body: Vec<Stmt<'src>>,
}

impl<'src> Module<'src> {
  pub fn new() -> Self {
    Self {
      imports: vec![],
      body: vec![],
    }
  }
}

impl<'src> Default for Module<'src> {
  fn default() -> Self {
    Self::new()
  }
}

/// Textual inclusion only — no symbol lists, no re-exports.
#[cfg_attr(test, derive(Debug))]
pub struct Import<'src> {
  pub path: Ident<'src>,
  pub alias: Option<Ident<'src>>,
}

pub type Stmt<'src> = Spanned<StmtKind<'src>>;

#[cfg_attr(test, derive(Debug))]
pub enum StmtKind<'src> {
  Designate(Box<Designate<'src>>),
  Assign(Box<Assign<'src>>),
  Expr(Box<Expr<'src>>),
  Foresee(Box<Foresee<'src>>),
  Situation(Box<Situation<'src>>),
  CycleWhile(Box<CycleWhile<'src>>),
  CycleThrough(Box<CycleThrough<'src>>),
  CycleFromTo(Box<CycleFromTo<'src>>),
  Break,
  Continue,
  Yield(Option<Expr<'src>>),
  Delegate(Box<Expr<'src>>),
  Return(Option<Expr<'src>>),
  Protocol(Rc<Protocol<'src>>),
  Entity(Box<Entity<'src>>),
  Attempt(Box<Attempt<'src>>),
  Scheme(Vec<Stmt<'src>>),
  Preview(Box<Expr<'src>>),
  Override(Box<Override<'src>>),
  Absolute(Box<Absolute<'src>>),
  Anomaly(Vec<Stmt<'src>>),
  Pass,
}

/// `designate ident = expr` — always defines in the current scope.
#[cfg_attr(test, derive(Debug))]
pub struct Designate<'src> {
  pub name: Ident<'src>,
  pub value: Expr<'src>,
}

/// `target = expr` / `target := expr` / compound (`+=`, `-=`, ...).
#[cfg_attr(test, derive(Debug))]
pub struct Assign<'src> {
  pub target: Target<'src>,
  pub op: AssignOp,
  pub value: Expr<'src>,
}

#[cfg_attr(test, derive(Debug))]
pub enum Target<'src> {
  Var(Ident<'src>),
  Member(Expr<'src>, Ident<'src>),
  Index(Expr<'src>, Expr<'src>),
  Destructure(Vec<Target<'src>>),
}

#[cfg_attr(test, derive(Debug))]
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
  Set,
  Add,
  Sub,
  Mul,
  Div,
  Rem,
  Pow,
  Maybe,
}

/// `foresee cond: body [alternate cond: body]* [otherwise: body]`
#[cfg_attr(test, derive(Debug))]
pub struct Foresee<'src> {
  pub cond: Expr<'src>,
  pub body: Vec<Stmt<'src>>,
  pub alternates: Vec<(Expr<'src>, Vec<Stmt<'src>>)>,
  pub otherwise: Option<Vec<Stmt<'src>>>,
}

/// `situation expr: alignment v1, v2: body | otherwise: body`
#[cfg_attr(test, derive(Debug))]
pub struct Situation<'src> {
  pub scrutinee: Expr<'src>,
  pub alignments: Vec<Alignment<'src>>,
}

#[cfg_attr(test, derive(Debug))]
pub struct Alignment<'src> {
  pub is_otherwise: bool,
  pub values: Vec<Expr<'src>>,
  pub body: Vec<Stmt<'src>>,
}

#[cfg_attr(test, derive(Debug))]
pub struct CycleWhile<'src> {
  pub cond: Expr<'src>,
  pub body: Vec<Stmt<'src>>,
}

#[cfg_attr(test, derive(Debug))]
pub struct CycleThrough<'src> {
  pub pattern: Pattern<'src>,
  pub iterable: Expr<'src>,
  pub body: Vec<Stmt<'src>>,
}

#[cfg_attr(test, derive(Debug))]
pub struct CycleFromTo<'src> {
  pub pattern: Pattern<'src>,
  pub start: Expr<'src>,
  pub end: Expr<'src>,
  pub step: Option<Expr<'src>>,
  pub body: Vec<Stmt<'src>>,
}

/// A pattern in a binding position: for-loop variable, function parameter,
/// destructuring assignment target. An identifier, or a bracketed list of
/// identifiers with recursive nesting.
#[cfg_attr(test, derive(Debug))]
pub enum Pattern<'src> {
  Ident(Ident<'src>),
  List(Vec<Pattern<'src>>),
}

/// `protocol name(params): body` — a function definition. `is_sequence`
/// marks a `sequence` (generator) definition; `is_async` marks an `await`-able
/// protocol.
#[cfg_attr(test, derive(Debug))]
pub struct Protocol<'src> {
  pub name: Ident<'src>,
  pub params: Vec<Param<'src>>,
  pub body: Vec<Stmt<'src>>,
  pub is_sequence: bool,
  pub is_async: bool,
}

#[cfg_attr(test, derive(Debug))]
pub struct Param<'src> {
  pub pattern: Pattern<'src>,
  pub default: Option<Expr<'src>>,
  pub is_rest: bool,
}

/// `entity name [inherits parent]: protocol...`
#[cfg_attr(test, derive(Debug))]
pub struct Entity<'src> {
  pub name: Ident<'src>,
  pub parent: Option<Ident<'src>>,
  pub methods: Vec<Rc<Protocol<'src>>>,
}

/// `attempt: body recover [as name]: body`
#[cfg_attr(test, derive(Debug))]
pub struct Attempt<'src> {
  pub body: Vec<Stmt<'src>>,
  pub error_name: Option<Ident<'src>>,
  pub recover_body: Vec<Stmt<'src>>,
}

/// `override name = expr`
#[cfg_attr(test, derive(Debug))]
pub struct Override<'src> {
  pub name: Ident<'src>,
  pub value: Expr<'src>,
}

/// `absolute expr` — keeps the literal source text for the voice-channel
/// failure message.
#[cfg_attr(test, derive(Debug))]
pub struct Absolute<'src> {
  pub expr: Expr<'src>,
  pub source_text: Cow<'src, str>,
}

pub type Expr<'src> = Spanned<ExprKind<'src>>;

#[cfg_attr(test, derive(Debug))]
pub enum ExprKind<'src> {
  Literal(Box<Literal<'src>>),
  GetVar(Ident<'src>),
  Binary(Box<Binary<'src>>),
  Unary(Box<Unary<'src>>),
  Call(Box<Call<'src>>),
  GetField(Box<Expr<'src>>, Ident<'src>),
  Index(Box<Expr<'src>>, Box<Expr<'src>>),
  Slice(Box<Slice<'src>>),
  Ascend(Box<Ascend<'src>>),
  Manifest(Box<Manifest<'src>>),
  Lambda(Rc<Lambda<'src>>),
  Ternary(Box<Ternary<'src>>),
  GeneratorExpr(Box<Comprehension<'src>>),
  ListComp(Box<Comprehension<'src>>),
}

#[cfg_attr(test, derive(Debug))]
pub enum Literal<'src> {
  Null,
  Int(i64),
  Float(f64),
  Bool(bool),
  String(Cow<'src, str>),
  List(Vec<Expr<'src>>),
  Dict(Vec<(Expr<'src>, Expr<'src>)>),
}

#[cfg_attr(test, derive(Debug))]
pub struct Binary<'src> {
  pub op: BinaryOp,
  pub left: Expr<'src>,
  pub right: Expr<'src>,
}

#[cfg_attr(test, derive(Debug))]
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  FloorDiv,
  Rem,
  Pow,
  Eq,
  Neq,
  More,
  MoreEq,
  Less,
  LessEq,
  And,
  Or,
  Maybe,
}

#[cfg_attr(test, derive(Debug))]
pub struct Unary<'src> {
  pub op: UnaryOp,
  pub right: Expr<'src>,
}

#[cfg_attr(test, derive(Debug))]
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
  Neg,
  Not,
  Await,
}

#[cfg_attr(test, derive(Debug))]
pub struct Call<'src> {
  pub target: Expr<'src>,
  pub args: Vec<Arg<'src>>,
}

#[cfg_attr(test, derive(Debug))]
pub enum Arg<'src> {
  Pos(Expr<'src>),
  Spread(Expr<'src>),
}

#[cfg_attr(test, derive(Debug))]
pub struct Slice<'src> {
  pub target: Expr<'src>,
  pub start: Option<Expr<'src>>,
  pub end: Option<Expr<'src>>,
  pub step: Option<Expr<'src>>,
}

/// `ascend name(args)` — super-call on the parent of the current `self`'s
/// class.
#[cfg_attr(test, derive(Debug))]
pub struct Ascend<'src> {
  pub name: Ident<'src>,
  pub args: Vec<Arg<'src>>,
}

/// `manifest Class(args)` — instantiate a class.
#[cfg_attr(test, derive(Debug))]
pub struct Manifest<'src> {
  pub class: Ident<'src>,
  pub args: Vec<Arg<'src>>,
}

#[cfg_attr(test, derive(Debug))]
pub struct Lambda<'src> {
  pub params: Vec<Param<'src>>,
  pub body: LambdaBody<'src>,
}

#[cfg_attr(test, derive(Debug))]
pub enum LambdaBody<'src> {
  Expr(Box<Expr<'src>>),
  Block(Vec<Stmt<'src>>),
}

/// Postfix ternary: `expr foresee cond otherwise expr2`. Lowest-precedence
/// expression form.
#[cfg_attr(test, derive(Debug))]
pub struct Ternary<'src> {
  pub body: Expr<'src>,
  pub cond: Expr<'src>,
  pub otherwise: Expr<'src>,
}

/// Shared shape for `(expr for ident through iterable [where cond])`
/// generator expressions and `[expr cycle through iterable as ident
/// [foresee cond]]` list comprehensions — distinct AST node kinds, same
/// payload shape.
#[cfg_attr(test, derive(Debug))]
pub struct Comprehension<'src> {
  pub body: Expr<'src>,
  pub pattern: Pattern<'src>,
  pub iterable: Expr<'src>,
  pub cond: Option<Expr<'src>>,
}

pub fn designate_stmt<'src>(s: impl Into<Span>, name: Ident<'src>, value: Expr<'src>) -> Stmt<'src> {
  Stmt::new(s, StmtKind::Designate(Box::new(Designate { name, value })))
}

pub fn assign_stmt<'src>(
  s: impl Into<Span>,
  target: Target<'src>,
  op: AssignOp,
  value: Expr<'src>,
) -> Stmt<'src> {
  Stmt::new(s, StmtKind::Assign(Box::new(Assign { target, op, value })))
}

pub fn expr_stmt<'src>(expr: Expr<'src>) -> Stmt<'src> {
  Stmt::new(expr.span, StmtKind::Expr(Box::new(expr)))
}

pub fn pass_stmt<'src>(s: impl Into<Span>) -> Stmt<'src> {
  Stmt::new(s, StmtKind::Pass)
}

pub fn break_stmt<'src>(s: impl Into<Span>) -> Stmt<'src> {
  Stmt::new(s, StmtKind::Break)
}

pub fn continue_stmt<'src>(s: impl Into<Span>) -> Stmt<'src> {
  Stmt::new(s, StmtKind::Continue)
}

pub fn yield_stmt<'src>(s: impl Into<Span>, value: Option<Expr<'src>>) -> Stmt<'src> {
  Stmt::new(s, StmtKind::Yield(value))
}

pub fn delegate_stmt<'src>(s: impl Into<Span>, iterable: Expr<'src>) -> Stmt<'src> {
  Stmt::new(s, StmtKind::Delegate(Box::new(iterable)))
}

pub fn return_stmt<'src>(s: impl Into<Span>, value: Option<Expr<'src>>) -> Stmt<'src> {
  Stmt::new(s, StmtKind::Return(value))
}

pub fn protocol_stmt<'src>(s: impl Into<Span>, protocol: Protocol<'src>) -> Stmt<'src> {
  Stmt::new(s, StmtKind::Protocol(Rc::new(protocol)))
}

pub fn entity_stmt<'src>(s: impl Into<Span>, entity: Entity<'src>) -> Stmt<'src> {
  Stmt::new(s, StmtKind::Entity(Box::new(entity)))
}

pub fn expr_binary<'src>(
  s: impl Into<Span>,
  op: BinaryOp,
  left: Expr<'src>,
  right: Expr<'src>,
) -> Expr<'src> {
  Expr::new(s, ExprKind::Binary(Box::new(Binary { op, left, right })))
}

pub fn expr_unary<'src>(s: impl Into<Span>, op: UnaryOp, right: Expr<'src>) -> Expr<'src> {
  Expr::new(s, ExprKind::Unary(Box::new(Unary { op, right })))
}

pub fn expr_call<'src>(s: impl Into<Span>, target: Expr<'src>, args: Vec<Arg<'src>>) -> Expr<'src> {
  Expr::new(s, ExprKind::Call(Box::new(Call { target, args })))
}

pub fn expr_get_var<'src>(name: Ident<'src>) -> Expr<'src> {
  Expr::new(name.span, ExprKind::GetVar(name))
}

pub fn expr_list<'src>(s: impl Into<Span>, items: Vec<Expr<'src>>) -> Expr<'src> {
  Expr::new(s, ExprKind::Literal(Box::new(Literal::List(items))))
}

pub fn expr_dict<'src>(s: impl Into<Span>, items: Vec<(Expr<'src>, Expr<'src>)>) -> Expr<'src> {
  Expr::new(s, ExprKind::Literal(Box::new(Literal::Dict(items))))
}

pub mod lit {
  use super::*;
  use crate::{Error, Result};

  pub fn null<'src>(s: impl Into<Span>) -> Expr<'src> {
    Expr::new(s, ExprKind::Literal(Box::new(Literal::Null)))
  }

  pub fn bool<'src>(s: impl Into<Span>, lexeme: &str) -> Expr<'src> {
    let v = match lexeme {
      "true" => true,
      "false" => false,
      _ => unreachable!("bool is only ever `true` or `false`"),
    };
    Expr::new(s, ExprKind::Literal(Box::new(Literal::Bool(v))))
  }

  pub fn num<'src>(s: impl Into<Span>, lexeme: &str) -> Result<Expr<'src>> {
    let s = s.into();
    if !lexeme.contains('.') && !lexeme.contains(['e', 'E']) {
      if let Ok(v) = lexeme.parse::<i64>() {
        return Ok(Expr::new(s, ExprKind::Literal(Box::new(Literal::Int(v)))));
      }
    }
    let value: f64 = lexeme
      .parse()
      .map_err(|e| Error::new(format!("invalid number: {e}"), s))?;
    Ok(Expr::new(
      s,
      ExprKind::Literal(Box::new(Literal::Float(value))),
    ))
  }

  pub fn str<'src>(s: impl Into<Span>, lexeme: &str) -> Option<Expr<'src>> {
    let s = s.into();
    let lexeme = lexeme
      .strip_prefix('"')
      .or_else(|| lexeme.strip_prefix('\''))
      .unwrap_or(lexeme);
    let lexeme = lexeme
      .strip_suffix('"')
      .or_else(|| lexeme.strip_suffix('\''))
      .unwrap_or(lexeme);
    let mut owned = lexeme.to_string();
    unescape_in_place(&mut owned)?;
    Some(Expr::new(
      s,
      ExprKind::Literal(Box::new(Literal::String(Cow::from(owned)))),
    ))
  }

  /// Unescapes the given string in-place. Returns `None` on an unterminated
  /// escape sequence. Only the escapes the lexer contract names are
  /// recognized (`\n \t \r \\ \' \"`); unknown escapes preserve the literal
  /// backslash + character.
  fn unescape_in_place(s: &mut String) -> Option<()> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
      if ch == '\\' {
        let next = chars.next()?;
        let escape = match next {
          'n' => Some('\n'),
          't' => Some('\t'),
          'r' => Some('\r'),
          '\'' => Some('\''),
          '"' => Some('"'),
          '\\' => Some('\\'),
          _ => None,
        };
        match escape {
          Some(esc) => out.push(esc),
          None => {
            out.push(ch);
            out.push(next);
          }
        }
      } else {
        out.push(ch);
      }
    }
    *s = out;
    Some(())
  }
}
