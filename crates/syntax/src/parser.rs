#![deny(unused_must_use)]
#![allow(dead_code)]

use beef::lean::Cow;
use span::{Span, Spanned};

use crate::ast;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Clone, Default)]
pub(crate) struct Context {
  pub in_loop: bool,
  pub in_protocol: bool,
  pub in_sequence: bool,
  pub in_entity: bool,
  pub has_parent: bool,
}

pub struct Parser<'src> {
  lex: Lexer<'src>,
  pos: usize,
  errors: Vec<Error>,
  ctx: Context,
}

/// Entry point: lexes and parses `src`, producing a module AST or the list
/// of syntax errors encountered along the way (lexer errors and parser
/// errors are both surfaced through the same [`Error`] type).
pub fn parse(src: &str) -> std::result::Result<ast::Module<'_>, Vec<Error>> {
  let lex = Lexer::lex(src).map_err(|errs| {
    errs
      .into_iter()
      .map(|e| Error::new(e.message, e.span))
      .collect::<Vec<_>>()
  })?;

  Parser {
    lex,
    pos: 0,
    errors: Vec::new(),
    ctx: Context::default(),
  }
  .run()
}

// On average a single parse_xxx() method consumes a few hundred bytes of
// stack space; this bound is checked at every block-parsing recursion to
// avoid blowing the native stack on pathologically deep source.
const MINIMUM_STACK_REQUIRED: usize = 64_000;

#[cfg(not(target_family = "wasm"))]
pub(crate) fn check_recursion_limit(span: Span) -> Result<()> {
  if cfg!(feature = "check-recursion-limit")
    && stacker::remaining_stack().unwrap_or(usize::MAX) < MINIMUM_STACK_REQUIRED
  {
    return Err(Error::new("exceeded recursion limit", span));
  }
  Ok(())
}

#[cfg(target_family = "wasm")]
pub(crate) fn check_recursion_limit(_span: Span) -> Result<()> {
  Ok(())
}

enum Either<'src> {
  Import(ast::Import<'src>),
  Stmt(ast::Stmt<'src>),
}

impl<'src> Parser<'src> {
  fn run(mut self) -> std::result::Result<ast::Module<'src>, Vec<Error>> {
    let mut module = ast::Module::new();

    self.skip_blank_lines();
    while !self.is(TokenKind::Eof) {
      match self.top_level_stmt() {
        Ok(Either::Import(import)) => module.imports.push(import),
        Ok(Either::Stmt(stmt)) => module.body.push(stmt),
        Err(e) => {
          self.errors.push(e);
          self.sync();
        }
      }
      self.skip_blank_lines();
    }

    if !self.errors.is_empty() {
      return Err(std::mem::take(&mut self.errors));
    }

    Ok(module)
  }

  fn top_level_stmt(&mut self) -> Result<Either<'src>> {
    if self.is(TokenKind::Kw_Import) {
      return self.import_stmt().map(Either::Import);
    }
    self.stmt().map(Either::Stmt)
  }

  fn import_stmt(&mut self) -> Result<ast::Import<'src>> {
    self.bump(); // import
    let path = self.string_or_ident()?;
    let alias = if self.bump_if(TokenKind::Kw_As) {
      Some(self.ident()?)
    } else {
      None
    };
    self.expect(TokenKind::Newline)?;
    Ok(ast::Import { path, alias })
  }

  fn string_or_ident(&mut self) -> Result<ast::Ident<'src>> {
    if self.is(TokenKind::Lit_String) {
      let tok = self.bump();
      let raw = tok.lexeme.trim_matches(|c| c == '"' || c == '\'');
      Ok(Spanned::new(tok.span, Cow::from(raw.to_string())))
    } else {
      self.ident()
    }
  }

  // --- token-stream primitives ---

  pub(crate) fn current(&self) -> &Token<'src> {
    self.lex.get(self.pos).expect("parser position past EOF")
  }

  pub(crate) fn peek(&self, n: usize) -> Option<&Token<'src>> {
    self.lex.get(self.pos + n)
  }

  pub(crate) fn peek_at(&self, pos: usize) -> Option<&Token<'src>> {
    self.lex.get(pos)
  }

  /// Rewinds the token-stream position to a marker returned by
  /// [`Parser::pos_marker`]. Used to backtrack a failed speculative parse
  /// (lambda-parameter-list detection) without re-lexing.
  pub(crate) fn seek(&mut self, marker: usize) {
    self.pos = marker;
  }

  pub(crate) fn is(&self, kind: TokenKind) -> bool {
    self.current().kind == kind
  }

  pub(crate) fn bump(&mut self) -> Token<'src> {
    let tok = self.current().clone();
    if !self.is(TokenKind::Eof) {
      self.pos += 1;
    }
    tok
  }

  pub(crate) fn bump_if(&mut self, kind: TokenKind) -> bool {
    if self.is(kind) {
      self.bump();
      true
    } else {
      false
    }
  }

  pub(crate) fn expect(&mut self, kind: TokenKind) -> Result<Token<'src>> {
    if self.is(kind) {
      Ok(self.bump())
    } else {
      Err(self.unexpected(&format!("{kind:?}")))
    }
  }

  pub(crate) fn unexpected(&self, expected: &str) -> Error {
    Error::new(
      format!("expected {expected}, found {:?}", self.current().kind),
      self.current().span,
    )
  }

  pub(crate) fn ident(&mut self) -> Result<ast::Ident<'src>> {
    let tok = self.expect(TokenKind::Lit_Ident)?;
    Ok(Spanned::new(tok.span, tok.lexeme))
  }

  /// Skip NEWLINE tokens produced for blank or comment-only lines; they
  /// carry no statement and are never significant to the grammar.
  pub(crate) fn skip_blank_lines(&mut self) {
    while self.is(TokenKind::Newline) {
      self.bump();
    }
  }

  /// Calls `f` in the context `ctx`; `ctx` is restored once `f` returns.
  pub(crate) fn with_ctx<T>(&mut self, ctx: Context, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
    let prev = std::mem::replace(&mut self.ctx, ctx);
    let result = f(self);
    self.ctx = prev;
    result
  }

  pub(crate) fn ctx(&self) -> &Context {
    &self.ctx
  }

  /// Calls `f` and wraps the returned value in a span that encompasses the
  /// entire sequence of tokens parsed within `f`.
  pub(crate) fn spanned<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<Spanned<T>> {
    let start = self.current().span;
    f(self).map(|value| {
      let end = self.previous().span;
      Spanned::new(start.join(end), value)
    })
  }

  fn previous(&self) -> &Token<'src> {
    self.lex.get(self.pos - 1).expect("no previous token")
  }

  /// An opaque marker for the current token-stream position, usable with
  /// [`Parser::lexeme_range`] to recover the literal text an expression was
  /// parsed from.
  pub(crate) fn pos_marker(&self) -> usize {
    self.pos
  }

  /// Rejoins the lexemes of the tokens between two markers with single
  /// spaces. Used for the `absolute` statement's voice-channel message,
  /// which only needs a recognizable rendering of the asserted expression,
  /// not a byte-for-byte copy of the source.
  pub(crate) fn lexeme_range(&self, from: usize, to: usize) -> Cow<'src, str> {
    let text = (from..to)
      .filter_map(|i| self.lex.get(i))
      .map(|t| t.lexeme.as_ref())
      .collect::<Vec<_>>()
      .join(" ");
    Cow::from(text)
  }

  /// Panic-mode recovery: advance until past the next NEWLINE/DEDENT so the
  /// next top-level statement can be attempted.
  fn sync(&mut self) {
    while !self.is(TokenKind::Eof) {
      if self.bump_if(TokenKind::Newline) || self.bump_if(TokenKind::Dedent) {
        return;
      }
      self.bump();
    }
  }
}

mod common;
mod expr;
mod stmt;

#[cfg(test)]
mod tests;
