use super::*;
use crate::lexer::TokenKind::*;

impl<'src> Parser<'src> {
  /// A block opens after `:`. If a NEWLINE follows, the body is an
  /// INDENT, one or more statements, and a matching DEDENT; otherwise the
  /// body is a single simple statement on the same line.
  pub(super) fn block(&mut self) -> Result<Vec<ast::Stmt<'src>>> {
    check_recursion_limit(self.current().span)?;
    self.expect(Tok_Colon)?;
    if self.bump_if(Newline) {
      self.skip_blank_lines();
      self.expect(Indent)?;
      let mut body = vec![self.stmt()?];
      self.skip_blank_lines();
      while !self.is(Dedent) && !self.is(Eof) {
        body.push(self.stmt()?);
        self.skip_blank_lines();
      }
      self.expect(Dedent)?;
      Ok(body)
    } else {
      Ok(vec![self.simple_stmt()?])
    }
  }

  /// A pattern in a binding position: `ident`, or a bracketed, possibly
  /// nested list of patterns (`[a, [b, c]]`).
  pub(super) fn pattern(&mut self) -> Result<ast::Pattern<'src>> {
    if self.bump_if(Brk_SquareL) {
      let mut items = vec![];
      if !self.is(Brk_SquareR) {
        items.push(self.pattern()?);
        while self.bump_if(Tok_Comma) && !self.is(Brk_SquareR) {
          items.push(self.pattern()?);
        }
      }
      self.expect(Brk_SquareR)?;
      Ok(ast::Pattern::List(items))
    } else {
      Ok(ast::Pattern::Ident(self.ident()?))
    }
  }

  /// `(pattern [= default], ... [...pattern])`
  pub(super) fn params(&mut self) -> Result<Vec<ast::Param<'src>>> {
    self.expect(Brk_ParenL)?;
    let mut params = vec![];
    if !self.is(Brk_ParenR) {
      params.push(self.param()?);
      while self.bump_if(Tok_Comma) && !self.is(Brk_ParenR) {
        params.push(self.param()?);
      }
    }
    self.expect(Brk_ParenR)?;
    Ok(params)
  }

  fn param(&mut self) -> Result<ast::Param<'src>> {
    let is_rest = self.bump_if(Op_Spread);
    let pattern = self.pattern()?;
    let default = if !is_rest && self.bump_if(Op_Equal) {
      Some(self.expr()?)
    } else {
      None
    };
    Ok(ast::Param {
      pattern,
      default,
      is_rest,
    })
  }

  /// `(args)` — positional arguments, with `...expr` spread.
  pub(super) fn args(&mut self) -> Result<Vec<ast::Arg<'src>>> {
    self.expect(Brk_ParenL)?;
    let mut args = vec![];
    if !self.is(Brk_ParenR) {
      args.push(self.arg()?);
      while self.bump_if(Tok_Comma) && !self.is(Brk_ParenR) {
        args.push(self.arg()?);
      }
    }
    self.expect(Brk_ParenR)?;
    Ok(args)
  }

  fn arg(&mut self) -> Result<ast::Arg<'src>> {
    if self.bump_if(Op_Spread) {
      Ok(ast::Arg::Spread(self.expr()?))
    } else {
      Ok(ast::Arg::Pos(self.expr()?))
    }
  }
}
