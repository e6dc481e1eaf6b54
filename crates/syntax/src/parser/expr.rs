use super::*;
use crate::lexer::TokenKind::*;

impl<'src> Parser<'src> {
  pub(super) fn expr(&mut self) -> Result<ast::Expr<'src>> {
    self.ternary_expr()
  }

  /// Postfix `expr foresee cond otherwise expr2` — the lowest-precedence
  /// expression form.
  fn ternary_expr(&mut self) -> Result<ast::Expr<'src>> {
    let body = self.or_expr()?;
    if self.bump_if(Kw_Foresee) {
      let cond = self.or_expr()?;
      self.expect(Kw_Otherwise)?;
      let otherwise = self.ternary_expr()?;
      let span = body.span.join(otherwise.span);
      return Ok(ast::Expr::new(
        span,
        ast::ExprKind::Ternary(Box::new(ast::Ternary { body, cond, otherwise })),
      ));
    }
    Ok(body)
  }

  fn or_expr(&mut self) -> Result<ast::Expr<'src>> {
    let mut left = self.and_expr()?;
    while self.bump_if(Kw_Or) {
      let right = self.and_expr()?;
      left = ast::expr_binary(left.span.join(right.span), ast::BinaryOp::Or, left, right);
    }
    Ok(left)
  }

  fn and_expr(&mut self) -> Result<ast::Expr<'src>> {
    let mut left = self.maybe_expr()?;
    while self.bump_if(Kw_And) {
      let right = self.maybe_expr()?;
      left = ast::expr_binary(left.span.join(right.span), ast::BinaryOp::And, left, right);
    }
    Ok(left)
  }

  /// `??` — null-coalescing.
  fn maybe_expr(&mut self) -> Result<ast::Expr<'src>> {
    let mut left = self.not_expr()?;
    while self.bump_if(Op_QuestionQuestion) {
      let right = self.not_expr()?;
      left = ast::expr_binary(left.span.join(right.span), ast::BinaryOp::Maybe, left, right);
    }
    Ok(left)
  }

  fn not_expr(&mut self) -> Result<ast::Expr<'src>> {
    if self.is(Kw_Not) {
      let start = self.current().span;
      self.bump();
      let right = self.not_expr()?;
      return Ok(ast::expr_unary(start.join(right.span), ast::UnaryOp::Not, right));
    }
    self.comparison_expr()
  }

  fn comparison_expr(&mut self) -> Result<ast::Expr<'src>> {
    let mut left = self.additive_expr()?;
    loop {
      let op = match self.current().kind {
        Op_EqualEqual => ast::BinaryOp::Eq,
        Op_BangEqual => ast::BinaryOp::Neq,
        Op_Less => ast::BinaryOp::Less,
        Op_LessEqual => ast::BinaryOp::LessEq,
        Op_More => ast::BinaryOp::More,
        Op_MoreEqual => ast::BinaryOp::MoreEq,
        _ => break,
      };
      self.bump();
      let right = self.additive_expr()?;
      left = ast::expr_binary(left.span.join(right.span), op, left, right);
    }
    Ok(left)
  }

  fn additive_expr(&mut self) -> Result<ast::Expr<'src>> {
    let mut left = self.multiplicative_expr()?;
    loop {
      let op = match self.current().kind {
        Op_Plus => ast::BinaryOp::Add,
        Op_Minus => ast::BinaryOp::Sub,
        _ => break,
      };
      self.bump();
      let right = self.multiplicative_expr()?;
      left = ast::expr_binary(left.span.join(right.span), op, left, right);
    }
    Ok(left)
  }

  fn multiplicative_expr(&mut self) -> Result<ast::Expr<'src>> {
    let mut left = self.power_expr()?;
    loop {
      let op = match self.current().kind {
        Op_Star => ast::BinaryOp::Mul,
        Op_Slash => ast::BinaryOp::Div,
        Op_SlashSlash => ast::BinaryOp::FloorDiv,
        Op_Percent => ast::BinaryOp::Rem,
        _ => break,
      };
      self.bump();
      let right = self.power_expr()?;
      left = ast::expr_binary(left.span.join(right.span), op, left, right);
    }
    Ok(left)
  }

  /// `**` — right-associative.
  fn power_expr(&mut self) -> Result<ast::Expr<'src>> {
    let left = self.unary_expr()?;
    if self.bump_if(Op_StarStar) {
      let right = self.power_expr()?;
      return Ok(ast::expr_binary(
        left.span.join(right.span),
        ast::BinaryOp::Pow,
        left,
        right,
      ));
    }
    Ok(left)
  }

  fn unary_expr(&mut self) -> Result<ast::Expr<'src>> {
    let (start, op) = match self.current().kind {
      Op_Minus => (self.current().span, ast::UnaryOp::Neg),
      Kw_Await => (self.current().span, ast::UnaryOp::Await),
      _ => return self.postfix_expr(),
    };
    self.bump();
    let right = self.unary_expr()?;
    Ok(ast::expr_unary(start.join(right.span), op, right))
  }

  fn postfix_expr(&mut self) -> Result<ast::Expr<'src>> {
    let mut expr = self.primary_expr()?;
    loop {
      match self.current().kind {
        Brk_ParenL => {
          let args = self.args()?;
          expr = ast::expr_call(expr.span.join(self.previous().span), expr, args);
        }
        Op_Dot => {
          self.bump();
          let name = self.ident()?;
          let span = expr.span.join(name.span);
          expr = ast::Expr::new(span, ast::ExprKind::GetField(Box::new(expr), name));
        }
        Brk_SquareL => {
          expr = self.index_or_slice(expr)?;
        }
        _ => break,
      }
    }
    Ok(expr)
  }

  fn index_or_slice(&mut self, target: ast::Expr<'src>) -> Result<ast::Expr<'src>> {
    self.bump(); // [
    let start = if self.is(Tok_Colon) { None } else { Some(self.expr()?) };
    if self.bump_if(Tok_Colon) {
      let end = if self.is(Tok_Colon) || self.is(Brk_SquareR) {
        None
      } else {
        Some(self.expr()?)
      };
      let step = if self.bump_if(Tok_Colon) {
        Some(self.expr()?)
      } else {
        None
      };
      let close = self.expect(Brk_SquareR)?;
      let span = target.span.join(close.span);
      return Ok(ast::Expr::new(
        span,
        ast::ExprKind::Slice(Box::new(ast::Slice {
          target,
          start,
          end,
          step,
        })),
      ));
    }

    let index = start.ok_or_else(|| self.unexpected("index expression"))?;
    let close = self.expect(Brk_SquareR)?;
    let span = target.span.join(close.span);
    Ok(ast::Expr::new(
      span,
      ast::ExprKind::Index(Box::new(target), Box::new(index)),
    ))
  }

  fn primary_expr(&mut self) -> Result<ast::Expr<'src>> {
    check_recursion_limit(self.current().span)?;

    match self.current().kind {
      Lit_Null => {
        let tok = self.bump();
        Ok(ast::lit::null(tok.span))
      }
      Lit_Bool => {
        let tok = self.bump();
        Ok(ast::lit::bool(tok.span, &tok.lexeme))
      }
      Lit_Number => {
        let tok = self.bump();
        ast::lit::num(tok.span, &tok.lexeme)
      }
      Lit_String => {
        let tok = self.bump();
        ast::lit::str(tok.span, &tok.lexeme).ok_or_else(|| Error::new("invalid escape sequence", tok.span))
      }
      Kw_Self => {
        let tok = self.bump();
        if !self.ctx().in_entity {
          return Err(Error::new("`self` outside of an entity method", tok.span));
        }
        Ok(ast::expr_get_var(span::Spanned::new(tok.span, beef::lean::Cow::from("self"))))
      }
      Kw_Ascend => self.ascend_expr(),
      Kw_Manifest => self.manifest_expr(),
      Brk_SquareL => self.list_or_comprehension(),
      Brk_ParenL => self.paren_or_lambda_or_generator(),
      Brk_CurlyL => self.dict_literal(),
      Lit_Ident => Ok(ast::expr_get_var(self.ident()?)),
      _ => Err(self.unexpected("an expression")),
    }
  }

  fn ascend_expr(&mut self) -> Result<ast::Expr<'src>> {
    let start = self.current().span;
    self.bump(); // ascend
    if !self.ctx().has_parent {
      return Err(Error::new("ascend without a parent entity", start));
    }
    let name = self.ident()?;
    let args = self.args()?;
    let span = start.join(self.previous().span);
    Ok(ast::Expr::new(
      span,
      ast::ExprKind::Ascend(Box::new(ast::Ascend { name, args })),
    ))
  }

  fn manifest_expr(&mut self) -> Result<ast::Expr<'src>> {
    let start = self.current().span;
    self.bump(); // manifest
    let class = self.ident()?;
    let args = self.args()?;
    let span = start.join(self.previous().span);
    Ok(ast::Expr::new(
      span,
      ast::ExprKind::Manifest(Box::new(ast::Manifest { class, args })),
    ))
  }

  /// `[expr, ...]` or `[expr cycle through iterable as pattern [foresee cond]]`.
  fn list_or_comprehension(&mut self) -> Result<ast::Expr<'src>> {
    let start = self.current().span;
    self.bump(); // [

    if self.is(Brk_SquareR) {
      let close = self.bump();
      return Ok(ast::expr_list(start.join(close.span), vec![]));
    }

    let first = self.expr()?;

    if self.bump_if(Kw_Cycle) {
      self.expect(Kw_Through)?;
      let iterable = self.expr()?;
      self.expect(Kw_As)?;
      let pattern = self.pattern()?;
      let cond = if self.bump_if(Kw_Foresee) {
        Some(self.expr()?)
      } else {
        None
      };
      let close = self.expect(Brk_SquareR)?;
      let span = start.join(close.span);
      return Ok(ast::Expr::new(
        span,
        ast::ExprKind::ListComp(Box::new(ast::Comprehension {
          body: first,
          pattern,
          iterable,
          cond,
        })),
      ));
    }

    let mut items = vec![first];
    while self.bump_if(Tok_Comma) && !self.is(Brk_SquareR) {
      items.push(self.expr()?);
    }
    let close = self.expect(Brk_SquareR)?;
    Ok(ast::expr_list(start.join(close.span), items))
  }

  /// `(expr)`, `(expr for pattern through iterable [where cond])`, a
  /// parenthesized lambda parameter list followed by `=>`, or a grouped
  /// expression.
  fn paren_or_lambda_or_generator(&mut self) -> Result<ast::Expr<'src>> {
    let checkpoint = self.pos_marker();

    if let Ok(params) = self.try_lambda_params() {
      if self.bump_if(Op_Arrow) {
        let start = self.lex_span_at(checkpoint);
        let body = if self.is(Tok_Colon) {
          ast::LambdaBody::Block(self.block()?)
        } else {
          ast::LambdaBody::Expr(Box::new(self.expr()?))
        };
        let end = self.previous().span;
        return Ok(ast::Expr::new(
          start.join(end),
          ast::ExprKind::Lambda(std::rc::Rc::new(ast::Lambda { params, body })),
        ));
      }
    }
    self.reset_to(checkpoint);

    let start = self.current().span;
    self.bump(); // (
    let body = self.expr()?;

    if self.bump_if(Kw_For) {
      let pattern = self.pattern()?;
      self.expect(Kw_Through)?;
      let iterable = self.expr()?;
      let cond = if self.bump_if(Kw_Where) {
        Some(self.expr()?)
      } else {
        None
      };
      let close = self.expect(Brk_ParenR)?;
      let span = start.join(close.span);
      return Ok(ast::Expr::new(
        span,
        ast::ExprKind::GeneratorExpr(Box::new(ast::Comprehension {
          body,
          pattern,
          iterable,
          cond,
        })),
      ));
    }

    self.expect(Brk_ParenR)?;
    Ok(body)
  }

  fn try_lambda_params(&mut self) -> Result<Vec<ast::Param<'src>>> {
    self.params()
  }

  fn reset_to(&mut self, marker: usize) {
    self.seek(marker);
  }

  fn lex_span_at(&self, marker: usize) -> span::Span {
    self
      .peek_at(marker)
      .map(|t| t.span)
      .unwrap_or_else(|| self.current().span)
  }

  fn dict_literal(&mut self) -> Result<ast::Expr<'src>> {
    let start = self.current().span;
    self.bump(); // {
    let mut items = vec![];
    if !self.is(Brk_CurlyR) {
      items.push(self.dict_entry()?);
      while self.bump_if(Tok_Comma) && !self.is(Brk_CurlyR) {
        items.push(self.dict_entry()?);
      }
    }
    let close = self.expect(Brk_CurlyR)?;
    Ok(ast::expr_dict(start.join(close.span), items))
  }

  /// `[expr]: value` for a computed key, or bare `ident: value` — the bare
  /// form is sugar for a string key, matching the literal property-name
  /// shorthand object literals commonly use.
  fn dict_entry(&mut self) -> Result<(ast::Expr<'src>, ast::Expr<'src>)> {
    let key = if self.bump_if(Brk_SquareL) {
      let key = self.expr()?;
      self.expect(Brk_SquareR)?;
      key
    } else {
      let name = self.ident()?;
      let span = name.span;
      ast::Expr::new(span, ast::ExprKind::Literal(Box::new(ast::Literal::String(name.into_inner()))))
    };
    self.expect(Tok_Colon)?;
    let value = self.expr()?;
    Ok((key, value))
  }
}
