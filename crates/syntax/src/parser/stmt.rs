use super::*;
use crate::lexer::TokenKind::*;

impl<'src> Parser<'src> {
  pub(super) fn stmt(&mut self) -> Result<ast::Stmt<'src>> {
    check_recursion_limit(self.current().span)?;
    match self.current().kind {
      Kw_Designate => self.designate_stmt(),
      Kw_Foresee => self.foresee_stmt(),
      Kw_Situation => self.situation_stmt(),
      Kw_Cycle => self.cycle_stmt(),
      Kw_Protocol | Kw_Sequence | Kw_Async => self.protocol_stmt(),
      Kw_Entity => self.entity_stmt(),
      Kw_Attempt => self.attempt_stmt(),
      Kw_Scheme => self.scheme_stmt(),
      Kw_Anomaly => self.anomaly_stmt(),
      _ => self.simple_stmt(),
    }
  }

  pub(super) fn simple_stmt(&mut self) -> Result<ast::Stmt<'src>> {
    let stmt = match self.current().kind {
      Kw_Pass => self.pass_stmt(),
      Kw_Break => self.break_stmt(),
      Kw_Continue => self.continue_stmt(),
      Kw_Return => self.return_stmt(),
      Kw_Yield => self.yield_stmt(),
      Kw_Delegate => self.delegate_stmt(),
      Kw_Preview => self.preview_stmt(),
      Kw_Override => self.override_stmt(),
      Kw_Absolute => self.absolute_stmt(),
      _ => self.assign_or_expr_stmt(),
    }?;
    self.terminate_simple_stmt()?;
    Ok(stmt)
  }

  /// Simple statements end at the next NEWLINE, except when they're the
  /// inline body of a `scheme ... execute` block, in which case `execute`
  /// itself stands in for the terminator.
  fn terminate_simple_stmt(&mut self) -> Result<()> {
    if self.is(Newline) || self.is(Eof) || self.is(Kw_Execute) || self.is(Dedent) {
      self.bump_if(Newline);
      Ok(())
    } else {
      Err(self.unexpected("end of statement"))
    }
  }

  fn designate_stmt(&mut self) -> Result<ast::Stmt<'src>> {
    let start = self.current().span;
    self.bump(); // designate
    let name = self.ident()?;
    self.expect(Op_Equal)?;
    let value = self.expr()?;
    Ok(ast::designate_stmt(start.join(value.span), name, value))
  }

  fn pass_stmt(&mut self) -> Result<ast::Stmt<'src>> {
    let tok = self.bump();
    Ok(ast::pass_stmt(tok.span))
  }

  fn break_stmt(&mut self) -> Result<ast::Stmt<'src>> {
    let tok = self.bump();
    if !self.ctx().in_loop {
      return Err(Error::new("break outside of a cycle", tok.span));
    }
    Ok(ast::break_stmt(tok.span))
  }

  fn continue_stmt(&mut self) -> Result<ast::Stmt<'src>> {
    let tok = self.bump();
    if !self.ctx().in_loop {
      return Err(Error::new("continue outside of a cycle", tok.span));
    }
    Ok(ast::continue_stmt(tok.span))
  }

  fn return_stmt(&mut self) -> Result<ast::Stmt<'src>> {
    let start = self.current().span;
    self.bump(); // return
    if !self.ctx().in_protocol {
      return Err(Error::new("return outside of a protocol", start));
    }
    let value = if self.at_stmt_end() {
      None
    } else {
      Some(self.expr()?)
    };
    let end = value.as_ref().map(|v| v.span).unwrap_or(start);
    Ok(ast::return_stmt(start.join(end), value))
  }

  fn yield_stmt(&mut self) -> Result<ast::Stmt<'src>> {
    let start = self.current().span;
    self.bump(); // yield
    if !self.ctx().in_sequence {
      return Err(Error::new("yield outside of a sequence", start));
    }
    let value = if self.at_stmt_end() {
      None
    } else {
      Some(self.expr()?)
    };
    let end = value.as_ref().map(|v| v.span).unwrap_or(start);
    Ok(ast::yield_stmt(start.join(end), value))
  }

  fn delegate_stmt(&mut self) -> Result<ast::Stmt<'src>> {
    let start = self.current().span;
    self.bump(); // delegate
    if !self.ctx().in_sequence {
      return Err(Error::new("delegate outside of a sequence", start));
    }
    let iterable = self.expr()?;
    Ok(ast::delegate_stmt(start.join(iterable.span), iterable))
  }

  fn preview_stmt(&mut self) -> Result<ast::Stmt<'src>> {
    let start = self.current().span;
    self.bump(); // preview
    let expr = self.expr()?;
    Ok(ast::Stmt::new(
      start.join(expr.span),
      ast::StmtKind::Preview(Box::new(expr)),
    ))
  }

  fn override_stmt(&mut self) -> Result<ast::Stmt<'src>> {
    let start = self.current().span;
    self.bump(); // override
    let name = self.ident()?;
    self.expect(Op_Equal)?;
    let value = self.expr()?;
    Ok(ast::Stmt::new(
      start.join(value.span),
      ast::StmtKind::Override(Box::new(ast::Override { name, value })),
    ))
  }

  fn absolute_stmt(&mut self) -> Result<ast::Stmt<'src>> {
    let start = self.current().span;
    self.bump(); // absolute
    let text_start_pos = self.pos_marker();
    let expr = self.expr()?;
    let source_text = self.lexeme_range(text_start_pos, self.pos_marker());
    Ok(ast::Stmt::new(
      start.join(expr.span),
      ast::StmtKind::Absolute(Box::new(ast::Absolute { expr, source_text })),
    ))
  }

  fn assign_or_expr_stmt(&mut self) -> Result<ast::Stmt<'src>> {
    let target_expr = self.expr()?;

    if self.bump_if(Op_Walrus) {
      let ast::ExprKind::GetVar(name) = target_expr.into_inner() else {
        return Err(self.unexpected("identifier before `:=`"));
      };
      let value = self.expr()?;
      return Ok(ast::designate_stmt(name.span.join(value.span), name, value));
    }

    if let Some(op) = self.assign_op() {
      let target = expr_to_target(target_expr).ok_or_else(|| self.unexpected("assignment target"))?;
      let value = self.expr()?;
      return Ok(ast::assign_stmt(value.span, target, op, value));
    }

    Ok(ast::expr_stmt(target_expr))
  }

  fn assign_op(&mut self) -> Option<ast::AssignOp> {
    use ast::AssignOp as A;
    let op = match self.current().kind {
      Op_Equal => A::Set,
      Op_PlusEqual => A::Add,
      Op_MinusEqual => A::Sub,
      Op_StarEqual => A::Mul,
      Op_SlashEqual => A::Div,
      Op_PercentEqual => A::Rem,
      Op_StarStarEqual => A::Pow,
      Op_QuestionQuestionEqual => A::Maybe,
      _ => return None,
    };
    self.bump();
    Some(op)
  }

  fn at_stmt_end(&self) -> bool {
    matches!(self.current().kind, Newline | Eof | Kw_Execute | Dedent)
  }

  fn foresee_stmt(&mut self) -> Result<ast::Stmt<'src>> {
    let start = self.current().span;
    self.bump(); // foresee
    let cond = self.expr()?;
    let body = self.block()?;

    let mut alternates = vec![];
    self.skip_blank_lines();
    while self.is(Kw_Alternate) {
      self.bump();
      let alt_cond = self.expr()?;
      let alt_body = self.block()?;
      alternates.push((alt_cond, alt_body));
      self.skip_blank_lines();
    }

    let otherwise = if self.is(Kw_Otherwise) {
      self.bump();
      Some(self.block()?)
    } else {
      None
    };

    let end = self.previous().span;
    Ok(ast::Stmt::new(
      start.join(end),
      ast::StmtKind::Foresee(Box::new(ast::Foresee {
        cond,
        body,
        alternates,
        otherwise,
      })),
    ))
  }

  fn situation_stmt(&mut self) -> Result<ast::Stmt<'src>> {
    let start = self.current().span;
    self.bump(); // situation
    let scrutinee = self.expr()?;
    self.expect(Tok_Colon)?;
    self.expect(Newline)?;
    self.skip_blank_lines();
    self.expect(Indent)?;

    let mut alignments = vec![self.alignment()?];
    self.skip_blank_lines();
    while !self.is(Dedent) && !self.is(Eof) {
      alignments.push(self.alignment()?);
      self.skip_blank_lines();
    }
    self.expect(Dedent)?;

    let end = self.previous().span;
    Ok(ast::Stmt::new(
      start.join(end),
      ast::StmtKind::Situation(Box::new(ast::Situation { scrutinee, alignments })),
    ))
  }

  fn alignment(&mut self) -> Result<ast::Alignment<'src>> {
    let is_otherwise = self.bump_if(Kw_Otherwise);
    let values = if is_otherwise {
      vec![]
    } else {
      self.expect(Kw_Alignment)?;
      let mut values = vec![self.expr()?];
      while self.bump_if(Tok_Comma) {
        values.push(self.expr()?);
      }
      values
    };
    let body = self.block()?;
    Ok(ast::Alignment {
      is_otherwise,
      values,
      body,
    })
  }

  fn cycle_stmt(&mut self) -> Result<ast::Stmt<'src>> {
    let start = self.current().span;
    self.bump(); // cycle

    let ctx = Context {
      in_loop: true,
      ..self.ctx().clone()
    };

    if self.is(Kw_While) {
      self.bump();
      let cond = self.expr()?;
      let body = self.with_ctx(ctx, |p| p.block())?;
      let end = self.previous().span;
      return Ok(ast::Stmt::new(
        start.join(end),
        ast::StmtKind::CycleWhile(Box::new(ast::CycleWhile { cond, body })),
      ));
    }

    let pattern = self.pattern()?;
    if self.bump_if(Kw_Through) {
      let iterable = self.expr()?;
      let body = self.with_ctx(ctx, |p| p.block())?;
      let end = self.previous().span;
      return Ok(ast::Stmt::new(
        start.join(end),
        ast::StmtKind::CycleThrough(Box::new(ast::CycleThrough {
          pattern,
          iterable,
          body,
        })),
      ));
    }

    self.expect(Kw_From)?;
    let from_start = self.expr()?;
    self.expect(Kw_To)?;
    let to_end = self.expr()?;
    let step = if self.bump_if(Kw_Where) {
      Some(self.expr()?)
    } else {
      None
    };
    let body = self.with_ctx(ctx, |p| p.block())?;
    let end = self.previous().span;
    Ok(ast::Stmt::new(
      start.join(end),
      ast::StmtKind::CycleFromTo(Box::new(ast::CycleFromTo {
        pattern,
        start: from_start,
        end: to_end,
        step,
        body,
      })),
    ))
  }

  fn protocol_stmt(&mut self) -> Result<ast::Stmt<'src>> {
    let start = self.current().span;
    let is_async = self.bump_if(Kw_Async);
    let is_sequence = self.bump_if(Kw_Sequence);
    if !is_sequence {
      self.expect(Kw_Protocol)?;
    }
    let name = self.ident()?;
    let params = self.params()?;

    let ctx = Context {
      in_protocol: true,
      in_sequence: is_sequence,
      in_loop: false,
      ..self.ctx().clone()
    };
    let body = self.with_ctx(ctx, |p| p.block())?;
    let end = self.previous().span;

    Ok(ast::protocol_stmt(
      start.join(end),
      ast::Protocol {
        name,
        params,
        body,
        is_sequence,
        is_async,
      },
    ))
  }

  fn entity_stmt(&mut self) -> Result<ast::Stmt<'src>> {
    let start = self.current().span;
    self.bump(); // entity
    let name = self.ident()?;
    let parent = if self.bump_if(Kw_Inherits) {
      Some(self.ident()?)
    } else {
      None
    };

    self.expect(Tok_Colon)?;

    let ctx = Context {
      in_entity: true,
      has_parent: parent.is_some(),
      in_protocol: false,
      in_sequence: false,
      in_loop: false,
    };
    let methods = self.with_ctx(ctx, |p| {
      if p.bump_if(Newline) {
        p.skip_blank_lines();
        p.expect(Indent)?;
        let mut methods = vec![p.method()?];
        p.skip_blank_lines();
        while !p.is(Dedent) && !p.is(Eof) {
          methods.push(p.method()?);
          p.skip_blank_lines();
        }
        p.expect(Dedent)?;
        Ok(methods)
      } else {
        Ok(vec![p.method()?])
      }
    })?;

    let end = self.previous().span;
    Ok(ast::entity_stmt(
      start.join(end),
      ast::Entity { name, parent, methods },
    ))
  }

  fn method(&mut self) -> Result<std::rc::Rc<ast::Protocol<'src>>> {
    match self.protocol_stmt()?.into_inner() {
      ast::StmtKind::Protocol(protocol) => Ok(protocol),
      _ => unreachable!("protocol_stmt always produces StmtKind::Protocol"),
    }
  }

  fn attempt_stmt(&mut self) -> Result<ast::Stmt<'src>> {
    let start = self.current().span;
    self.bump(); // attempt
    let body = self.block()?;
    self.skip_blank_lines();
    self.expect(Kw_Recover)?;
    let error_name = if !self.is(Tok_Colon) {
      Some(self.ident()?)
    } else {
      None
    };
    let recover_body = self.block()?;
    let end = self.previous().span;
    Ok(ast::Stmt::new(
      start.join(end),
      ast::StmtKind::Attempt(Box::new(ast::Attempt {
        body,
        error_name,
        recover_body,
      })),
    ))
  }

  /// `scheme: body execute` — the two keywords bracket the block
  /// syntactically; `execute` is a terminator, not a second body.
  fn scheme_stmt(&mut self) -> Result<ast::Stmt<'src>> {
    let start = self.current().span;
    self.bump(); // scheme
    let body = self.block()?;
    let execute = self.expect(Kw_Execute)?;
    self.bump_if(Newline);
    Ok(ast::Stmt::new(
      start.join(execute.span),
      ast::StmtKind::Scheme(body),
    ))
  }

  fn anomaly_stmt(&mut self) -> Result<ast::Stmt<'src>> {
    let start = self.current().span;
    self.bump(); // anomaly
    let body = self.block()?;
    let end = self.previous().span;
    Ok(ast::Stmt::new(start.join(end), ast::StmtKind::Anomaly(body)))
  }

}

/// Converts an already-parsed expression into an assignment target.
/// `None` if `expr` isn't a valid target shape.
fn expr_to_target(expr: ast::Expr<'_>) -> Option<ast::Target<'_>> {
  match expr.into_inner() {
    ast::ExprKind::GetVar(name) => Some(ast::Target::Var(name)),
    ast::ExprKind::GetField(target, name) => Some(ast::Target::Member(*target, name)),
    ast::ExprKind::Index(target, key) => Some(ast::Target::Index(*target, *key)),
    ast::ExprKind::Literal(lit) => match *lit {
      ast::Literal::List(items) => {
        let mut targets = Vec::with_capacity(items.len());
        for item in items {
          targets.push(expr_to_target(item)?);
        }
        Some(ast::Target::Destructure(targets))
      }
      _ => None,
    },
    _ => None,
  }
}
