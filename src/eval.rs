//! The tree-walking evaluator. Statement execution returns an
//! [`ExecOutcome`] rather than unwinding through `return`/`break`/`continue`
//! directly, because a `yield`/`delegate` has to be able to suspend out of an
//! arbitrarily deep statement nest and later resume from the exact same
//! point — see `src/generator.rs` for the frame stack this threads through.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use span::Span;
use syntax::ast;

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::generator::{
  ExecOutcome, Frame, GeneratorSource, GeneratorState, GeneratorStatus, IterSource, Mailbox,
};
use crate::value::{Callable, Class, Function, Instance, Promise, PromiseState, Str, Value};
use crate::voice::VoiceChannel;

fn ident_name(id: &ast::Ident<'_>) -> Str {
  Str::from(id.as_ref())
}

pub struct Evaluator<'src> {
  pub globals: Environment<'src>,
  /// Resume stack for the generator currently being driven by
  /// `resume_generator` — empty during ordinary (non-generator-resuming)
  /// evaluation, which is why a ordinary nested function call needs no
  /// special handling to avoid tripping over stale frames.
  resume: Vec<Frame<'src>>,
  /// The generator `receive()` reads from — swapped in and out around a
  /// resumption so a plain helper called from within a generator's body can
  /// still see the generator's mailbox.
  current_generator: Option<Rc<RefCell<GeneratorState<'src>>>>,
  /// The class a currently-running method was *defined* on — needed so
  /// `ascend` resolves the parent of the defining class, not the parent of
  /// the instance's (possibly further-derived) concrete class.
  current_method_class: Option<Rc<Class<'src>>>,
  /// An error injected by `disrupt`, consumed the moment resumption reaches
  /// the innermost suspended `Block` frame (see `exec_block`).
  pending_disrupt: Option<Value<'src>>,
  voice: Box<dyn VoiceChannel>,
}

impl<'src> Evaluator<'src> {
  pub fn new(voice: Box<dyn VoiceChannel>) -> Self {
    let globals = Environment::root();
    crate::builtins::install(&globals);
    Evaluator {
      globals,
      resume: Vec::new(),
      current_generator: None,
      current_method_class: None,
      pending_disrupt: None,
      voice,
    }
  }

  pub fn voice_mut(&mut self) -> &mut dyn VoiceChannel {
    &mut *self.voice
  }

  /// Runs a parsed module's top-level statements against this evaluator's
  /// globals. Imports are textual inclusion, resolved by the embedder
  /// before the module ever reaches here — a non-empty `imports` list at
  /// this point means the caller skipped that step.
  pub fn eval_module(&mut self, module: &'src ast::Module<'src>) -> Result<Value<'src>> {
    if !module.imports.is_empty() {
      return Err(Error::runtime_detached(
        "unresolved imports reached the evaluator — splice them before calling eval_module",
      ));
    }
    let globals = self.globals.clone();
    match self.exec_block(&module.body, &globals)? {
      ExecOutcome::Normal => Ok(Value::Null),
      ExecOutcome::Return(v) => Ok(v),
      ExecOutcome::Suspend { .. } => Err(Error::runtime_detached("yield used outside of a sequence")),
      ExecOutcome::Break | ExecOutcome::Continue => {
        Err(Error::runtime_detached("break/continue used outside of a cycle"))
      }
    }
  }

  /// `receive()`'s implementation — reads and clears the current
  /// generator's mailbox, or errors if there is no current generator.
  pub fn receive(&mut self) -> Result<Value<'src>> {
    match &self.current_generator {
      Some(gen) => {
        let mut g = gen.borrow_mut();
        match std::mem::replace(&mut g.mailbox, Mailbox::Empty) {
          Mailbox::Sent(v) => Ok(v),
          Mailbox::Empty | Mailbox::Disrupted(_) => Ok(Value::Null),
        }
      }
      None => Err(Error::runtime_detached("receive() used outside of a sequence")),
    }
  }

  fn disrupt_error(&self, err: Value<'src>) -> Error {
    Error::runtime_detached(format!("disrupted: {}", err.display()))
  }

  // ---------------------------------------------------------------- blocks

  /// Walks a statement list, resuming mid-list if the top of `self.resume`
  /// is a `Block` frame belonging to this call. The innermost such frame —
  /// the one whose pop leaves `self.resume` empty — is where a pending
  /// `disrupt` error is raised, since that's the resume point closest to
  /// the actual suspended leaf statement and the only one guaranteed to sit
  /// inside every enclosing `attempt`'s try-body call.
  fn exec_block(
    &mut self,
    stmts: &'src [ast::Stmt<'src>],
    env: &Environment<'src>,
  ) -> Result<ExecOutcome<'src>> {
    let (mut i, env) = match self.resume.last() {
      Some(Frame::Block { .. }) => {
        let Some(Frame::Block { next, env }) = self.resume.pop() else {
          unreachable!()
        };
        if self.resume.is_empty() {
          if let Some(err) = self.pending_disrupt.take() {
            return Err(self.disrupt_error(err));
          }
        }
        (next, env)
      }
      _ => (0, env.clone()),
    };

    while i < stmts.len() {
      match self.exec_stmt(&stmts[i], &env)? {
        ExecOutcome::Normal => i += 1,
        ExecOutcome::Suspend { value, mut frames } => {
          let next = if frames.is_empty() { i + 1 } else { i };
          frames.push(Frame::Block {
            next,
            env: env.clone(),
          });
          return Ok(ExecOutcome::Suspend { value, frames });
        }
        other => return Ok(other),
      }
    }
    Ok(ExecOutcome::Normal)
  }

  fn exec_stmt(
    &mut self,
    stmt: &'src ast::Stmt<'src>,
    env: &Environment<'src>,
  ) -> Result<ExecOutcome<'src>> {
    let span = stmt.span;
    match &**stmt {
      ast::StmtKind::Designate(d) => {
        self.exec_designate(d, env)?;
        Ok(ExecOutcome::Normal)
      }
      ast::StmtKind::Assign(a) => {
        self.exec_assign(a, span, env)?;
        Ok(ExecOutcome::Normal)
      }
      ast::StmtKind::Expr(e) => {
        self.eval_expr(e, env)?;
        Ok(ExecOutcome::Normal)
      }
      ast::StmtKind::Foresee(f) => self.exec_foresee(f, env),
      ast::StmtKind::Situation(s) => self.exec_situation(s, env),
      ast::StmtKind::CycleWhile(c) => self.exec_cycle_while(c, env),
      ast::StmtKind::CycleThrough(c) => self.exec_cycle_through(c, span, env),
      ast::StmtKind::CycleFromTo(c) => self.exec_cycle_from_to(c, span, env),
      ast::StmtKind::Break => Ok(ExecOutcome::Break),
      ast::StmtKind::Continue => Ok(ExecOutcome::Continue),
      ast::StmtKind::Yield(v) => self.exec_yield(v, env),
      ast::StmtKind::Delegate(e) => self.exec_delegate(e, span, env),
      ast::StmtKind::Return(v) => {
        let val = match v {
          Some(e) => self.eval_expr(e, env)?,
          None => Value::Null,
        };
        Ok(ExecOutcome::Return(val))
      }
      ast::StmtKind::Protocol(p) => {
        self.exec_protocol_stmt(p, env);
        Ok(ExecOutcome::Normal)
      }
      ast::StmtKind::Entity(e) => {
        self.exec_entity(e, env)?;
        Ok(ExecOutcome::Normal)
      }
      ast::StmtKind::Attempt(a) => self.exec_attempt(a, env),
      ast::StmtKind::Scheme(body) => self.exec_scheme(body, span, env),
      ast::StmtKind::Preview(e) => {
        self.exec_preview(e, span, env)?;
        Ok(ExecOutcome::Normal)
      }
      ast::StmtKind::Override(o) => {
        self.exec_override(o, span, env)?;
        Ok(ExecOutcome::Normal)
      }
      ast::StmtKind::Absolute(a) => {
        self.exec_absolute(a, span, env)?;
        Ok(ExecOutcome::Normal)
      }
      ast::StmtKind::Anomaly(body) => self.exec_anomaly(body, span, env),
      ast::StmtKind::Pass => Ok(ExecOutcome::Normal),
    }
  }

  // ------------------------------------------------------------------ loops

  fn exec_cycle_while(
    &mut self,
    node: &'src ast::CycleWhile<'src>,
    env: &Environment<'src>,
  ) -> Result<ExecOutcome<'src>> {
    let mut resuming = matches!(self.resume.last(), Some(Frame::CycleWhile));
    if resuming {
      self.resume.pop();
    }
    loop {
      if !resuming && !self.eval_expr(&node.cond, env)?.truthy() {
        break;
      }
      resuming = false;
      let body_env = env.child();
      match self.exec_block(&node.body, &body_env)? {
        ExecOutcome::Normal | ExecOutcome::Continue => continue,
        ExecOutcome::Break => break,
        ExecOutcome::Return(v) => return Ok(ExecOutcome::Return(v)),
        ExecOutcome::Suspend { value, mut frames } => {
          frames.push(Frame::CycleWhile);
          return Ok(ExecOutcome::Suspend { value, frames });
        }
      }
    }
    Ok(ExecOutcome::Normal)
  }

  fn exec_cycle_through(
    &mut self,
    node: &'src ast::CycleThrough<'src>,
    span: Span,
    env: &Environment<'src>,
  ) -> Result<ExecOutcome<'src>> {
    let (source, mut index) = match self.resume.last() {
      Some(Frame::CycleThrough { .. }) => {
        let Some(Frame::CycleThrough { source, index }) = self.resume.pop() else {
          unreachable!()
        };
        (source, index)
      }
      _ => {
        let iterable = self.eval_expr(&node.iterable, env)?;
        (self.make_iter_source(iterable, node.iterable.span)?, 0)
      }
    };

    loop {
      // `item_index` names the slot the item we're about to bind came from;
      // `index` itself is already advanced to the *next* pull by the time
      // the body runs, so the suspended frame must save the former, not the
      // latter — else resuming re-pulls the item after this one.
      let item_index = index;
      let item = match &source {
        IterSource::List(items) => match items.get(index) {
          Some(v) => {
            index += 1;
            v.clone()
          }
          None => break,
        },
        IterSource::Generator(g) => match self.generator_next(g)? {
          Some(v) => v,
          None => break,
        },
      };
      let body_env = env.child();
      self.bind_pattern(&node.pattern, item, &body_env, span)?;
      match self.exec_block(&node.body, &body_env)? {
        ExecOutcome::Normal | ExecOutcome::Continue => continue,
        ExecOutcome::Break => break,
        ExecOutcome::Return(v) => return Ok(ExecOutcome::Return(v)),
        ExecOutcome::Suspend { value, mut frames } => {
          frames.push(Frame::CycleThrough { source, index: item_index });
          return Ok(ExecOutcome::Suspend { value, frames });
        }
      }
    }
    Ok(ExecOutcome::Normal)
  }

  fn exec_cycle_from_to(
    &mut self,
    node: &'src ast::CycleFromTo<'src>,
    span: Span,
    env: &Environment<'src>,
  ) -> Result<ExecOutcome<'src>> {
    let (mut current, end, step) = match self.resume.last() {
      Some(Frame::CycleFromTo { .. }) => {
        let Some(Frame::CycleFromTo { current, end, step }) = self.resume.pop() else {
          unreachable!()
        };
        (current, end, step)
      }
      _ => {
        let start_v = self.eval_expr(&node.start, env)?;
        let end_v = self.eval_expr(&node.end, env)?;
        let step_v = match &node.step {
          Some(e) => self.eval_expr(e, env)?,
          None => Value::Int(1),
        };
        let step_i = to_int(&step_v, span)?;
        if step_i == 0 {
          return Err(Error::runtime("cycle step cannot be zero", span));
        }
        (to_int(&start_v, span)?, to_int(&end_v, span)?, step_i)
      }
    };

    loop {
      let continues = if step > 0 { current < end } else { current > end };
      if !continues {
        break;
      }
      let body_env = env.child();
      self.bind_pattern(&node.pattern, Value::Int(current), &body_env, span)?;
      let next_current = current + step;
      match self.exec_block(&node.body, &body_env)? {
        ExecOutcome::Normal | ExecOutcome::Continue => {
          current = next_current;
          continue;
        }
        ExecOutcome::Break => break,
        ExecOutcome::Return(v) => return Ok(ExecOutcome::Return(v)),
        ExecOutcome::Suspend { value, mut frames } => {
          // Save the value this (unfinished) iteration bound, not
          // `next_current` — resuming re-enters the same iteration's `Block`
          // frame to finish it, and only advances to `next_current` itself
          // once that frame reports `Normal`. Saving `next_current` here
          // would skip a value on every resumption.
          frames.push(Frame::CycleFromTo { current, end, step });
          return Ok(ExecOutcome::Suspend { value, frames });
        }
      }
    }
    Ok(ExecOutcome::Normal)
  }

  fn exec_yield(
    &mut self,
    value: &'src Option<ast::Expr<'src>>,
    env: &Environment<'src>,
  ) -> Result<ExecOutcome<'src>> {
    let v = match value {
      Some(e) => self.eval_expr(e, env)?,
      None => Value::Null,
    };
    Ok(ExecOutcome::Suspend {
      value: v,
      frames: Vec::new(),
    })
  }

  fn exec_delegate(
    &mut self,
    expr: &'src ast::Expr<'src>,
    span: Span,
    env: &Environment<'src>,
  ) -> Result<ExecOutcome<'src>> {
    let (source, index) = match self.resume.last() {
      Some(Frame::Delegate { .. }) => {
        let Some(Frame::Delegate { source, index }) = self.resume.pop() else {
          unreachable!()
        };
        (source, index)
      }
      _ => {
        let iterable = self.eval_expr(expr, env)?;
        (self.make_iter_source(iterable, span)?, 0)
      }
    };

    let item = match &source {
      IterSource::List(items) => items.get(index).cloned(),
      IterSource::Generator(g) => self.generator_next(g)?,
    };

    match item {
      Some(v) => Ok(ExecOutcome::Suspend {
        value: v,
        frames: vec![Frame::Delegate {
          source,
          index: index + 1,
        }],
      }),
      None => Ok(ExecOutcome::Normal),
    }
  }

  // -------------------------------------------------------------- branches

  fn exec_foresee(
    &mut self,
    node: &'src ast::Foresee<'src>,
    env: &Environment<'src>,
  ) -> Result<ExecOutcome<'src>> {
    if self.eval_expr(&node.cond, env)?.truthy() {
      return self.exec_block(&node.body, &env.child());
    }
    for (cond, body) in &node.alternates {
      if self.eval_expr(cond, env)?.truthy() {
        return self.exec_block(body, &env.child());
      }
    }
    if let Some(body) = &node.otherwise {
      return self.exec_block(body, &env.child());
    }
    Ok(ExecOutcome::Normal)
  }

  fn exec_situation(
    &mut self,
    node: &'src ast::Situation<'src>,
    env: &Environment<'src>,
  ) -> Result<ExecOutcome<'src>> {
    let scrutinee = self.eval_expr(&node.scrutinee, env)?;
    let mut otherwise_body = None;
    for alignment in &node.alignments {
      if alignment.is_otherwise {
        otherwise_body = Some(&alignment.body);
        continue;
      }
      for value_expr in &alignment.values {
        let v = self.eval_expr(value_expr, env)?;
        if v.equals(&scrutinee) {
          return self.exec_block(&alignment.body, &env.child());
        }
      }
    }
    if let Some(body) = otherwise_body {
      return self.exec_block(body, &env.child());
    }
    Ok(ExecOutcome::Normal)
  }

  fn exec_attempt(
    &mut self,
    node: &'src ast::Attempt<'src>,
    env: &Environment<'src>,
  ) -> Result<ExecOutcome<'src>> {
    match self.exec_block(&node.body, &env.child()) {
      Ok(outcome) => Ok(outcome),
      Err(err) => {
        let recover_env = env.child();
        if let Some(name) = &node.error_name {
          recover_env.define(ident_name(name), Value::String(Str::from(err.to_string())));
        }
        self.exec_block(&node.recover_body, &recover_env)
      }
    }
  }

  fn exec_scheme(
    &mut self,
    body: &'src [ast::Stmt<'src>],
    span: Span,
    env: &Environment<'src>,
  ) -> Result<ExecOutcome<'src>> {
    self.voice.scheme_enter(span);
    let outcome = self.exec_block(body, &env.child())?;
    self.voice.scheme_exit(span);
    Ok(outcome)
  }

  fn exec_anomaly(
    &mut self,
    body: &'src [ast::Stmt<'src>],
    span: Span,
    env: &Environment<'src>,
  ) -> Result<ExecOutcome<'src>> {
    self.voice.anomaly_enter(span);
    let outcome = self.exec_block(body, &env.child())?;
    self.voice.anomaly_exit(span);
    Ok(outcome)
  }

  // --------------------------------------------------------- declarations

  fn exec_designate(&mut self, node: &'src ast::Designate<'src>, env: &Environment<'src>) -> Result<()> {
    let v = self.eval_expr(&node.value, env)?;
    env.define(ident_name(&node.name), v);
    Ok(())
  }

  fn exec_protocol_stmt(&mut self, proto: &Rc<ast::Protocol<'src>>, env: &Environment<'src>) {
    let func = Rc::new(Function {
      name: Some(ident_name(&proto.name)),
      callable: Callable::Protocol(Rc::clone(proto)),
      env: env.clone(),
      bound_self: None,
      defining_class: None,
    });
    env.define(ident_name(&proto.name), Value::Function(func));
  }

  fn exec_entity(&mut self, node: &'src ast::Entity<'src>, env: &Environment<'src>) -> Result<()> {
    let parent = match &node.parent {
      Some(name) => match env.get(name.as_ref()) {
        Some(Value::Class(c)) => Some(c),
        Some(_) => return Err(Error::runtime(format!("`{}` is not a class", name.as_ref()), name.span)),
        None => return Err(Error::runtime(format!("unknown class `{}`", name.as_ref()), name.span)),
      },
      None => None,
    };
    let methods_env = Environment::standalone_with_root(&self.globals);
    let class = Rc::new(Class {
      name: ident_name(&node.name),
      methods: methods_env.clone(),
      parent,
    });
    for proto in &node.methods {
      let func = Rc::new(Function {
        name: Some(ident_name(&proto.name)),
        callable: Callable::Protocol(Rc::clone(proto)),
        env: env.clone(),
        bound_self: None,
        defining_class: Some(Rc::clone(&class)),
      });
      methods_env.define(ident_name(&proto.name), Value::Function(func));
    }
    env.define(ident_name(&node.name), Value::Class(class));
    Ok(())
  }

  // --------------------------------------------------------------- voice

  fn exec_preview(&mut self, expr: &'src ast::Expr<'src>, span: Span, env: &Environment<'src>) -> Result<()> {
    let v = self.eval_expr(expr, env)?;
    self.voice.preview(span, &v);
    Ok(())
  }

  fn exec_override(&mut self, node: &'src ast::Override<'src>, span: Span, env: &Environment<'src>) -> Result<()> {
    let v = self.eval_expr(&node.value, env)?;
    env.force_set_global(ident_name(&node.name), v);
    self.voice.override_applied(span, node.name.as_ref());
    Ok(())
  }

  fn exec_absolute(&mut self, node: &'src ast::Absolute<'src>, span: Span, env: &Environment<'src>) -> Result<()> {
    let v = self.eval_expr(&node.expr, env)?;
    if !v.truthy() {
      self.voice.absolute_failure(span, node.source_text.as_ref(), &v);
    }
    Ok(())
  }

  // ------------------------------------------------------------ assignment

  fn exec_assign(&mut self, node: &'src ast::Assign<'src>, span: Span, env: &Environment<'src>) -> Result<()> {
    let value = self.eval_expr(&node.value, env)?;
    let final_value = if node.op == ast::AssignOp::Set {
      value
    } else {
      let current = self.read_target(&node.target, env)?;
      apply_assign_op(node.op, current, value, span)?
    };
    self.write_target(&node.target, final_value, env)
  }

  fn read_target(&mut self, target: &'src ast::Target<'src>, env: &Environment<'src>) -> Result<Value<'src>> {
    match target {
      ast::Target::Var(name) => Ok(env.get(name.as_ref()).unwrap_or(Value::Null)),
      ast::Target::Member(obj_expr, name) => {
        let obj = self.eval_expr(obj_expr, env)?;
        self.eval_field(obj, name.as_ref(), obj_expr.span, env)
      }
      ast::Target::Index(obj_expr, idx_expr) => {
        let obj = self.eval_expr(obj_expr, env)?;
        let idx = self.eval_expr(idx_expr, env)?;
        self.eval_index(&obj, &idx, obj_expr.span)
      }
      ast::Target::Destructure(_) => Err(Error::runtime(
        "cannot use a compound assignment operator on a destructuring target",
        span_of_target(target),
      )),
    }
  }

  fn write_target(
    &mut self,
    target: &'src ast::Target<'src>,
    value: Value<'src>,
    env: &Environment<'src>,
  ) -> Result<()> {
    match target {
      ast::Target::Var(name) => {
        env.set(ident_name(name), value);
        Ok(())
      }
      ast::Target::Member(obj_expr, name) => {
        let obj = self.eval_expr(obj_expr, env)?;
        let self_check = env.get("self").map(|s| s.equals(&obj)).unwrap_or(false);
        if name.as_ref().starts_with('_') && !self_check {
          return Err(Error::runtime(format!("`{}` is private", name.as_ref()), obj_expr.span));
        }
        match obj {
          Value::Instance(inst) => {
            inst.fields.set(ident_name(name), value);
            Ok(())
          }
          other => Err(Error::runtime(
            format!("cannot set a field on a {}", other.type_name()),
            obj_expr.span,
          )),
        }
      }
      ast::Target::Index(obj_expr, idx_expr) => {
        let obj = self.eval_expr(obj_expr, env)?;
        let idx = self.eval_expr(idx_expr, env)?;
        match obj {
          Value::List(l) => {
            let i = to_int(&idx, idx_expr.span)?;
            if i >= 0 {
              let mut list = l.borrow_mut();
              if (i as usize) < list.len() {
                list[i as usize] = value;
              }
            }
            Ok(())
          }
          Value::Dict(d) => {
            d.borrow_mut().insert(Str::from(idx.display()), value);
            Ok(())
          }
          other => Err(Error::runtime(
            format!("cannot index-assign a {}", other.type_name()),
            obj_expr.span,
          )),
        }
      }
      ast::Target::Destructure(targets) => {
        let items: Vec<Value<'src>> = match &value {
          Value::List(l) => l.borrow().clone(),
          _ => return Err(Error::runtime_detached("destructuring source must be a list")),
        };
        for (i, t) in targets.iter().enumerate() {
          let v = items.get(i).cloned().unwrap_or(Value::Null);
          self.write_target(t, v, env)?;
        }
        Ok(())
      }
    }
  }

  // ----------------------------------------------------------- expressions

  fn eval_expr(&mut self, expr: &'src ast::Expr<'src>, env: &Environment<'src>) -> Result<Value<'src>> {
    let span = expr.span;
    match &**expr {
      ast::ExprKind::Literal(lit) => self.eval_literal(lit, env),
      ast::ExprKind::GetVar(name) => env
        .get(name.as_ref())
        .ok_or_else(|| Error::runtime(format!("undefined name `{}`", name.as_ref()), span)),
      ast::ExprKind::Binary(b) => self.eval_binary(b, span, env),
      ast::ExprKind::Unary(u) => self.eval_unary(u, span, env),
      ast::ExprKind::Call(c) => self.eval_call(c, span, env),
      ast::ExprKind::GetField(obj, name) => {
        let obj_v = self.eval_expr(obj, env)?;
        self.eval_field(obj_v, name.as_ref(), span, env)
      }
      ast::ExprKind::Index(obj, idx) => {
        let obj_v = self.eval_expr(obj, env)?;
        let idx_v = self.eval_expr(idx, env)?;
        self.eval_index(&obj_v, &idx_v, span)
      }
      ast::ExprKind::Slice(s) => self.eval_slice(s, span, env),
      ast::ExprKind::Ascend(a) => self.eval_ascend(a, span, env),
      ast::ExprKind::Manifest(m) => self.eval_manifest(m, env),
      ast::ExprKind::Lambda(lambda) => Ok(Value::Function(Rc::new(Function {
        name: None,
        callable: Callable::Lambda(Rc::clone(lambda)),
        env: env.clone(),
        bound_self: None,
        defining_class: None,
      }))),
      ast::ExprKind::Ternary(t) => {
        if self.eval_expr(&t.cond, env)?.truthy() {
          self.eval_expr(&t.body, env)
        } else {
          self.eval_expr(&t.otherwise, env)
        }
      }
      ast::ExprKind::GeneratorExpr(c) => {
        let items = self.drain_comprehension(c, env)?;
        let call_env = env.child();
        Ok(Value::Generator(Rc::new(RefCell::new(
          GeneratorState::new_precomputed(Rc::new(items), call_env),
        ))))
      }
      ast::ExprKind::ListComp(c) => {
        let items = self.drain_comprehension(c, env)?;
        Ok(Value::List(Rc::new(RefCell::new(items))))
      }
    }
  }

  fn eval_literal(&mut self, lit: &'src ast::Literal<'src>, env: &Environment<'src>) -> Result<Value<'src>> {
    match lit {
      ast::Literal::Null => Ok(Value::Null),
      ast::Literal::Int(i) => Ok(Value::Int(*i)),
      ast::Literal::Float(f) => Ok(Value::Float(*f)),
      ast::Literal::Bool(b) => Ok(Value::Bool(*b)),
      ast::Literal::String(s) => Ok(Value::String(Str::from(s.as_ref()))),
      ast::Literal::List(items) => {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
          out.push(self.eval_expr(item, env)?);
        }
        Ok(Value::List(Rc::new(RefCell::new(out))))
      }
      ast::Literal::Dict(entries) => {
        let mut out = crate::value::DictInner::new();
        for (k, v) in entries {
          let key_v = self.eval_expr(k, env)?;
          let val = self.eval_expr(v, env)?;
          out.insert(Str::from(key_v.display()), val);
        }
        Ok(Value::Dict(Rc::new(RefCell::new(out))))
      }
    }
  }

  fn eval_binary(&mut self, node: &'src ast::Binary<'src>, span: Span, env: &Environment<'src>) -> Result<Value<'src>> {
    use ast::BinaryOp::*;
    match node.op {
      And => {
        let l = self.eval_expr(&node.left, env)?;
        if !l.truthy() {
          Ok(l)
        } else {
          self.eval_expr(&node.right, env)
        }
      }
      Or => {
        let l = self.eval_expr(&node.left, env)?;
        if l.truthy() {
          Ok(l)
        } else {
          self.eval_expr(&node.right, env)
        }
      }
      Maybe => {
        let l = self.eval_expr(&node.left, env)?;
        if matches!(l, Value::Null) {
          self.eval_expr(&node.right, env)
        } else {
          Ok(l)
        }
      }
      Eq => {
        let l = self.eval_expr(&node.left, env)?;
        let r = self.eval_expr(&node.right, env)?;
        Ok(Value::Bool(l.equals(&r)))
      }
      Neq => {
        let l = self.eval_expr(&node.left, env)?;
        let r = self.eval_expr(&node.right, env)?;
        Ok(Value::Bool(!l.equals(&r)))
      }
      More | MoreEq | Less | LessEq => {
        let l = self.eval_expr(&node.left, env)?;
        let r = self.eval_expr(&node.right, env)?;
        let ord = compare(&l, &r, span)?;
        let result = match node.op {
          More => ord == Ordering::Greater,
          MoreEq => ord != Ordering::Less,
          Less => ord == Ordering::Less,
          LessEq => ord != Ordering::Greater,
          _ => unreachable!(),
        };
        Ok(Value::Bool(result))
      }
      Add | Sub | Mul | Div | FloorDiv | Rem | Pow => {
        let l = self.eval_expr(&node.left, env)?;
        let r = self.eval_expr(&node.right, env)?;
        eval_arith(node.op, &l, &r, span)
      }
    }
  }

  fn eval_unary(&mut self, node: &'src ast::Unary<'src>, span: Span, env: &Environment<'src>) -> Result<Value<'src>> {
    match node.op {
      ast::UnaryOp::Not => {
        let v = self.eval_expr(&node.right, env)?;
        Ok(Value::Bool(!v.truthy()))
      }
      ast::UnaryOp::Neg => {
        let v = self.eval_expr(&node.right, env)?;
        match v {
          Value::Int(i) => Ok(Value::Int(-i)),
          Value::Float(f) => Ok(Value::Float(-f)),
          other => Err(Error::runtime(format!("cannot negate a {}", other.type_name()), span)),
        }
      }
      ast::UnaryOp::Await => {
        let v = self.eval_expr(&node.right, env)?;
        self.eval_await(v, span)
      }
    }
  }

  fn eval_await(&mut self, v: Value<'src>, span: Span) -> Result<Value<'src>> {
    match v {
      Value::Promise(p) => {
        let state = p.borrow().state.clone();
        match state {
          PromiseState::Pending => Ok(Value::Promise(p)),
          PromiseState::Resolved(v) => Ok(v),
          PromiseState::Rejected(err) => Err(Error::runtime(
            format!("awaited promise was rejected: {}", err.display()),
            span,
          )),
        }
      }
      Value::Generator(g) => self.generator_proceed(&g),
      other => Ok(other),
    }
  }

  fn eval_field(
    &mut self,
    obj: Value<'src>,
    name: &str,
    span: Span,
    env: &Environment<'src>,
  ) -> Result<Value<'src>> {
    let Value::Instance(inst) = &obj else {
      return Err(Error::runtime(
        format!("cannot access `.{name}` on a {}", obj.type_name()),
        span,
      ));
    };
    if name.starts_with('_') {
      let allowed = env.get("self").map(|s| s.equals(&obj)).unwrap_or(false);
      if !allowed {
        return Err(Error::runtime(format!("`{name}` is private"), span));
      }
    }
    if let Some(v) = inst.fields.get(name) {
      return Ok(v);
    }
    if let Some(method) = inst.class.find_method(name) {
      return Ok(bind_method(method, obj.clone()));
    }
    Err(Error::runtime(format!("no such field or method `{name}`"), span))
  }

  fn eval_index(&mut self, target: &Value<'src>, index: &Value<'src>, span: Span) -> Result<Value<'src>> {
    match target {
      Value::List(l) => {
        let i = to_int(index, span)?;
        let list = l.borrow();
        if i < 0 || (i as usize) >= list.len() {
          Ok(Value::Null)
        } else {
          Ok(list[i as usize].clone())
        }
      }
      Value::Dict(d) => {
        let key: Str = Str::from(index.display());
        Ok(d.borrow().get(&key).cloned().unwrap_or(Value::Null))
      }
      Value::String(s) => {
        let i = to_int(index, span)?;
        if i < 0 {
          return Ok(Value::Null);
        }
        Ok(match s.chars().nth(i as usize) {
          Some(c) => Value::String(Str::from(c.to_string())),
          None => Value::Null,
        })
      }
      other => Err(Error::runtime(format!("{} is not indexable", other.type_name()), span)),
    }
  }

  fn eval_slice(&mut self, node: &'src ast::Slice<'src>, span: Span, env: &Environment<'src>) -> Result<Value<'src>> {
    let target = self.eval_expr(&node.target, env)?;
    let step = match &node.step {
      Some(e) => to_int(&self.eval_expr(e, env)?, span)?,
      None => 1,
    };
    if step == 0 {
      return Err(Error::runtime("slice step cannot be zero", span));
    }
    let start = match &node.start {
      Some(e) => Some(to_int(&self.eval_expr(e, env)?, span)?),
      None => None,
    };
    let end = match &node.end {
      Some(e) => Some(to_int(&self.eval_expr(e, env)?, span)?),
      None => None,
    };

    match &target {
      Value::List(l) => {
        let list = l.borrow();
        let (s, e) = normalize_slice_bounds(start, end, list.len() as i64, step);
        let mut out = Vec::new();
        let mut i = s;
        while (step > 0 && i < e) || (step < 0 && i > e) {
          if i >= 0 && (i as usize) < list.len() {
            out.push(list[i as usize].clone());
          }
          i += step;
        }
        Ok(Value::List(Rc::new(RefCell::new(out))))
      }
      Value::String(str_val) => {
        let chars: Vec<char> = str_val.chars().collect();
        let (s, e) = normalize_slice_bounds(start, end, chars.len() as i64, step);
        let mut out = String::new();
        let mut i = s;
        while (step > 0 && i < e) || (step < 0 && i > e) {
          if i >= 0 && (i as usize) < chars.len() {
            out.push(chars[i as usize]);
          }
          i += step;
        }
        Ok(Value::String(Str::from(out)))
      }
      other => Err(Error::runtime(format!("{} cannot be sliced", other.type_name()), span)),
    }
  }

  fn eval_ascend(&mut self, node: &'src ast::Ascend<'src>, span: Span, env: &Environment<'src>) -> Result<Value<'src>> {
    let class = self
      .current_method_class
      .clone()
      .ok_or_else(|| Error::runtime_detached("ascend used outside of a method"))?;
    let parent = class
      .parent
      .clone()
      .ok_or_else(|| Error::runtime(format!("`{}` has no parent to ascend to", class.name), span))?;
    let method = parent
      .find_method(node.name.as_ref())
      .ok_or_else(|| Error::runtime(format!("no such method `{}` on the parent class", node.name.as_ref()), span))?;
    let self_value = env
      .get("self")
      .ok_or_else(|| Error::runtime_detached("ascend used outside of a self context"))?;
    let bound = bind_method(method, self_value);
    let args = self.eval_args(&node.args, env)?;
    self.call_value(bound, args, span)
  }

  fn eval_manifest(&mut self, node: &'src ast::Manifest<'src>, env: &Environment<'src>) -> Result<Value<'src>> {
    let class_val = env
      .get(node.class.as_ref())
      .ok_or_else(|| Error::runtime(format!("unknown class `{}`", node.class.as_ref()), node.class.span))?;
    let Value::Class(class) = class_val else {
      return Err(Error::runtime(
        format!("`{}` is not a class", node.class.as_ref()),
        node.class.span,
      ));
    };
    let fields = Environment::standalone_with_root(&self.globals);
    let instance = Rc::new(Instance {
      class: Rc::clone(&class),
      fields,
    });
    if let Some(ctor) = class.find_method("construct") {
      let bound = bind_method(ctor, Value::Instance(Rc::clone(&instance)));
      let args = self.eval_args(&node.args, env)?;
      self.call_value(bound, args, node.class.span)?;
    }
    Ok(Value::Instance(instance))
  }

  fn drain_comprehension(
    &mut self,
    node: &'src ast::Comprehension<'src>,
    env: &Environment<'src>,
  ) -> Result<Vec<Value<'src>>> {
    let iterable = self.eval_expr(&node.iterable, env)?;
    let source = self.make_iter_source(iterable, node.iterable.span)?;
    let mut out = Vec::new();
    let mut index = 0;
    loop {
      let item = match &source {
        IterSource::List(items) => match items.get(index) {
          Some(v) => {
            index += 1;
            v.clone()
          }
          None => break,
        },
        IterSource::Generator(g) => match self.generator_next(g)? {
          Some(v) => v,
          None => break,
        },
      };
      let body_env = env.child();
      self.bind_pattern(&node.pattern, item, &body_env, node.iterable.span)?;
      if let Some(cond) = &node.cond {
        if !self.eval_expr(cond, &body_env)?.truthy() {
          continue;
        }
      }
      out.push(self.eval_expr(&node.body, &body_env)?);
    }
    Ok(out)
  }

  fn make_iter_source(&mut self, value: Value<'src>, span: Span) -> Result<IterSource<'src>> {
    match value {
      Value::List(l) => Ok(IterSource::List(Rc::new(l.borrow().clone()))),
      Value::Generator(_) => Ok(IterSource::Generator(value)),
      other => Err(Error::runtime(format!("{} is not iterable", other.type_name()), span)),
    }
  }

  // -------------------------------------------------------------- calling

  fn eval_args(&mut self, args: &'src [ast::Arg<'src>], env: &Environment<'src>) -> Result<Vec<Value<'src>>> {
    let mut out = Vec::with_capacity(args.len());
    for arg in args {
      match arg {
        ast::Arg::Pos(e) => out.push(self.eval_expr(e, env)?),
        ast::Arg::Spread(e) => {
          let v = self.eval_expr(e, env)?;
          match v {
            Value::List(l) => out.extend(l.borrow().iter().cloned()),
            other => return Err(Error::runtime(format!("cannot spread a {}", other.type_name()), e.span)),
          }
        }
      }
    }
    Ok(out)
  }

  fn eval_call(&mut self, node: &'src ast::Call<'src>, span: Span, env: &Environment<'src>) -> Result<Value<'src>> {
    let target = self.eval_expr(&node.target, env)?;
    let args = self.eval_args(&node.args, env)?;
    self.call_value(target, args, span)
  }

  pub fn call_value(&mut self, target: Value<'src>, args: Vec<Value<'src>>, span: Span) -> Result<Value<'src>> {
    match target {
      Value::Function(f) => self.call_function(f, args, span),
      Value::Builtin(b) => (Rc::clone(&b.func))(self, &args),
      other => Err(Error::runtime(format!("{} is not callable", other.type_name()), span)),
    }
  }

  fn call_function(&mut self, func: Rc<Function<'src>>, args: Vec<Value<'src>>, span: Span) -> Result<Value<'src>> {
    let call_env = func.env.child();
    if let Some(self_v) = &func.bound_self {
      call_env.define(Str::from("self"), self_v.clone());
    }
    self.bind_params(func.callable.params(), args, &call_env, span)?;

    if func.callable.is_sequence() {
      return Ok(Value::Generator(Rc::new(RefCell::new(GeneratorState::new(
        Rc::clone(&func),
        call_env,
      )))));
    }

    if let Callable::Lambda(lambda) = &func.callable {
      if let ast::LambdaBody::Expr(e) = &lambda.body {
        return self.eval_expr(e, &call_env);
      }
    }

    let prev_class = std::mem::replace(&mut self.current_method_class, func.defining_class.clone());
    let outcome = self.exec_block(func.callable.body(), &call_env);
    self.current_method_class = prev_class;

    let result = match outcome? {
      ExecOutcome::Normal => Value::Null,
      ExecOutcome::Return(v) => v,
      ExecOutcome::Suspend { .. } => unreachable!("a non-sequence body contains no yield"),
      ExecOutcome::Break | ExecOutcome::Continue => {
        unreachable!("break/continue cannot escape a function body")
      }
    };

    if func.callable.is_async() {
      Ok(Value::Promise(Rc::new(RefCell::new(Promise {
        state: PromiseState::Resolved(result),
      }))))
    } else {
      Ok(result)
    }
  }

  fn bind_params(
    &mut self,
    params: &'src [ast::Param<'src>],
    args: Vec<Value<'src>>,
    env: &Environment<'src>,
    span: Span,
  ) -> Result<()> {
    let mut it = args.into_iter();
    for param in params {
      if param.is_rest {
        let rest: Vec<Value<'src>> = it.by_ref().collect();
        self.bind_pattern(&param.pattern, Value::List(Rc::new(RefCell::new(rest))), env, span)?;
        continue;
      }
      let value = match it.next() {
        Some(v) => v,
        None => match &param.default {
          Some(default_expr) => self.eval_expr(default_expr, env)?,
          None => Value::Null,
        },
      };
      self.bind_pattern(&param.pattern, value, env, span)?;
    }
    Ok(())
  }

  fn bind_pattern(
    &mut self,
    pattern: &'src ast::Pattern<'src>,
    value: Value<'src>,
    env: &Environment<'src>,
    span: Span,
  ) -> Result<()> {
    match pattern {
      ast::Pattern::Ident(name) => {
        env.define(ident_name(name), value);
        Ok(())
      }
      ast::Pattern::List(pats) => {
        let items: Vec<Value<'src>> = match &value {
          Value::List(l) => l.borrow().clone(),
          _ => return Err(Error::runtime("cannot destructure a non-list value", span)),
        };
        for (i, p) in pats.iter().enumerate() {
          let v = items.get(i).cloned().unwrap_or(Value::Null);
          self.bind_pattern(p, v, env, span)?;
        }
        Ok(())
      }
    }
  }

  // ------------------------------------------------------- generator driver

  /// One pull, with no value sent and no error injected.
  pub fn generator_proceed(&mut self, gen: &Rc<RefCell<GeneratorState<'src>>>) -> Result<Value<'src>> {
    self.resume_generator(gen, Mailbox::Empty)
  }

  pub fn generator_transmit(&mut self, gen: &Rc<RefCell<GeneratorState<'src>>>, v: Value<'src>) -> Result<Value<'src>> {
    self.resume_generator(gen, Mailbox::Sent(v))
  }

  pub fn generator_disrupt(&mut self, gen: &Rc<RefCell<GeneratorState<'src>>>, err: Value<'src>) -> Result<Value<'src>> {
    self.resume_generator(gen, Mailbox::Disrupted(err))
  }

  /// Pulls exactly one value from a nested generator value for
  /// `cycle through`/`delegate`/comprehension-draining purposes. A
  /// generator's own terminal `return` value counts as its final produced
  /// item — the call *after* that one is what reports exhaustion.
  fn generator_next(&mut self, gen_value: &Value<'src>) -> Result<Option<Value<'src>>> {
    let Value::Generator(g) = gen_value else {
      unreachable!("an IterSource::Generator always holds a Value::Generator")
    };
    if g.borrow().is_done() {
      return Ok(None);
    }
    Ok(Some(self.generator_proceed(g)?))
  }

  fn resume_generator(
    &mut self,
    gen_rc: &Rc<RefCell<GeneratorState<'src>>>,
    mailbox: Mailbox<'src>,
  ) -> Result<Value<'src>> {
    if gen_rc.borrow().is_done() {
      return Ok(Value::Null);
    }
    tracing::trace!(frames = gen_rc.borrow().frames.len(), "resuming generator");
    let is_precomputed = matches!(gen_rc.borrow().source, GeneratorSource::Precomputed(_));
    if is_precomputed {
      self.resume_precomputed(gen_rc, mailbox)
    } else {
      self.resume_protocol(gen_rc, mailbox)
    }
  }

  fn resume_precomputed(
    &mut self,
    gen_rc: &Rc<RefCell<GeneratorState<'src>>>,
    mailbox: Mailbox<'src>,
  ) -> Result<Value<'src>> {
    if let Mailbox::Disrupted(err) = mailbox {
      gen_rc.borrow_mut().status = GeneratorStatus::Done;
      return Err(self.disrupt_error(err));
    }
    let (items, index) = {
      let g = gen_rc.borrow();
      let GeneratorSource::Precomputed(items) = &g.source else {
        unreachable!()
      };
      let index = match g.frames.first() {
        Some(Frame::CycleThrough { index, .. }) => *index,
        _ => 0,
      };
      (Rc::clone(items), index)
    };
    if index >= items.len() {
      let mut g = gen_rc.borrow_mut();
      g.status = GeneratorStatus::Done;
      g.last_value = Value::Null;
      return Ok(Value::Null);
    }
    let value = items[index].clone();
    let mut g = gen_rc.borrow_mut();
    g.frames = vec![Frame::CycleThrough {
      source: IterSource::List(items),
      index: index + 1,
    }];
    g.status = GeneratorStatus::Suspended;
    g.last_value = value.clone();
    Ok(value)
  }

  fn resume_protocol(
    &mut self,
    gen_rc: &Rc<RefCell<GeneratorState<'src>>>,
    mailbox: Mailbox<'src>,
  ) -> Result<Value<'src>> {
    let (func, call_env, frames) = {
      let mut g = gen_rc.borrow_mut();
      let GeneratorSource::Protocol(func) = &g.source else {
        unreachable!()
      };
      (Rc::clone(func), g.call_env.clone(), std::mem::take(&mut g.frames))
    };

    if let Mailbox::Disrupted(err) = &mailbox {
      if frames.is_empty() {
        gen_rc.borrow_mut().status = GeneratorStatus::Done;
        return Err(self.disrupt_error(err.clone()));
      }
    }

    let prev_gen = self.current_generator.replace(Rc::clone(gen_rc));
    let prev_resume = std::mem::replace(&mut self.resume, frames);
    self.pending_disrupt = match mailbox {
      Mailbox::Disrupted(err) => Some(err),
      Mailbox::Sent(v) => {
        gen_rc.borrow_mut().mailbox = Mailbox::Sent(v);
        None
      }
      Mailbox::Empty => None,
    };

    let outcome = self.exec_block(func.callable.body(), &call_env);

    self.current_generator = prev_gen;
    self.resume = prev_resume;
    self.pending_disrupt = None;

    match outcome? {
      ExecOutcome::Suspend { value, frames } => {
        let mut g = gen_rc.borrow_mut();
        g.frames = frames;
        g.status = GeneratorStatus::Suspended;
        g.last_value = value.clone();
        Ok(value)
      }
      ExecOutcome::Return(v) => {
        let mut g = gen_rc.borrow_mut();
        g.status = GeneratorStatus::Done;
        g.last_value = v.clone();
        Ok(v)
      }
      ExecOutcome::Normal => {
        let mut g = gen_rc.borrow_mut();
        g.status = GeneratorStatus::Done;
        g.last_value = Value::Null;
        Ok(Value::Null)
      }
      ExecOutcome::Break | ExecOutcome::Continue => {
        Err(Error::runtime_detached("break/continue escaped a sequence body"))
      }
    }
  }
}

fn bind_method<'src>(func_value: Value<'src>, self_value: Value<'src>) -> Value<'src> {
  match func_value {
    Value::Function(f) => Value::Function(Rc::new(Function {
      name: f.name.clone(),
      callable: f.callable.clone(),
      env: f.env.clone(),
      bound_self: Some(self_value),
      defining_class: f.defining_class.clone(),
    })),
    other => other,
  }
}

fn apply_assign_op<'src>(
  op: ast::AssignOp,
  current: Value<'src>,
  new: Value<'src>,
  span: Span,
) -> Result<Value<'src>> {
  use ast::AssignOp::*;
  match op {
    Set => unreachable!("Set is handled directly in exec_assign"),
    Add => eval_arith(ast::BinaryOp::Add, &current, &new, span),
    Sub => eval_arith(ast::BinaryOp::Sub, &current, &new, span),
    Mul => eval_arith(ast::BinaryOp::Mul, &current, &new, span),
    Div => eval_arith(ast::BinaryOp::Div, &current, &new, span),
    Rem => eval_arith(ast::BinaryOp::Rem, &current, &new, span),
    Pow => eval_arith(ast::BinaryOp::Pow, &current, &new, span),
    Maybe => Ok(if matches!(current, Value::Null) { new } else { current }),
  }
}

/// Arithmetic: int/int stays int for `+ - *` (wrapping, to avoid a
/// panic on overflow); `/` always promotes to float; `//` always floors
/// back down to int; `%` stays int for int/int, float fmod otherwise; `**`
/// stays int for a non-negative int exponent that doesn't overflow, float
/// otherwise. Strings support `+` (stringify the other side) and `*` with
/// an int repeat count.
fn eval_arith<'src>(op: ast::BinaryOp, l: &Value<'src>, r: &Value<'src>, span: Span) -> Result<Value<'src>> {
  use ast::BinaryOp::*;
  use Value::*;

  match (l, op, r) {
    (String(_), Add, _) | (_, Add, String(_)) => {
      return Ok(String(Str::from(format!("{}{}", l.display(), r.display()))));
    }
    (String(s), Mul, Int(n)) | (Int(n), Mul, String(s)) => {
      return Ok(String(Str::from(repeat_string(s, *n))));
    }
    _ => {}
  }

  match (l, r) {
    (Int(a), Int(b)) => match op {
      Add => Ok(Int(a.wrapping_add(*b))),
      Sub => Ok(Int(a.wrapping_sub(*b))),
      Mul => Ok(Int(a.wrapping_mul(*b))),
      Div => {
        if *b == 0 {
          Err(Error::runtime("division by zero", span))
        } else {
          Ok(Float(*a as f64 / *b as f64))
        }
      }
      FloorDiv => {
        if *b == 0 {
          Err(Error::runtime("division by zero", span))
        } else {
          Ok(Int((*a as f64 / *b as f64).floor() as i64))
        }
      }
      Rem => {
        if *b == 0 {
          Err(Error::runtime("division by zero", span))
        } else {
          Ok(Int(a.wrapping_rem(*b)))
        }
      }
      Pow if *b >= 0 => match a.checked_pow(*b as u32) {
        Some(v) => Ok(Int(v)),
        None => Ok(Float((*a as f64).powf(*b as f64))),
      },
      Pow => Ok(Float((*a as f64).powf(*b as f64))),
      _ => unreachable!("comparison/logical ops are handled by eval_binary"),
    },
    _ => {
      let a = to_float(l, span)?;
      let b = to_float(r, span)?;
      match op {
        Add => Ok(Float(a + b)),
        Sub => Ok(Float(a - b)),
        Mul => Ok(Float(a * b)),
        Div => {
          if b == 0.0 {
            Err(Error::runtime("division by zero", span))
          } else {
            Ok(Float(a / b))
          }
        }
        FloorDiv => {
          if b == 0.0 {
            Err(Error::runtime("division by zero", span))
          } else {
            Ok(Int((a / b).floor() as i64))
          }
        }
        Rem => {
          if b == 0.0 {
            Err(Error::runtime("division by zero", span))
          } else {
            Ok(Float(a % b))
          }
        }
        Pow => Ok(Float(a.powf(b))),
        _ => unreachable!("comparison/logical ops are handled by eval_binary"),
      }
    }
  }
}

fn compare(l: &Value<'_>, r: &Value<'_>, span: Span) -> Result<Ordering> {
  match (l, r) {
    (Value::String(a), Value::String(b)) => Ok(a.as_ref().cmp(b.as_ref())),
    (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
    _ => {
      let a = to_float(l, span)?;
      let b = to_float(r, span)?;
      a.partial_cmp(&b).ok_or_else(|| Error::runtime("cannot compare NaN", span))
    }
  }
}

fn to_float(v: &Value<'_>, span: Span) -> Result<f64> {
  match v {
    Value::Int(i) => Ok(*i as f64),
    Value::Float(f) => Ok(*f),
    other => Err(Error::runtime(format!("expected a number, found {}", other.type_name()), span)),
  }
}

fn to_int(v: &Value<'_>, span: Span) -> Result<i64> {
  match v {
    Value::Int(i) => Ok(*i),
    Value::Float(f) => Ok(*f as i64),
    other => Err(Error::runtime(format!("expected an integer, found {}", other.type_name()), span)),
  }
}

fn repeat_string(s: &str, n: i64) -> String {
  if n <= 0 {
    String::new()
  } else {
    s.repeat(n as usize)
  }
}

/// Python-style bound normalization: negative indices count from the end,
/// clamped to `[0, len]` for a positive step or `[-1, len-1]` for a
/// negative one (so an omitted end on a reversed slice runs to index 0).
fn normalize_slice_bounds(start: Option<i64>, end: Option<i64>, len: i64, step: i64) -> (i64, i64) {
  if step > 0 {
    let norm = |v: i64| if v < 0 { (v + len).max(0) } else { v.min(len) };
    (start.map(norm).unwrap_or(0), end.map(norm).unwrap_or(len))
  } else {
    let norm = |v: i64| if v < 0 { v + len } else { v };
    let s = start.map(norm).unwrap_or(len - 1).min(len - 1);
    let e = end.map(norm).unwrap_or(-1);
    (s, e)
  }
}

fn span_of_target(target: &ast::Target<'_>) -> Span {
  match target {
    ast::Target::Var(name) => name.span,
    ast::Target::Member(expr, _) => expr.span,
    ast::Target::Index(expr, _) => expr.span,
    ast::Target::Destructure(targets) => targets
      .first()
      .map(span_of_target)
      .unwrap_or_else(|| Span::from(0..0)),
  }
}
