//! The suspension engine behind `sequence` (generator) values. A generator's
//! AST is walked by the ordinary
//! evaluator; when it hits a `yield`/`delegate` statement mid-walk, the
//! walk unwinds back to the driver (`proceed`/`transmit`/`disrupt`) instead
//! of returning, recording just enough state in a [`Frame`] stack to
//! re-descend to the same point next time.
//!
//! Only 5 frame shapes exist. `foresee`/`situation`/`attempt` need none of
//! their own: they're assumed to deterministically re-select the same
//! branch on resume, so the walk just re-evaluates the condition/scrutinee
//! and transparently recurses into the chosen branch's `Block` frame.

use std::rc::Rc;

use crate::env::Environment;
use crate::value::{Function, Value};

/// One level of "where was I" state, pushed in child-to-parent order as a
/// suspend unwinds (so the *last* pushed frame is the outermost one, and
/// popping from the end of the stack yields frames outermost-first again
/// on resume — matching the direction of recursive re-descent).
#[derive(Clone)]
pub enum Frame<'src> {
  /// Resume a statement list at `next`, in the scope it was suspended in —
  /// `exec_block` is the only construct that owns a scope across
  /// suspension, so it's the only frame that carries one.
  Block {
    next: usize,
    env: Environment<'src>,
  },
  /// Resume the body of a `cycle while` loop; the condition is re-tested
  /// (assumed side-effect-stable) once the body's own `Block` frame drains.
  CycleWhile,
  /// Resume a `cycle through` loop over a list (deep-copied into a snapshot
  /// at loop entry so mutation during suspension can't shift the index out
  /// from under the resumption) or a nested generator (which tracks its own
  /// position, so `index` goes unused).
  CycleThrough { source: IterSource<'src>, index: usize },
  /// Resume a `cycle from ... to` loop.
  CycleFromTo { current: i64, end: i64, step: i64 },
  /// Resume a `delegate` statement: pulls from the same list-or-generator
  /// source as `cycle through`, re-yielding each value in turn.
  Delegate { source: IterSource<'src>, index: usize },
}

impl<'src> Frame<'src> {
  fn deep_copy(&self) -> Frame<'src> {
    match self {
      Frame::Block { next, env } => Frame::Block {
        next: *next,
        env: env.deep_copy(),
      },
      Frame::CycleWhile => Frame::CycleWhile,
      Frame::CycleThrough { source, index } => Frame::CycleThrough {
        source: source.deep_copy(),
        index: *index,
      },
      Frame::CycleFromTo { current, end, step } => Frame::CycleFromTo {
        current: *current,
        end: *end,
        step: *step,
      },
      Frame::Delegate { source, index } => Frame::Delegate {
        source: source.deep_copy(),
        index: *index,
      },
    }
  }
}

/// What a `cycle through`/`delegate` statement is pulling values from.
#[derive(Clone)]
pub enum IterSource<'src> {
  List(Rc<Vec<Value<'src>>>),
  Generator(Value<'src>),
}

impl<'src> IterSource<'src> {
  fn deep_copy(&self) -> IterSource<'src> {
    match self {
      IterSource::List(items) => IterSource::List(Rc::new(items.iter().map(Value::deep_copy).collect())),
      IterSource::Generator(g) => IterSource::Generator(g.deep_copy()),
    }
  }
}

/// The generator's mailbox: the value handed to it by `proceed`/`transmit`,
/// or an error to raise at the next resumption via `disrupt`.
#[derive(Clone)]
pub enum Mailbox<'src> {
  Empty,
  Sent(Value<'src>),
  Disrupted(Value<'src>),
}

impl<'src> Mailbox<'src> {
  fn deep_copy(&self) -> Mailbox<'src> {
    match self {
      Mailbox::Empty => Mailbox::Empty,
      Mailbox::Sent(v) => Mailbox::Sent(v.deep_copy()),
      Mailbox::Disrupted(v) => Mailbox::Disrupted(v.deep_copy()),
    }
  }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum GeneratorStatus {
  /// Never started.
  Fresh,
  Suspended,
  Done,
}

/// What a generator walks. Most generators wrap a `sequence`-flagged
/// [`Function`]; a generator expression (`(expr for x through xs)`) has no
/// function body at all — it's drained eagerly into a list at the
/// expression's evaluation site and then just re-serves that list one
/// element per resumption, which is observably identical to a lazy pull for
/// any finite source.
#[derive(Clone)]
pub enum GeneratorSource<'src> {
  Protocol(Rc<Function<'src>>),
  Precomputed(Rc<Vec<Value<'src>>>),
}

impl<'src> GeneratorSource<'src> {
  /// The function itself is shared (functions are reference-owned, per the
  /// value model's own rule); only a precomputed generator-expression's
  /// backing list is duplicated.
  fn deep_copy(&self) -> GeneratorSource<'src> {
    match self {
      GeneratorSource::Protocol(f) => GeneratorSource::Protocol(f.clone()),
      GeneratorSource::Precomputed(items) => {
        GeneratorSource::Precomputed(Rc::new(items.iter().map(Value::deep_copy).collect()))
      }
    }
  }
}

pub struct GeneratorState<'src> {
  pub status: GeneratorStatus,
  /// Resume stack, outermost-last (see [`Frame`]). Empty + `Fresh` means
  /// "hasn't started"; empty + `Done` means "finished".
  pub frames: Vec<Frame<'src>>,
  pub source: GeneratorSource<'src>,
  /// The call-scope this was built with at creation time (params already
  /// bound, `self` included for a method generator). Unused by a
  /// [`GeneratorSource::Precomputed`] generator.
  pub call_env: Environment<'src>,
  /// The value most recently produced by `yield`/`return`, cached for
  /// `measure`/introspection callers that peek without resuming.
  pub last_value: Value<'src>,
  /// `transmit`'s sent value or `disrupt`'s injected error, consumed at the
  /// next resumption.
  pub mailbox: Mailbox<'src>,
}

impl<'src> GeneratorState<'src> {
  pub fn new(func: Rc<Function<'src>>, call_env: Environment<'src>) -> Self {
    GeneratorState {
      status: GeneratorStatus::Fresh,
      frames: Vec::new(),
      source: GeneratorSource::Protocol(func),
      call_env,
      last_value: Value::Null,
      mailbox: Mailbox::Empty,
    }
  }

  pub fn new_precomputed(items: Rc<Vec<Value<'src>>>, call_env: Environment<'src>) -> Self {
    GeneratorState {
      status: GeneratorStatus::Fresh,
      frames: Vec::new(),
      source: GeneratorSource::Precomputed(items),
      call_env,
      last_value: Value::Null,
      mailbox: Mailbox::Empty,
    }
  }

  pub fn is_done(&self) -> bool {
    self.status == GeneratorStatus::Done
  }

  /// Deep-copying a generator clones its environment, suspension stack, and
  /// saved iterables — unlike a plain [`Value::clone`] (which aliases the
  /// same `Rc<RefCell<GeneratorState>>>`), this produces an independent
  /// cursor that can be driven separately from the original: every scope the
  /// copy can still write to (its own call scope and any suspended block
  /// scopes) is a fresh `Scope`, not an `Rc` alias of the original's.
  pub fn deep_copy(&self) -> GeneratorState<'src> {
    GeneratorState {
      status: self.status,
      frames: self.frames.iter().map(Frame::deep_copy).collect(),
      source: self.source.deep_copy(),
      call_env: self.call_env.deep_copy(),
      last_value: self.last_value.deep_copy(),
      mailbox: self.mailbox.deep_copy(),
    }
  }
}

/// What a statement-list walk produced, used to thread suspension through
/// nested block/loop execution without unwinding via `Result` alone.
pub enum ExecOutcome<'src> {
  Normal,
  Break,
  Continue,
  Return(Value<'src>),
  Suspend {
    value: Value<'src>,
    /// Child-to-parent order so far; the caller appends its own frame
    /// before propagating further up.
    frames: Vec<Frame<'src>>,
  },
}
