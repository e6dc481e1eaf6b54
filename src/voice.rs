//! The "voice channel" — a side-message sink distinct from ordinary program
//! output (`declare`/`announce`), carrying the evaluator's own narration of
//! what it's doing: scheme/anomaly tracing, `preview` dumps, `override`
//! notices, and `absolute` failures. Modeled as a trait object field on
//! [`crate::eval::Evaluator`] rather than a generic parameter, keeping
//! [`crate::value::Builtin`]'s function-pointer type free of an extra
//! generic.

use span::Span;

use crate::value::Value;

/// Everything the evaluator may want to say that isn't ordinary program
/// output. Default implementations are no-ops, so a channel only needs to
/// override what it cares about.
pub trait VoiceChannel {
  fn repl_banner(&mut self) {}
  fn repl_goodbye(&mut self) {}

  fn scheme_enter(&mut self, _span: Span) {}
  fn scheme_exit(&mut self, _span: Span) {}

  fn preview(&mut self, _span: Span, _value: &Value<'_>) {}

  fn override_applied(&mut self, _span: Span, _name: &str) {}

  fn absolute_failure(&mut self, _span: Span, _source_text: &str, _value: &Value<'_>) {}

  fn anomaly_enter(&mut self, _span: Span) {}
  fn anomaly_exit(&mut self, _span: Span) {}

  fn error(&mut self, _message: &str, _span: Option<Span>) {}
}

/// The default channel: every narration call is silently dropped. Used for
/// file execution and embedding contexts that never asked for narration.
pub struct NullVoice;

impl VoiceChannel for NullVoice {}
