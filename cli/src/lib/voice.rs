//! [`keikaku::VoiceChannel`] implementation that renders narration to a
//! terminal. Spanned events render through [`diag::Report`]; unspanned
//! events (the REPL banner/goodbye) are
//! plain prints. Repeated identical errors escalate in verbosity, tracked
//! by a small per-span counter this struct owns — the core crate never
//! needs to know about repeat counts.

use std::collections::HashMap;

use keikaku::VoiceChannel;
use span::Span;

pub struct TerminalVoice {
  source: String,
  name: String,
  color: bool,
  quiet: bool,
  error_repeats: HashMap<Span, u32>,
}

impl TerminalVoice {
  pub fn new(name: impl Into<String>, color: bool, quiet: bool) -> Self {
    TerminalVoice {
      source: String::new(),
      name: name.into(),
      color,
      quiet,
      error_repeats: HashMap::new(),
    }
  }

  /// The REPL rebuilds its buffer every iteration; call this before
  /// evaluating so spanned reports point at the right source text.
  pub fn set_source(&mut self, source: impl Into<String>) {
    self.source = source.into();
  }

  fn report(&self, message: impl Into<String>, span: Span, label: Option<&str>) -> String {
    let mut builder = diag::Report::info()
      .source(diag::Source::file(self.name.clone(), self.source.clone()))
      .message(message.into())
      .span(span)
      .color(self.color);
    if let Some(label) = label {
      builder = builder.label(label.to_string());
    }
    builder.build().emit_to_string().unwrap_or_default()
  }
}

impl VoiceChannel for TerminalVoice {
  fn repl_banner(&mut self) {
    println!("keikaku REPL v{}", env!("CARGO_PKG_VERSION"));
    println!("type `conclude` to exit");
  }

  fn repl_goodbye(&mut self) {
    println!("goodbye");
  }

  fn scheme_enter(&mut self, span: Span) {
    if self.quiet {
      return;
    }
    print!("{}", self.report("entering scheme", span, None));
  }

  fn scheme_exit(&mut self, span: Span) {
    if self.quiet {
      return;
    }
    print!("{}", self.report("exiting scheme", span, None));
  }

  fn preview(&mut self, span: Span, value: &keikaku::Value<'_>) {
    if self.quiet {
      return;
    }
    print!("{}", self.report(format!("preview: {}", value.repr()), span, None));
  }

  fn override_applied(&mut self, span: Span, name: &str) {
    if self.quiet {
      return;
    }
    print!("{}", self.report(format!("override applied to `{name}`"), span, None));
  }

  fn absolute_failure(&mut self, span: Span, source_text: &str, value: &keikaku::Value<'_>) {
    // absolute failures report regardless of --quiet — they're an assertion
    // result, not chatter, and never halt execution.
    eprint!(
      "{}",
      self.report(
        format!("absolute failed: {}", value.repr()),
        span,
        Some(source_text),
      )
    );
  }

  fn anomaly_enter(&mut self, span: Span) {
    if self.quiet {
      return;
    }
    print!("{}", self.report("entering anomaly", span, None));
  }

  fn anomaly_exit(&mut self, span: Span) {
    if self.quiet {
      return;
    }
    print!("{}", self.report("exiting anomaly", span, None));
  }

  fn error(&mut self, message: &str, span: Option<Span>) {
    let count = span
      .map(|s| {
        let entry = self.error_repeats.entry(s).or_insert(0);
        *entry += 1;
        *entry
      })
      .unwrap_or(1);

    match span {
      Some(span) if count == 1 => eprint!("{}", self.report(message, span, None)),
      Some(span) if count == 2 => eprint!(
        "{}",
        self.report(message, span, Some("this keeps happening — check the loop condition"))
      ),
      Some(span) => eprint!(
        "{}",
        self.report(
          format!("{message} (repeated {count} times)"),
          span,
          Some("this keeps happening — check the loop condition"),
        )
      ),
      None => eprintln!("error: {message}"),
    }
  }
}
