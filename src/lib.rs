#![allow(clippy::wrong_self_convention)]

//! Keikaku: a dynamically-typed, indentation-sensitive scripting language
//! with first-class generators, lexical closures, and single-inheritance
//! classes. This crate is the lexer-independent half of the implementation
//! — value model, environment, tree-walking evaluator, generator/suspension
//! engine, and the built-in registry; [`syntax`] owns lexing/parsing.
//!
//! The public entry point is [`Keikaku`], built via [`Keikaku::builder`]
//! (or [`Keikaku::new`] for the defaults). Its AST borrows straight from
//! source text instead of interning it: every [`Keikaku`] is parameterized
//! by the `'src` lifetime of the [`SourceArena`] that owns that text.

pub mod builtins;
pub mod env;
pub mod error;
pub mod eval;
pub mod generator;
pub mod loader;
pub mod value;
pub mod voice;

pub use env::Environment;
pub use error::Error;
pub use eval::Evaluator;
pub use loader::{ModuleLoadError, ModuleLoader, NoopModuleLoader, SourceArena};
pub use value::Value;
pub use voice::{NullVoice, VoiceChannel};

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub struct Keikaku<'src> {
  evaluator: Evaluator<'src>,
  loader: Box<dyn ModuleLoader>,
  arena: &'src SourceArena,
}

impl<'src> Keikaku<'src> {
  /// Builds an instance with default settings: no import loader (every
  /// `import` fails) and a silent voice channel. `arena` must outlive the
  /// returned value — it owns every source string and parsed module this
  /// instance (and anything it evaluates) ever touches.
  pub fn new(arena: &'src SourceArena) -> Self {
    Keikaku::builder(arena).build()
  }

  pub fn builder(arena: &'src SourceArena) -> KeikakuBuilder<'src> {
    KeikakuBuilder {
      arena,
      voice: None,
      loader: None,
    }
  }

  /// Parses `src` without evaluating it — surfaces only syntax errors.
  pub fn check(src: &str) -> std::result::Result<(), Vec<syntax::Error>> {
    syntax::parser::parse(src).map(|_| ())
  }

  /// Parses `src` as a module, splices in whatever it imports (via this
  /// instance's loader), and runs its top-level body against this
  /// instance's globals. Calling this repeatedly against the same
  /// [`Keikaku`] shares state across calls — the REPL's execution model.
  pub fn eval(&mut self, src: &str) -> Result<Value<'src>> {
    let _span = tracing::debug_span!("eval", bytes = src.len()).entered();
    let text = self.arena.alloc_str(src.to_string());
    let mut module = syntax::parser::parse(text)?;
    loader::resolve_imports(&mut module, &mut *self.loader, self.arena)?;
    let module = self.arena.alloc_module(module);
    let result = self.evaluator.eval_module(module);
    if let Err(e) = &result {
      tracing::debug!(error = %e, "eval failed");
    }
    result
  }

  /// The root scope — `define`/`get`/`set` are usable directly since
  /// [`Environment`]'s mutation methods take `&self` (interior mutability
  /// all the way down, per `src/env.rs`).
  pub fn globals(&self) -> &Environment<'src> {
    &self.evaluator.globals
  }

  pub fn voice_mut(&mut self) -> &mut dyn VoiceChannel {
    self.evaluator.voice_mut()
  }

  pub fn evaluator_mut(&mut self) -> &mut Evaluator<'src> {
    &mut self.evaluator
  }
}

pub struct KeikakuBuilder<'src> {
  arena: &'src SourceArena,
  voice: Option<Box<dyn VoiceChannel>>,
  loader: Option<Box<dyn ModuleLoader>>,
}

impl<'src> KeikakuBuilder<'src> {
  pub fn with_voice(mut self, voice: impl VoiceChannel + 'static) -> Self {
    self.voice = Some(Box::new(voice));
    self
  }

  pub fn with_module_loader(mut self, loader: impl ModuleLoader + 'static) -> Self {
    self.loader = Some(Box::new(loader));
    self
  }

  pub fn build(self) -> Keikaku<'src> {
    let voice = self.voice.unwrap_or_else(|| Box::new(NullVoice) as Box<dyn VoiceChannel>);
    let loader = self.loader.unwrap_or_else(|| Box::new(NoopModuleLoader) as Box<dyn ModuleLoader>);
    Keikaku {
      evaluator: Evaluator::new(voice),
      loader,
      arena: self.arena,
    }
  }
}

#[cfg(test)]
mod tests;
