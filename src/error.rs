use std::fmt;

use span::Span;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error type threaded through the public embedding API.
///
/// Library crates define their own error types; this enum is the seam
/// where they get wrapped for the embedder.
#[derive(Debug)]
pub enum Error {
  Syntax(Vec<syntax::Error>),
  Runtime(RuntimeError),
  Io(std::io::Error),
}

/// A runtime error: division by zero, unknown name, non-callable call, bad
/// index/member, bad destructure, or a value injected via `disrupt`.
///
/// `span` is `None` for errors that don't originate from a parsed source
/// location (for example a `disrupt`-injected value raised from outside the
/// module being evaluated).
#[derive(Debug, Clone)]
pub struct RuntimeError {
  pub message: String,
  pub span: Option<Span>,
}

impl RuntimeError {
  pub fn new(message: impl Into<String>, span: impl Into<Span>) -> Self {
    RuntimeError {
      message: message.into(),
      span: Some(span.into()),
    }
  }

  pub fn detached(message: impl Into<String>) -> Self {
    RuntimeError {
      message: message.into(),
      span: None,
    }
  }
}

impl fmt::Display for RuntimeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.message)
  }
}

impl Error {
  pub fn runtime(message: impl Into<String>, span: impl Into<Span>) -> Self {
    Error::Runtime(RuntimeError::new(message, span))
  }

  pub fn runtime_detached(message: impl Into<String>) -> Self {
    Error::Runtime(RuntimeError::detached(message))
  }
}

impl From<Vec<syntax::Error>> for Error {
  fn from(value: Vec<syntax::Error>) -> Self {
    Error::Syntax(value)
  }
}

impl From<RuntimeError> for Error {
  fn from(value: RuntimeError) -> Self {
    Error::Runtime(value)
  }
}

impl From<std::io::Error> for Error {
  fn from(value: std::io::Error) -> Self {
    Error::Io(value)
  }
}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Error::Syntax(errs) => {
        for (i, e) in errs.iter().enumerate() {
          if i > 0 {
            writeln!(f)?;
          }
          write!(f, "{e}")?;
        }
        Ok(())
      }
      Error::Runtime(e) => write!(f, "{e}"),
      Error::Io(e) => write!(f, "{e}"),
    }
  }
}

impl std::error::Error for Error {}
