//! Builds a [`keikaku::Keikaku`] instance for the CLI and renders its errors
//! to the terminal: one function to build the runtime, one to report its
//! errors. Builtins are installed directly by the evaluator
//! (`src/builtins.rs`); there is no separate native-module registration
//! step.

use std::path::{Path, PathBuf};

use keikaku::{Error, ModuleLoadError, ModuleLoader, SourceArena};

/// Resolves `import a.b` against the filesystem, relative to the directory
/// of the script that's importing, following a `.kei` suffix convention.
/// This is the embedder-supplied half of the `ModuleLoader` seam the core
/// crate leaves open (`src/loader.rs`).
pub struct FileModuleLoader {
  root: PathBuf,
}

impl FileModuleLoader {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    FileModuleLoader { root: root.into() }
  }
}

impl ModuleLoader for FileModuleLoader {
  fn load(&mut self, path: &[String]) -> Result<String, Box<dyn std::error::Error>> {
    let mut file: PathBuf = self.root.clone();
    for component in path {
      file.push(component);
    }
    file.set_extension("kei");
    std::fs::read_to_string(&file).map_err(|_| {
      Box::new(ModuleLoadError { path: path.join(".") }) as Box<dyn std::error::Error>
    })
  }
}

/// Builds a loader rooted at the directory containing `script_path`, or the
/// current directory for stdin/REPL input.
pub fn loader_for(script_path: Option<&Path>) -> FileModuleLoader {
  let root = script_path
    .and_then(Path::parent)
    .filter(|p| !p.as_os_str().is_empty())
    .map(Path::to_path_buf)
    .unwrap_or_else(|| PathBuf::from("."));
  FileModuleLoader::new(root)
}

/// Renders every diagnostic embedded in `e` to stderr, colorized unless
/// `--no-color` was passed or the terminal doesn't support it.
pub fn report_errors(source: &str, name: &str, e: &Error, color: bool) {
  match e {
    Error::Syntax(errs) => {
      for err in errs {
        let report = diag::Report::error()
          .source(diag::Source::file(name.to_string(), source.to_string()))
          .message(err.message.to_string())
          .span(err.span)
          .color(color)
          .build();
        eprint!("{}", report.emit_to_string().unwrap_or_else(|_| format!("{err}\n")));
      }
    }
    Error::Runtime(re) => match re.span {
      Some(span) => {
        let report = diag::Report::error()
          .source(diag::Source::file(name.to_string(), source.to_string()))
          .message(re.message.clone())
          .span(span)
          .color(color)
          .build();
        eprint!("{}", report.emit_to_string().unwrap_or_else(|_| format!("{re}\n")));
      }
      None => eprintln!("error: {re}"),
    },
    Error::Io(io) => eprintln!("error: {io}"),
  }
}

/// Detects whether colored output should be used for `stream`, honoring an
/// explicit `--no-color` override before falling back to terminal detection
/// (via `supports_color::on`).
pub fn color_enabled(no_color: bool, stream: supports_color::Stream) -> bool {
  if no_color {
    return false;
  }
  supports_color::on(stream).map(|c| c.has_basic).unwrap_or(false)
}

pub fn arena() -> SourceArena {
  SourceArena::new()
}
