//! Import resolution. The core crate only parses `import "path" [as alias]`
//! into an [`ast::Import`] node — turning that path into source text is the
//! embedder's job, via the [`ModuleLoader`] trait boundary. This module also
//! owns an arena that keeps spliced source text alive for exactly as long as
//! the [`ast::Module`] values borrowed from it, since the AST borrows
//! straight from the source string rather than interning it.

use std::fmt;

use beef::lean::Cow;
use bumpalo::Bump;
use syntax::ast::{self, Expr, ExprKind, Ident, Literal};

use crate::error::{Error, Result};

/// Resolves an import path (dot-separated components, e.g. `a.b` for
/// `import a.b`) to source text. The CLI's implementation resolves against
/// the filesystem; an embedding application might resolve against a
/// virtual filesystem, a network store, or an in-memory map instead.
pub trait ModuleLoader {
  fn load(&mut self, path: &[String]) -> std::result::Result<String, Box<dyn std::error::Error>>;
}

/// Refuses every import — the default for embedders that never opted in.
pub struct NoopModuleLoader;

#[derive(Debug)]
pub struct ModuleLoadError {
  pub path: String,
}

impl fmt::Display for ModuleLoadError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "could not load module `{}`", self.path)
  }
}

impl std::error::Error for ModuleLoadError {}

impl ModuleLoader for NoopModuleLoader {
  fn load(&mut self, path: &[String]) -> std::result::Result<String, Box<dyn std::error::Error>> {
    Err(Box::new(ModuleLoadError { path: path.join(".") }))
  }
}

/// Append-only store of loaded source text *and* the modules parsed from
/// it, backed by a bump allocator so that handing out `&'arena` references
/// from a `&self` method doesn't require the caller to hold `&mut` for the
/// arena's whole lifetime — essential here, since import resolution
/// interleaves "load more text", "parse it", and "keep the AST already
/// borrowed from earlier text alive", and since a top-level module handed
/// to [`crate::eval::Evaluator::eval_module`] must outlive the evaluator
/// itself (a `Function` value can carry an `Rc` to its defining AST node
/// well past the call that created it).
#[derive(Default)]
pub struct SourceArena {
  bump: Bump,
}

impl SourceArena {
  pub fn new() -> Self {
    SourceArena::default()
  }

  /// Copies `text` into the arena and returns a reference tied to the
  /// arena's own lifetime.
  pub fn alloc_str(&self, text: String) -> &str {
    self.bump.alloc_str(&text)
  }

  /// Moves `module` into the arena and returns a reference tied to the
  /// arena's own lifetime — the module's own `'src` content already
  /// borrows from a string this same arena owns.
  pub fn alloc_module<'src>(&'src self, module: ast::Module<'src>) -> &'src ast::Module<'src> {
    self.bump.alloc(module)
  }
}

/// Splices every `import` reachable from `module` into its top-level body,
/// recursively, via `loader`. Text for imported modules is copied into
/// `arena` so the resulting AST can borrow it for as long as `arena` lives.
///
/// Unaliased (`import path`) is textual inclusion: the imported module's
/// top-level statements are spliced directly ahead of the importing
/// module's own body, so its bindings land straight in the same scope —
/// there is no module system beyond this.
/// Aliased (`import path as name`) performs the same splice, then adds one
/// synthesized `designate name = {...}` statement gathering the imported
/// module's top-level bindings into a dict under `name` — a convenience
/// namespace snapshot, not real encapsulation: the bare names are still
/// directly visible too, since the underlying mechanism is still textual
/// inclusion (see `DESIGN.md`).
pub fn resolve_imports<'src>(
  module: &mut ast::Module<'src>,
  loader: &mut dyn ModuleLoader,
  arena: &'src SourceArena,
) -> Result<()> {
  let mut stack = Vec::new();
  resolve_imports_inner(module, loader, arena, &mut stack)
}

fn resolve_imports_inner<'src>(
  module: &mut ast::Module<'src>,
  loader: &mut dyn ModuleLoader,
  arena: &'src SourceArena,
  stack: &mut Vec<String>,
) -> Result<()> {
  let imports = std::mem::take(&mut module.imports);
  let mut prelude: Vec<ast::Stmt<'src>> = Vec::new();

  for import in imports {
    let path_str = import.path.as_ref().to_string();
    if stack.iter().any(|p| p == &path_str) {
      return Err(Error::runtime_detached(format!(
        "import cycle detected at `{path_str}`"
      )));
    }

    tracing::debug!(path = %path_str, "resolving import");
    let components: Vec<String> = path_str.split('.').map(String::from).collect();
    let text = loader
      .load(&components)
      .map_err(|e| Error::runtime_detached(format!("failed to import `{path_str}`: {e}")))?;
    let text_ref: &'src str = arena.alloc_str(text);

    let mut imported = syntax::parser::parse(text_ref).map_err(Error::from)?;

    stack.push(path_str);
    resolve_imports_inner(&mut imported, loader, arena, stack)?;
    stack.pop();

    match &import.alias {
      Some(alias) => {
        let names = collect_top_level_names(&imported.body);
        let entries: Vec<(Expr<'src>, Expr<'src>)> = names
          .iter()
          .map(|name| {
            let key = Expr::new(
              name.span,
              ExprKind::Literal(Box::new(Literal::String(Cow::from(name.as_ref().to_string())))),
            );
            (key, ast::expr_get_var(name.clone()))
          })
          .collect();
        prelude.extend(imported.body);
        prelude.push(ast::designate_stmt(
          alias.span,
          alias.clone(),
          ast::expr_dict(alias.span, entries),
        ));
      }
      None => prelude.extend(imported.body),
    }
  }

  prelude.extend(std::mem::take(&mut module.body));
  module.body = prelude;
  Ok(())
}

/// The identifiers a module's top-level statements bind directly into
/// whatever scope runs them — used to build the namespace dict for an
/// aliased import. Only looks at the statement list itself, not inside
/// nested blocks, matching how `designate`/`protocol`/`entity` actually
/// scope.
fn collect_top_level_names<'src>(body: &[ast::Stmt<'src>]) -> Vec<Ident<'src>> {
  let mut names = Vec::new();
  for stmt in body {
    match &**stmt {
      ast::StmtKind::Designate(d) => names.push(d.name.clone()),
      ast::StmtKind::Protocol(p) => names.push(p.name.clone()),
      ast::StmtKind::Entity(e) => names.push(e.name.clone()),
      _ => {}
    }
  }
  names
}
