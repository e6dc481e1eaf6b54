use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use syntax::ast;

use crate::env::Environment;
use crate::eval::Evaluator;
use crate::generator::GeneratorState;
use crate::Result;

/// Interned-ish owned string payload. Cheap to clone (pointer bump);
/// allocated fresh wherever a literal or computed string is produced.
pub type Str = Rc<str>;

pub type ListInner<'src> = Vec<Value<'src>>;
pub type DictInner<'src> = IndexMap<Str, Value<'src>>;

pub type ListRef<'src> = Rc<RefCell<ListInner<'src>>>;
pub type DictRef<'src> = Rc<RefCell<DictInner<'src>>>;

/// `Clone` is always a cheap pointer bump (or, for `Int`/`Float`/`Bool`/
/// `Null`, a literal copy) — structural duplication of strings/lists/dicts/
/// generators is the separate [`Value::deep_copy`] operation, reserved for
/// the specific call sites that need it (generator suspension-frame
/// iterable snapshots, the `deep_copy` builtin-adjacent semantics).
#[derive(Clone)]
pub enum Value<'src> {
  Null,
  Bool(bool),
  Int(i64),
  Float(f64),
  String(Str),
  List(ListRef<'src>),
  Dict(DictRef<'src>),
  Function(Rc<Function<'src>>),
  Builtin(Rc<Builtin<'src>>),
  Class(Rc<Class<'src>>),
  Instance(Rc<Instance<'src>>),
  Generator(Rc<RefCell<GeneratorState<'src>>>),
  Promise(Rc<RefCell<Promise<'src>>>),
}

pub struct Function<'src> {
  pub name: Option<Str>,
  pub callable: Callable<'src>,
  pub env: Environment<'src>,
  /// Bound receiver for a method value obtained via `obj.method` (without a
  /// call) — `None` for a plain `protocol`/`sequence` definition.
  pub bound_self: Option<Value<'src>>,
  /// The class this was defined on, when it's a method — lets `ascend`
  /// resolve the parent's method regardless of the instance's concrete
  /// (possibly further-derived) class.
  pub defining_class: Option<Rc<Class<'src>>>,
}

/// A `protocol`/`sequence` definition or a lambda expression — the two
/// things a [`Function`] can wrap. Only the former can be `is_sequence`
/// (lambdas can't be generators).
#[derive(Clone)]
pub enum Callable<'src> {
  Protocol(Rc<ast::Protocol<'src>>),
  Lambda(Rc<ast::Lambda<'src>>),
}

impl<'src> Callable<'src> {
  pub fn params(&self) -> &[ast::Param<'src>] {
    match self {
      Callable::Protocol(p) => &p.params,
      Callable::Lambda(l) => &l.params,
    }
  }

  pub fn is_sequence(&self) -> bool {
    matches!(self, Callable::Protocol(p) if p.is_sequence)
  }

  pub fn is_async(&self) -> bool {
    matches!(self, Callable::Protocol(p) if p.is_async)
  }

  /// The statement list to walk via `exec_block`. Panics for a lambda with
  /// an expression body — those are evaluated directly and never reach the
  /// generator machinery (lambdas can't be sequences).
  pub fn body(&self) -> &[ast::Stmt<'src>] {
    match self {
      Callable::Protocol(p) => &p.body,
      Callable::Lambda(l) => match &l.body {
        ast::LambdaBody::Block(body) => body,
        ast::LambdaBody::Expr(_) => {
          unreachable!("expression-bodied lambdas are evaluated directly, not walked")
        }
      },
    }
  }
}

pub type NativeFn<'src> =
  dyn Fn(&mut Evaluator<'src>, &[Value<'src>]) -> Result<Value<'src>>;

pub struct Builtin<'src> {
  pub name: Str,
  pub func: Rc<NativeFn<'src>>,
}

pub struct Class<'src> {
  pub name: Str,
  /// name -> `Value::Function`, searched directly (own methods only); the
  /// parent chain is walked by the caller.
  pub methods: Environment<'src>,
  pub parent: Option<Rc<Class<'src>>>,
}

impl<'src> Class<'src> {
  /// Finds a method on this class or, failing that, any ancestor.
  pub fn find_method(&self, name: &str) -> Option<Value<'src>> {
    if let Some(f) = self.methods.get(name) {
      return Some(f);
    }
    self.parent.as_ref().and_then(|p| p.find_method(name))
  }
}

pub struct Instance<'src> {
  pub class: Rc<Class<'src>>,
  pub fields: Environment<'src>,
}

#[derive(Clone)]
pub enum PromiseState<'src> {
  Pending,
  Resolved(Value<'src>),
  Rejected(Value<'src>),
}

pub struct Promise<'src> {
  pub state: PromiseState<'src>,
}

impl<'src> Value<'src> {
  pub fn type_name(&self) -> &'static str {
    match self {
      Value::Null => "null",
      Value::Bool(_) => "bool",
      Value::Int(_) => "int",
      Value::Float(_) => "float",
      Value::String(_) => "string",
      Value::List(_) => "list",
      Value::Dict(_) => "dict",
      Value::Function(_) | Value::Builtin(_) => "function",
      Value::Class(_) => "class",
      Value::Instance(_) => "instance",
      Value::Generator(_) => "generator",
      Value::Promise(_) => "promise",
    }
  }

  /// Truthiness: null/false, numeric zero, empty string/list/dict are
  /// falsy; everything else is truthy.
  pub fn truthy(&self) -> bool {
    match self {
      Value::Null => false,
      Value::Bool(b) => *b,
      Value::Int(i) => *i != 0,
      Value::Float(f) => *f != 0.0,
      Value::String(s) => !s.is_empty(),
      Value::List(l) => !l.borrow().is_empty(),
      Value::Dict(d) => !d.borrow().is_empty(),
      Value::Function(_)
      | Value::Builtin(_)
      | Value::Class(_)
      | Value::Instance(_)
      | Value::Generator(_)
      | Value::Promise(_) => true,
    }
  }

  /// Equality: structural for primitives/strings/lists; identity for
  /// functions/classes/instances/dicts (see `DESIGN.md` for the dict
  /// equality rationale).
  pub fn equals(&self, other: &Value<'src>) -> bool {
    use Value::*;
    match (self, other) {
      (Null, Null) => true,
      (Bool(a), Bool(b)) => a == b,
      (Int(a), Int(b)) => a == b,
      (Float(a), Float(b)) => a == b,
      (Int(a), Float(b)) | (Float(b), Int(a)) => *a as f64 == *b,
      (String(a), String(b)) => a == b,
      (List(a), List(b)) => {
        let a = a.borrow();
        let b = b.borrow();
        a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
      }
      (Dict(a), Dict(b)) => Rc::ptr_eq(a, b),
      (Function(a), Function(b)) => Rc::ptr_eq(a, b),
      (Builtin(a), Builtin(b)) => Rc::ptr_eq(a, b),
      (Class(a), Class(b)) => Rc::ptr_eq(a, b),
      (Instance(a), Instance(b)) => Rc::ptr_eq(a, b),
      (Generator(a), Generator(b)) => Rc::ptr_eq(a, b),
      (Promise(a), Promise(b)) => Rc::ptr_eq(a, b),
      _ => false,
    }
  }

  /// Structural duplication: strings/lists/dicts/generators are duplicated;
  /// functions/classes/instances/builtins/promises remain shared aliases.
  pub fn deep_copy(&self) -> Value<'src> {
    match self {
      Value::String(s) => Value::String(Str::from(&**s)),
      Value::List(l) => {
        let copied = l.borrow().iter().map(Value::deep_copy).collect();
        Value::List(Rc::new(RefCell::new(copied)))
      }
      Value::Dict(d) => {
        let copied: DictInner<'src> = d
          .borrow()
          .iter()
          .map(|(k, v)| (k.clone(), v.deep_copy()))
          .collect();
        Value::Dict(Rc::new(RefCell::new(copied)))
      }
      Value::Generator(g) => Value::Generator(Rc::new(RefCell::new(g.borrow().deep_copy()))),
      other => other.clone(),
    }
  }

  /// Full stringification: strings quoted, containers recursive, opaque
  /// values render as `<kind name>`.
  pub fn repr(&self) -> String {
    match self {
      Value::Null => "null".to_string(),
      Value::Bool(b) => b.to_string(),
      Value::Int(i) => i.to_string(),
      Value::Float(f) => format_float(*f),
      Value::String(s) => quote(s),
      Value::List(l) => {
        let items: Vec<String> = l.borrow().iter().map(Value::repr).collect();
        format!("[{}]", items.join(", "))
      }
      Value::Dict(d) => {
        let items: Vec<String> = d
          .borrow()
          .iter()
          .map(|(k, v)| format!("{}: {}", quote(k), v.repr()))
          .collect();
        format!("{{{}}}", items.join(", "))
      }
      Value::Function(f) => format!("<function {}>", f.name.as_deref().unwrap_or("anonymous")),
      Value::Builtin(b) => format!("<builtin {}>", b.name),
      Value::Class(c) => format!("<class {}>", c.name),
      Value::Instance(i) => format!("<instance {}>", i.class.name),
      Value::Generator(_) => "<generator>".to_string(),
      Value::Promise(_) => "<promise>".to_string(),
    }
  }

  /// Display form: like [`Value::repr`], except a top-level string is
  /// printed bare — used by `declare`/`announce` and by string
  /// concatenation's "stringify the non-string side" rule.
  pub fn display(&self) -> String {
    match self {
      Value::String(s) => s.to_string(),
      other => other.repr(),
    }
  }
}

fn quote(s: &str) -> String {
  let mut out = String::with_capacity(s.len() + 2);
  out.push('"');
  for c in s.chars() {
    match c {
      '"' => out.push_str("\\\""),
      '\\' => out.push_str("\\\\"),
      '\n' => out.push_str("\\n"),
      '\t' => out.push_str("\\t"),
      '\r' => out.push_str("\\r"),
      c => out.push(c),
    }
  }
  out.push('"');
  out
}

fn format_float(f: f64) -> String {
  if f.fract() == 0.0 && f.is_finite() {
    format!("{f:.1}")
  } else {
    f.to_string()
  }
}

impl<'src> fmt::Debug for Value<'src> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.repr())
  }
}
