//! The intrinsic registry — every callable the evaluator's root environment
//! must carry before a module ever runs. Each entry is a plain
//! `fn(&mut Evaluator, &[Value]) -> Result<Value>` wrapped in a [`Builtin`],
//! with a consistent arity-mismatch message style
//! (`Error::runtime(format!("expected exactly {{n}} argument(s), got {{m}}"))`).

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::generator::GeneratorState;
use crate::value::{Builtin, DictInner, Promise, PromiseState, Str, Value};

pub fn install(globals: &Environment<'_>) {
  macro_rules! reg {
    ($name:literal, $f:expr) => {
      globals.define(
        Str::from($name),
        Value::Builtin(Rc::new(Builtin {
          name: Str::from($name),
          func: Rc::new($f),
        })),
      );
    };
  }

  reg!("declare", declare);
  reg!("announce", declare);
  reg!("inquire", inquire);
  reg!("measure", measure);
  reg!("span", span_builtin);
  reg!("text", to_text);
  reg!("number", to_number);
  reg!("decimal", to_decimal);
  reg!("boolean", to_boolean);
  reg!("classify", classify);
  reg!("abs", abs);
  reg!("sqrt", sqrt);
  reg!("min", min_builtin);
  reg!("max", max_builtin);
  reg!("random", random);
  reg!("uppercase", uppercase);
  reg!("lowercase", lowercase);
  reg!("split", split);
  reg!("join", join);
  reg!("contains", contains);
  reg!("push", push);
  reg!("reverse", reverse);
  reg!("transform", transform);
  reg!("select", select);
  reg!("fold", fold);
  reg!("encode_json", encode_json);
  reg!("decode_json", decode_json);
  reg!("clock", clock);
  reg!("timestamp", timestamp);
  reg!("sleep", sleep);
  reg!("terminate", terminate);
  reg!("inscribe", inscribe);
  reg!("decipher", decipher);
  reg!("chronicle", chronicle);
  reg!("exists", exists);
  reg!("proceed", proceed);
  reg!("transmit", transmit);
  reg!("receive", receive);
  reg!("disrupt", disrupt);
  reg!("resolve", resolve);
  reg!("defer", defer);
}

fn arity_exact(name: &str, args: &[Value<'_>], n: usize) -> Result<()> {
  if args.len() != n {
    return Err(Error::runtime_detached(format!(
      "{name}: expected exactly {n} argument(s), got {}",
      args.len()
    )));
  }
  Ok(())
}

fn arity_range(name: &str, args: &[Value<'_>], lo: usize, hi: usize) -> Result<()> {
  if args.len() < lo || args.len() > hi {
    return Err(Error::runtime_detached(format!(
      "{name}: expected {lo}..={hi} argument(s), got {}",
      args.len()
    )));
  }
  Ok(())
}

// ------------------------------------------------------------------- I/O

fn declare<'src>(_ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  let parts: Vec<String> = args.iter().map(Value::display).collect();
  println!("{}", parts.join(" "));
  Ok(Value::Null)
}

fn inquire<'src>(_ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_range("inquire", args, 0, 1)?;
  use std::io::Write;
  if let Some(prompt) = args.first() {
    print!("{}", prompt.display());
    std::io::stdout().flush().ok();
  }
  let mut line = String::new();
  let n = std::io::stdin()
    .read_line(&mut line)
    .map_err(|e| Error::runtime_detached(format!("inquire: {e}")))?;
  if n == 0 {
    return Ok(Value::Null);
  }
  while line.ends_with(['\n', '\r']) {
    line.pop();
  }
  Ok(Value::String(Str::from(line)))
}

// ------------------------------------------------------------------ shape

fn measure<'src>(_ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("measure", args, 1)?;
  let n = match &args[0] {
    Value::String(s) => s.chars().count() as i64,
    Value::List(l) => l.borrow().len() as i64,
    Value::Dict(d) => d.borrow().len() as i64,
    _ => 0,
  };
  Ok(Value::Int(n))
}

fn span_builtin<'src>(_ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_range("span", args, 1, 3)?;
  let as_int = |v: &Value<'src>| -> Result<i64> {
    match v {
      Value::Int(i) => Ok(*i),
      Value::Float(f) => Ok(*f as i64),
      other => Err(Error::runtime_detached(format!(
        "span: expected an integer, found {}",
        other.type_name()
      ))),
    }
  };
  let (start, end, step) = match args.len() {
    1 => (0, as_int(&args[0])?, 1),
    2 => (as_int(&args[0])?, as_int(&args[1])?, 1),
    _ => (as_int(&args[0])?, as_int(&args[1])?, as_int(&args[2])?),
  };
  if step == 0 {
    return Err(Error::runtime_detached("span: step cannot be zero"));
  }
  let mut out = Vec::new();
  let mut i = start;
  while (step > 0 && i < end) || (step < 0 && i > end) {
    out.push(Value::Int(i));
    i += step;
  }
  Ok(Value::List(Rc::new(RefCell::new(out))))
}

// --------------------------------------------------------------- conversion

fn to_text<'src>(_ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("text", args, 1)?;
  Ok(Value::String(Str::from(args[0].display())))
}

fn to_number<'src>(_ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("number", args, 1)?;
  match &args[0] {
    Value::Int(i) => Ok(Value::Int(*i)),
    Value::Float(f) => Ok(Value::Int(*f as i64)),
    Value::Bool(b) => Ok(Value::Int(*b as i64)),
    Value::String(s) => s
      .trim()
      .parse::<i64>()
      .map(Value::Int)
      .or_else(|_| s.trim().parse::<f64>().map(|f| Value::Int(f as i64)))
      .or(Ok(Value::Null)),
    _ => Ok(Value::Null),
  }
}

fn to_decimal<'src>(_ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("decimal", args, 1)?;
  match &args[0] {
    Value::Int(i) => Ok(Value::Float(*i as f64)),
    Value::Float(f) => Ok(Value::Float(*f)),
    Value::Bool(b) => Ok(Value::Float(*b as i64 as f64)),
    Value::String(s) => s.trim().parse::<f64>().map(Value::Float).or(Ok(Value::Null)),
    _ => Ok(Value::Null),
  }
}

fn to_boolean<'src>(_ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("boolean", args, 1)?;
  Ok(Value::Bool(args[0].truthy()))
}

fn classify<'src>(_ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("classify", args, 1)?;
  Ok(Value::String(Str::from(args[0].type_name())))
}

// -------------------------------------------------------------------- math

fn as_f64(v: &Value<'_>, who: &str) -> Result<f64> {
  match v {
    Value::Int(i) => Ok(*i as f64),
    Value::Float(f) => Ok(*f),
    other => Err(Error::runtime_detached(format!(
      "{who}: expected a number, found {}",
      other.type_name()
    ))),
  }
}

fn abs<'src>(_ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("abs", args, 1)?;
  Ok(match &args[0] {
    Value::Int(i) => Value::Int(i.wrapping_abs()),
    Value::Float(f) => Value::Float(f.abs()),
    other => return Err(Error::runtime_detached(format!("abs: expected a number, found {}", other.type_name()))),
  })
}

fn sqrt<'src>(_ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("sqrt", args, 1)?;
  Ok(Value::Float(as_f64(&args[0], "sqrt")?.sqrt()))
}

fn min_builtin<'src>(_ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_range("min", args, 1, usize::MAX)?;
  if let [Value::List(l)] = args {
    let items = l.borrow();
    return extremum(&items, "min", |a, b| a < b);
  }
  extremum(args, "min", |a, b| a < b)
}

fn max_builtin<'src>(_ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_range("max", args, 1, usize::MAX)?;
  if let [Value::List(l)] = args {
    let items = l.borrow();
    return extremum(&items, "max", |a, b| a > b);
  }
  extremum(args, "max", |a, b| a > b)
}

fn extremum<'src>(items: &[Value<'src>], who: &str, better: impl Fn(f64, f64) -> bool) -> Result<Value<'src>> {
  let mut iter = items.iter();
  let mut best = iter
    .next()
    .ok_or_else(|| Error::runtime_detached(format!("{who}: expected at least 1 argument")))?;
  let mut best_f = as_f64(best, who)?;
  for v in iter {
    let f = as_f64(v, who)?;
    if better(f, best_f) {
      best = v;
      best_f = f;
    }
  }
  Ok(best.clone())
}

fn random<'src>(_ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("random", args, 0)?;
  Ok(Value::Float(rand::thread_rng().gen::<f64>()))
}

// ------------------------------------------------------------------ string

fn as_str<'a, 'src>(v: &'a Value<'src>, who: &str) -> Result<&'a str> {
  match v {
    Value::String(s) => Ok(s),
    other => Err(Error::runtime_detached(format!("{who}: expected a string, found {}", other.type_name()))),
  }
}

fn uppercase<'src>(_ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("uppercase", args, 1)?;
  Ok(Value::String(Str::from(as_str(&args[0], "uppercase")?.to_uppercase())))
}

fn lowercase<'src>(_ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("lowercase", args, 1)?;
  Ok(Value::String(Str::from(as_str(&args[0], "lowercase")?.to_lowercase())))
}

fn split<'src>(_ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("split", args, 2)?;
  let s = as_str(&args[0], "split")?;
  let d = as_str(&args[1], "split")?;
  let parts: Vec<Value<'src>> = if d.is_empty() {
    s.chars().map(|c| Value::String(Str::from(c.to_string()))).collect()
  } else {
    s.split(d).map(|p| Value::String(Str::from(p))).collect()
  };
  Ok(Value::List(Rc::new(RefCell::new(parts))))
}

fn join<'src>(_ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("join", args, 2)?;
  let Value::List(l) = &args[0] else {
    return Err(Error::runtime_detached(format!("join: expected a list, found {}", args[0].type_name())));
  };
  let d = as_str(&args[1], "join")?;
  let joined = l.borrow().iter().map(Value::display).collect::<Vec<_>>().join(d);
  Ok(Value::String(Str::from(joined)))
}

fn contains<'src>(_ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("contains", args, 2)?;
  let found = match &args[0] {
    Value::String(s) => s.contains(as_str(&args[1], "contains")?),
    Value::List(l) => l.borrow().iter().any(|v| v.equals(&args[1])),
    Value::Dict(d) => d.borrow().contains_key(&*Str::from(args[1].display())),
    other => return Err(Error::runtime_detached(format!("contains: cannot search a {}", other.type_name()))),
  };
  Ok(Value::Bool(found))
}

// -------------------------------------------------------------------- list

fn push<'src>(_ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("push", args, 2)?;
  let Value::List(l) = &args[0] else {
    return Err(Error::runtime_detached(format!("push: expected a list, found {}", args[0].type_name())));
  };
  l.borrow_mut().push(args[1].clone());
  Ok(Value::List(Rc::clone(l)))
}

fn reverse<'src>(_ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("reverse", args, 1)?;
  let Value::List(l) = &args[0] else {
    return Err(Error::runtime_detached(format!("reverse: expected a list, found {}", args[0].type_name())));
  };
  let mut items = l.borrow().clone();
  items.reverse();
  Ok(Value::List(Rc::new(RefCell::new(items))))
}

// -------------------------------------------------------------- functional

fn transform<'src>(ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("transform", args, 2)?;
  let Value::List(l) = &args[0] else {
    return Err(Error::runtime_detached(format!("transform: expected a list, found {}", args[0].type_name())));
  };
  let items = l.borrow().clone();
  let mut out = Vec::with_capacity(items.len());
  for item in items {
    out.push(ev.call_value(args[1].clone(), vec![item], detached_span())?);
  }
  Ok(Value::List(Rc::new(RefCell::new(out))))
}

fn select<'src>(ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("select", args, 2)?;
  let Value::List(l) = &args[0] else {
    return Err(Error::runtime_detached(format!("select: expected a list, found {}", args[0].type_name())));
  };
  let items = l.borrow().clone();
  let mut out = Vec::new();
  for item in items {
    let keep = ev.call_value(args[1].clone(), vec![item.clone()], detached_span())?;
    if keep.truthy() {
      out.push(item);
    }
  }
  Ok(Value::List(Rc::new(RefCell::new(out))))
}

fn fold<'src>(ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("fold", args, 3)?;
  let Value::List(l) = &args[0] else {
    return Err(Error::runtime_detached(format!("fold: expected a list, found {}", args[0].type_name())));
  };
  let items = l.borrow().clone();
  let mut acc = args[2].clone();
  for item in items {
    acc = ev.call_value(args[1].clone(), vec![acc, item], detached_span())?;
  }
  Ok(acc)
}

fn detached_span() -> span::Span {
  span::Span::from(0..0)
}

// -------------------------------------------------------------------- json

fn encode_json<'src>(_ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("encode_json", args, 1)?;
  let mut out = String::new();
  write_json(&args[0], &mut out);
  Ok(Value::String(Str::from(out)))
}

fn write_json(v: &Value<'_>, out: &mut String) {
  match v {
    Value::Null => out.push_str("null"),
    Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
    Value::Int(i) => out.push_str(&i.to_string()),
    Value::Float(f) => out.push_str(&f.to_string()),
    Value::String(s) => {
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
    }
    Value::List(l) => {
      out.push('[');
      for (i, item) in l.borrow().iter().enumerate() {
        if i > 0 {
          out.push(',');
        }
        write_json(item, out);
      }
      out.push(']');
    }
    Value::Dict(d) => {
      out.push('{');
      for (i, (k, v)) in d.borrow().iter().enumerate() {
        if i > 0 {
          out.push(',');
        }
        write_json(&Value::String(k.clone()), out);
        out.push(':');
        write_json(v, out);
      }
      out.push('}');
    }
    other => out.push_str(&format!("\"<{}>\"", other.type_name())),
  }
}

fn decode_json<'src>(_ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("decode_json", args, 1)?;
  let s = as_str(&args[0], "decode_json")?;
  let mut p = JsonParser { bytes: s.as_bytes(), pos: 0 };
  p.skip_ws();
  let v = p.parse_value()?;
  p.skip_ws();
  if p.pos != p.bytes.len() {
    return Err(Error::runtime_detached("decode_json: trailing data after JSON value"));
  }
  Ok(v)
}

/// Minimal JSON reader over primitives, lists, and string-keyed objects —
/// deliberately hand-rolled rather than pulling in `serde_json` for a
/// non-serde value model (see `DESIGN.md`).
struct JsonParser<'a> {
  bytes: &'a [u8],
  pos: usize,
}

impl<'a> JsonParser<'a> {
  fn skip_ws(&mut self) {
    while matches!(self.bytes.get(self.pos), Some(b' ' | b'\t' | b'\n' | b'\r')) {
      self.pos += 1;
    }
  }

  fn peek(&self) -> Option<u8> {
    self.bytes.get(self.pos).copied()
  }

  fn expect(&mut self, b: u8) -> Result<()> {
    if self.peek() == Some(b) {
      self.pos += 1;
      Ok(())
    } else {
      Err(Error::runtime_detached(format!("decode_json: expected `{}`", b as char)))
    }
  }

  fn parse_value<'src>(&mut self) -> Result<Value<'src>> {
    self.skip_ws();
    match self.peek() {
      Some(b'{') => self.parse_object(),
      Some(b'[') => self.parse_array(),
      Some(b'"') => self.parse_string().map(|s| Value::String(Str::from(s))),
      Some(b't') => self.parse_literal("true", Value::Bool(true)),
      Some(b'f') => self.parse_literal("false", Value::Bool(false)),
      Some(b'n') => self.parse_literal("null", Value::Null),
      Some(c) if c == b'-' || c.is_ascii_digit() => self.parse_number(),
      _ => Err(Error::runtime_detached("decode_json: unexpected input")),
    }
  }

  fn parse_literal<'src>(&mut self, lit: &str, value: Value<'src>) -> Result<Value<'src>> {
    if self.bytes[self.pos..].starts_with(lit.as_bytes()) {
      self.pos += lit.len();
      Ok(value)
    } else {
      Err(Error::runtime_detached(format!("decode_json: expected `{lit}`")))
    }
  }

  fn parse_number<'src>(&mut self) -> Result<Value<'src>> {
    let start = self.pos;
    if self.peek() == Some(b'-') {
      self.pos += 1;
    }
    while matches!(self.peek(), Some(b'0'..=b'9')) {
      self.pos += 1;
    }
    let mut is_float = false;
    if self.peek() == Some(b'.') {
      is_float = true;
      self.pos += 1;
      while matches!(self.peek(), Some(b'0'..=b'9')) {
        self.pos += 1;
      }
    }
    if matches!(self.peek(), Some(b'e' | b'E')) {
      is_float = true;
      self.pos += 1;
      if matches!(self.peek(), Some(b'+' | b'-')) {
        self.pos += 1;
      }
      while matches!(self.peek(), Some(b'0'..=b'9')) {
        self.pos += 1;
      }
    }
    let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap();
    if is_float {
      text.parse::<f64>().map(Value::Float).map_err(|e| Error::runtime_detached(format!("decode_json: {e}")))
    } else {
      text.parse::<i64>().map(Value::Int).map_err(|e| Error::runtime_detached(format!("decode_json: {e}")))
    }
  }

  fn parse_string(&mut self) -> Result<String> {
    self.expect(b'"')?;
    let mut out = String::new();
    loop {
      match self.peek() {
        None => return Err(Error::runtime_detached("decode_json: unterminated string")),
        Some(b'"') => {
          self.pos += 1;
          return Ok(out);
        }
        Some(b'\\') => {
          self.pos += 1;
          match self.peek() {
            Some(b'n') => out.push('\n'),
            Some(b't') => out.push('\t'),
            Some(b'r') => out.push('\r'),
            Some(b'"') => out.push('"'),
            Some(b'\\') => out.push('\\'),
            Some(b'/') => out.push('/'),
            Some(c) => out.push(c as char),
            None => return Err(Error::runtime_detached("decode_json: unterminated escape")),
          }
          self.pos += 1;
        }
        Some(_) => {
          let rest = std::str::from_utf8(&self.bytes[self.pos..]).unwrap_or("");
          let ch = rest.chars().next().unwrap();
          out.push(ch);
          self.pos += ch.len_utf8();
        }
      }
    }
  }

  fn parse_array<'src>(&mut self) -> Result<Value<'src>> {
    self.expect(b'[')?;
    let mut items = Vec::new();
    self.skip_ws();
    if self.peek() == Some(b']') {
      self.pos += 1;
      return Ok(Value::List(Rc::new(RefCell::new(items))));
    }
    loop {
      items.push(self.parse_value()?);
      self.skip_ws();
      match self.peek() {
        Some(b',') => {
          self.pos += 1;
          self.skip_ws();
        }
        Some(b']') => {
          self.pos += 1;
          break;
        }
        _ => return Err(Error::runtime_detached("decode_json: expected `,` or `]`")),
      }
    }
    Ok(Value::List(Rc::new(RefCell::new(items))))
  }

  fn parse_object<'src>(&mut self) -> Result<Value<'src>> {
    self.expect(b'{')?;
    let mut out: DictInner<'src> = DictInner::new();
    self.skip_ws();
    if self.peek() == Some(b'}') {
      self.pos += 1;
      return Ok(Value::Dict(Rc::new(RefCell::new(out))));
    }
    loop {
      self.skip_ws();
      let key = self.parse_string()?;
      self.skip_ws();
      self.expect(b':')?;
      let value = self.parse_value()?;
      out.insert(Str::from(key), value);
      self.skip_ws();
      match self.peek() {
        Some(b',') => {
          self.pos += 1;
        }
        Some(b'}') => {
          self.pos += 1;
          break;
        }
        _ => return Err(Error::runtime_detached("decode_json: expected `,` or `}`")),
      }
    }
    Ok(Value::Dict(Rc::new(RefCell::new(out))))
  }
}

// --------------------------------------------------------------- time/exit

fn clock<'src>(_ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("clock", args, 0)?;
  let now = SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map_err(|e| Error::runtime_detached(format!("clock: {e}")))?;
  Ok(Value::Float(now.as_secs_f64()))
}

fn timestamp<'src>(_ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("timestamp", args, 0)?;
  let now = SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map_err(|e| Error::runtime_detached(format!("timestamp: {e}")))?;
  Ok(Value::Int(now.as_secs() as i64))
}

fn sleep<'src>(_ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("sleep", args, 1)?;
  let ms = as_f64(&args[0], "sleep")?;
  if ms > 0.0 {
    std::thread::sleep(std::time::Duration::from_millis(ms as u64));
  }
  Ok(Value::Null)
}

fn terminate<'src>(_ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_range("terminate", args, 0, 1)?;
  let code = match args.first() {
    Some(v) => as_f64(v, "terminate")? as i32,
    None => 0,
  };
  std::process::exit(code);
}

// ------------------------------------------------------------------- files

fn path_arg<'a, 'src>(v: &'a Value<'src>, who: &str) -> Result<&'a str> {
  as_str(v, who)
}

fn inscribe<'src>(_ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("inscribe", args, 2)?;
  let path = path_arg(&args[0], "inscribe")?;
  let contents = args[1].display();
  std::fs::write(path, contents).map_err(|e| Error::runtime_detached(format!("inscribe: {e}")))?;
  Ok(Value::Null)
}

fn decipher<'src>(_ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("decipher", args, 1)?;
  let path = path_arg(&args[0], "decipher")?;
  let contents = std::fs::read_to_string(path).map_err(|e| Error::runtime_detached(format!("decipher: {e}")))?;
  Ok(Value::String(Str::from(contents)))
}

fn chronicle<'src>(_ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("chronicle", args, 2)?;
  use std::io::Write;
  let path = path_arg(&args[0], "chronicle")?;
  let contents = args[1].display();
  let mut f = std::fs::OpenOptions::new()
    .create(true)
    .append(true)
    .open(path)
    .map_err(|e| Error::runtime_detached(format!("chronicle: {e}")))?;
  f.write_all(contents.as_bytes())
    .map_err(|e| Error::runtime_detached(format!("chronicle: {e}")))?;
  Ok(Value::Null)
}

fn exists<'src>(_ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("exists", args, 1)?;
  let path = path_arg(&args[0], "exists")?;
  Ok(Value::Bool(std::path::Path::new(path).exists()))
}

// -------------------------------------------------------------- generators

fn as_generator<'src>(v: &Value<'src>, who: &str) -> Result<Rc<RefCell<GeneratorState<'src>>>> {
  match v {
    Value::Generator(g) => Ok(Rc::clone(g)),
    other => Err(Error::runtime_detached(format!("{who}: expected a generator, found {}", other.type_name()))),
  }
}

fn proceed<'src>(ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("proceed", args, 1)?;
  let g = as_generator(&args[0], "proceed")?;
  ev.generator_proceed(&g)
}

fn transmit<'src>(ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("transmit", args, 2)?;
  let g = as_generator(&args[0], "transmit")?;
  ev.generator_transmit(&g, args[1].clone())
}

fn receive<'src>(ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("receive", args, 0)?;
  ev.receive()
}

fn disrupt<'src>(ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("disrupt", args, 2)?;
  let g = as_generator(&args[0], "disrupt")?;
  ev.generator_disrupt(&g, args[1].clone())
}

// ---------------------------------------------------------------- promises

fn resolve<'src>(_ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_exact("resolve", args, 1)?;
  Ok(Value::Promise(Rc::new(RefCell::new(Promise {
    state: PromiseState::Resolved(args[0].clone()),
  }))))
}

/// `defer(ms, fn, ...args)` — the model is single-threaded and cooperative:
/// there is no event loop to actually delay delivery, so the callback
/// runs synchronously and its result is wrapped as an already-resolved
/// promise, matching the simplification `await` already makes for a
/// resolved promise.
fn defer<'src>(ev: &mut crate::eval::Evaluator<'src>, args: &[Value<'src>]) -> Result<Value<'src>> {
  arity_range("defer", args, 2, usize::MAX)?;
  let _ms = as_f64(&args[0], "defer")?;
  let f = args[1].clone();
  let rest = args[2..].to_vec();
  let result = ev.call_value(f, rest, detached_span())?;
  Ok(Value::Promise(Rc::new(RefCell::new(Promise {
    state: PromiseState::Resolved(result),
  }))))
}
