use std::cell::RefCell;
use std::rc::Rc;

use crate::value::{Str, Value};

/// A single binding: name, value, and whether it was installed via
/// `override` (`force_set_global`).
struct Entry<'src> {
  name: Str,
  value: Value<'src>,
  is_override: bool,
}

struct Scope<'src> {
  vars: Vec<Entry<'src>>,
  parent: Option<Environment<'src>>,
}

/// A linked scope chain. Cloning an [`Environment`] is a pointer bump — it
/// shares the underlying scope, matching the way a [`crate::value::Function`]
/// captures its defining environment by reference.
#[derive(Clone)]
pub struct Environment<'src> {
  inner: Rc<RefCell<Scope<'src>>>,
  global: Rc<RefCell<Scope<'src>>>,
}

impl<'src> Environment<'src> {
  /// Creates the root environment: its own global pointer.
  pub fn root() -> Self {
    let inner = Rc::new(RefCell::new(Scope {
      vars: Vec::new(),
      parent: None,
    }));
    Environment {
      inner: inner.clone(),
      global: inner,
    }
  }

  /// A new scope parented to `self`, sharing `self`'s root.
  pub fn child(&self) -> Self {
    let inner = Rc::new(RefCell::new(Scope {
      vars: Vec::new(),
      parent: Some(self.clone()),
    }));
    Environment {
      inner,
      global: self.global.clone(),
    }
  }

  /// A standalone flat scope (no parent) that still resolves `override`
  /// writes to `self`'s root — used for an [`crate::value::Instance`]'s
  /// field table, which is searched on its own but should still honor
  /// `force_set_global` semantics for any code running within a method.
  pub fn standalone_with_root(root: &Environment<'src>) -> Self {
    Environment {
      inner: Rc::new(RefCell::new(Scope {
        vars: Vec::new(),
        parent: None,
      })),
      global: root.global.clone(),
    }
  }

  pub fn global(&self) -> Environment<'src> {
    Environment {
      inner: self.global.clone(),
      global: self.global.clone(),
    }
  }

  /// Always inserts into the current scope (`designate`).
  pub fn define(&self, name: Str, value: Value<'src>) {
    self.inner.borrow_mut().vars.push(Entry {
      name,
      value,
      is_override: false,
    });
  }

  /// Walks the chain looking for `name`, returning the most recently
  /// defined binding in the nearest scope that has one.
  pub fn get(&self, name: &str) -> Option<Value<'src>> {
    let scope = self.inner.borrow();
    if let Some(entry) = scope.vars.iter().rev().find(|e| &*e.name == name) {
      return Some(entry.value.clone());
    }
    match &scope.parent {
      Some(parent) => parent.get(name),
      None => None,
    }
  }

  /// Assigns in the nearest scope that already binds `name`; if none does,
  /// defines it in the current scope.
  pub fn set(&self, name: Str, value: Value<'src>) {
    if self.try_set_existing(&name, &value) {
      return;
    }
    self.define(name, value);
  }

  fn try_set_existing(&self, name: &str, value: &Value<'src>) -> bool {
    {
      let mut scope = self.inner.borrow_mut();
      if let Some(entry) = scope.vars.iter_mut().rev().find(|e| &*e.name == name) {
        entry.value = value.clone();
        return true;
      }
    }
    let parent = self.inner.borrow().parent.clone();
    match parent {
      Some(parent) => parent.try_set_existing(name, value),
      None => false,
    }
  }

  /// Writes at the root scope and marks the entry overridden.
  pub fn force_set_global(&self, name: Str, value: Value<'src>) {
    let mut scope = self.global.borrow_mut();
    if let Some(entry) = scope.vars.iter_mut().rev().find(|e| e.name == name) {
      entry.value = value;
      entry.is_override = true;
      return;
    }
    scope.vars.push(Entry {
      name,
      value,
      is_override: true,
    });
  }

  pub fn is_same_root(&self, other: &Environment<'src>) -> bool {
    Rc::ptr_eq(&self.global, &other.global)
  }

  /// Duplicates every scope from `self` up to (but not including) the
  /// shared global root, so `define`/`set` in the copy never touches the
  /// original's bindings. The global scope itself is never duplicated —
  /// it's process-wide state (§5), not something a generator clone should
  /// fork. Used by [`crate::generator::GeneratorState::deep_copy`].
  pub fn deep_copy(&self) -> Self {
    if Rc::ptr_eq(&self.inner, &self.global) {
      return self.clone();
    }
    let scope = self.inner.borrow();
    let parent = scope.parent.as_ref().map(Environment::deep_copy);
    let vars = scope
      .vars
      .iter()
      .map(|e| Entry {
        name: e.name.clone(),
        value: e.value.deep_copy(),
        is_override: e.is_override,
      })
      .collect();
    Environment {
      inner: Rc::new(RefCell::new(Scope { vars, parent })),
      global: self.global.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn define_and_get() {
    let root = Environment::root();
    root.define(Str::from("x"), Value::Int(1));
    assert!(matches!(root.get("x"), Some(Value::Int(1))));
    assert!(root.get("y").is_none());
  }

  #[test]
  fn child_sees_parent_but_not_vice_versa() {
    let root = Environment::root();
    root.define(Str::from("x"), Value::Int(1));
    let child = root.child();
    assert!(matches!(child.get("x"), Some(Value::Int(1))));
    child.define(Str::from("y"), Value::Int(2));
    assert!(root.get("y").is_none());
  }

  #[test]
  fn set_updates_nearest_existing_binding() {
    let root = Environment::root();
    root.define(Str::from("x"), Value::Int(1));
    let child = root.child();
    child.set(Str::from("x"), Value::Int(2));
    assert!(matches!(root.get("x"), Some(Value::Int(2))));
  }

  #[test]
  fn set_defines_locally_when_absent_everywhere() {
    let root = Environment::root();
    let child = root.child();
    child.set(Str::from("z"), Value::Int(3));
    assert!(root.get("z").is_none());
    assert!(matches!(child.get("z"), Some(Value::Int(3))));
  }

  #[test]
  fn force_set_global_reaches_root_from_child() {
    let root = Environment::root();
    let child = root.child();
    child.force_set_global(Str::from("g"), Value::Int(9));
    assert!(matches!(root.get("g"), Some(Value::Int(9))));
  }
}
