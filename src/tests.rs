//! End-to-end coverage, run against the public [`crate::Keikaku`] surface
//! exactly as an embedder would use it — not against the evaluator's
//! internals. `Value` carries no `PartialEq`, so results are read back by
//! pattern-matching the variant or comparing `.display()`/`.repr()`.

use crate::loader::{ModuleLoadError, ModuleLoader, SourceArena};
use crate::value::Value;
use crate::voice::{NullVoice, VoiceChannel};
use crate::Keikaku;

fn run<'src>(keikaku: &mut Keikaku<'src>, src: &str) -> Value<'src> {
  keikaku.eval(src).unwrap_or_else(|e| panic!("eval failed: {e}\nsource:\n{src}"))
}

fn global<'src>(keikaku: &Keikaku<'src>, name: &str) -> Value<'src> {
  keikaku
    .globals()
    .get(name)
    .unwrap_or_else(|| panic!("no global named `{name}`"))
}

#[test]
fn arithmetic_keeps_int_precedence_and_promotes_division() {
  let arena = SourceArena::new();
  let mut k = Keikaku::new(&arena);
  run(&mut k, "designate result = 1 + 2 * 3\n");
  assert!(matches!(global(&k, "result"), Value::Int(7)));

  run(&mut k, "designate quotient = 7 / 2\n");
  match global(&k, "quotient") {
    Value::Float(f) => assert!((f - 3.5).abs() < f64::EPSILON),
    other => panic!("expected a float, got {}", other.repr()),
  }
}

#[test]
fn string_repeat_and_concatenation() {
  let arena = SourceArena::new();
  let mut k = Keikaku::new(&arena);
  run(&mut k, r#"designate result = "ab" * 3"#);
  assert_eq!(global(&k, "result").display(), "ababab");

  run(&mut k, r#"designate greeting = "count: " + 5"#);
  assert_eq!(global(&k, "greeting").display(), "count: 5");
}

#[test]
fn generator_round_trip_over_a_cycle_from_to() {
  let arena = SourceArena::new();
  let mut k = Keikaku::new(&arena);
  run(
    &mut k,
    "sequence counting():\n    cycle i from 0 to 3:\n        yield i\n",
  );
  run(&mut k, "designate g = counting()\n");

  for expected in 0..3 {
    run(&mut k, "designate current = proceed(g)\n");
    assert!(
      matches!(global(&k, "current"), Value::Int(n) if n == expected),
      "expected {expected}, got {}",
      global(&k, "current").repr()
    );
  }
  // `to 3` is exclusive, so the fourth pull finds the generator exhausted.
  run(&mut k, "designate done = proceed(g)\n");
  assert!(matches!(global(&k, "done"), Value::Null));
}

#[test]
fn bidirectional_send_and_receive() {
  let arena = SourceArena::new();
  let mut k = Keikaku::new(&arena);
  run(
    &mut k,
    "sequence echo():\n    first := receive()\n    yield first\n    second := receive()\n    yield second\n",
  );
  run(&mut k, "designate g = echo()\n");

  // the mailbox starts empty: the first pull's `receive()` sees nothing sent.
  run(&mut k, "designate first = proceed(g)\n");
  assert!(matches!(global(&k, "first"), Value::Null));

  run(&mut k, r#"designate second = transmit(g, "hi")"#);
  assert_eq!(global(&k, "second").display(), "hi");
}

#[test]
fn single_inheritance_construction_and_ascend() {
  let arena = SourceArena::new();
  let mut k = Keikaku::new(&arena);
  run(
    &mut k,
    concat!(
      "entity Animal:\n",
      "    protocol construct(name):\n",
      "        self.name = name\n",
      "\n",
      "    protocol speak():\n",
      "        return \"...\"\n",
      "\n",
      "entity Dog inherits Animal:\n",
      "    protocol construct(name):\n",
      "        ascend construct(name)\n",
      "\n",
      "    protocol speak():\n",
      "        return self.name + \" says woof\"\n",
    ),
  );
  run(&mut k, r#"designate rex = manifest Dog("Rex")"#);
  assert!(matches!(global(&k, "rex"), Value::Instance(_)));

  run(&mut k, "designate greeting = rex.speak()\n");
  assert_eq!(global(&k, "greeting").display(), "Rex says woof");
}

#[test]
fn attempt_recover_catches_division_by_zero() {
  let arena = SourceArena::new();
  let mut k = Keikaku::new(&arena);
  run(
    &mut k,
    concat!(
      "outcome := null\n",
      "attempt:\n",
      "    outcome = 1 / 0\n",
      "recover e:\n",
      "    outcome = e\n",
    ),
  );
  match global(&k, "outcome") {
    Value::String(s) => assert!(s.contains("division by zero"), "got `{s}`"),
    other => panic!("expected the recovered error as a string, got {}", other.repr()),
  }
}

#[test]
fn check_reports_syntax_errors_without_evaluating() {
  assert!(Keikaku::check("designate x = 1\n").is_ok());
  assert!(Keikaku::check("designate x = \n").is_err());
}

#[test]
fn repeated_eval_calls_share_globals() {
  let arena = SourceArena::new();
  let mut k = Keikaku::new(&arena);
  run(&mut k, "designate x = 1\n");
  run(&mut k, "x = x + 1\n");
  assert!(matches!(global(&k, "x"), Value::Int(2)));
}

#[test]
fn unresolved_import_fails_with_the_noop_loader() {
  let arena = SourceArena::new();
  let mut k = Keikaku::new(&arena);
  assert!(k.eval("import a\n").is_err());
}

struct MapLoader(Vec<(&'static str, &'static str)>);

impl ModuleLoader for MapLoader {
  fn load(&mut self, path: &[String]) -> std::result::Result<String, Box<dyn std::error::Error>> {
    let joined = path.join(".");
    self
      .0
      .iter()
      .find(|(name, _)| *name == joined)
      .map(|(_, text)| text.to_string())
      .ok_or_else(|| Box::new(ModuleLoadError { path: joined }) as Box<dyn std::error::Error>)
  }
}

#[test]
fn import_splices_the_module_source_textually() {
  let arena = SourceArena::new();
  let mut k = Keikaku::builder(&arena)
    .with_module_loader(MapLoader(vec![("greeter", "designate greeting = \"hi\"\n")]))
    .build();
  run(&mut k, "import greeter\n");
  assert_eq!(global(&k, "greeting").display(), "hi");
}

#[test]
fn aliased_import_also_gathers_a_namespace_dict() {
  let arena = SourceArena::new();
  let mut k = Keikaku::builder(&arena)
    .with_module_loader(MapLoader(vec![("greeter", "designate greeting = \"hi\"\n")]))
    .build();
  run(&mut k, "import greeter as g\n");
  assert_eq!(global(&k, "greeting").display(), "hi");
  match global(&k, "g") {
    Value::Dict(d) => {
      let d = d.borrow();
      assert_eq!(d.get("greeting").map(Value::display).as_deref(), Some("hi"));
    }
    other => panic!("expected a dict, got {}", other.repr()),
  }
}

#[derive(Default)]
struct CapturingVoice {
  previews: std::rc::Rc<std::cell::RefCell<Vec<String>>>,
}

impl VoiceChannel for CapturingVoice {
  fn preview(&mut self, _span: span::Span, value: &Value<'_>) {
    self.previews.borrow_mut().push(value.display());
  }
}

#[test]
fn preview_reaches_the_installed_voice_channel() {
  let arena = SourceArena::new();
  let previews = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
  let voice = CapturingVoice { previews: previews.clone() };
  let mut k = Keikaku::builder(&arena).with_voice(voice).build();
  run(&mut k, "preview 1 + 1\n");
  assert_eq!(previews.borrow().as_slice(), ["2"]);
}

#[test]
fn null_voice_drops_narration_silently() {
  let arena = SourceArena::new();
  let mut k = Keikaku::builder(&arena).with_voice(NullVoice).build();
  run(&mut k, "preview 1 + 1\n");
}

/// A `yield` nested two `cycle` levels deep re-enters at the exact
/// `(i, j)` it suspended at on every resumption, enumerating all 9 pairs
/// in order — the scenario the suspension-frame stack exists for.
#[test]
fn nested_cycles_resume_at_the_correct_pair_each_time() {
  let arena = SourceArena::new();
  let mut k = Keikaku::new(&arena);
  run(
    &mut k,
    concat!(
      "sequence pairs():\n",
      "    cycle i from 0 to 3:\n",
      "        cycle j from 0 to 3:\n",
      "            yield [i, j]\n",
    ),
  );
  run(&mut k, "designate g = pairs()\n");

  let mut seen = Vec::new();
  for _ in 0..9 {
    run(&mut k, "designate current = proceed(g)\n");
    match global(&k, "current") {
      Value::List(l) => {
        let items = l.borrow();
        let (Value::Int(i), Value::Int(j)) = (&items[0], &items[1]) else {
          panic!("expected [int, int]");
        };
        seen.push((*i, *j));
      }
      other => panic!("expected a list, got {}", other.repr()),
    }
  }
  let expected: Vec<(i64, i64)> = (0..3).flat_map(|i| (0..3).map(move |j| (i, j))).collect();
  assert_eq!(seen, expected);

  run(&mut k, "designate done = proceed(g)\n");
  assert!(matches!(global(&k, "done"), Value::Null));
}

/// A `yield` inside `cycle through` must not drop the element after the one
/// it suspended on: resuming finishes the suspended iteration's body, and
/// only then pulls the next list element.
#[test]
fn cycle_through_resumes_without_skipping_elements() {
  let arena = SourceArena::new();
  let mut k = Keikaku::new(&arena);
  run(
    &mut k,
    concat!(
      "sequence each():\n",
      "    cycle v through [10, 20, 30]:\n",
      "        yield v\n",
    ),
  );
  run(&mut k, "designate g = each()\n");

  let mut seen = Vec::new();
  for _ in 0..3 {
    run(&mut k, "designate current = proceed(g)\n");
    match global(&k, "current") {
      Value::Int(n) => seen.push(n),
      other => panic!("expected an int, got {}", other.repr()),
    }
  }
  assert_eq!(seen, vec![10, 20, 30]);

  run(&mut k, "designate done = proceed(g)\n");
  assert!(matches!(global(&k, "done"), Value::Null));
}

#[test]
fn delegate_re_yields_every_value_from_an_inner_list() {
  let arena = SourceArena::new();
  let mut k = Keikaku::new(&arena);
  run(
    &mut k,
    concat!(
      "sequence outer():\n",
      "    delegate [1, 2, 3]\n",
      "    yield 4\n",
    ),
  );
  run(&mut k, "designate g = outer()\n");

  let mut seen = Vec::new();
  for _ in 0..4 {
    run(&mut k, "designate current = proceed(g)\n");
    match global(&k, "current") {
      Value::Int(n) => seen.push(n),
      other => panic!("expected an int, got {}", other.repr()),
    }
  }
  assert_eq!(seen, vec![1, 2, 3, 4]);
}

#[test]
fn delegate_pulls_through_a_nested_generator() {
  let arena = SourceArena::new();
  let mut k = Keikaku::new(&arena);
  run(
    &mut k,
    concat!(
      "sequence inner():\n",
      "    cycle i from 0 to 2:\n",
      "        yield i\n",
      "\n",
      "sequence outer():\n",
      "    delegate inner()\n",
    ),
  );
  run(&mut k, "designate g = outer()\n");

  let mut seen = Vec::new();
  for _ in 0..2 {
    run(&mut k, "designate current = proceed(g)\n");
    match global(&k, "current") {
      Value::Int(n) => seen.push(n),
      other => panic!("expected an int, got {}", other.repr()),
    }
  }
  assert_eq!(seen, vec![0, 1]);

  run(&mut k, "designate done = proceed(g)\n");
  assert!(matches!(global(&k, "done"), Value::Null));
}

/// A `disrupt`-injected value surfaces as a catchable error at the
/// generator's next suspended `yield` point.
#[test]
fn disrupt_is_caught_by_an_attempt_inside_the_generator() {
  let arena = SourceArena::new();
  let mut k = Keikaku::new(&arena);
  run(
    &mut k,
    concat!(
      "sequence guarded():\n",
      "    attempt:\n",
      "        yield 1\n",
      "        yield 2\n",
      "    recover e:\n",
      "        yield e\n",
    ),
  );
  run(&mut k, "designate g = guarded()\n");
  run(&mut k, "designate first = proceed(g)\n");
  assert!(matches!(global(&k, "first"), Value::Int(1)));

  run(&mut k, r#"designate caught = disrupt(g, "boom")"#);
  match global(&k, "caught") {
    Value::String(s) => assert!(s.contains("boom"), "got `{s}`"),
    other => panic!("expected the recovered error as a string, got {}", other.repr()),
  }
}

/// `Value::deep_copy` on a suspended generator must produce an
/// independently-drivable cursor (§3.3/§4.3): driving the original further
/// must not perturb where the copy resumes, and vice versa.
#[test]
fn generator_deep_copy_produces_an_independent_cursor() {
  let arena = SourceArena::new();
  let mut k = Keikaku::new(&arena);
  run(
    &mut k,
    concat!(
      "sequence counter(start):\n",
      "    designate n = start\n",
      "    cycle while true:\n",
      "        yield n\n",
      "        n = n + 1\n",
    ),
  );
  run(&mut k, "designate g = counter(0)\n");
  run(&mut k, "designate first = proceed(g)\n");
  assert!(matches!(global(&k, "first"), Value::Int(0)));

  let copy = global(&k, "g").deep_copy();

  // advance the original twice more through the script surface.
  run(&mut k, "designate a = proceed(g)\n");
  run(&mut k, "designate b = proceed(g)\n");
  assert!(matches!(global(&k, "a"), Value::Int(1)));
  assert!(matches!(global(&k, "b"), Value::Int(2)));

  // the copy resumes from its own snapshot (n == 0), unaffected by the
  // original's advancement above.
  let Value::Generator(copy_ref) = copy else {
    panic!("expected a generator");
  };
  let next = k.evaluator_mut().generator_proceed(&copy_ref).unwrap();
  assert!(matches!(next, Value::Int(1)), "got {}", next.repr());
  let next = k.evaluator_mut().generator_proceed(&copy_ref).unwrap();
  assert!(matches!(next, Value::Int(2)), "got {}", next.repr());

  // driving the copy must not have perturbed the original's own state.
  run(&mut k, "designate c = proceed(g)\n");
  assert!(matches!(global(&k, "c"), Value::Int(3)));
}

/// Without an enclosing `attempt`, a `disrupt` propagates out of `proceed`
/// as an ordinary error and marks the generator `Done`.
#[test]
fn disrupt_without_a_handler_errors_and_ends_the_generator() {
  let arena = SourceArena::new();
  let mut k = Keikaku::new(&arena);
  run(
    &mut k,
    concat!("sequence naive():\n", "    yield 1\n", "    yield 2\n"),
  );
  run(&mut k, "designate g = naive()\n");
  run(&mut k, "designate first = proceed(g)\n");
  assert!(matches!(global(&k, "first"), Value::Int(1)));

  assert!(k.eval(r#"disrupt(g, "boom")"#).is_err());
  run(&mut k, "designate done = proceed(g)\n");
  assert!(matches!(global(&k, "done"), Value::Null));
}
