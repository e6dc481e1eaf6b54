//! The interactive REPL: a `rustyline`-backed multi-line reader whose
//! `is_indented`/`begins_block` heuristics decide whether to keep reading
//! with a continuation prompt, followed by a `check`-then-`eval` step.

use keikaku::{Keikaku, SourceArena};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::interpreter::{loader_for, report_errors};
use crate::voice::TerminalVoice;

enum Control {
  Eval,
  Conclude,
}

fn is_empty(line: &str) -> bool {
  line.trim().is_empty()
}

fn is_indented(line: &str) -> bool {
  line
    .trim_start_matches('\n')
    .starts_with(|c: char| c.is_ascii_whitespace())
}

fn begins_block(line: &str) -> bool {
  line.trim_end_matches('\n').ends_with(':')
}

/// Whether `buffer` (everything accumulated so far) looks complete, or
/// needs another line appended with the `... ` continuation prompt.
fn is_complete(buffer: &str) -> bool {
  match buffer.split('\n').last() {
    Some(last_line) if !is_empty(last_line) && (is_indented(last_line) || begins_block(last_line)) => false,
    _ => true,
  }
}

fn read_multi_line_input(
  editor: &mut DefaultEditor,
  buffer: &mut String,
) -> Result<Control, ReadlineError> {
  loop {
    let prompt = if buffer.is_empty() { ">> " } else { "... " };
    let line = editor.readline(prompt)?;

    if buffer.is_empty() && line.trim() == "conclude" {
      return Ok(Control::Conclude);
    }

    editor.add_history_entry(line.as_str()).ok();
    if !buffer.is_empty() {
      buffer.push('\n');
    }
    buffer.push_str(&line);

    if is_complete(buffer) {
      return Ok(Control::Eval);
    }
  }
}

pub fn run(quiet: bool, color: bool) -> rustyline::Result<()> {
  let arena = SourceArena::new();
  let loader = loader_for(None);
  let voice = TerminalVoice::new("<repl>", color, quiet);
  let mut keikaku = Keikaku::builder(&arena)
    .with_module_loader(loader)
    .with_voice(voice)
    .build();

  keikaku.voice_mut().repl_banner();

  let mut editor = DefaultEditor::new()?;
  let mut buffer = String::new();

  loop {
    buffer.clear();

    match read_multi_line_input(&mut editor, &mut buffer) {
      Ok(Control::Eval) => {}
      Ok(Control::Conclude) => break,
      Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => break,
      Err(e) => return Err(e),
    }

    match keikaku.eval(&buffer) {
      Ok(value) => println!("{}", value.display()),
      Err(e) => report_errors(&buffer, "<repl>", &e, color),
    }
  }

  keikaku.voice_mut().repl_goodbye();
  Ok(())
}
