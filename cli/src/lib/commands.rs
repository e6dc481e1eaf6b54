use clap::{Args, Subcommand};
use keikaku::{Keikaku, SourceArena};

use crate::common::InputArgs;
use crate::interpreter::{color_enabled, loader_for, report_errors};
use crate::voice::TerminalVoice;

#[derive(Clone, Debug, Subcommand)]
pub enum Command {
  /// Execute a Keikaku file [default]
  Run(RunArgs),
  /// Start the interactive REPL
  Repl,
}

impl Command {
  pub fn run(input: InputArgs) -> Self {
    Self::Run(RunArgs { input })
  }

  pub fn execute(self, quiet: bool, no_color: bool) -> anyhow::Result<()> {
    match self {
      Self::Run(args) => handle_run(args, quiet, no_color),
      Self::Repl => handle_repl(quiet, no_color),
    }
  }
}

#[derive(Clone, Debug, Args)]
pub struct RunArgs {
  #[clap(flatten)]
  input: InputArgs,
}

fn handle_run(args: RunArgs, quiet: bool, no_color: bool) -> anyhow::Result<()> {
  let source = args.input.source()?;
  let name = args.input.name();
  let color = color_enabled(no_color, supports_color::Stream::Stderr);

  let arena = SourceArena::new();
  let loader = loader_for(args.input.path());
  let mut voice = TerminalVoice::new(name.to_string(), color, quiet);
  voice.set_source(source.clone());
  let mut keikaku = Keikaku::builder(&arena)
    .with_module_loader(loader)
    .with_voice(voice)
    .build();

  match keikaku.eval(&source) {
    Ok(_) => Ok(()),
    Err(e) => {
      report_errors(&source, &name, &e, color);
      anyhow::bail!("Failed to run {name}");
    }
  }
}

fn handle_repl(quiet: bool, no_color: bool) -> anyhow::Result<()> {
  let color = color_enabled(no_color, supports_color::Stream::Stdout);
  crate::repl::run(quiet, color).map_err(|e| anyhow::anyhow!(e))
}
