use clap::Parser;
use keikaku_cli::commands::Command;
use keikaku_cli::common::InputArgs;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[clap(
  name = "keikaku",
  about = "A dynamically-typed, indentation-sensitive scripting language",
  disable_version_flag = true
)]
pub struct App {
  #[clap(subcommand)]
  command: Option<Command>,

  // Args for the default run command
  #[clap(flatten)]
  input: InputArgs,

  /// Suppress voice-channel narration below error level.
  #[clap(short, long, global = true)]
  quiet: bool,

  /// Disable colored diagnostic output regardless of terminal detection.
  #[clap(long, global = true)]
  no_color: bool,

  /// Increase structured logging verbosity; RUST_LOG overrides this.
  #[clap(long, global = true, action = clap::ArgAction::Count)]
  verbose: u8,

  /// Print version and exit.
  #[clap(short = 'v', long, action = clap::ArgAction::Version)]
  version: Option<bool>,
}

fn main() -> anyhow::Result<()> {
  let app = App::parse();
  init_tracing(app.verbose);

  let command = app
    .command
    .unwrap_or_else(|| Command::run(app.input.clone()));

  command.execute(app.quiet, app.no_color)
}

/// Structured diagnostic logging (distinct from the language's own voice
/// channel) — `tracing` + `tracing-subscriber`'s `env-filter`, following the
/// stack used across the retrieval pack's CLI/language-tool repos. Library
/// crates only emit `tracing::{debug,trace}`; only this binary installs a
/// subscriber.
fn init_tracing(verbose: u8) {
  let default_level = match verbose {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .without_time()
    .init();
}
