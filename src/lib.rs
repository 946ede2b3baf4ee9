pub mod cli;
pub mod error;
pub mod host;
pub mod model;
pub mod processor;
pub mod program;
pub mod repl;

use anyhow::Context;
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use host::{DirStore, NoBus, StdConsole};
use model::Config;
use processor::Interpreter;
use program::Program;
use repl::Repl;

/// Logs go to stderr so they never mix with program output.
fn install_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "trace" } else { "info" }));
    // a second install (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    install_tracing(args.debug);

    // 1. ── Configure ──────────────────────────────────────────────────
    let mut config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Reading {}", path.display()))?;
            Config::from_json(&json).with_context(|| format!("Parsing {}", path.display()))?
        }
        None => Config::default(),
    };
    if let Some(home) = args.home {
        config.home = home;
    }
    config.debug |= args.debug;
    config.trace |= args.trace;
    config.validate()?;

    // 2. ── Interpreter ────────────────────────────────────────────────
    let files = DirStore::new(config.home.clone());
    let interp = Interpreter::new(config, Box::new(StdConsole), Box::new(files), Box::new(NoBus));
    let mut repl = Repl::new(interp);

    // 3. ── Batch run ──────────────────────────────────────────────────
    if let Some(path) = &args.program {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Reading {}", path.display()))?;
        let program = Program::from_text(&text).with_context(|| format!("Parsing {}", path.display()))?;
        repl.set_program(program);
        match repl.run_program() {
            Ok(()) => return Ok(()),
            // a failed run leaves the program loaded for LIST and editing
            Err(err) => {
                warn!(%err, program = %path.display(), "run failed");
                repl.report(&err);
            }
        }
    }

    // 4. ── REPL ───────────────────────────────────────────────────────
    repl.banner();
    repl.run_loop();
    Ok(())
}
