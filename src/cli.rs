use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Program to run instead of starting the REPL
    pub program: Option<PathBuf>,
    /// JSON interpreter config file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Directory SAVE, LOAD and CATALOG work in
    #[arg(long)]
    pub home: Option<PathBuf>,
    /// Expose debug builtins and log at trace level
    #[arg(long)]
    pub debug: bool,
    /// Start with TRON
    #[arg(long)]
    pub trace: bool,
}
