// scratch memory figures, in bytes
pub const MIN_SCRATCH_MEMORY: usize = 8192;
pub const DEFAULT_SCRATCH_MEMORY: usize = 65536;

pub const DEFAULT_RECURSION_LIMIT: usize = 256;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Interpreter settings as they come out of the optional JSON config file.
///
/// Every field has a default so a config file only needs to name what it
/// changes, e.g. `{ "scratch_memory": 16384, "debug": true }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Size of the scratch memory that variables and program text share.
    pub scratch_memory: usize,
    /// Deepest closure nesting before `RecursionLimit` is raised.
    pub recursion_limit: usize,
    /// Hides builtins that are not production ready.
    pub production: bool,
    /// Exposes debug-only builtins.
    pub debug: bool,
    /// Initial TRON state.
    pub trace: bool,
    /// Directory SAVE, LOAD and CATALOG work in.
    pub home: PathBuf,
    /// Fixed seed for RND; entropy when absent.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scratch_memory: DEFAULT_SCRATCH_MEMORY,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            production: true,
            debug: false,
            trace: false,
            home: PathBuf::from("."),
            seed: None,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.scratch_memory < MIN_SCRATCH_MEMORY {
            bail!("Out of memory. BASIC requires 8K or more User RAM");
        }
        if self.recursion_limit == 0 {
            bail!("recursion_limit must be at least 1");
        }
        Ok(())
    }
}
