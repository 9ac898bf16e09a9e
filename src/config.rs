//! Process-wide settings, built once at start-up and passed by reference.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::parser::{LoadError, LoadErrorKind};
use crate::runtime::memory::MAX_PAGES;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Export name of the function to run.
    pub entry: String,
    /// Dump the module summary and the final stack.
    pub debug: bool,
    /// Nested calls beyond this depth trap.
    pub max_call_depth: usize,
    /// Optional watchdog on the number of dispatched instructions.
    pub max_steps: Option<u64>,
    /// Hard ceiling on memory size in pages, applied on top of declared maximums.
    pub max_pages: u32,
    /// Hard ceiling on table size in elements, applied on top of declared maximums.
    pub max_table_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            entry: "main".to_string(),
            debug: false,
            max_call_depth: 16384,
            max_steps: None,
            max_pages: MAX_PAGES,
            max_table_size: 1 << 20,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Config, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Reads a JSON config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Config, LoadError> {
        let invalid = |message: String| {
            LoadError::new(
                LoadErrorKind::InvalidInputPath(format!("{}: {}", path.display(), message)),
                0,
            )
        };
        let text = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        Config::from_json(&text).map_err(|e| invalid(e.to_string()))
    }
}
