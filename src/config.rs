//! Server configuration
//!
//! Delivered by the client as `initializationOptions` and updated through
//! `workspace/didChangeConfiguration` under the `pawn` section.

use std::path::PathBuf;

use serde::Deserialize;

/// Analyzer and compiler locations plus the option set passed to every run.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Directory containing the production compiler (and its `include/`)
    pub compiler_path: PathBuf,
    /// Directory containing the analysis compiler binary
    pub parser_path: PathBuf,
    /// Extra options appended to every analyzer invocation
    pub compile_options: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            compiler_path: PathBuf::new(),
            parser_path: PathBuf::new(),
            compile_options: ["-d1", "-O1", "-(", "-;"].map(String::from).to_vec(),
        }
    }
}
