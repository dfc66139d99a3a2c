//! Running the external analysis compiler
//!
//! Spawns the analyzer on a unit's main path, parses its line-oriented JSON
//! output, and publishes a fresh grammar table on the unit. One malformed
//! output line is skipped with a warning; it never invalidates the batch.

use std::path::MAIN_SEPARATOR;
use std::sync::atomic::Ordering;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::analysis::manager::AnalysisUnit;
use crate::config::Settings;
use crate::grammar::records::{ErrorRecord, RecordLine};
use crate::grammar::GrammarTable;

/// Name of the analysis compiler binary, resolved inside the configured
/// parser path.
const ANALYZER_BINARY: &str = "pawnparser";

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to spawn analyzer: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Result of one completed analysis pass.
#[derive(Debug)]
pub struct AnalysisOutcome {
    /// Diagnostic records emitted during the pass
    pub errors: Vec<ErrorRecord>,
}

/// Clears the unit's in-progress flag when the pass ends, on every exit path.
struct PassGuard<'a>(&'a AnalysisUnit);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.in_progress.store(false, Ordering::SeqCst);
    }
}

/// Run one analysis pass for `unit` and publish the resulting table.
///
/// Returns `Ok(None)` when the pass was skipped: another pass is already in
/// flight, or a workspace unit has no detectable main file. A failed spawn
/// leaves the previously published table untouched.
pub async fn run(unit: &AnalysisUnit, settings: &Settings) -> Result<Option<AnalysisOutcome>, AnalysisError> {
    let Some(main_path) = unit.main_path() else {
        return Ok(None);
    };

    if unit.in_progress.swap(true, Ordering::SeqCst) {
        debug!(root = %unit.root().display(), "analysis already in progress, skipping");
        return Ok(None);
    }
    let _guard = PassGuard(unit);

    let mut args: Vec<String> = vec![main_path.display().to_string()];
    if settings.compiler_path != settings.parser_path {
        args.push(format!(
            "-i{}{}",
            settings.compiler_path.join("include").display(),
            MAIN_SEPARATOR
        ));
    }
    args.extend(settings.compile_options.iter().cloned());

    let working_dir = main_path.parent().unwrap_or(unit.root());
    debug!(analyzer = ANALYZER_BINARY, ?args, "spawning analyzer");

    let output = Command::new(settings.parser_path.join(ANALYZER_BINARY))
        .args(&args)
        .current_dir(working_dir)
        .output()
        .await?;

    if !output.stderr.is_empty() {
        warn!(
            root = %unit.root().display(),
            stderr = %String::from_utf8_lossy(&output.stderr),
            "analyzer reported errors on stderr"
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let (table, errors) = ingest_output(&unit.snapshot(), &stdout);

    unit.publish(table, errors.clone());
    debug!(root = %unit.root().display(), "analysis pass published");

    Ok(Some(AnalysisOutcome { errors }))
}

/// Parse the analyzer's stdout into a fresh table, carrying over the
/// accumulate-kind collections from the previous snapshot. Details are
/// refreshed once, after the whole batch is ingested.
fn ingest_output(previous: &GrammarTable, stdout: &str) -> (GrammarTable, Vec<ErrorRecord>) {
    let mut table = GrammarTable::carry_over(previous);
    let mut errors = Vec::new();

    for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
        match RecordLine::parse(line) {
            Ok(record) => {
                if let Some(error) = table.ingest_line(record) {
                    errors.push(error);
                }
            }
            Err(err) => {
                warn!(%err, line, "skipping malformed analyzer record");
            }
        }
    }

    table.refresh_details();
    (table, errors)
}
