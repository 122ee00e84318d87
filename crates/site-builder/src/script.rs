/// Replay scripts: JSON arrays of builder actions applied in order.
use std::path::Path;

use anyhow::{Context, Result};
use site_builder_core::{ActionOutcome, BlockHistoryManager, BuilderAction};

/// One entry of a script, parsed independently so a bad entry doesn't
/// discard the rest.
pub type ScriptStep = std::result::Result<BuilderAction, serde_json::Error>;

/// Tally of a replayed script.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplaySummary {
    pub applied: usize,
    pub unchanged: usize,
    pub failed: usize,
}

/// Reads a script file. The file itself must be a JSON array; individual
/// entries that don't parse as actions are returned as errors.
///
/// # Errors
///
/// Returns an error if the file can't be read or isn't a JSON array.
pub fn load_script(path: &Path) -> Result<Vec<ScriptStep>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script: {}", path.display()))?;
    let entries: Vec<serde_json::Value> = serde_json::from_str(&contents)
        .with_context(|| format!("Script is not a JSON array: {}", path.display()))?;
    Ok(entries.into_iter().map(serde_json::from_value).collect())
}

/// Applies every step to `manager`, logging and skipping failures.
pub fn replay(manager: &mut BlockHistoryManager, steps: Vec<ScriptStep>) -> ReplaySummary {
    let mut summary = ReplaySummary::default();
    for (index, step) in steps.into_iter().enumerate() {
        let action = match step {
            Ok(action) => action,
            Err(e) => {
                tracing::warn!("Skipping malformed action #{index}: {e}");
                summary.failed += 1;
                continue;
            }
        };
        match manager.dispatch(action) {
            Ok(ActionOutcome::Unchanged) => summary.unchanged += 1,
            Ok(outcome) => {
                tracing::debug!(index, ?outcome, "action applied");
                summary.applied += 1;
            }
            Err(e) => {
                tracing::warn!("Action #{index} failed: {e}");
                summary.failed += 1;
            }
        }
    }
    summary
}
