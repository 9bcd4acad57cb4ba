//! Delete superseded directories and files

use janitor_fs::io;

use super::{RepairStep, StepContext, StepOutcome};
use crate::Result;

/// Removes configured tree-relative paths when they exist
#[derive(Debug, Clone, Default)]
pub struct PathPruner {
    paths: Vec<String>,
}

impl PathPruner {
    pub fn new(paths: Vec<String>) -> Self {
        Self { paths }
    }
}

impl RepairStep for PathPruner {
    fn name(&self) -> &'static str {
        "prune"
    }

    fn run(&self, ctx: &StepContext<'_>) -> Result<StepOutcome> {
        let mut outcome = StepOutcome::new(self.name());

        for relative in &self.paths {
            let target = ctx.resolve(relative);
            if !target.exists() {
                tracing::debug!("Nothing to prune at {}", relative);
                continue;
            }

            if ctx.dry_run {
                outcome.action(true, format!("delete {relative}"));
                outcome.tally.paths_pruned += 1;
                continue;
            }

            match io::remove_path(&target, ctx.robustness) {
                Ok(true) => {
                    outcome.action(false, format!("deleted {relative}"));
                    outcome.tally.paths_pruned += 1;
                }
                Ok(false) => {}
                Err(e) => outcome.fail(format!("could not delete {relative}: {e}")),
            }
        }

        Ok(outcome)
    }
}
