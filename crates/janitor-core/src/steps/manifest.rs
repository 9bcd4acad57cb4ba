//! Dependency manifest rewriting

use janitor_content::{unified_diff, EditMode, ManifestEdit};
use janitor_fs::io;

use super::{RepairStep, StepContext, StepOutcome};
use crate::Result;

#[derive(Debug, Clone)]
pub struct ManifestRewriter {
    path: String,
    mode: EditMode,
    edit: ManifestEdit,
}

impl ManifestRewriter {
    pub fn new(path: impl Into<String>, mode: EditMode, edit: ManifestEdit) -> Self {
        Self {
            path: path.into(),
            mode,
            edit,
        }
    }
}

impl RepairStep for ManifestRewriter {
    fn name(&self) -> &'static str {
        "manifest"
    }

    fn run(&self, ctx: &StepContext<'_>) -> Result<StepOutcome> {
        let mut outcome = StepOutcome::new(self.name());
        let path = ctx.resolve(&self.path);
        if !path.is_file() {
            tracing::debug!("No manifest at {}", self.path);
            return Ok(outcome);
        }

        let source = io::read_text(&path)?;
        let edited = match janitor_content::rewrite(&source, &self.edit, self.mode) {
            Ok(edited) => edited,
            Err(e) => {
                outcome.fail(format!("{} left unchanged: {e}", self.path));
                return Ok(outcome);
            }
        };

        for risk in &edited.risks {
            outcome.warn(format!("{}: {risk}", self.path));
        }
        for skipped in &edited.skipped {
            outcome.warn(format!("{}: skipped ensure {skipped}", self.path));
        }
        if !edited.changed() {
            return Ok(outcome);
        }

        for entry in &edited.removed {
            tracing::debug!("Manifest entry removed: {}", entry.trim());
        }
        for entry in &edited.inserted {
            tracing::debug!("Manifest entry inserted: {}", entry.trim());
        }
        let summary = format!(
            "{} ({} removed, {} inserted)",
            self.path,
            edited.removed.len(),
            edited.inserted.len()
        );

        if ctx.dry_run {
            outcome.action(true, format!("rewrite {summary}"));
            outcome
                .previews
                .push(unified_diff(&source, &edited.source, &self.path));
        } else {
            io::write_atomic(&path, edited.source.as_bytes(), ctx.robustness)?;
            outcome.action(false, format!("rewrote {summary}"));
        }
        outcome.tally.manifest_entries_removed += edited.removed.len();
        outcome.tally.manifest_entries_inserted += edited.inserted.len();

        Ok(outcome)
    }
}
