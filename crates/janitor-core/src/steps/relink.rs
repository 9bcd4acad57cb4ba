//! Pipeline stage wrapping [`ReferenceRelinker`]

use super::{RepairStep, StepContext, StepOutcome};
use crate::host::AssetKind;
use crate::index::{AssetIndex, TieBreak};
use crate::relink::ReferenceRelinker;
use crate::Result;

/// Builds a fresh [`AssetIndex`] and relinks broken slots
#[derive(Debug, Clone)]
pub struct RelinkStep {
    kinds: Vec<AssetKind>,
    tie_break: TieBreak,
}

impl RelinkStep {
    pub fn new(kinds: Vec<AssetKind>, tie_break: TieBreak) -> Self {
        Self { kinds, tie_break }
    }
}

impl RepairStep for RelinkStep {
    fn name(&self) -> &'static str {
        "relink"
    }

    fn run(&self, ctx: &StepContext<'_>) -> Result<StepOutcome> {
        let mut outcome = StepOutcome::new(self.name());
        if self.kinds.is_empty() {
            return Ok(outcome);
        }

        let index = AssetIndex::build(ctx.host, &self.kinds, self.tie_break)?;
        for ambiguity in index.ambiguities() {
            outcome.warn(ambiguity.to_string());
        }

        let report = ReferenceRelinker::new(index).relink(ctx.host, ctx.dry_run)?;
        for relink in &report.relinked {
            let verb = if ctx.dry_run { "link" } else { "linked" };
            outcome.action(
                ctx.dry_run,
                format!(
                    "{verb} {} slot {} ({}) to {}",
                    relink.object, relink.slot, relink.kind, relink.target
                ),
            );
        }
        for failure in report.failures {
            outcome.fail(failure);
        }
        outcome.tally.slots_relinked += report.relinked.len();
        outcome.tally.objects_saved += report.objects_saved;

        Ok(outcome)
    }
}
