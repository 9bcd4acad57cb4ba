//! Token replacement in sidecar metadata files

use janitor_fs::{io, walk};

use super::{FilePattern, RepairStep, StepContext, StepOutcome};
use crate::config::{PatchRule, Replacement};
use crate::Result;

#[derive(Debug, Clone, Default)]
pub struct MetadataPatcher {
    rules: Vec<PatchRule>,
}

impl MetadataPatcher {
    pub fn new(rules: Vec<PatchRule>) -> Self {
        Self { rules }
    }

    fn run_rule(&self, rule: &PatchRule, ctx: &StepContext<'_>, outcome: &mut StepOutcome) -> Result<()> {
        let dir = ctx.resolve(&rule.dir);
        if !dir.is_dir() {
            tracing::debug!("Patch directory {} is absent", rule.dir);
            return Ok(());
        }

        let pattern = FilePattern::from_glob(&rule.pattern)?;
        let files = walk::list_files(&dir, |relative| {
            relative.file_name().is_some_and(|name| pattern.matches(name))
        })?;

        for relative in files {
            let path = dir.join(relative.as_str());
            let shown = format!("{}/{}", rule.dir.trim_end_matches('/'), relative);

            let content = match io::read_text(&path) {
                Ok(content) => content,
                Err(e) => {
                    outcome.fail(format!("could not read {shown}: {e}"));
                    continue;
                }
            };

            let Some((patched, applied)) = apply_replacements(&content, &rule.replacements) else {
                continue;
            };

            if ctx.dry_run {
                outcome.action(true, format!("patch {shown} ({applied} replacements)"));
                outcome.tally.metadata_files_patched += 1;
                continue;
            }

            match io::write_atomic(&path, patched.as_bytes(), ctx.robustness) {
                Ok(()) => {
                    outcome.action(false, format!("patched {shown} ({applied} replacements)"));
                    outcome.tally.metadata_files_patched += 1;
                }
                Err(e) => outcome.fail(format!("could not write {shown}: {e}")),
            }
        }

        Ok(())
    }
}

/// Apply every replacement whose token is present, in order.
///
/// Returns `None` when nothing matched or the result equals the input.
fn apply_replacements(content: &str, replacements: &[Replacement]) -> Option<(String, usize)> {
    let mut text = content.to_string();
    let mut applied = 0;
    for replacement in replacements {
        if replacement.from.is_empty() || !text.contains(&replacement.from) {
            continue;
        }
        text = text.replace(&replacement.from, &replacement.to);
        applied += 1;
    }
    (applied > 0 && text != content).then_some((text, applied))
}

impl RepairStep for MetadataPatcher {
    fn name(&self) -> &'static str {
        "patch"
    }

    fn run(&self, ctx: &StepContext<'_>) -> Result<StepOutcome> {
        let mut outcome = StepOutcome::new(self.name());
        for rule in &self.rules {
            if let Err(e) = self.run_rule(rule, ctx, &mut outcome) {
                outcome.fail(format!("patching {} stopped: {e}", rule.dir));
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replacements(pairs: &[(&str, &str)]) -> Vec<Replacement> {
        pairs
            .iter()
            .map(|(from, to)| Replacement {
                from: from.to_string(),
                to: to.to_string(),
            })
            .collect()
    }

    #[test]
    fn only_present_tokens_count() {
        let content = "isPredefined: 0\nvalidateReferences: 0\n";
        let (patched, applied) = apply_replacements(
            content,
            &replacements(&[
                ("isPredefined: 0", "isPredefined: 1"),
                ("validateReferences: 1", "validateReferences: 0"),
            ]),
        )
        .unwrap();
        assert_eq!(applied, 1);
        assert_eq!(patched, "isPredefined: 1\nvalidateReferences: 0\n");
    }

    #[test]
    fn patched_content_is_stable() {
        let rules = replacements(&[("isPredefined: 0", "isPredefined: 1")]);
        let (patched, _) = apply_replacements("isPredefined: 0", &rules).unwrap();
        assert!(apply_replacements(&patched, &rules).is_none());
    }

    #[test]
    fn replacements_that_cancel_out_change_nothing() {
        let rules = replacements(&[("flag: 0", "flag: 1"), ("flag: 1", "flag: 0")]);
        assert!(apply_replacements("flag: 0\n", &rules).is_none());
    }
}
