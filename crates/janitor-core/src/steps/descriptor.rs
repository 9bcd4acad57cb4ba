//! Generated assembly descriptors
//!
//! Each entry owns `<dir>/<name>/<name>.<extension>` holding
//! `{"name": ..., "references": [...]}`.

use janitor_fs::{DocumentStore, Format};
use serde::Serialize;

use super::{RepairStep, StepContext, StepOutcome};
use crate::config::DescriptorConfig;
use crate::Result;

#[derive(Serialize)]
struct Descriptor<'a> {
    name: &'a str,
    references: &'a [String],
}

#[derive(Debug, Clone)]
pub struct DescriptorWriter {
    config: DescriptorConfig,
}

impl DescriptorWriter {
    pub fn new(config: DescriptorConfig) -> Self {
        Self { config }
    }
}

impl RepairStep for DescriptorWriter {
    fn name(&self) -> &'static str {
        "descriptors"
    }

    fn run(&self, ctx: &StepContext<'_>) -> Result<StepOutcome> {
        let mut outcome = StepOutcome::new(self.name());
        let dir = ctx.resolve(&self.config.dir);
        let store = DocumentStore::with_robustness(ctx.robustness);

        for entry in &self.config.entries {
            let folder = dir.join(&entry.name);
            if !folder.is_dir() && !self.config.create_dirs {
                tracing::debug!("Descriptor folder {} is absent; skipping", folder);
                continue;
            }

            let file_name = format!("{}.{}", entry.name, self.config.extension);
            let path = folder.join(&file_name);
            let shown = format!("{}/{}/{}", self.config.dir, entry.name, file_name);

            let descriptor = Descriptor {
                name: &entry.name,
                references: &entry.references,
            };
            if store.is_current(&path, Format::Json, &descriptor)? {
                continue;
            }

            if ctx.dry_run {
                outcome.action(true, format!("write {shown}"));
                outcome.tally.descriptors_written += 1;
                continue;
            }

            match store.save_as(&path, Format::Json, &descriptor) {
                Ok(_) => {
                    outcome.action(false, format!("wrote {shown}"));
                    outcome.tally.descriptors_written += 1;
                }
                Err(e) => outcome.fail(format!("could not write {shown}: {e}")),
            }
        }

        Ok(outcome)
    }
}
