//! Ordered repair pipeline
//!
//! Steps run one after another on the calling thread. A failing step is
//! logged and the next one runs anyway; nothing is rolled back. When any
//! step changed the tree, the host is asked to reconcile exactly once.

use chrono::{DateTime, Utc};
use janitor_fs::{NormalizedPath, RobustnessConfig};
use serde::{Deserialize, Serialize};

use crate::config::RepairConfig;
use crate::host::{AssetKind, Host};
use crate::steps::{
    BinaryRelocator, DescriptorWriter, ManifestRewriter, MetadataPatcher, PathPruner, RelinkStep,
    RepairStep, RepairSummary, StepContext, StepOutcome,
};

/// Options for a single pipeline run
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    /// Plan every change without touching the tree
    pub dry_run: bool,
}

/// Result of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairReport {
    pub started_at: DateTime<Utc>,
    pub dry_run: bool,
    pub steps: Vec<StepOutcome>,
    pub summary: RepairSummary,
    /// Steps that could not run, and a failed reconcile request
    pub errors: Vec<String>,
    /// Whether the host was asked to reconcile
    pub reconciled: bool,
}

impl RepairReport {
    /// True when the run changed (or in a dry run, would change) the tree
    pub fn changed(&self) -> bool {
        self.summary.total() > 0
    }

    pub fn warning_count(&self) -> usize {
        self.steps.iter().map(|s| s.warnings.len()).sum()
    }

    pub fn failure_count(&self) -> usize {
        self.errors.len() + self.steps.iter().map(|s| s.failures.len()).sum::<usize>()
    }
}

pub struct RepairPipeline {
    root: NormalizedPath,
    steps: Vec<Box<dyn RepairStep>>,
    robustness: RobustnessConfig,
}

impl RepairPipeline {
    /// Build the standard step order from a configuration:
    /// prune, relocate, patch, manifest, descriptors, relink
    pub fn from_config(root: NormalizedPath, config: &RepairConfig) -> Self {
        let mut steps: Vec<Box<dyn RepairStep>> = vec![
            Box::new(PathPruner::new(config.prune.clone())),
            Box::new(BinaryRelocator::new(config.relocate.clone())),
            Box::new(MetadataPatcher::new(config.patch.clone())),
        ];
        if let Some(manifest) = &config.manifest {
            steps.push(Box::new(ManifestRewriter::new(
                manifest.path.clone(),
                manifest.mode,
                manifest.edit.clone(),
            )));
        }
        if let Some(descriptors) = &config.descriptors {
            steps.push(Box::new(DescriptorWriter::new(descriptors.clone())));
        }
        let kinds: Vec<AssetKind> = config.assets.kinds.keys().map(|k| AssetKind::new(k.as_str())).collect();
        steps.push(Box::new(RelinkStep::new(kinds, config.assets.tie_break)));

        Self::with_steps(root, steps)
    }

    pub fn with_steps(root: NormalizedPath, steps: Vec<Box<dyn RepairStep>>) -> Self {
        Self {
            root,
            steps,
            robustness: RobustnessConfig::default(),
        }
    }

    pub fn with_robustness(mut self, robustness: RobustnessConfig) -> Self {
        self.robustness = robustness;
        self
    }

    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step in order. Never fails; problems land in the report.
    pub fn apply(&self, host: &dyn Host, options: PipelineOptions) -> RepairReport {
        let mut report = RepairReport {
            started_at: Utc::now(),
            dry_run: options.dry_run,
            steps: Vec::new(),
            summary: RepairSummary::default(),
            errors: Vec::new(),
            reconciled: false,
        };

        tracing::info!(
            "Repairing {}{}",
            self.root,
            if options.dry_run { " (dry run)" } else { "" }
        );

        let ctx = StepContext {
            root: &self.root,
            dry_run: options.dry_run,
            robustness: self.robustness,
            host,
        };

        for step in &self.steps {
            match step.run(&ctx) {
                Ok(outcome) => {
                    if outcome.changed() {
                        tracing::info!("{}: {} change(s)", step.name(), outcome.tally.total());
                    } else {
                        tracing::debug!("{}: nothing to do", step.name());
                    }
                    report.summary.merge(&outcome.tally);
                    report.steps.push(outcome);
                }
                Err(e) => {
                    tracing::warn!("Step {} failed: {}", step.name(), e);
                    report.errors.push(format!("{}: {e}", step.name()));
                }
            }
        }

        if report.changed() && !options.dry_run {
            match host.request_reconcile() {
                Ok(()) => report.reconciled = true,
                Err(e) => {
                    tracing::warn!("Reconcile request failed: {}", e);
                    report.errors.push(format!("reconcile: {e}"));
                }
            }
        }

        tracing::info!(
            "Repair finished: {} change(s), {} warning(s), {} failure(s)",
            report.summary.total(),
            report.warning_count(),
            report.failure_count()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{AssetCandidate, StructuredObject};
    use crate::{Error, Result};
    use std::cell::Cell;

    struct NullHost {
        reconciles: Cell<usize>,
    }

    impl Host for NullHost {
        fn assets_of_kind(&self, _kind: &AssetKind) -> Result<Vec<AssetCandidate>> {
            Ok(Vec::new())
        }
        fn object_ids(&self) -> Result<Vec<NormalizedPath>> {
            Ok(Vec::new())
        }
        fn load_object(&self, id: &NormalizedPath) -> Result<StructuredObject> {
            Err(Error::host(format!("no object {id}")))
        }
        fn save_object(&self, _object: &StructuredObject) -> Result<()> {
            Ok(())
        }
        fn request_reconcile(&self) -> Result<()> {
            self.reconciles.set(self.reconciles.get() + 1);
            Ok(())
        }
    }

    struct Fixed {
        name: &'static str,
        changes: usize,
        fail: bool,
    }

    impl RepairStep for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }
        fn run(&self, _ctx: &StepContext<'_>) -> Result<StepOutcome> {
            if self.fail {
                return Err(Error::StepFailed {
                    step: self.name.to_string(),
                    reason: "boom".to_string(),
                });
            }
            let mut outcome = StepOutcome::new(self.name);
            outcome.tally.paths_pruned = self.changes;
            Ok(outcome)
        }
    }

    fn pipeline(steps: Vec<Fixed>) -> RepairPipeline {
        RepairPipeline::with_steps(
            NormalizedPath::new("/nonexistent"),
            steps.into_iter().map(|s| Box::new(s) as Box<dyn RepairStep>).collect(),
        )
    }

    #[test]
    fn failing_step_does_not_stop_later_steps() {
        let host = NullHost { reconciles: Cell::new(0) };
        let report = pipeline(vec![
            Fixed { name: "a", changes: 0, fail: true },
            Fixed { name: "b", changes: 2, fail: false },
        ])
        .apply(&host, PipelineOptions::default());

        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.steps.len(), 1);
        assert_eq!(report.summary.paths_pruned, 2);
        assert!(report.reconciled);
        assert_eq!(host.reconciles.get(), 1);
    }

    #[test]
    fn no_reconcile_without_changes_or_in_dry_run() {
        let host = NullHost { reconciles: Cell::new(0) };
        let unchanged = pipeline(vec![Fixed { name: "a", changes: 0, fail: false }])
            .apply(&host, PipelineOptions::default());
        assert!(!unchanged.changed());

        let dry = pipeline(vec![Fixed { name: "a", changes: 1, fail: false }])
            .apply(&host, PipelineOptions { dry_run: true });
        assert!(dry.changed());
        assert!(!dry.reconciled);

        assert_eq!(host.reconciles.get(), 0);
    }

    #[test]
    fn standard_step_order() {
        let mut config = RepairConfig::default();
        config.manifest = Some(crate::config::ManifestConfig {
            path: "Packages/manifest.json".to_string(),
            mode: Default::default(),
            edit: Default::default(),
        });
        let pipeline = RepairPipeline::from_config(NormalizedPath::new("/tmp"), &config);
        assert_eq!(
            pipeline.step_names(),
            vec!["prune", "relocate", "patch", "manifest", "relink"]
        );
    }
}
