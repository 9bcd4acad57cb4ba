//! Repair steps
//!
//! Each step is idempotent over the tree: a second run on a repaired tree
//! produces no changes and no writes. Per-item failures are recorded in
//! the [`StepOutcome`] and never stop the step.

mod descriptor;
mod manifest;
mod patch;
mod prune;
mod relink;
mod relocate;

pub use descriptor::DescriptorWriter;
pub use manifest::ManifestRewriter;
pub use patch::MetadataPatcher;
pub use prune::PathPruner;
pub use relink::RelinkStep;
pub use relocate::BinaryRelocator;

use janitor_fs::{NormalizedPath, RobustnessConfig};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::host::Host;
use crate::Result;

/// Everything a step may touch while running
pub struct StepContext<'a> {
    pub root: &'a NormalizedPath,
    pub dry_run: bool,
    pub robustness: RobustnessConfig,
    pub host: &'a dyn Host,
}

impl StepContext<'_> {
    /// Absolute path of a tree-relative entry
    pub fn resolve(&self, relative: &str) -> NormalizedPath {
        self.root.join(relative)
    }
}

/// One stage of the repair pipeline
pub trait RepairStep {
    fn name(&self) -> &'static str;

    /// Run the step. An `Err` means the step could not start at all;
    /// per-item problems belong in the outcome.
    fn run(&self, ctx: &StepContext<'_>) -> Result<StepOutcome>;
}

/// Counts of what a repair pass changed (or would change, in a dry run)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairSummary {
    pub paths_pruned: usize,
    pub files_relocated: usize,
    pub sidecars_relocated: usize,
    pub metadata_files_patched: usize,
    pub manifest_entries_removed: usize,
    pub manifest_entries_inserted: usize,
    pub descriptors_written: usize,
    pub slots_relinked: usize,
    pub objects_saved: usize,
}

impl RepairSummary {
    pub fn merge(&mut self, other: &RepairSummary) {
        self.paths_pruned += other.paths_pruned;
        self.files_relocated += other.files_relocated;
        self.sidecars_relocated += other.sidecars_relocated;
        self.metadata_files_patched += other.metadata_files_patched;
        self.manifest_entries_removed += other.manifest_entries_removed;
        self.manifest_entries_inserted += other.manifest_entries_inserted;
        self.descriptors_written += other.descriptors_written;
        self.slots_relinked += other.slots_relinked;
        self.objects_saved += other.objects_saved;
    }

    pub fn total(&self) -> usize {
        self.paths_pruned
            + self.files_relocated
            + self.sidecars_relocated
            + self.metadata_files_patched
            + self.manifest_entries_removed
            + self.manifest_entries_inserted
            + self.descriptors_written
            + self.slots_relinked
            + self.objects_saved
    }
}

/// What a single step did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step: String,
    /// Human-readable description of each change, prefixed with
    /// `[dry-run] Would` in dry runs
    pub actions: Vec<String>,
    /// Ambiguities, structural risks, and skipped requests
    pub warnings: Vec<String>,
    /// Per-item failures the step continued past
    pub failures: Vec<String>,
    /// Unified diffs of planned edits (dry runs only)
    pub previews: Vec<String>,
    pub tally: RepairSummary,
}

impl StepOutcome {
    pub fn new(step: &str) -> Self {
        Self {
            step: step.to_string(),
            ..Default::default()
        }
    }

    /// True when the step changed (or would change) the tree
    pub fn changed(&self) -> bool {
        self.tally.total() > 0
    }

    pub(crate) fn action(&mut self, dry_run: bool, description: String) {
        tracing::debug!("[{}] {}", self.step, description);
        if dry_run {
            self.actions.push(format!("[dry-run] Would {description}"));
        } else {
            self.actions.push(capitalize(&description));
        }
    }

    pub(crate) fn warn(&mut self, message: String) {
        tracing::warn!("[{}] {}", self.step, message);
        self.warnings.push(message);
    }

    pub(crate) fn fail(&mut self, message: String) {
        tracing::warn!("[{}] {}", self.step, message);
        self.failures.push(message);
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// File-name glob supporting `*` and `?`
#[derive(Debug, Clone)]
pub struct FilePattern {
    glob: String,
    regex: Regex,
}

impl FilePattern {
    pub fn from_glob(glob: &str) -> std::result::Result<Self, regex::Error> {
        let mut expr = String::from("^");
        for ch in glob.chars() {
            match ch {
                '*' => expr.push_str("[^/]*"),
                '?' => expr.push_str("[^/]"),
                other => expr.push_str(&regex::escape(&other.to_string())),
            }
        }
        expr.push('$');
        Ok(Self {
            glob: glob.to_string(),
            regex: Regex::new(&expr)?,
        })
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.regex.is_match(file_name)
    }

    pub fn as_str(&self) -> &str {
        &self.glob
    }
}
