//! Name-based reference relinking
//!
//! For every empty or broken slot, look up an asset of the slot's kind
//! named exactly like the owning object. This is a heuristic: a name
//! collision links the wrong asset, and nothing here scores confidence.

use janitor_fs::NormalizedPath;
use serde::{Deserialize, Serialize};

use crate::host::{AssetKind, Host, SlotState};
use crate::index::AssetIndex;
use crate::Result;

/// One slot that was (or would be) filled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relink {
    pub object: NormalizedPath,
    pub slot: usize,
    pub kind: AssetKind,
    pub target: NormalizedPath,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelinkReport {
    pub objects_scanned: usize,
    pub relinked: Vec<Relink>,
    pub objects_saved: usize,
    pub failures: Vec<String>,
}

/// A slot needing repair, as reported by [`ReferenceRelinker::scan`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingReference {
    pub object: NormalizedPath,
    pub object_name: String,
    pub slot: usize,
    pub kind: AssetKind,
    pub state: SlotState,
    /// What relinking would assign, if anything
    pub resolvable: Option<NormalizedPath>,
}

#[derive(Debug, Clone)]
pub struct ReferenceRelinker {
    index: AssetIndex,
}

impl ReferenceRelinker {
    pub fn new(index: AssetIndex) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &AssetIndex {
        &self.index
    }

    /// Fill every resolvable slot and save the objects that changed.
    ///
    /// In a dry run nothing is saved; `objects_saved` counts the objects
    /// that would be.
    pub fn relink(&self, host: &dyn Host, dry_run: bool) -> Result<RelinkReport> {
        let mut report = RelinkReport::default();

        for id in host.object_ids()? {
            let mut object = match host.load_object(&id) {
                Ok(object) => object,
                Err(e) => {
                    report.failures.push(format!("could not load {id}: {e}"));
                    continue;
                }
            };
            report.objects_scanned += 1;

            let mut pending = Vec::new();
            for (slot, entry) in object.slots.iter().enumerate() {
                if !entry.state.needs_repair() {
                    continue;
                }
                if let Some(target) = self.index.lookup(&entry.kind, &object.name) {
                    pending.push(Relink {
                        object: id.clone(),
                        slot,
                        kind: entry.kind.clone(),
                        target: target.clone(),
                    });
                }
            }
            for relink in &pending {
                tracing::debug!(
                    "{} slot {} ({}) -> {}",
                    object.name,
                    relink.slot,
                    relink.kind,
                    relink.target
                );
                object.link(relink.slot, relink.target.clone());
            }

            if !object.is_dirty() {
                continue;
            }
            if dry_run {
                report.objects_saved += 1;
                report.relinked.extend(pending);
                continue;
            }
            match host.save_object(&object) {
                Ok(()) => {
                    report.objects_saved += 1;
                    report.relinked.extend(pending);
                }
                Err(e) => report.failures.push(format!("could not save {id}: {e}")),
            }
        }

        Ok(report)
    }

    /// List every empty or broken slot without changing anything
    pub fn scan(&self, host: &dyn Host) -> Result<Vec<MissingReference>> {
        let mut missing = Vec::new();
        for id in host.object_ids()? {
            let object = match host.load_object(&id) {
                Ok(object) => object,
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", id, e);
                    continue;
                }
            };
            for (slot, entry) in object.slots.iter().enumerate() {
                if !entry.state.needs_repair() {
                    continue;
                }
                missing.push(MissingReference {
                    object: id.clone(),
                    object_name: object.name.clone(),
                    slot,
                    kind: entry.kind.clone(),
                    state: entry.state.clone(),
                    resolvable: self.index.lookup(&entry.kind, &object.name).cloned(),
                });
            }
        }
        Ok(missing)
    }
}
