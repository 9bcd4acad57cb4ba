//! Name lookup over candidate assets
//!
//! Rebuilt from the host on every pipeline run and never persisted.
//! Candidates are visited in sorted path order, so whichever tie-break is
//! configured, the same tree always produces the same index.

use std::collections::BTreeMap;

use janitor_fs::NormalizedPath;
use serde::{Deserialize, Serialize};

use crate::host::{AssetCandidate, AssetKind, Host};
use crate::Result;

/// Which candidate wins when several share a kind and name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    /// Later entries overwrite earlier ones
    LastInScanOrder,
    /// Fewest path components, then shortest path text
    #[default]
    ShortestPath,
}

/// A key with more than one candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ambiguity {
    pub kind: AssetKind,
    pub name: String,
    pub candidates: Vec<NormalizedPath>,
    pub chosen: NormalizedPath,
}

impl std::fmt::Display for Ambiguity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} '{}' has {} candidates; using {}",
            self.kind,
            self.name,
            self.candidates.len(),
            self.chosen
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct AssetIndex {
    entries: BTreeMap<(AssetKind, String), NormalizedPath>,
    ambiguities: Vec<Ambiguity>,
}

impl AssetIndex {
    /// Ask the host for every candidate of each kind and index them
    pub fn build(host: &dyn Host, kinds: &[AssetKind], tie_break: TieBreak) -> Result<Self> {
        let mut candidates = Vec::new();
        for kind in kinds {
            candidates.extend(host.assets_of_kind(kind)?);
        }
        let index = Self::from_candidates(candidates, tie_break);
        tracing::debug!(
            "Asset index holds {} entries ({} ambiguous)",
            index.len(),
            index.ambiguities.len()
        );
        Ok(index)
    }

    pub fn from_candidates(candidates: Vec<AssetCandidate>, tie_break: TieBreak) -> Self {
        let mut grouped: BTreeMap<(AssetKind, String), Vec<NormalizedPath>> = BTreeMap::new();
        for candidate in candidates {
            grouped
                .entry((candidate.kind, candidate.name))
                .or_default()
                .push(candidate.path);
        }

        let mut entries = BTreeMap::new();
        let mut ambiguities = Vec::new();
        for ((kind, name), mut paths) in grouped {
            paths.sort();
            paths.dedup();
            let chosen = match tie_break {
                TieBreak::LastInScanOrder => paths.last(),
                TieBreak::ShortestPath => paths
                    .iter()
                    .min_by_key(|p| (p.depth(), p.as_str().len())),
            };
            let Some(chosen) = chosen.cloned() else {
                continue;
            };
            if paths.len() > 1 {
                ambiguities.push(Ambiguity {
                    kind: kind.clone(),
                    name: name.clone(),
                    candidates: paths,
                    chosen: chosen.clone(),
                });
            }
            entries.insert((kind, name), chosen);
        }

        Self {
            entries,
            ambiguities,
        }
    }

    /// Exact-name lookup
    pub fn lookup(&self, kind: &AssetKind, name: &str) -> Option<&NormalizedPath> {
        self.entries.get(&(kind.clone(), name.to_string()))
    }

    pub fn ambiguities(&self) -> &[Ambiguity] {
        &self.ambiguities
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
