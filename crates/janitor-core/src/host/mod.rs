//! Host collaborator abstraction
//!
//! The repair pipeline never talks to an editor or asset database
//! directly. Everything it needs from the surrounding application goes
//! through [`Host`]: enumerating candidate assets, loading and saving
//! structured objects, and asking the host to reconcile its view of the
//! tree after files changed underneath it.

mod directory;

pub use directory::DirectoryHost;

use std::fmt;

use janitor_fs::NormalizedPath;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Category of asset a reference slot expects, e.g. `mesh` or `material`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetKind(String);

impl AssetKind {
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetKind {
    fn from(kind: &str) -> Self {
        Self::new(kind)
    }
}

/// An asset the host can link into a slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetCandidate {
    pub kind: AssetKind,
    /// Lookup name, matched exactly against object names
    pub name: String,
    pub path: NormalizedPath,
}

/// State of one reference slot on a structured object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "target", rename_all = "kebab-case")]
pub enum SlotState {
    Linked(NormalizedPath),
    Empty,
    /// Points at something that no longer resolves
    Broken(NormalizedPath),
}

impl SlotState {
    /// True for slots the relinker may fill
    pub fn needs_repair(&self) -> bool {
        !matches!(self, SlotState::Linked(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub kind: AssetKind,
    pub state: SlotState,
}

/// A named host object holding typed reference slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredObject {
    pub id: NormalizedPath,
    pub name: String,
    pub slots: Vec<Slot>,
    dirty: bool,
}

impl StructuredObject {
    pub fn new(id: NormalizedPath, name: impl Into<String>, slots: Vec<Slot>) -> Self {
        Self {
            id,
            name: name.into(),
            slots,
            dirty: false,
        }
    }

    /// Point slot `index` at `target` and mark the object dirty
    pub fn link(&mut self, index: usize, target: NormalizedPath) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.state = SlotState::Linked(target);
            self.dirty = true;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// The application that owns the tree
pub trait Host {
    /// True while the host is compiling, importing, or otherwise unable
    /// to tolerate file changes
    fn is_busy(&self) -> bool {
        false
    }

    /// Every asset of `kind` the host knows about
    fn assets_of_kind(&self, kind: &AssetKind) -> Result<Vec<AssetCandidate>>;

    /// Identifiers of every structured object
    fn object_ids(&self) -> Result<Vec<NormalizedPath>>;

    fn load_object(&self, id: &NormalizedPath) -> Result<StructuredObject>;

    fn save_object(&self, object: &StructuredObject) -> Result<()>;

    /// Ask the host to re-scan the tree after a repair changed it
    fn request_reconcile(&self) -> Result<()>;
}
