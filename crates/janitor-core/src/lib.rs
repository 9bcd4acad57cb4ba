//! Repair engine for Tree Janitor
//!
//! Turns a tree produced by an uncontrolled extraction into a loadable
//! one. The [`QuiescenceWatcher`] decides when the extraction has
//! settled, the [`RepairPipeline`] runs the idempotent repair steps in a
//! fixed order, and the [`ReferenceRelinker`] repairs broken object
//! references by name through the [`Host`] collaborator.
//!
//! [`RepairSession`] ties these together for a long-lived host process.

pub mod config;
pub mod error;
pub mod host;
pub mod index;
pub mod pipeline;
pub mod relink;
pub mod session;
pub mod steps;
pub mod watcher;

pub use config::RepairConfig;
pub use error::{Error, Result};
pub use host::{AssetCandidate, AssetKind, DirectoryHost, Host, Slot, SlotState, StructuredObject};
pub use index::{AssetIndex, TieBreak};
pub use pipeline::{PipelineOptions, RepairPipeline, RepairReport};
pub use relink::{MissingReference, ReferenceRelinker, RelinkReport};
pub use session::{AutoRepairPolicy, RepairSession};
pub use steps::{RepairStep, RepairSummary, StepContext, StepOutcome};
pub use watcher::{PollOutcome, QuiescenceWatcher, WatcherState};
