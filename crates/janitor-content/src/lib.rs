//! Dependency manifest parsing, editing, and diffing for Tree Janitor
//!
//! A manifest is edited structurally when it parses as a JSON object and
//! falls back to an opaque line model otherwise. Both strategies share
//! the same [`ManifestEdit`] request and report an [`EditOutcome`].

pub mod diff;
pub mod document;
pub mod edit;
pub mod error;
pub mod handlers;
pub mod structure;

pub use diff::unified_diff;
pub use document::{LineEnding, ManifestDocument};
pub use edit::{EditMode, EditOutcome, EnsureLine, ManifestEdit, Strategy};
pub use error::{Error, Result};
pub use handlers::{JsonEditor, LineEditor};
pub use structure::{RiskKind, StructuralRisk};

/// Apply `edit` to `source` using the strategy selected by `mode`.
///
/// With [`EditMode::Auto`], JSON objects are edited structurally and any
/// other content goes through the line editor. Only an explicit
/// [`EditMode::Structural`] request can fail on unparseable input.
pub fn rewrite(source: &str, edit: &ManifestEdit, mode: EditMode) -> Result<EditOutcome> {
    match mode {
        EditMode::Lines => Ok(LineEditor::new().apply(source, edit)),
        EditMode::Structural => JsonEditor::new().apply(source, edit),
        EditMode::Auto => match JsonEditor::new().apply(source, edit) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::debug!("Structural edit unavailable ({e}); using line editor");
                Ok(LineEditor::new().apply(source, edit))
            }
        },
    }
}
