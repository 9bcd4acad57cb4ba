//! Edit requests and outcomes

use serde::{Deserialize, Serialize};

use crate::structure::StructuralRisk;

/// A line that must be present after the edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsureLine {
    /// The full line, e.g. `"com.example.pkg": "1.2.0",`.
    pub line: String,
    /// Insert right after the first line containing this text.
    pub after: String,
}

/// What to change in a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEdit {
    /// Entries or lines containing any of these substrings are removed.
    #[serde(default)]
    pub denylist: Vec<String>,
    /// Lines inserted when absent.
    #[serde(default)]
    pub ensure: Vec<EnsureLine>,
}

impl ManifestEdit {
    /// True when `text` contains a non-empty denylisted substring.
    pub fn is_denied(&self, text: &str) -> bool {
        self.denylist
            .iter()
            .any(|d| !d.is_empty() && text.contains(d.as_str()))
    }
}

/// How the rewriter chooses its strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EditMode {
    /// Structural when the source parses as a JSON object, lines otherwise.
    #[default]
    Auto,
    /// Structural only; unparseable input is an error.
    Structural,
    /// Opaque line editing only.
    Lines,
}

/// The strategy that produced an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    Structural,
    Lines,
}

/// Result of applying a [`ManifestEdit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    /// New document text. Identical to the input when nothing changed.
    pub source: String,
    pub strategy: Strategy,
    /// Removed lines, or `"key": value` renderings of removed entries.
    pub removed: Vec<String>,
    /// Inserted lines or entries.
    pub inserted: Vec<String>,
    /// Ensure requests that could not be honored.
    pub skipped: Vec<String>,
    /// Structural hazards present in the output and introduced by the edit.
    pub risks: Vec<StructuralRisk>,
    changed: bool,
}

impl EditOutcome {
    pub(crate) fn new(source: String, strategy: Strategy, changed: bool) -> Self {
        Self {
            source,
            strategy,
            removed: Vec::new(),
            inserted: Vec::new(),
            skipped: Vec::new(),
            risks: Vec::new(),
            changed,
        }
    }

    /// True when the file must be rewritten.
    pub fn changed(&self) -> bool {
        self.changed
    }
}
