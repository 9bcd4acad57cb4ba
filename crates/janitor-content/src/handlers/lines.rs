//! Opaque line editor
//!
//! Tolerates any input and never fails. Removing lines can break the
//! surrounding syntax; hazards the edit introduces are reported in the
//! outcome and left in place.

use std::collections::HashMap;

use crate::document::ManifestDocument;
use crate::edit::{EditOutcome, ManifestEdit, Strategy};
use crate::structure;

#[derive(Debug, Default)]
pub struct LineEditor;

impl LineEditor {
    pub fn new() -> Self {
        Self
    }

    pub fn apply(&self, source: &str, edit: &ManifestEdit) -> EditOutcome {
        let mut doc = ManifestDocument::parse(source);
        let before: Vec<String> = doc.lines().to_vec();

        let removed = doc.remove_where(|line| edit.is_denied(line));

        let mut inserted = Vec::new();
        let mut skipped = Vec::new();
        // Lines already inserted after each marker, to keep configured order
        let mut placed: HashMap<usize, usize> = HashMap::new();

        for ensure in &edit.ensure {
            if edit.is_denied(&ensure.line) {
                skipped.push(format!("{} (matches denylist)", ensure.line.trim()));
                continue;
            }
            if doc.contains_line(&ensure.line) {
                continue;
            }
            let Some(marker) = doc.find(&ensure.after) else {
                skipped.push(format!("{} (marker '{}' not found)", ensure.line.trim(), ensure.after));
                continue;
            };
            let offset = placed.entry(marker).or_insert(0);
            doc.insert(marker + 1 + *offset, ensure.line.clone());
            *offset += 1;
            inserted.push(ensure.line.trim().to_string());
        }

        let changed = doc.is_modified();
        let risks = if changed {
            structure::introduced(&before, doc.lines())
        } else {
            Vec::new()
        };

        let rendered = if changed { doc.render() } else { source.to_string() };
        let mut outcome = EditOutcome::new(rendered, Strategy::Lines, changed);
        outcome.removed = removed;
        outcome.inserted = inserted;
        outcome.skipped = skipped;
        outcome.risks = risks;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::EnsureLine;
    use crate::structure::RiskKind;
    use pretty_assertions::assert_eq;

    fn edit(deny: &[&str], ensure: &[(&str, &str)]) -> ManifestEdit {
        ManifestEdit {
            denylist: deny.iter().map(|s| s.to_string()).collect(),
            ensure: ensure
                .iter()
                .map(|(line, after)| EnsureLine {
                    line: line.to_string(),
                    after: after.to_string(),
                })
                .collect(),
        }
    }

    const MANIFEST: &str = "{\n  \"dependencies\": {\n    \"com.keep\": \"1.0.0\",\n    \"com.drop\": \"2.0.0\",\n    \"com.last\": \"3.0.0\"\n  }\n}\n";

    #[test]
    fn removes_every_denied_line() {
        let outcome = LineEditor::new().apply(MANIFEST, &edit(&["com.drop"], &[]));
        assert!(outcome.changed());
        assert_eq!(outcome.removed, vec!["    \"com.drop\": \"2.0.0\",".to_string()]);
        assert!(!outcome.source.contains("com.drop"));
        assert!(outcome.risks.is_empty());
    }

    #[test]
    fn removing_last_entry_reports_dangling_separator() {
        let outcome = LineEditor::new().apply(MANIFEST, &edit(&["com.last"], &[]));
        assert!(outcome.changed());
        assert_eq!(outcome.risks.len(), 1);
        assert_eq!(outcome.risks[0].kind, RiskKind::DanglingSeparator);
        // Reported, not repaired
        assert!(outcome.source.contains("\"com.drop\": \"2.0.0\",\n  }"));
    }

    #[test]
    fn ensure_inserts_after_marker_in_configured_order() {
        let outcome = LineEditor::new().apply(
            MANIFEST,
            &edit(
                &[],
                &[
                    ("    \"com.a\": \"1.0.0\",", "\"dependencies\""),
                    ("    \"com.b\": \"1.0.0\",", "\"dependencies\""),
                ],
            ),
        );
        let lines: Vec<&str> = outcome.source.lines().collect();
        assert_eq!(lines[1], "  \"dependencies\": {");
        assert_eq!(lines[2], "    \"com.a\": \"1.0.0\",");
        assert_eq!(lines[3], "    \"com.b\": \"1.0.0\",");
    }

    #[test]
    fn ensure_is_idempotent() {
        let request = edit(&["com.drop"], &[("    \"com.a\": \"1.0.0\",", "\"dependencies\"")]);
        let first = LineEditor::new().apply(MANIFEST, &request);
        let second = LineEditor::new().apply(&first.source, &request);
        assert!(first.changed());
        assert!(!second.changed());
        assert_eq!(second.source, first.source);
    }

    #[test]
    fn missing_marker_is_skipped() {
        let outcome = LineEditor::new().apply(MANIFEST, &edit(&[], &[("x", "\"nowhere\"")]));
        assert!(!outcome.changed());
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.source, MANIFEST);
    }

    #[test]
    fn crlf_is_preserved() {
        let source = MANIFEST.replace('\n', "\r\n");
        let outcome = LineEditor::new().apply(&source, &edit(&["com.drop"], &[]));
        assert!(outcome.source.contains("\r\n"));
        assert!(!outcome.source.replace("\r\n", "").contains('\n'));
    }
}
