//! Unified diff rendering for dry-run previews

use similar::TextDiff;

/// Render a unified diff of `old` → `new`, labelled with `path`.
///
/// Returns an empty string when the texts are identical.
pub fn unified_diff(old: &str, new: &str, path: &str) -> String {
    if old == new {
        return String::new();
    }
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(2)
        .header(&format!("a/{path}"), &format!("b/{path}"))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_texts_produce_no_diff() {
        assert_eq!(unified_diff("a\n", "a\n", "m.json"), "");
    }

    #[test]
    fn diff_marks_removed_lines() {
        let diff = unified_diff("a\nb\nc\n", "a\nc\n", "Packages/manifest.json");
        assert!(diff.contains("--- a/Packages/manifest.json"));
        assert!(diff.contains("+++ b/Packages/manifest.json"));
        assert!(diff.contains("-b"));
    }
}
