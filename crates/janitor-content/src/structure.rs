//! Structural hazard detection for line-edited documents
//!
//! The line editor treats a manifest as opaque text, so removing the last
//! entry of an object can leave `"a": "1",` directly before `}`. These
//! checks find such hazards; they never repair them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskKind {
    /// A line ends in `,` and the next non-blank line closes a container.
    DanglingSeparator,
    /// Brackets or braces outside string literals do not balance.
    Unbalanced,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralRisk {
    pub kind: RiskKind,
    /// Zero-based line index the hazard points at.
    pub line: usize,
}

impl std::fmt::Display for StructuralRisk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            RiskKind::DanglingSeparator => {
                write!(f, "dangling separator before closing token at line {}", self.line + 1)
            }
            RiskKind::Unbalanced => write!(f, "unbalanced brackets (detected at line {})", self.line + 1),
        }
    }
}

/// Find every hazard in `lines`.
pub fn analyze<S: AsRef<str>>(lines: &[S]) -> Vec<StructuralRisk> {
    let mut risks = dangling_separators(lines);
    if let Some(line) = first_imbalance(lines) {
        risks.push(StructuralRisk {
            kind: RiskKind::Unbalanced,
            line,
        });
    }
    risks
}

/// Hazards in `after` that were not already present in `before`.
///
/// Compared by kind and count, since line numbers shift under editing.
pub fn introduced<S: AsRef<str>, T: AsRef<str>>(before: &[S], after: &[T]) -> Vec<StructuralRisk> {
    let old = analyze(before);
    let new = analyze(after);
    let count = |risks: &[StructuralRisk], kind: RiskKind| risks.iter().filter(|r| r.kind == kind).count();

    let mut introduced = Vec::new();
    for kind in [RiskKind::DanglingSeparator, RiskKind::Unbalanced] {
        if count(&new, kind) > count(&old, kind) {
            introduced.extend(new.iter().filter(|r| r.kind == kind).cloned());
        }
    }
    introduced
}

pub fn dangling_separators<S: AsRef<str>>(lines: &[S]) -> Vec<StructuralRisk> {
    let mut risks = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        if !line.as_ref().trim_end().ends_with(',') {
            continue;
        }
        let next = lines[idx + 1..]
            .iter()
            .map(|l| l.as_ref().trim())
            .find(|l| !l.is_empty());
        if matches!(next, Some(n) if n.starts_with('}') || n.starts_with(']')) {
            risks.push(StructuralRisk {
                kind: RiskKind::DanglingSeparator,
                line: idx,
            });
        }
    }
    risks
}

/// Line index where nesting first goes negative, or the last line if
/// containers are left open.
fn first_imbalance<S: AsRef<str>>(lines: &[S]) -> Option<usize> {
    let mut depth: i64 = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, line) in lines.iter().enumerate() {
        for ch in line.as_ref().chars() {
            if in_string {
                match ch {
                    _ if escaped => escaped = false,
                    '\\' => escaped = true,
                    '"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match ch {
                '"' => in_string = true,
                '{' | '[' => depth += 1,
                '}' | ']' => {
                    depth -= 1;
                    if depth < 0 {
                        return Some(idx);
                    }
                }
                _ => {}
            }
        }
    }

    if depth != 0 {
        Some(lines.len().saturating_sub(1))
    } else {
        None
    }
}
