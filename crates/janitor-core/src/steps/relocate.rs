//! Copy binaries and their sidecars into canonical directories
//!
//! Candidates sharing a file name are ordered by path depth, then path
//! text, and the first one wins. Destinations are never overwritten, so a
//! file placed by hand or by an earlier run stays as it is.

use std::collections::{BTreeMap, BTreeSet};

use janitor_fs::checksum::compute_file_checksum;
use janitor_fs::{io, walk, NormalizedPath};

use super::{RepairStep, StepContext, StepOutcome};
use crate::config::RelocateRule;
use crate::Result;

#[derive(Debug, Clone, Default)]
pub struct BinaryRelocator {
    rules: Vec<RelocateRule>,
}

impl BinaryRelocator {
    pub fn new(rules: Vec<RelocateRule>) -> Self {
        Self { rules }
    }

    fn selects(rule: &RelocateRule, file_name: &str) -> bool {
        if rule.names.iter().any(|n| n == file_name) {
            return true;
        }
        let extension = NormalizedPath::new(file_name);
        let Some(extension) = extension.extension() else {
            return false;
        };
        rule.extensions
            .iter()
            .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(extension))
    }

    fn run_rule(&self, rule: &RelocateRule, ctx: &StepContext<'_>, outcome: &mut StepOutcome) -> Result<()> {
        let search_root = ctx.resolve(&rule.search_root);
        let target_dir = ctx.resolve(&rule.target_dir);
        let excluded: Vec<NormalizedPath> = rule.exclude.iter().map(|e| ctx.resolve(e)).collect();

        if !search_root.is_dir() {
            tracing::debug!("Search root {} is absent", search_root);
            return Ok(());
        }

        let matches = walk::list_files(&search_root, |relative| {
            relative
                .file_name()
                .is_some_and(|name| Self::selects(rule, name))
        })?;

        let mut by_name: BTreeMap<String, Vec<NormalizedPath>> = BTreeMap::new();
        for relative in matches {
            let absolute = search_root.join(relative.as_str());
            if absolute.is_within(&target_dir) || excluded.iter().any(|e| absolute.is_within(e)) {
                continue;
            }
            if let Some(name) = absolute.file_name() {
                by_name.entry(name.to_string()).or_default().push(absolute.clone());
            }
        }

        for (name, mut candidates) in by_name {
            candidates.sort_by(|a, b| {
                a.depth()
                    .cmp(&b.depth())
                    .then_with(|| a.as_str().cmp(b.as_str()))
            });
            let destination = target_dir.join(&name);
            if destination.exists() {
                tracing::debug!("{} already present at {}", name, self.display(ctx, &destination));
                self.place_sidecar(rule, ctx, &candidates, &destination, outcome);
                continue;
            }
            if candidates.len() > 1 {
                self.check_ambiguity(ctx, &name, &candidates, outcome);
            }
            if let Some(placed) = self.place(ctx, &candidates, &destination, outcome) {
                self.place_sidecar(rule, ctx, &candidates[placed..], &destination, outcome);
            }
        }

        Ok(())
    }

    fn check_ambiguity(
        &self,
        ctx: &StepContext<'_>,
        name: &str,
        candidates: &[NormalizedPath],
        outcome: &mut StepOutcome,
    ) {
        let checksums: BTreeSet<String> = candidates
            .iter()
            .filter_map(|c| compute_file_checksum(c).ok())
            .collect();
        if checksums.len() > 1 {
            outcome.warn(format!(
                "{} candidates for {} differ in content; using {}",
                candidates.len(),
                name,
                self.display(ctx, &candidates[0])
            ));
        }
    }

    /// Copy the first candidate that succeeds. Returns its index.
    fn place(
        &self,
        ctx: &StepContext<'_>,
        candidates: &[NormalizedPath],
        destination: &NormalizedPath,
        outcome: &mut StepOutcome,
    ) -> Option<usize> {
        for (index, source) in candidates.iter().enumerate() {
            let description = format!(
                "{} -> {}",
                self.display(ctx, source),
                self.display(ctx, destination)
            );

            if ctx.dry_run {
                outcome.action(true, format!("copy {description}"));
                outcome.tally.files_relocated += 1;
                return Some(index);
            }

            match io::copy_if_absent(source, destination, ctx.robustness) {
                Ok(true) => {
                    outcome.action(false, format!("copied {description}"));
                    outcome.tally.files_relocated += 1;
                    return Some(index);
                }
                Ok(false) => return Some(index),
                Err(e) => outcome.fail(format!("could not copy {description}: {e}")),
            }
        }
        None
    }

    /// Copy the sidecar of the first candidate that has one, unless the
    /// destination sidecar already exists.
    fn place_sidecar(
        &self,
        rule: &RelocateRule,
        ctx: &StepContext<'_>,
        candidates: &[NormalizedPath],
        destination: &NormalizedPath,
        outcome: &mut StepOutcome,
    ) {
        let Some(suffix) = rule.sidecar_suffix.as_deref() else {
            return;
        };
        let to = with_suffix(destination, suffix);
        if to.exists() {
            return;
        }

        for source in candidates {
            let from = with_suffix(source, suffix);
            if !from.is_file() {
                continue;
            }
            let description = format!("{} -> {}", self.display(ctx, &from), self.display(ctx, &to));

            if ctx.dry_run {
                outcome.action(true, format!("copy sidecar {description}"));
                outcome.tally.sidecars_relocated += 1;
                return;
            }

            match io::copy_if_absent(&from, &to, ctx.robustness) {
                Ok(true) => {
                    outcome.action(false, format!("copied sidecar {description}"));
                    outcome.tally.sidecars_relocated += 1;
                    return;
                }
                Ok(false) => return,
                Err(e) => outcome.fail(format!("could not copy sidecar {description}: {e}")),
            }
        }
    }

    fn display(&self, ctx: &StepContext<'_>, path: &NormalizedPath) -> String {
        path.relative_to(ctx.root)
            .unwrap_or_else(|| path.to_string())
    }
}

fn with_suffix(path: &NormalizedPath, suffix: &str) -> NormalizedPath {
    NormalizedPath::new(format!("{}{}", path.as_str(), suffix))
}

impl RepairStep for BinaryRelocator {
    fn name(&self) -> &'static str {
        "relocate"
    }

    fn run(&self, ctx: &StepContext<'_>) -> Result<StepOutcome> {
        let mut outcome = StepOutcome::new(self.name());
        for rule in &self.rules {
            if let Err(e) = self.run_rule(rule, ctx, &mut outcome) {
                outcome.fail(format!("relocation into {} stopped: {e}", rule.target_dir));
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RepairConfig;
    use crate::host::DirectoryHost;
    use janitor_fs::RobustnessConfig;
    use std::fs;
    use tempfile::tempdir;

    fn rule(names: &[&str], extensions: &[&str]) -> RelocateRule {
        RelocateRule {
            search_root: String::new(),
            target_dir: "Plugins".to_string(),
            names: names.iter().map(|s| s.to_string()).collect(),
            extensions: extensions.iter().map(|s| s.to_string()).collect(),
            exclude: Vec::new(),
            sidecar_suffix: Some(".meta".to_string()),
        }
    }

    #[test]
    fn selects_by_exact_name_or_extension() {
        let by_name = rule(&["Foo.dll"], &[]);
        assert!(BinaryRelocator::selects(&by_name, "Foo.dll"));
        assert!(!BinaryRelocator::selects(&by_name, "foo.dll"));
        assert!(!BinaryRelocator::selects(&by_name, "Foo.dll.meta"));

        let by_ext = rule(&[], &["fbx", ".obj"]);
        assert!(BinaryRelocator::selects(&by_ext, "Rock.FBX"));
        assert!(BinaryRelocator::selects(&by_ext, "Tree.obj"));
        assert!(!BinaryRelocator::selects(&by_ext, "Rock.fbx.meta"));
    }

    #[test]
    fn failed_candidate_falls_back_to_the_next() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("B")).unwrap();
        fs::write(dir.path().join("B/Foo.dll"), "second").unwrap();
        fs::write(dir.path().join("B/Foo.dll.meta"), "meta").unwrap();

        let root = NormalizedPath::new(dir.path());
        let host = DirectoryHost::new(root.clone(), &RepairConfig::default()).unwrap();
        let ctx = StepContext {
            root: &root,
            dry_run: false,
            robustness: RobustnessConfig::no_retry(),
            host: &host,
        };
        // The first candidate vanished after the listing
        let candidates = vec![root.join("A/Foo.dll"), root.join("B/Foo.dll")];
        let destination = root.join("Plugins/Foo.dll");
        let relocator = BinaryRelocator::default();
        let mut outcome = StepOutcome::new("relocate");

        let placed = relocator.place(&ctx, &candidates, &destination, &mut outcome);
        assert_eq!(placed, Some(1));
        relocator.place_sidecar(&rule(&["Foo.dll"], &[]), &ctx, &candidates[1..], &destination, &mut outcome);

        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0].contains("A/Foo.dll"));
        assert_eq!(outcome.tally.files_relocated, 1);
        assert_eq!(outcome.tally.sidecars_relocated, 1);
        assert_eq!(fs::read_to_string(dir.path().join("Plugins/Foo.dll")).unwrap(), "second");
        assert_eq!(fs::read_to_string(dir.path().join("Plugins/Foo.dll.meta")).unwrap(), "meta");
    }
}
