//! Repair configuration parsed from `janitor.toml`
//!
//! Every list here is empty by default: which folders are superseded,
//! which binaries need relocating, and which packages conflict is
//! project-specific knowledge supplied by the user.

use std::collections::BTreeMap;

use janitor_content::{EditMode, ManifestEdit};
use janitor_fs::path::validate_relative;
use janitor_fs::{DocumentStore, NormalizedPath};
use serde::{Deserialize, Serialize};

use crate::index::TieBreak;
use crate::session::AutoRepairPolicy;
use crate::steps::FilePattern;
use crate::{Error, Result};

/// Default config file name, looked up at the tree root
pub const CONFIG_FILE: &str = "janitor.toml";

/// Quiescence watcher settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Directory the extraction tool writes into, relative to the root
    pub source: String,
    /// File count must hold still this long before repair runs
    pub stable_after_ms: u64,
    /// Delay between polls in `janitor watch`
    pub poll_interval_ms: u64,
    /// Keep watching after firing instead of disarming
    pub rearm: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            source: "AssetRipperOutput".to_string(),
            stable_after_ms: 4000,
            poll_interval_ms: 500,
            rearm: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub auto_repair: AutoRepairPolicy,
}

/// Copy named binaries (and their sidecars) into one canonical directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocateRule {
    /// Search root relative to the tree root; empty means the tree root
    #[serde(default)]
    pub search_root: String,
    /// Canonical directory, relative to the tree root
    pub target_dir: String,
    /// Exact file names to relocate
    #[serde(default)]
    pub names: Vec<String>,
    /// File extensions to relocate, without the dot
    #[serde(default)]
    pub extensions: Vec<String>,
    /// Tree-relative prefixes never searched
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Sidecar suffix copied alongside each file
    #[serde(default = "default_sidecar_suffix")]
    pub sidecar_suffix: Option<String>,
}

fn default_sidecar_suffix() -> Option<String> {
    Some(".meta".to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    pub from: String,
    pub to: String,
}

/// Rewrite tokens inside sidecar metadata files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchRule {
    pub dir: String,
    /// File-name glob, e.g. `*.dll.meta`
    pub pattern: String,
    pub replacements: Vec<Replacement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestConfig {
    #[serde(default = "default_manifest_path")]
    pub path: String,
    #[serde(default)]
    pub mode: EditMode,
    #[serde(flatten)]
    pub edit: ManifestEdit,
}

fn default_manifest_path() -> String {
    "Packages/manifest.json".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorEntry {
    pub name: String,
    #[serde(default)]
    pub references: Vec<String>,
}

/// Generated assembly descriptor files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorConfig {
    /// Parent directory holding one folder per entry
    pub dir: String,
    #[serde(default = "default_descriptor_extension")]
    pub extension: String,
    /// Create missing entry folders instead of skipping them
    #[serde(default)]
    pub create_dirs: bool,
    #[serde(default)]
    pub entries: Vec<DescriptorEntry>,
}

fn default_descriptor_extension() -> String {
    "asmdef".to_string()
}

/// Which files count as relink candidates, per asset kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Asset kind -> file extensions (without the dot)
    pub kinds: BTreeMap<String, Vec<String>>,
    pub tie_break: TieBreak,
}

/// Where the host keeps structured object documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectsConfig {
    pub dir: String,
    pub pattern: String,
}

impl Default for ObjectsConfig {
    fn default() -> Self {
        Self {
            dir: "Objects".to_string(),
            pattern: "*.json".to_string(),
        }
    }
}

/// Full repair configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    pub watch: WatchConfig,
    pub session: SessionConfig,
    /// Tree-relative paths deleted when present
    pub prune: Vec<String>,
    pub relocate: Vec<RelocateRule>,
    pub patch: Vec<PatchRule>,
    pub manifest: Option<ManifestConfig>,
    pub descriptors: Option<DescriptorConfig>,
    pub assets: AssetsConfig,
    pub objects: ObjectsConfig,
}

impl RepairConfig {
    /// Parse and validate a TOML configuration
    pub fn parse(content: &str) -> Result<Self> {
        let config: RepairConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file in any supported format
    pub fn load(path: &NormalizedPath) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::ConfigNotFound {
                path: path.to_native(),
            });
        }
        let config: RepairConfig = DocumentStore::new().load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `<root>/janitor.toml`, or the defaults when it is absent
    pub fn discover(root: &NormalizedPath) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if path.is_file() {
            Self::load(&path)
        } else {
            tracing::debug!("No {} under {}; using defaults", CONFIG_FILE, root);
            Ok(Self::default())
        }
    }

    /// Reject settings that would escape the tree or never converge
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();
        let mut check_path = |what: &str, path: &str, allow_empty: bool| {
            if allow_empty && path.is_empty() {
                return;
            }
            if let Err(e) = validate_relative(path) {
                problems.push(format!("{what}: {e}"));
            }
        };

        check_path("watch.source", &self.watch.source, false);
        for path in &self.prune {
            check_path("prune", path, false);
        }
        for rule in &self.relocate {
            check_path("relocate.search_root", &rule.search_root, true);
            check_path("relocate.target_dir", &rule.target_dir, false);
            for exclude in &rule.exclude {
                check_path("relocate.exclude", exclude, false);
            }
        }
        for rule in &self.patch {
            check_path("patch.dir", &rule.dir, false);
        }
        if let Some(manifest) = &self.manifest {
            check_path("manifest.path", &manifest.path, false);
        }
        if let Some(descriptors) = &self.descriptors {
            check_path("descriptors.dir", &descriptors.dir, false);
        }
        check_path("objects.dir", &self.objects.dir, false);

        if self.watch.stable_after_ms == 0 {
            problems.push("watch.stable_after_ms must be greater than zero".to_string());
        }
        if self.watch.poll_interval_ms == 0 {
            problems.push("watch.poll_interval_ms must be greater than zero".to_string());
        }

        for rule in &self.relocate {
            if rule.names.is_empty() && rule.extensions.is_empty() {
                problems.push(format!(
                    "relocate rule for '{}' selects no files (set names or extensions)",
                    rule.target_dir
                ));
            }
        }

        for rule in &self.patch {
            if let Err(e) = FilePattern::from_glob(&rule.pattern) {
                problems.push(format!("patch.pattern '{}': {e}", rule.pattern));
            }
            for replacement in &rule.replacements {
                if replacement.from.is_empty() {
                    problems.push(format!("patch rule for '{}' has an empty token", rule.dir));
                    continue;
                }
                if replacement.to.contains(&replacement.from) {
                    problems.push(format!(
                        "replacement '{}' -> '{}' would apply again on every run",
                        replacement.from, replacement.to
                    ));
                }
                // A token produced by one replacement must not feed another
                for other in &rule.replacements {
                    if std::ptr::eq(other, replacement) || other.from.is_empty() {
                        continue;
                    }
                    if replacement.to.contains(&other.from) {
                        problems.push(format!(
                            "replacement '{}' -> '{}' produces '{}', which another replacement rewrites",
                            replacement.from, replacement.to, other.from
                        ));
                    }
                }
            }
        }

        if let Some(manifest) = &self.manifest {
            for ensure in &manifest.edit.ensure {
                if manifest.edit.is_denied(&ensure.line) {
                    problems.push(format!(
                        "manifest ensure line '{}' matches the denylist",
                        ensure.line.trim()
                    ));
                }
            }
        }

        if let Err(e) = FilePattern::from_glob(&self.objects.pattern) {
            problems.push(format!("objects.pattern '{}': {e}", self.objects.pattern));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::ConfigInvalid { problems })
        }
    }
}

/// Commented starter configuration written by `janitor init`
pub const TEMPLATE: &str = r#"# Tree Janitor configuration
#
# All paths are relative to the project root.

prune = [
    # "Assets/TutorialInfo",
]

[watch]
source = "AssetRipperOutput"
stable_after_ms = 4000
poll_interval_ms = 500
rearm = false

[session]
# "off", "once-per-session", or "every-load"
auto_repair = "once-per-session"

# [[relocate]]
# target_dir = "Assets/Plugins/DOTween"
# names = ["DOTween.dll", "DOTweenPro.dll"]

# [[patch]]
# dir = "Assets/Plugins"
# pattern = "*.dll.meta"
# replacements = [
#     { from = "isPredefined: 0", to = "isPredefined: 1" },
#     { from = "validateReferences: 1", to = "validateReferences: 0" },
# ]

# [manifest]
# path = "Packages/manifest.json"
# mode = "auto"
# denylist = ["com.unity.render-pipelines.universal"]

[assets]
tie_break = "shortest-path"

[assets.kinds]
# mesh = ["fbx", "obj", "asset"]
# material = ["mat"]

[objects]
dir = "Objects"
pattern = "*.json"
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn template_parses_and_validates() {
        let config = RepairConfig::parse(TEMPLATE).unwrap();
        assert_eq!(config.watch, WatchConfig::default());
        assert_eq!(config.session.auto_repair, AutoRepairPolicy::OncePerSession);
        assert!(config.prune.is_empty());
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = RepairConfig::parse("").unwrap();
        assert_eq!(config, RepairConfig::default());
    }

    #[test]
    fn manifest_edit_fields_are_flattened() {
        let config = RepairConfig::parse(
            r#"
[manifest]
denylist = ["LibraryX"]
ensure = [{ line = "\"com.a\": \"1.0.0\",", after = "\"dependencies\"" }]
"#,
        )
        .unwrap();
        let manifest = config.manifest.unwrap();
        assert_eq!(manifest.path, "Packages/manifest.json");
        assert_eq!(manifest.mode, EditMode::Auto);
        assert_eq!(manifest.edit.denylist, vec!["LibraryX".to_string()]);
        assert_eq!(manifest.edit.ensure.len(), 1);
    }

    #[test]
    fn relocate_rule_defaults_to_meta_sidecar() {
        let config = RepairConfig::parse(
            r#"
[[relocate]]
target_dir = "Plugins/LibraryX"
names = ["Foo.dll"]
"#,
        )
        .unwrap();
        assert_eq!(config.relocate[0].sidecar_suffix.as_deref(), Some(".meta"));
        assert_eq!(config.relocate[0].search_root, "");
    }

    #[test]
    fn validate_collects_every_problem() {
        let err = RepairConfig::parse(
            r#"
prune = ["../outside"]

[[relocate]]
target_dir = "/abs"

[[patch]]
dir = "Plugins"
pattern = "*.meta"
replacements = [{ from = "a", to = "aa" }]
"#,
        )
        .unwrap_err();

        let Error::ConfigInvalid { problems } = err else {
            panic!("expected ConfigInvalid, got {err:?}");
        };
        assert_eq!(problems.len(), 4);
    }
}
