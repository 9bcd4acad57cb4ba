//! A freshly extracted project, before any repair.
//!
//! - `LibraryX/` is a superseded copy of a library and must be pruned
//! - `Foo.dll` and its sidecar landed at the root instead of
//!   `Plugins/LibraryX/`
//! - the manifest still declares `LibraryX`
//! - `Objects/Rock.json` lost its mesh reference; `Meshes/Rock.fbx` exists

use crate::tree::TestTree;

/// Configuration matching [`extracted_project`].
pub const CONFIG: &str = r#"prune = ["LibraryX"]

[[relocate]]
target_dir = "Plugins/LibraryX"
names = ["Foo.dll"]

[[patch]]
dir = "Plugins"
pattern = "*.dll.meta"
replacements = [
    { from = "isPredefined: 0", to = "isPredefined: 1" },
    { from = "validateReferences: 1", to = "validateReferences: 0" },
]

[manifest]
denylist = ["LibraryX"]

[assets.kinds]
mesh = ["fbx"]
"#;

pub const MANIFEST: &str = r#"{
  "dependencies": {
    "LibraryX": "1.0.0",
    "com.unity.ugui": "1.0.0"
  }
}
"#;

pub const FOO_META: &str = "fileFormatVersion: 2\nPluginImporter:\n  isPredefined: 0\n  validateReferences: 1\n";

pub const ROCK_OBJECT: &str = r#"{
  "name": "Rock",
  "slots": [
    { "kind": "mesh", "ref": "Meshes/Missing.fbx" }
  ]
}
"#;

/// Build the scenario tree, including `janitor.toml`.
pub fn extracted_project() -> TestTree {
    let tree = TestTree::new();
    tree.file("janitor.toml", CONFIG)
        .file("LibraryX/Runtime/LibraryX.cs", "// superseded copy")
        .file("Foo.dll", "MZ foo binary")
        .file("Foo.dll.meta", FOO_META)
        .file("Packages/manifest.json", MANIFEST)
        .file("Meshes/Rock.fbx", "mesh data")
        .file("Objects/Rock.json", ROCK_OBJECT);
    tree
}
