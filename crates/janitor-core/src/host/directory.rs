//! File-backed host
//!
//! Serves the CLI and the test suite. Assets are plain files classified by
//! extension; structured objects are JSON documents of the form
//!
//! ```json
//! { "name": "Rock", "slots": [ { "kind": "mesh", "ref": "Meshes/Rock.fbx" } ] }
//! ```
//!
//! where `ref` is a tree-relative path or `null`. A `ref` naming a file
//! that does not exist is a broken slot. Unknown members are preserved.

use std::cell::Cell;
use std::collections::BTreeMap;

use janitor_fs::walk;
use janitor_fs::{DocumentStore, Format, NormalizedPath};
use serde_json::Value;

use super::{AssetCandidate, AssetKind, Host, Slot, SlotState, StructuredObject};
use crate::config::RepairConfig;
use crate::steps::FilePattern;
use crate::{Error, Result};

/// Host backed by a directory tree
#[derive(Debug)]
pub struct DirectoryHost {
    root: NormalizedPath,
    kinds: BTreeMap<String, Vec<String>>,
    objects_dir: NormalizedPath,
    objects_pattern: FilePattern,
    busy_marker: Option<NormalizedPath>,
    store: DocumentStore,
    reconcile_requests: Cell<usize>,
}

impl DirectoryHost {
    pub fn new(root: NormalizedPath, config: &RepairConfig) -> Result<Self> {
        Ok(Self {
            objects_dir: root.join(&config.objects.dir),
            objects_pattern: FilePattern::from_glob(&config.objects.pattern)?,
            kinds: config.assets.kinds.clone(),
            root,
            busy_marker: None,
            store: DocumentStore::new(),
            reconcile_requests: Cell::new(0),
        })
    }

    /// Report busy while the file `marker` (tree-relative) exists
    pub fn with_busy_marker(mut self, marker: &str) -> Self {
        self.busy_marker = Some(self.root.join(marker));
        self
    }

    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    /// How many times a reconcile was requested
    pub fn reconcile_requests(&self) -> usize {
        self.reconcile_requests.get()
    }

    fn relative(&self, path: &NormalizedPath) -> NormalizedPath {
        match path.relative_to(&self.root) {
            Some(rel) => NormalizedPath::new(rel),
            None => path.clone(),
        }
    }

    fn read_document(&self, id: &NormalizedPath) -> Result<Value> {
        let value: Value = match self.store.load_as(&self.root.join(id.as_str()), Format::Json) {
            Ok(value) => value,
            Err(janitor_fs::Error::DocumentParse { message, .. }) => {
                return Err(Error::ObjectDocument {
                    path: id.to_string(),
                    message,
                });
            }
            Err(e) => return Err(e.into()),
        };
        if !value.is_object() {
            return Err(Error::ObjectDocument {
                path: id.to_string(),
                message: "root must be an object".to_string(),
            });
        }
        Ok(value)
    }
}

impl Host for DirectoryHost {
    fn is_busy(&self) -> bool {
        self.busy_marker.as_ref().is_some_and(|m| m.exists())
    }

    fn assets_of_kind(&self, kind: &AssetKind) -> Result<Vec<AssetCandidate>> {
        let Some(extensions) = self.kinds.get(kind.as_str()) else {
            return Ok(Vec::new());
        };
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let files = walk::list_files(&self.root, |path| {
            path.extension().is_some_and(|ext| {
                extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(ext))
            })
        })?;

        Ok(files
            .into_iter()
            .filter_map(|path| {
                let name = path.file_stem()?.to_string();
                Some(AssetCandidate {
                    kind: kind.clone(),
                    name,
                    path,
                })
            })
            .collect())
    }

    fn object_ids(&self) -> Result<Vec<NormalizedPath>> {
        if !self.objects_dir.is_dir() {
            return Ok(Vec::new());
        }
        let files = walk::list_files(&self.objects_dir, |path| {
            path.file_name().is_some_and(|name| self.objects_pattern.matches(name))
        })?;
        Ok(files
            .into_iter()
            .map(|path| self.relative(&self.objects_dir.join(path.as_str())))
            .collect())
    }

    fn load_object(&self, id: &NormalizedPath) -> Result<StructuredObject> {
        let document = self.read_document(id)?;
        let name = document
            .get("name")
            .and_then(Value::as_str)
            .or_else(|| id.file_stem())
            .unwrap_or_default()
            .to_string();

        let mut slots = Vec::new();
        if let Some(entries) = document.get("slots").and_then(Value::as_array) {
            for entry in entries {
                let kind = entry.get("kind").and_then(Value::as_str).ok_or_else(|| {
                    Error::ObjectDocument {
                        path: id.to_string(),
                        message: "slot without a kind".to_string(),
                    }
                })?;
                let state = match entry.get("ref").and_then(Value::as_str) {
                    None | Some("") => SlotState::Empty,
                    Some(target) => {
                        let target = NormalizedPath::new(target);
                        if self.root.join(target.as_str()).is_file() {
                            SlotState::Linked(target)
                        } else {
                            SlotState::Broken(target)
                        }
                    }
                };
                slots.push(Slot {
                    kind: AssetKind::new(kind),
                    state,
                });
            }
        }

        Ok(StructuredObject::new(id.clone(), name, slots))
    }

    fn save_object(&self, object: &StructuredObject) -> Result<()> {
        let mut document = self.read_document(&object.id)?;
        let Some(entries) = document.get_mut("slots").and_then(Value::as_array_mut) else {
            return Err(Error::ObjectDocument {
                path: object.id.to_string(),
                message: "document has no slots".to_string(),
            });
        };

        for (entry, slot) in entries.iter_mut().zip(&object.slots) {
            let SlotState::Linked(target) = &slot.state else {
                continue;
            };
            if let Some(map) = entry.as_object_mut() {
                map.insert("ref".to_string(), Value::String(target.to_string()));
            }
        }

        let path = self.root.join(object.id.as_str());
        if self.store.save_as(&path, Format::Json, &document)? {
            tracing::debug!("Saved object {}", object.id);
        }
        Ok(())
    }

    fn request_reconcile(&self) -> Result<()> {
        self.reconcile_requests.set(self.reconcile_requests.get() + 1);
        tracing::info!("Tree at {} changed; host reconcile requested", self.root);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn host_for(dir: &std::path::Path) -> DirectoryHost {
        let mut config = RepairConfig::default();
        config
            .assets
            .kinds
            .insert("mesh".to_string(), vec!["fbx".to_string(), "obj".to_string()]);
        DirectoryHost::new(NormalizedPath::new(dir), &config).unwrap()
    }

    #[test]
    fn assets_are_classified_by_extension() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Meshes")).unwrap();
        fs::write(dir.path().join("Meshes/Rock.FBX"), "m").unwrap();
        fs::write(dir.path().join("Meshes/Rock.fbx.meta"), "meta").unwrap();
        fs::write(dir.path().join("Meshes/Tree.obj"), "m").unwrap();

        let host = host_for(dir.path());
        let assets = host.assets_of_kind(&AssetKind::new("mesh")).unwrap();
        let names: Vec<&str> = assets.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Rock", "Tree"]);
        assert_eq!(assets[0].path, NormalizedPath::new("Meshes/Rock.FBX"));

        assert!(host.assets_of_kind(&AssetKind::new("material")).unwrap().is_empty());
    }

    #[test]
    fn load_classifies_slots_and_save_keeps_extra_members() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Objects")).unwrap();
        fs::create_dir_all(dir.path().join("Meshes")).unwrap();
        fs::write(dir.path().join("Meshes/Rock.fbx"), "m").unwrap();
        fs::write(
            dir.path().join("Objects/Rock.json"),
            r#"{"name":"Rock","layer":4,"slots":[{"kind":"mesh","ref":"Meshes/Gone.fbx"},{"kind":"mesh","ref":null}]}"#,
        )
        .unwrap();

        let host = host_for(dir.path());
        let ids = host.object_ids().unwrap();
        assert_eq!(ids, vec![NormalizedPath::new("Objects/Rock.json")]);

        let mut object = host.load_object(&ids[0]).unwrap();
        assert_eq!(
            object.slots[0].state,
            SlotState::Broken(NormalizedPath::new("Meshes/Gone.fbx"))
        );
        assert_eq!(object.slots[1].state, SlotState::Empty);

        object.link(1, NormalizedPath::new("Meshes/Rock.fbx"));
        host.save_object(&object).unwrap();

        let reloaded = host.load_object(&ids[0]).unwrap();
        assert_eq!(
            reloaded.slots[1].state,
            SlotState::Linked(NormalizedPath::new("Meshes/Rock.fbx"))
        );
        let raw = fs::read_to_string(dir.path().join("Objects/Rock.json")).unwrap();
        assert!(raw.contains("\"layer\": 4"));
    }

    #[test]
    fn busy_marker_and_reconcile_counter() {
        let dir = tempdir().unwrap();
        let host = host_for(dir.path()).with_busy_marker("Temp/busy");
        assert!(!host.is_busy());

        fs::create_dir_all(dir.path().join("Temp")).unwrap();
        fs::write(dir.path().join("Temp/busy"), "").unwrap();
        assert!(host.is_busy());

        host.request_reconcile().unwrap();
        assert_eq!(host.reconcile_requests(), 1);
    }
}
