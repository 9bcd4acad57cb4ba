//! [`TestTree`] builder for repair scenarios.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

use tempfile::TempDir;
use walkdir::WalkDir;

/// Every file under a tree, keyed by forward-slash relative path, with its
/// length and modification time.
pub type Snapshot = BTreeMap<String, (u64, SystemTime)>;

/// A temporary project tree with helpers for setup and assertion.
///
/// # Example
///
/// ```rust,no_run
/// use janitor_test_utils::TestTree;
///
/// let tree = TestTree::new();
/// tree.file("LibraryX/readme.txt", "old copy");
/// tree.assert_exists("LibraryX/readme.txt");
/// ```
pub struct TestTree {
    temp_dir: TempDir,
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TestTree {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `content` to `path`, creating parent directories.
    pub fn file(&self, path: &str, content: &str) -> &Self {
        let full_path = self.root().join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&full_path, content).unwrap();
        self
    }

    pub fn dir(&self, path: &str) -> &Self {
        fs::create_dir_all(self.root().join(path)).unwrap();
        self
    }

    pub fn read(&self, path: &str) -> String {
        let full_path = self.root().join(path);
        fs::read_to_string(&full_path)
            .unwrap_or_else(|_| panic!("Could not read file: {}", full_path.display()))
    }

    pub fn exists(&self, path: &str) -> bool {
        self.root().join(path).exists()
    }

    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            full_path.exists(),
            "Expected path to exist: {}",
            full_path.display()
        );
    }

    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_missing(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            !full_path.exists(),
            "Expected path NOT to exist: {}",
            full_path.display()
        );
    }

    /// Modification time of the file at `path`.
    pub fn mtime(&self, path: &str) -> SystemTime {
        fs::metadata(self.root().join(path))
            .and_then(|m| m.modified())
            .unwrap()
    }

    /// Record every file in the tree.
    ///
    /// Two equal snapshots mean nothing was created, deleted, resized, or
    /// rewritten in between.
    pub fn snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot::new();
        for entry in WalkDir::new(self.root()) {
            let entry = entry.unwrap();
            if !entry.file_type().is_file() {
                continue;
            }
            let metadata = entry.metadata().unwrap();
            let relative = entry
                .path()
                .strip_prefix(self.root())
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/");
            snapshot.insert(relative, (metadata.len(), metadata.modified().unwrap()));
        }
        snapshot
    }
}
