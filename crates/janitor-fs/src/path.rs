//! Normalized path handling for cross-platform compatibility

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A path normalized to use forward slashes internally.
///
/// Extraction output routinely mixes separator styles, so every path that
/// enters the repair pipeline is normalized once and converted back to a
/// platform-native form only at I/O boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct NormalizedPath {
    /// Internal representation always uses forward slashes
    inner: String,
}

impl NormalizedPath {
    /// Create a new NormalizedPath from any path-like input.
    ///
    /// Converts backslashes to forward slashes and drops a trailing slash.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path_str = path.as_ref().to_string_lossy();
        let mut normalized = path_str.replace('\\', "/");
        while normalized.len() > 1 && normalized.ends_with('/') {
            normalized.pop();
        }
        Self { inner: normalized }
    }

    /// Get the internal normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Convert to a platform-native PathBuf for I/O operations.
    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    /// Join this path with a segment.
    pub fn join(&self, segment: &str) -> Self {
        let segment_normalized = segment.replace('\\', "/");
        let segment_normalized = segment_normalized.trim_matches('/');
        if segment_normalized.is_empty() {
            return self.clone();
        }
        let joined = if self.inner.is_empty() {
            segment_normalized.to_string()
        } else if self.inner.ends_with('/') {
            format!("{}{}", self.inner, segment_normalized)
        } else {
            format!("{}/{}", self.inner, segment_normalized)
        };
        Self { inner: joined }
    }

    /// Get the parent directory.
    pub fn parent(&self) -> Option<Self> {
        let trimmed = self.inner.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(idx) if idx > 0 => Some(Self {
                inner: trimmed[..idx].to_string(),
            }),
            Some(0) => Some(Self {
                inner: "/".to_string(),
            }),
            _ => None,
        }
    }

    /// Get the file name component.
    pub fn file_name(&self) -> Option<&str> {
        let trimmed = self.inner.trim_end_matches('/');
        trimmed.rsplit('/').next().filter(|name| !name.is_empty())
    }

    /// Get the file name without its final extension.
    pub fn file_stem(&self) -> Option<&str> {
        let name = self.file_name()?;
        match name.rfind('.') {
            Some(idx) if idx > 0 => Some(&name[..idx]),
            _ => Some(name),
        }
    }

    /// Get the extension if present.
    pub fn extension(&self) -> Option<&str> {
        self.file_name().and_then(|name| {
            let idx = name.rfind('.')?;
            if idx == 0 {
                None
            } else {
                Some(&name[idx + 1..])
            }
        })
    }

    /// Number of non-empty components.
    pub fn depth(&self) -> usize {
        self.inner.split('/').filter(|c| !c.is_empty()).count()
    }

    /// True if `self` equals `dir` or lies underneath it.
    ///
    /// Compares whole components, so `Plugins/Foo2` is not under `Plugins/Foo`.
    pub fn is_within(&self, dir: &NormalizedPath) -> bool {
        let dir = dir.inner.trim_end_matches('/');
        if dir.is_empty() {
            return true;
        }
        self.inner == dir
            || (self.inner.starts_with(dir) && self.inner[dir.len()..].starts_with('/'))
    }

    /// Path of `self` relative to `base`, or `None` if `self` is not within it.
    pub fn relative_to(&self, base: &NormalizedPath) -> Option<String> {
        if !self.is_within(base) {
            return None;
        }
        let base = base.inner.trim_end_matches('/');
        Some(self.inner[base.len()..].trim_start_matches('/').to_string())
    }

    /// Check if this path exists on the filesystem.
    pub fn exists(&self) -> bool {
        self.to_native().exists()
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.to_native().is_dir()
    }

    /// Check if this is a file.
    pub fn is_file(&self) -> bool {
        self.to_native().is_file()
    }
}

/// Validate a configured tree-relative path.
///
/// Rejects absolute paths, drive prefixes, and `..` components so a
/// configuration can never reach outside the project tree.
pub fn validate_relative(path: &str) -> std::result::Result<(), String> {
    let normalized = path.replace('\\', "/");
    if normalized.trim().is_empty() {
        return Err("path is empty".to_string());
    }
    if normalized.starts_with('/') {
        return Err(format!("'{path}' is absolute"));
    }
    if normalized.len() >= 2 && normalized.as_bytes()[1] == b':' {
        return Err(format!("'{path}' has a drive prefix"));
    }
    if normalized.split('/').any(|c| c == "..") {
        return Err(format!("'{path}' escapes the tree root"));
    }
    Ok(())
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<&str> for NormalizedPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NormalizedPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<NormalizedPath> for String {
    fn from(p: NormalizedPath) -> Self {
        p.inner
    }
}

impl From<PathBuf> for NormalizedPath {
    fn from(p: PathBuf) -> Self {
        Self::new(p)
    }
}

impl From<&Path> for NormalizedPath {
    fn from(p: &Path) -> Self {
        Self::new(p)
    }
}
