//! Recursive tree walking
//!
//! All listings come back in sorted order so that every consumer of the
//! tree (relocation tie-breaks, index construction) is deterministic.

use walkdir::WalkDir;

use crate::{NormalizedPath, Result};

/// Count the regular files under `root`, recursively.
///
/// Symlinks are not followed. Any unreadable entry fails the whole count;
/// callers polling an in-flight extraction retry on the next tick.
pub fn count_files(root: &NormalizedPath) -> Result<usize> {
    let mut count = 0;
    for entry in WalkDir::new(root.to_native()).follow_links(false) {
        if entry?.file_type().is_file() {
            count += 1;
        }
    }
    Ok(count)
}

/// List the regular files under `root` for which `keep` returns true.
///
/// `keep` receives the path relative to `root`. Results are sorted by
/// relative path.
pub fn list_files(
    root: &NormalizedPath,
    mut keep: impl FnMut(&NormalizedPath) -> bool,
) -> Result<Vec<NormalizedPath>> {
    let native_root = root.to_native();
    let mut files = Vec::new();

    for entry in WalkDir::new(&native_root)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(&native_root)
            .unwrap_or(entry.path());
        let relative = NormalizedPath::new(relative);
        if keep(&relative) {
            files.push(relative);
        }
    }

    files.sort();
    Ok(files)
}
