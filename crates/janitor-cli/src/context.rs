//! Project root and configuration resolution

use std::path::{Path, PathBuf};

use janitor_core::RepairConfig;
use janitor_fs::NormalizedPath;

use crate::error::{CliError, Result};

/// A resolved project: canonical root plus validated configuration
#[derive(Debug, Clone)]
pub struct ProjectContext {
    pub root: NormalizedPath,
    pub config: RepairConfig,
}

impl ProjectContext {
    /// Canonicalize `root` and load `config`, or `<root>/janitor.toml`
    pub fn resolve(root: &Path, config: Option<&PathBuf>) -> Result<Self> {
        let root = canonical_root(root)?;
        let config = match config {
            Some(path) => {
                let path = if path.is_absolute() {
                    NormalizedPath::new(path)
                } else {
                    NormalizedPath::new(std::env::current_dir()?.join(path))
                };
                RepairConfig::load(&path)?
            }
            None => RepairConfig::discover(&root)?,
        };
        Ok(Self { root, config })
    }
}

/// Canonical project root, without the `\\?\` prefix on Windows
pub fn canonical_root(root: &Path) -> Result<NormalizedPath> {
    let canonical = dunce::canonicalize(root).map_err(|e| {
        CliError::user(format!("Project root {} is not accessible: {e}", root.display()))
    })?;
    if !canonical.is_dir() {
        return Err(CliError::user(format!(
            "Project root {} is not a directory",
            canonical.display()
        )));
    }
    Ok(NormalizedPath::new(canonical))
}
