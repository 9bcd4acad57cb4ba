//! Atomic I/O operations with file locking

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use fs2::FileExt;

use crate::{Error, NormalizedPath, Result};

/// Retry policy for filesystem calls that can fail transiently.
///
/// Extraction tools and editors may still hold a handle on a file when a
/// repair pass starts; rename and delete calls are retried for a bounded
/// time before the failure is reported.
#[derive(Debug, Clone, Copy)]
pub struct RobustnessConfig {
    /// First retry delay.
    pub initial_interval: Duration,
    /// Give up after this much total time. `None` disables retrying.
    pub max_elapsed: Option<Duration>,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(20),
            max_elapsed: Some(Duration::from_millis(500)),
        }
    }
}

impl RobustnessConfig {
    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            initial_interval: Duration::from_millis(0),
            max_elapsed: None,
        }
    }

    fn retry<T>(&self, mut op: impl FnMut() -> std::io::Result<T>) -> std::io::Result<T> {
        if self.max_elapsed.is_none() {
            return op();
        }
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_max_elapsed_time(self.max_elapsed)
            .build();

        backoff::retry(policy, || {
            op().map_err(|e| match e.kind() {
                ErrorKind::PermissionDenied | ErrorKind::Interrupted | ErrorKind::WouldBlock => {
                    tracing::debug!("Transient filesystem error, retrying: {}", e);
                    backoff::Error::transient(e)
                }
                _ => backoff::Error::permanent(e),
            })
        })
        .map_err(|e| match e {
            backoff::Error::Permanent(err) => err,
            backoff::Error::Transient { err, .. } => err,
        })
    }
}

fn temp_sibling(native_path: &Path) -> std::path::PathBuf {
    let temp_name = format!(
        ".{}.{}.tmp",
        native_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    native_path.with_file_name(temp_name)
}

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename strategy to prevent partial writes.
/// Acquires an advisory lock to prevent concurrent access.
pub fn write_atomic(path: &NormalizedPath, content: &[u8], config: RobustnessConfig) -> Result<()> {
    let native_path = path.to_native();

    if let Some(parent) = native_path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    // Same directory keeps the rename on one filesystem
    let temp_path = temp_sibling(&native_path);

    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;

    temp_file
        .lock_exclusive()
        .map_err(|_| Error::LockFailed {
            path: native_path.clone(),
        })?;

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(&temp_path, e))?;

    temp_file
        .sync_all()
        .map_err(|e| Error::io(&temp_path, e))?;

    temp_file.unlock().map_err(|_| Error::LockFailed {
        path: native_path.clone(),
    })?;
    drop(temp_file);

    if let Err(e) = config.retry(|| fs::rename(&temp_path, &native_path)) {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::io(&native_path, e));
    }

    Ok(())
}

/// Read text content from a file.
pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native_path = path.to_native();
    fs::read_to_string(&native_path).map_err(|e| Error::io(&native_path, e))
}

/// Write text content to a file atomically.
pub fn write_text(path: &NormalizedPath, content: &str) -> Result<()> {
    write_atomic(path, content.as_bytes(), RobustnessConfig::default())
}

/// Copy `source` to `destination` unless the destination already exists.
///
/// Returns `Ok(false)` without touching anything when the destination is
/// present. The copy lands under a temporary name first, so a failed copy
/// never leaves a truncated destination behind.
pub fn copy_if_absent(
    source: &NormalizedPath,
    destination: &NormalizedPath,
    config: RobustnessConfig,
) -> Result<bool> {
    let dest_native = destination.to_native();
    if dest_native.exists() {
        return Ok(false);
    }

    if let Some(parent) = dest_native.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let temp_path = temp_sibling(&dest_native);
    let src_native = source.to_native();
    tracing::debug!("Copying {} -> {}", source, destination);
    if let Err(e) = fs::copy(&src_native, &temp_path) {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::io(&src_native, e));
    }

    if let Err(e) = config.retry(|| fs::rename(&temp_path, &dest_native)) {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::io(&dest_native, e));
    }

    Ok(true)
}

/// Delete a file or a directory tree.
///
/// Returns `Ok(false)` when nothing exists at `path`.
pub fn remove_path(path: &NormalizedPath, config: RobustnessConfig) -> Result<bool> {
    let native_path = path.to_native();
    let metadata = match fs::symlink_metadata(&native_path) {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(Error::io(&native_path, e)),
    };

    let result = if metadata.is_dir() {
        config.retry(|| fs::remove_dir_all(&native_path))
    } else {
        config.retry(|| fs::remove_file(&native_path))
    };

    result.map(|_| true).map_err(|e| Error::io(&native_path, e))
}
