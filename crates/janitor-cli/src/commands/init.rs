//! Init command implementation

use std::path::Path;

use colored::Colorize;
use janitor_core::config::{CONFIG_FILE, TEMPLATE};
use janitor_fs::io;

use crate::context::canonical_root;
use crate::error::{CliError, Result};

/// Write the commented default configuration into `root`
pub fn run_init(root: &Path, force: bool) -> Result<()> {
    let root = canonical_root(root)?;
    let path = root.join(CONFIG_FILE);

    if path.exists() && !force {
        return Err(CliError::user(format!(
            "{} already exists (use --force to overwrite)",
            path
        )));
    }

    io::write_text(&path, TEMPLATE)?;
    println!("{} Wrote {}", "OK".green().bold(), path.as_str().cyan());
    Ok(())
}
