//! Scan command implementation

use std::path::{Path, PathBuf};

use colored::Colorize;
use janitor_core::{AssetIndex, AssetKind, DirectoryHost, ReferenceRelinker, SlotState};

use crate::context::ProjectContext;
use crate::error::Result;

/// Report empty and broken slots, and what relinking would assign
pub fn run_scan(root: &Path, config: Option<&PathBuf>, json: bool) -> Result<()> {
    let ctx = ProjectContext::resolve(root, config)?;
    let host = DirectoryHost::new(ctx.root.clone(), &ctx.config)?;

    let kinds: Vec<AssetKind> = ctx.config.assets.kinds.keys().map(|k| AssetKind::new(k.as_str())).collect();
    let index = AssetIndex::build(&host, &kinds, ctx.config.assets.tie_break)?;
    let relinker = ReferenceRelinker::new(index);
    let missing = relinker.scan(&host)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&missing)?);
        return Ok(());
    }

    println!("{} Scanning objects under {}...", "=>".blue().bold(), ctx.root.as_str().cyan());

    for ambiguity in relinker.index().ambiguities() {
        println!("   {} {}", "!".yellow(), ambiguity);
    }

    if missing.is_empty() {
        println!("{} No missing references.", "OK".green().bold());
        return Ok(());
    }

    for entry in &missing {
        let state = match &entry.state {
            SlotState::Empty => "empty".to_string(),
            SlotState::Broken(target) => format!("broken ({target})"),
            SlotState::Linked(target) => target.to_string(),
        };
        let resolution = match &entry.resolvable {
            Some(path) => format!("-> {}", path).green(),
            None => "no match".dimmed(),
        };
        println!(
            "   {} {} [{}] slot {} ({}): {} {}",
            "-".yellow(),
            entry.object.as_str().cyan(),
            entry.object_name,
            entry.slot,
            entry.kind.as_str().dimmed(),
            state,
            resolution
        );
    }

    let resolvable = missing.iter().filter(|m| m.resolvable.is_some()).count();
    println!();
    println!(
        "{} {} missing reference(s), {} resolvable. Run {} to relink.",
        "MISSING".yellow().bold(),
        missing.len(),
        resolvable,
        "janitor run".cyan()
    );
    Ok(())
}
