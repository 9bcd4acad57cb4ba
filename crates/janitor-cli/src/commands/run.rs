//! Run command implementation
//!
//! One explicit repair pass. The command is the host's `RunRepair()`:
//! each invocation is its own session, so the pipeline always runs.

use std::path::{Path, PathBuf};

use colored::Colorize;
use janitor_core::{DirectoryHost, PipelineOptions, RepairPipeline, RepairReport, RepairSession};

use crate::context::ProjectContext;
use crate::error::Result;

pub fn run_repair(root: &Path, config: Option<&PathBuf>, dry_run: bool, json: bool) -> Result<()> {
    let ctx = ProjectContext::resolve(root, config)?;
    let host = DirectoryHost::new(ctx.root.clone(), &ctx.config)?;
    let pipeline = RepairPipeline::from_config(ctx.root.clone(), &ctx.config);
    let mut session = RepairSession::new(pipeline, host).with_options(PipelineOptions { dry_run });

    if !json {
        println!(
            "{} Repairing {}{}",
            "=>".blue().bold(),
            ctx.root.as_str().cyan(),
            if dry_run { " (dry run)" } else { "" }
        );
    }

    let Some(report) = session.run_repair(true) else {
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

/// Human-readable report, shared with `watch`
pub fn print_report(report: &RepairReport) {
    for step in &report.steps {
        if step.actions.is_empty() && step.warnings.is_empty() && step.failures.is_empty() {
            continue;
        }
        println!("{} {}", "::".blue(), step.step.bold());
        for action in &step.actions {
            println!("   {} {}", "+".green(), action);
        }
        for warning in &step.warnings {
            println!("   {} {}", "!".yellow(), warning);
        }
        for failure in &step.failures {
            println!("   {} {}", "x".red(), failure);
        }
        for preview in &step.previews {
            for line in preview.lines() {
                let colored = if line.starts_with('+') && !line.starts_with("+++") {
                    line.green()
                } else if line.starts_with('-') && !line.starts_with("---") {
                    line.red()
                } else {
                    line.normal()
                };
                println!("   {colored}");
            }
        }
    }

    for error in &report.errors {
        println!("{} {}", "ERROR".red().bold(), error);
    }

    let total = report.summary.total();
    if total == 0 {
        println!("{} Nothing to repair.", "OK".green().bold());
    } else if report.dry_run {
        println!(
            "{} {} change(s) planned. Run without {} to apply.",
            "DRY RUN".yellow().bold(),
            total,
            "--dry-run".cyan()
        );
    } else {
        println!("{} Applied {} change(s).", "OK".green().bold(), total);
    }

    let s = &report.summary;
    println!(
        "   pruned {}, relocated {} (+{} sidecars), patched {}, manifest -{}/+{}, descriptors {}, relinked {}",
        s.paths_pruned,
        s.files_relocated,
        s.sidecars_relocated,
        s.metadata_files_patched,
        s.manifest_entries_removed,
        s.manifest_entries_inserted,
        s.descriptors_written,
        s.slots_relinked
    );
}
