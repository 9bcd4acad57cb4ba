//! Watch command implementation
//!
//! Plays the host's part: a load notification at startup, then idle
//! ticks until the extraction output settles and the repair fires. A
//! rearming watcher never reaches `Stable`, so the loop then only ends on
//! `--max-polls` or an interrupt.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use colored::Colorize;
use janitor_core::{
    DirectoryHost, PipelineOptions, QuiescenceWatcher, RepairPipeline, RepairSession, WatcherState,
};

use super::run::print_report;
use crate::context::ProjectContext;
use crate::error::Result;

pub fn run_watch(
    root: &Path,
    config: Option<&PathBuf>,
    dry_run: bool,
    max_polls: Option<u64>,
) -> Result<()> {
    let ctx = ProjectContext::resolve(root, config)?;
    let watch = &ctx.config.watch;
    let host = DirectoryHost::new(ctx.root.clone(), &ctx.config)?;
    let pipeline = RepairPipeline::from_config(ctx.root.clone(), &ctx.config);
    let watcher = QuiescenceWatcher::from_config(&ctx.root, watch);

    println!(
        "{} Watching {} (stable after {} ms)",
        "=>".blue().bold(),
        watcher.source().as_str().cyan(),
        watch.stable_after_ms
    );

    let mut session = RepairSession::new(pipeline, host)
        .with_watcher(watcher)
        .with_policy(ctx.config.session.auto_repair)
        .with_options(PipelineOptions { dry_run });

    if let Some(report) = session.on_host_load() {
        print_report(&report);
    }

    let interval = Duration::from_millis(watch.poll_interval_ms);
    let mut polls: u64 = 0;
    loop {
        if let Some(report) = session.tick(Instant::now()) {
            print_report(&report);
            if watch.rearm {
                println!("{} Watching for the next extraction...", "=>".blue().bold());
            }
        }
        polls += 1;

        if session
            .watcher()
            .is_some_and(|w| w.state() == WatcherState::Stable)
        {
            break;
        }
        if max_polls.is_some_and(|max| polls >= max) {
            println!(
                "{} Stopped after {} poll(s) without a stable tree.",
                "WAIT".yellow().bold(),
                polls
            );
            break;
        }
        std::thread::sleep(interval);
    }

    Ok(())
}
