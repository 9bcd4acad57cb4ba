//! Repair session: one-shot guard, auto-repair policy, and watcher
//!
//! A session lives as long as the host process. It owns the watcher state
//! and the "already repaired" guard, so repeated idle ticks and repeated
//! load notifications cannot trigger overlapping or redundant runs.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::host::Host;
use crate::pipeline::{PipelineOptions, RepairPipeline, RepairReport};
use crate::watcher::{PollOutcome, QuiescenceWatcher};

/// When a host load triggers a repair on its own
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutoRepairPolicy {
    /// Only explicit commands and the watcher repair
    Off,
    /// The first load in a session repairs
    #[default]
    OncePerSession,
    /// Every load repairs
    EveryLoad,
}

pub struct RepairSession<H: Host> {
    pipeline: RepairPipeline,
    host: H,
    watcher: Option<QuiescenceWatcher>,
    policy: AutoRepairPolicy,
    options: PipelineOptions,
    completed: bool,
}

impl<H: Host> RepairSession<H> {
    pub fn new(pipeline: RepairPipeline, host: H) -> Self {
        Self {
            pipeline,
            host,
            watcher: None,
            policy: AutoRepairPolicy::default(),
            options: PipelineOptions::default(),
            completed: false,
        }
    }

    pub fn with_watcher(mut self, watcher: QuiescenceWatcher) -> Self {
        self.watcher = Some(watcher);
        self
    }

    pub fn with_policy(mut self, policy: AutoRepairPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn watcher(&self) -> Option<&QuiescenceWatcher> {
        self.watcher.as_ref()
    }

    /// True once a non-dry run has completed in this session
    pub fn has_run(&self) -> bool {
        self.completed
    }

    /// Run the pipeline unless it already ran this session.
    ///
    /// `force` bypasses the guard. Dry runs never set it.
    pub fn run_repair(&mut self, force: bool) -> Option<RepairReport> {
        if self.completed && !force {
            tracing::debug!("Repair already ran this session; skipping");
            return None;
        }
        let report = self.pipeline.apply(&self.host, self.options);
        if !self.options.dry_run {
            self.completed = true;
        }
        Some(report)
    }

    /// Notify the session that the host finished loading
    pub fn on_host_load(&mut self) -> Option<RepairReport> {
        match self.policy {
            AutoRepairPolicy::Off => None,
            AutoRepairPolicy::OncePerSession => self.run_repair(false),
            AutoRepairPolicy::EveryLoad => self.run_repair(true),
        }
    }

    /// One cooperative idle tick: poll the watcher and repair when the
    /// extraction output has settled
    pub fn tick(&mut self, now: Instant) -> Option<RepairReport> {
        if self.host.is_busy() {
            tracing::debug!("Host busy; skipping watcher tick");
            return None;
        }
        let watcher = self.watcher.as_mut()?;
        match watcher.poll(now) {
            PollOutcome::Fire { file_count } => {
                tracing::info!("Extraction output settled at {} file(s); repairing", file_count);
                // A settled extraction is new work, whatever ran before it
                self.completed = false;
                self.run_repair(false)
            }
            PollOutcome::Absent | PollOutcome::Waiting | PollOutcome::Disarmed => None,
        }
    }
}
