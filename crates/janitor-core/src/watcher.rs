//! Quiescence detection over an extraction output directory
//!
//! The watcher counts files under its source directory on each poll and
//! fires once the count has held still for the stability threshold. The
//! threshold is a debounce, not a deadline: a tree that never settles
//! never fires.

use std::time::{Duration, Instant};

use janitor_fs::{walk, NormalizedPath};
use serde::{Deserialize, Serialize};

use crate::config::WatchConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatcherState {
    /// Not yet observing, or re-armed after firing
    Idle,
    /// Counting files and waiting for the count to settle
    Observing,
    /// Fired; consumed until reset
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The source directory does not exist
    Absent,
    Waiting,
    /// The tree just became stable; run the repair
    Fire { file_count: usize },
    /// Already fired and not re-armed
    Disarmed,
}

#[derive(Debug, Clone)]
pub struct QuiescenceWatcher {
    source: NormalizedPath,
    threshold: Duration,
    rearm: bool,
    state: WatcherState,
    last_count: Option<usize>,
    last_changed: Option<Instant>,
    disarmed: bool,
}

impl QuiescenceWatcher {
    pub fn new(source: NormalizedPath, threshold: Duration) -> Self {
        Self {
            source,
            threshold,
            rearm: false,
            state: WatcherState::Idle,
            last_count: None,
            last_changed: None,
            disarmed: false,
        }
    }

    pub fn from_config(root: &NormalizedPath, config: &WatchConfig) -> Self {
        Self::new(
            root.join(&config.source),
            Duration::from_millis(config.stable_after_ms),
        )
        .with_rearm(config.rearm)
    }

    /// Return to `Idle` after firing instead of disarming
    pub fn with_rearm(mut self, rearm: bool) -> Self {
        self.rearm = rearm;
        self
    }

    pub fn source(&self) -> &NormalizedPath {
        &self.source
    }

    pub fn state(&self) -> WatcherState {
        self.state
    }

    pub fn last_count(&self) -> Option<usize> {
        self.last_count
    }

    /// Count the source directory and advance. Never fails: count errors
    /// are retried on the next poll.
    pub fn poll(&mut self, now: Instant) -> PollOutcome {
        if self.disarmed {
            return PollOutcome::Disarmed;
        }
        if !self.source.is_dir() {
            return PollOutcome::Absent;
        }
        match walk::count_files(&self.source) {
            Ok(count) => self.observe(count, now),
            Err(e) => {
                tracing::debug!("Could not count {}: {}", self.source, e);
                PollOutcome::Waiting
            }
        }
    }

    /// Advance with an externally sampled file count
    pub fn observe(&mut self, count: usize, now: Instant) -> PollOutcome {
        if self.disarmed {
            return PollOutcome::Disarmed;
        }

        let unchanged = self.last_count == Some(count);
        if !unchanged {
            tracing::debug!("{}: {} file(s)", self.source, count);
            self.last_count = Some(count);
            self.last_changed = Some(now);
            self.state = WatcherState::Observing;
            return PollOutcome::Waiting;
        }

        // Extraction has not started writing yet
        if count == 0 {
            self.state = WatcherState::Observing;
            return PollOutcome::Waiting;
        }
        if self.state == WatcherState::Idle {
            return PollOutcome::Waiting;
        }

        let settled = self
            .last_changed
            .is_some_and(|changed| now.saturating_duration_since(changed) >= self.threshold);
        if !settled {
            return PollOutcome::Waiting;
        }

        tracing::info!("{} stable at {} file(s)", self.source, count);
        if self.rearm {
            self.state = WatcherState::Idle;
        } else {
            self.state = WatcherState::Stable;
            self.disarmed = true;
        }
        PollOutcome::Fire { file_count: count }
    }

    /// Forget everything observed and re-arm
    pub fn reset(&mut self) {
        self.state = WatcherState::Idle;
        self.last_count = None;
        self.last_changed = None;
        self.disarmed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(watcher: &mut QuiescenceWatcher, counts: &[usize]) -> Vec<PollOutcome> {
        let start = Instant::now();
        counts
            .iter()
            .enumerate()
            .map(|(i, count)| watcher.observe(*count, start + Duration::from_secs(i as u64)))
            .collect()
    }

    fn watcher(rearm: bool) -> QuiescenceWatcher {
        QuiescenceWatcher::new(NormalizedPath::new("/nowhere"), Duration::from_secs(3)).with_rearm(rearm)
    }

    #[test]
    fn fires_only_after_final_count_settles() {
        let mut w = watcher(false);
        let outcomes = run(&mut w, &[0, 0, 3, 3, 3, 5, 5, 5, 5]);
        let fired: Vec<usize> = outcomes
            .iter()
            .enumerate()
            .filter(|(_, o)| matches!(o, PollOutcome::Fire { .. }))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(fired, vec![8]);
        assert_eq!(outcomes[8], PollOutcome::Fire { file_count: 5 });
        assert_eq!(w.state(), WatcherState::Stable);
    }

    #[test]
    fn empty_tree_never_fires() {
        let mut w = watcher(false);
        let outcomes = run(&mut w, &[0; 20]);
        assert!(outcomes.iter().all(|o| *o == PollOutcome::Waiting));
        assert_eq!(w.state(), WatcherState::Observing);
    }

    #[test]
    fn disarms_after_firing_until_reset() {
        let mut w = watcher(false);
        run(&mut w, &[2, 2, 2, 2]);
        let later = Instant::now() + Duration::from_secs(60);
        assert_eq!(w.observe(2, later), PollOutcome::Disarmed);
        assert_eq!(w.observe(9, later), PollOutcome::Disarmed);

        w.reset();
        assert_eq!(w.state(), WatcherState::Idle);
        assert_eq!(w.observe(9, later), PollOutcome::Waiting);
    }

    #[test]
    fn rearmed_watcher_waits_for_the_next_change() {
        let mut w = watcher(true);
        let outcomes = run(&mut w, &[4, 4, 4, 4, 4, 4, 4, 6, 6, 6, 6]);
        let fires = outcomes
            .iter()
            .filter(|o| matches!(o, PollOutcome::Fire { .. }))
            .count();
        assert_eq!(fires, 2);
        assert_eq!(outcomes[10], PollOutcome::Fire { file_count: 6 });
        assert_eq!(w.state(), WatcherState::Idle);
    }

    #[test]
    fn missing_source_stays_idle() {
        let mut w = watcher(false);
        assert_eq!(w.poll(Instant::now()), PollOutcome::Absent);
        assert_eq!(w.state(), WatcherState::Idle);
    }
}
