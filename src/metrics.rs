//! Lightweight atomic-counter metrics for the simulation loop: ticks, bot
//! admission, and match completions. No exporter crate is wired up (none
//! appears anywhere in this dependency stack); callers read the counters
//! directly. Unrelated to `RuntimeStats`, which reports container-level
//! figures sourced from the sandbox scheduler.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct Metrics {
    ticks_processed: AtomicU64,
    bots_admitted: AtomicU64,
    bots_queued: AtomicU64,
    matches_finished: AtomicU64,
    bullets_fired: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_tick(&self) {
        self.ticks_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bot_admitted(&self) {
        self.bots_admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bot_queued(&self) {
        self.bots_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_match_finished(&self) {
        self.matches_finished.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bullets_fired(&self, count: u64) {
        self.bullets_fired.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ticks_processed: self.ticks_processed.load(Ordering::Relaxed),
            bots_admitted: self.bots_admitted.load(Ordering::Relaxed),
            bots_queued: self.bots_queued.load(Ordering::Relaxed),
            matches_finished: self.matches_finished.load(Ordering::Relaxed),
            bullets_fired: self.bullets_fired.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub ticks_processed: u64,
    pub bots_admitted: u64,
    pub bots_queued: u64,
    pub matches_finished: u64,
    pub bullets_fired: u64,
}
