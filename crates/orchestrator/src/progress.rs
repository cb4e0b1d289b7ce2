//! Progress tracking

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

/// Snapshot handed to progress callbacks after each completed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub matched: usize,
}

impl Progress {
    #[must_use]
    pub fn percent(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            (self.completed as f32 / self.total as f32) * 100.0
        }
    }
}

/// Lock-free counters shared by every worker of a run.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    total: AtomicUsize,
    completed: AtomicUsize,
    matched: AtomicUsize,
    failed: AtomicUsize,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total: AtomicUsize::new(total),
            ..Default::default()
        }
    }

    pub fn add_total(&self, n: usize) {
        self.total.fetch_add(n, Ordering::Relaxed);
    }

    /// Count one finished item and return the counters as seen right after it.
    pub fn complete(&self, matched: bool) -> Progress {
        let matched = if matched {
            self.matched.fetch_add(1, Ordering::Relaxed) + 1
        } else {
            self.matched.load(Ordering::Relaxed)
        };
        let completed = self.completed.fetch_add(1, Ordering::AcqRel) + 1;
        Progress {
            completed,
            total: self.total.load(Ordering::Relaxed),
            matched,
        }
    }

    pub fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Progress {
        Progress {
            completed: self.completed.load(Ordering::Acquire),
            total: self.total.load(Ordering::Relaxed),
            matched: self.matched.load(Ordering::Relaxed),
        }
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn log_summary(&self, label: &str) {
        let p = self.snapshot();
        info!(
            "{}: {}/{} completed, {} matched, {} faulted ({:.1}%)",
            label,
            p.completed,
            p.total,
            p.matched,
            self.failed(),
            p.percent()
        );
    }
}
