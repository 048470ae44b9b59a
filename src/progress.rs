//! Two-level progress: tutorials done out of queued, and units within the active tutorial.
//!
//! Every tutorial is worth [`UNITS_PER_TUTORIAL`] units. `base` counts units of
//! tutorials already finished (or skipped), `current` additionally counts the
//! units dispatched in the active tutorial. Both only ever grow and never pass
//! `max`, even when the orchestrator and download workers update concurrently.

use std::sync::{Mutex, MutexGuard};

use crate::events::Reporter;

/// Progress units assigned to each tutorial.
pub const UNITS_PER_TUTORIAL: u64 = 100;

/// A consistent copy of the progress counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Units of finished tutorials.
    pub base: u64,
    /// Units including the active tutorial's dispatched lessons.
    pub current: u64,
    /// Units of the whole queue.
    pub max: u64,
    /// `"<tutorials completed>/<tutorials total>"`.
    pub label: String,
}

impl ProgressSnapshot {
    /// `current / max`, or 0 before the queue is known.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        if self.max == 0 {
            0.0
        } else {
            self.current as f64 / self.max as f64
        }
    }

    /// Number of tutorials finished so far.
    #[must_use]
    pub const fn completed(&self) -> u64 {
        self.base / UNITS_PER_TUTORIAL
    }

    /// Number of tutorials in the queue.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.max / UNITS_PER_TUTORIAL
    }
}

#[derive(Debug, Default)]
struct ProgressState {
    base: u64,
    current: u64,
    max: u64,
}

impl ProgressState {
    fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            base: self.base,
            current: self.current,
            max: self.max,
            label: format!(
                "{}/{}",
                self.base / UNITS_PER_TUTORIAL,
                self.max / UNITS_PER_TUTORIAL
            ),
        }
    }
}

/// Shared, serialized progress counters.
///
/// Share it behind an `Arc`. Updates are applied under one lock and announced
/// in the order they were applied. The counters' lock is released before the
/// observer runs, so an observer may read [`snapshot`](Self::snapshot) but must
/// not update the tracker from its callback.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    state: Mutex<ProgressState>,
    /// Held across the notification, which keeps announcements in update order.
    reporter: Mutex<Reporter>,
}

fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Counters stay valid even if a holder panicked mid-update.
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl ProgressTracker {
    #[must_use]
    pub fn new(reporter: Reporter) -> Self {
        Self {
            state: Mutex::new(ProgressState::default()),
            reporter: Mutex::new(reporter),
        }
    }

    /// Sends later updates to `reporter`. Counters are kept.
    pub fn set_reporter(&self, reporter: Reporter) {
        *relock(&self.reporter) = reporter;
    }

    fn update(&self, apply: impl FnOnce(&mut ProgressState)) -> ProgressSnapshot {
        let reporter = relock(&self.reporter);
        let snapshot = {
            let mut state = relock(&self.state);
            apply(&mut state);
            state.snapshot()
        };
        reporter.progress(&snapshot);
        snapshot
    }

    /// Sets the queue length. Units already counted are kept.
    pub fn set_total(&self, tutorials: usize) -> ProgressSnapshot {
        let max = tutorials as u64 * UNITS_PER_TUTORIAL;
        self.update(|state| state.max = state.max.max(max))
    }

    /// Marks the active tutorial as finished, skipped or rejected.
    pub fn advance_tutorial(&self) -> ProgressSnapshot {
        self.update(|state| {
            state.base = (state.base + UNITS_PER_TUTORIAL).min(state.max);
            state.current = state.current.max(state.base);
        })
    }

    /// Credits `units` to the active tutorial.
    ///
    /// Capped at the active tutorial's share, so a later
    /// [`advance_tutorial`](Self::advance_tutorial) never moves `current` backwards.
    pub fn advance_current(&self, units: u64) -> ProgressSnapshot {
        self.update(|state| {
            let ceiling = (state.base + UNITS_PER_TUTORIAL).min(state.max);
            state.current = (state.current + units).min(ceiling).max(state.current);
        })
    }

    /// `current / max`, 0 before the queue is loaded.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        self.snapshot().fraction()
    }

    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        relock(&self.state).snapshot()
    }
}
