//! Process-wide, explicit context: the graph, the deadline clock, the
//! best-known-score tracker, and the single seeded RNG stream.
//!
//! Replaces file-scope singletons with one value threaded through
//! constructors. The deadline carries a writable slot so a signal handler
//! can advance it to "now"; everything else is read-only after
//! construction except the single-writer best trackers.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::graph::Graph;

/// A deadline that can be advanced to "now" exactly once, from anywhere.
/// Polling is an O(1) comparison.
///
/// The wall-clock bound lives in a thread-confined `Cell`, since every
/// reader is the single search thread; the signal-stop flag lives in an
/// `Arc<AtomicBool>` instead, since `ctrlc`'s handler runs on its own OS
/// thread and only needs to set one bit.
#[derive(Debug)]
pub struct Deadline {
    at: Cell<Instant>,
    stopped: Arc<AtomicBool>,
}

impl Deadline {
    /// A deadline `duration` from now.
    pub fn in_duration(duration: Duration) -> Self {
        Self { at: Cell::new(Instant::now() + duration), stopped: Arc::new(AtomicBool::new(false)) }
    }

    /// Has the deadline passed?
    pub fn poll(&self) -> bool {
        self.stopped.load(Ordering::Relaxed) || Instant::now() >= self.at.get()
    }

    /// Advances the deadline to now, used by the signal handler to request
    /// a clean stop.
    pub fn expire_now(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }

    /// A cloneable, `Send + Sync` handle a signal handler can set from any
    /// thread to request a clean stop, without needing a reference into
    /// this (thread-confined) `Deadline`.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stopped.clone()
    }

    /// The earlier of `self` and a sub-method deadline computed from
    /// `max_local_search_time`: min(global deadline, method-start +
    /// maxLocalSearchTime).
    pub fn sub_deadline(&self, max_local_search_time: Duration) -> Instant {
        let sub = Instant::now() + max_local_search_time;
        sub.min(self.at.get())
    }
}

/// Single-writer tracker for the process-wide best score / best color
/// count, read by MCTS for pruning and by tabu variants for aspiration;
/// monotone non-increasing during a run.
#[derive(Debug)]
pub struct BestTracker {
    score: Cell<i32>,
    n_colors: Cell<i32>,
}

impl BestTracker {
    /// Starts with both trackers at their largest representable value, so
    /// the first feasible solution found always improves them.
    pub fn new() -> Self {
        Self { score: Cell::new(i32::MAX), n_colors: Cell::new(i32::MAX) }
    }

    /// Current best-known WVCP score.
    pub fn score(&self) -> i32 { self.score.get() }

    /// Current best-known number of colors (GCP sub-goal).
    pub fn n_colors(&self) -> i32 { self.n_colors.get() }

    /// Attempts to lower the best score; returns whether it improved.
    pub fn try_improve_score(&self, candidate: i32) -> bool {
        if candidate < self.score.get() {
            self.score.set(candidate);
            true
        } else {
            false
        }
    }

    /// Attempts to lower the best color count; returns whether it improved.
    pub fn try_improve_n_colors(&self, candidate: i32) -> bool {
        if candidate < self.n_colors.get() {
            self.n_colors.set(candidate);
            true
        } else {
            false
        }
    }
}

impl Default for BestTracker {
    fn default() -> Self { Self::new() }
}

/// Everything every search algorithm needs, threaded explicitly instead of
/// living as file-scope globals.
#[derive(Debug)]
pub struct SearchContext {
    /// the immutable instance
    pub graph: Rc<Graph>,
    /// writable deadline slot
    pub deadline: Deadline,
    /// process-wide best score / best color count
    pub best: BestTracker,
    /// single process-wide RNG stream; tests seed it for byte-identical runs
    pub rng: RefCell<StdRng>,
}

impl SearchContext {
    /// Builds a context with a deterministic RNG seed and a wall-clock
    /// deadline.
    pub fn new(graph: Rc<Graph>, seed: u64, time_limit: Duration) -> Self {
        Self {
            graph,
            deadline: Deadline::in_duration(time_limit),
            best: BestTracker::new(),
            rng: RefCell::new(StdRng::seed_from_u64(seed)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_tracker_is_monotone() {
        let t = BestTracker::new();
        assert!(t.try_improve_score(10));
        assert!(!t.try_improve_score(12));
        assert!(t.try_improve_score(5));
        assert_eq!(t.score(), 5);
    }

    #[test]
    fn deadline_expires_immediately_when_requested() {
        let d = Deadline::in_duration(Duration::from_secs(60));
        assert!(!d.poll());
        d.expire_now();
        assert!(d.poll());
    }
}
