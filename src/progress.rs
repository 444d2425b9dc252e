//! # Progress — Cancellation Flag and Throttled Status Reporting
//!
//! The driver owns one `CancelFlag` and one `Progress` per request and lends
//! them to every run (and every fork) through a `RunContext`. The engine
//! polls the flag at the top of each tick and each forked run; once raised,
//! all nested loops unwind promptly, returning whatever best result they
//! have accumulated — never an error.
//!
//! Reporting is checkpoint-driven rather than a background thread: each
//! simulation is cooperatively single-threaded, so the engine calls `tick()`
//! once per simulated tick and the reporter rate-limits itself to roughly
//! one status line per 250 ms of wall clock.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::info;

const REPORT_INTERVAL: Duration = Duration::from_millis(250);
/// Only consult the clock every this many ticks; a tick is far cheaper than
/// an `Instant::now` call.
const TICKS_PER_CLOCK_CHECK: u64 = 8192;

/// Cooperative cancellation token. Raised once, observed everywhere.
#[derive(Debug, Default)]
pub struct CancelFlag(AtomicBool);

impl CancelFlag {
    pub fn new() -> Self {
        CancelFlag(AtomicBool::new(false))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Shared progress state for one request: total ticks and simulations, plus
/// a user-visible "what am I doing" string set at run boundaries.
#[derive(Debug)]
pub struct Progress {
    pub ticks: AtomicU64,
    pub sims: AtomicU64,
    current: Mutex<String>,
    start: Instant,
    last_report: Mutex<Instant>,
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress {
    pub fn new() -> Self {
        Progress {
            ticks: AtomicU64::new(0),
            sims: AtomicU64::new(0),
            current: Mutex::new(String::new()),
            start: Instant::now(),
            last_report: Mutex::new(Instant::now()),
        }
    }

    /// Update the user-visible progress string (e.g. `"e512/e700"`).
    pub fn set_current(&self, msg: String) {
        *self.current.lock().unwrap() = msg;
    }

    pub fn current(&self) -> String {
        self.current.lock().unwrap().clone()
    }

    /// Count one simulated tick; occasionally emits a status line.
    pub fn tick(&self) {
        let n = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        if n % TICKS_PER_CLOCK_CHECK == 0 {
            self.maybe_report();
        }
    }

    /// Count one started simulation (direct or forked).
    pub fn start_sim(&self) {
        self.sims.fetch_add(1, Ordering::Relaxed);
    }

    fn maybe_report(&self) {
        let mut last = self.last_report.lock().unwrap();
        if last.elapsed() < REPORT_INTERVAL {
            return;
        }
        *last = Instant::now();
        drop(last);

        let elapsed = self.start.elapsed().as_secs_f64();
        let ticks = self.ticks.load(Ordering::Relaxed);
        let rate = if elapsed > 0.0 {
            ticks as f64 / elapsed
        } else {
            0.0
        };
        info!(
            current = %self.current(),
            ticks,
            sims = self.sims.load(Ordering::Relaxed),
            rate = format_args!("{rate:.0}"),
            "simulation progress"
        );
    }
}

/// Borrowed cancellation + progress handles threaded through every run and
/// fork. Cheap to copy; no ownership, no locking beyond `Progress`.
#[derive(Clone, Copy)]
pub struct RunContext<'a> {
    pub cancel: &'a CancelFlag,
    pub progress: &'a Progress,
}

impl<'a> RunContext<'a> {
    pub fn new(cancel: &'a CancelFlag, progress: &'a Progress) -> Self {
        RunContext { cancel, progress }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_starts_clear_and_latches() {
        let flag = CancelFlag::new();
        assert!(!flag.is_cancelled());
        flag.cancel();
        assert!(flag.is_cancelled());
        flag.cancel();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn progress_counts_ticks() {
        let p = Progress::new();
        for _ in 0..10 {
            p.tick();
        }
        assert_eq!(p.ticks.load(Ordering::Relaxed), 10);
        p.set_current("e10/e20".into());
        assert_eq!(p.current(), "e10/e20");
    }
}
