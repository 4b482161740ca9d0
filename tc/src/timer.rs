//! Clocks, interval timers and stopwatches
//!
//! Everything time-dependent reads time through a [`Clock`] so tests can
//! drive it with [`ManualClock`] instead of sleeping.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Interval timer. Starts elapsed; `reset` re-arms it.
#[derive(Clone)]
pub struct Timer {
    interval: Duration,
    last_reset: Option<Instant>,
    clock: Arc<dyn Clock>,
}

impl Timer {
    pub fn new(interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            interval,
            last_reset: None,
            clock,
        }
    }

    /// True once `interval` has passed since the last reset
    pub fn elapsed(&self) -> bool {
        match self.last_reset {
            None => true,
            Some(at) => self.clock.now().saturating_duration_since(at) >= self.interval,
        }
    }

    /// Time left until the timer elapses
    pub fn remaining(&self) -> Duration {
        match self.last_reset {
            None => Duration::ZERO,
            Some(at) => self
                .interval
                .saturating_sub(self.clock.now().saturating_duration_since(at)),
        }
    }

    pub fn reset(&mut self) {
        self.last_reset = Some(self.clock.now());
    }

    /// Make the timer elapsed right away
    pub fn force_elapse(&mut self) {
        self.last_reset = None;
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer")
            .field("interval", &self.interval)
            .field("elapsed", &self.elapsed())
            .finish()
    }
}

/// Measures how long something has been running
#[derive(Clone)]
pub struct Stopwatch {
    started: Option<Instant>,
    clock: Arc<dyn Clock>,
}

impl Stopwatch {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { started: None, clock }
    }

    pub fn begin(&mut self) {
        self.started = Some(self.clock.now());
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    /// Elapsed time since `begin`, zero if never started
    pub fn elapsed(&self) -> Duration {
        self.started
            .map(|at| self.clock.now().saturating_duration_since(at))
            .unwrap_or_default()
    }

    pub fn stop(&mut self) -> Duration {
        let elapsed = self.elapsed();
        self.started = None;
        elapsed
    }
}

impl std::fmt::Debug for Stopwatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stopwatch").field("elapsed", &self.elapsed()).finish()
    }
}
