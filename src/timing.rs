//! Clocks that drive sequence playback.

use core::time::Duration;
use std::time::Instant;

use parking_lot::Mutex;

/// A monotonic position source.
///
/// The position only advances while the clock is running and not paused.
/// Methods take `&self` so a clock can be shared between the executor, its
/// end-check thread and whoever renders the sequence; implementations use
/// interior mutability.
pub trait TimingSource: Send + Sync {
    /// Time since the start of the sequence.
    fn position(&self) -> Duration;

    /// Seek. Takes effect immediately whether or not the clock is running.
    fn set_position(&self, position: Duration);

    /// Begin advancing from the current position.
    fn start(&self);

    /// Halt. Stopping a stopped clock does nothing.
    fn stop(&self);

    /// Freeze the position without resetting it.
    fn pause(&self);

    /// Continue from the frozen position.
    fn resume(&self);

    fn is_running(&self) -> bool;

    fn is_paused(&self) -> bool;
}

#[derive(Debug, Default)]
struct Stopwatch {
    base: Duration,
    since: Option<Instant>,
    running: bool,
    paused: bool,
}

impl Stopwatch {
    fn position(&self) -> Duration {
        match self.since {
            Some(since) => self.base.saturating_add(since.elapsed()),
            None => self.base,
        }
    }
}

/// Wall-clock [`TimingSource`] backed by [`Instant`].
#[derive(Debug, Default)]
pub struct StopwatchTiming {
    inner: Mutex<Stopwatch>,
}

impl StopwatchTiming {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimingSource for StopwatchTiming {
    fn position(&self) -> Duration {
        self.inner.lock().position()
    }

    fn set_position(&self, position: Duration) {
        let mut sw = self.inner.lock();
        sw.base = position;
        if sw.since.is_some() {
            sw.since = Some(Instant::now());
        }
    }

    fn start(&self) {
        let mut sw = self.inner.lock();
        if sw.running {
            return;
        }
        sw.running = true;
        sw.paused = false;
        sw.since = Some(Instant::now());
    }

    fn stop(&self) {
        let mut sw = self.inner.lock();
        if !sw.running {
            return;
        }
        sw.base = sw.position();
        sw.since = None;
        sw.running = false;
        sw.paused = false;
    }

    fn pause(&self) {
        let mut sw = self.inner.lock();
        if !sw.running || sw.paused {
            return;
        }
        sw.base = sw.position();
        sw.since = None;
        sw.paused = true;
    }

    fn resume(&self) {
        let mut sw = self.inner.lock();
        if !sw.running || !sw.paused {
            return;
        }
        sw.since = Some(Instant::now());
        sw.paused = false;
    }

    fn is_running(&self) -> bool {
        self.inner.lock().running
    }

    fn is_paused(&self) -> bool {
        self.inner.lock().paused
    }
}
