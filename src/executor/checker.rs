//! The end-check timer thread.
//!
//! The thread never stops a run itself. When a timed run's clock reaches its
//! end it posts a [`Request::Stop`] for that run onto the owner's queue and
//! leaves the transition to [`SequenceExecutor::process_requests`](super::SequenceExecutor::process_requests).

use core::time::Duration;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::config::ExecutorConfig;
use crate::timing::TimingSource;

/// Work queued for the executor's owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Request {
    /// The run with this id reached its end.
    Stop { run: u64 },
}

pub(crate) enum Command {
    Shutdown,
}

/// Checker state, shared between the owner and the timer thread.
///
/// Arming, disarming and firing all happen under the one mutex guarding it.
#[derive(Default)]
pub(crate) struct Checker {
    enabled: bool,
    run: u64,
    start: Duration,
    end: Duration,
    timing: Option<Arc<dyn TimingSource>>,
    stop_posted: bool,
    shutdown: bool,
}

impl Checker {
    pub(crate) fn arm(&mut self, run: u64, start: Duration, end: Duration, timing: Arc<dyn TimingSource>) {
        self.enabled = true;
        self.run = run;
        self.start = start;
        self.end = end;
        self.timing = Some(timing);
        self.stop_posted = false;
    }

    pub(crate) fn disarm(&mut self) {
        self.enabled = false;
        self.timing = None;
    }

    /// Re-enable checking for the current run after a pause.
    pub(crate) fn rearm(&mut self) {
        if self.timing.is_some() {
            self.enabled = true;
        }
    }

    /// Stop checking without forgetting the run.
    pub(crate) fn suspend(&mut self) {
        self.enabled = false;
    }

    #[inline]
    pub(crate) fn is_armed(&self) -> bool {
        self.enabled
    }

    fn check(&mut self, requests: &Sender<Request>) {
        if !self.enabled || self.stop_posted || self.end < self.start {
            return;
        }
        let Some(timing) = &self.timing else {
            return;
        };

        let position = timing.position();
        trace!(run = self.run, ?position, end = ?self.end, "end check");
        if position >= self.end {
            debug!(run = self.run, ?position, "run reached its end, requesting stop");
            // The owner may already be gone during teardown
            let _ = requests.send(Request::Stop { run: self.run });
            self.stop_posted = true;
        }
    }
}

/// Handle to the running timer thread.
pub(crate) struct CheckerThread {
    commands: Sender<Command>,
    handle: JoinHandle<()>,
}

impl CheckerThread {
    pub(crate) fn spawn(
        config: &ExecutorConfig,
        checker: Arc<Mutex<Checker>>,
        requests: Sender<Request>,
    ) -> std::io::Result<Self> {
        let (commands, command_receiver) = unbounded();
        let interval = config.end_check_interval;

        let handle = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || Self::run(interval, command_receiver, checker, requests))?;

        Ok(Self { commands, handle })
    }

    fn run(
        interval: Duration,
        commands: Receiver<Command>,
        checker: Arc<Mutex<Checker>>,
        requests: Sender<Request>,
    ) {
        loop {
            match commands.recv_timeout(interval) {
                Ok(Command::Shutdown) => break,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            let mut checker = checker.lock();
            if checker.shutdown {
                break;
            }
            checker.check(&requests);
        }
        trace!("end-check thread exiting");
    }

    /// Mark the checker shut down, wake the thread and wait for it.
    pub(crate) fn shutdown(self, checker: &Mutex<Checker>) {
        checker.lock().shutdown = true;
        let _ = self.commands.send(Command::Shutdown);
        if self.handle.join().is_err() {
            tracing::error!("end-check thread panicked");
        }
    }
}
