//! The playback state machine.

mod checker;
mod event;

pub use event::ExecutorEvent;

use core::time::Duration;
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::ExecutorConfig;
use crate::error::MediaError;
use crate::graph::{ControllerFrame, PatchGraph, Tick};
use crate::media::Media;
use crate::sequence::{DataListener, Effect, ListenerId, Sequence, SequenceFilter};
use crate::timing::{StopwatchTiming, TimingSource};
use crate::Result;

use checker::{Checker, CheckerThread, Request};

/// Where the executor is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Running,
    Paused,
}

/// Plays a [`Sequence`] against a clock and keeps its media in step.
///
/// The executor is driven from one owner thread. A background thread checks
/// every [`end_check_interval`](ExecutorConfig::end_check_interval) whether a
/// timed run has reached its end and, if so, queues a stop request. The owner
/// applies queued requests with [`process_requests`](Self::process_requests)
/// or [`wait_for_requests`](Self::wait_for_requests), so natural ends are
/// ordered against explicit `pause`/`resume`/`stop` calls.
///
/// Calls that make no sense in the current state (playing while running,
/// resuming while idle, ...) are ignored.
pub struct SequenceExecutor {
    config: ExecutorConfig,
    state: PlaybackState,
    sequence: Option<Arc<dyn Sequence>>,
    default_timing: Arc<dyn TimingSource>,
    /// Clock of the current (or last) run
    timing: Option<Arc<dyn TimingSource>>,
    start: Duration,
    end: Duration,
    run: u64,
    listener: Option<ListenerId>,
    checker: Arc<Mutex<Checker>>,
    thread: Option<CheckerThread>,
    requests: Receiver<Request>,
    subscribers: Vec<Sender<ExecutorEvent>>,
}

impl SequenceExecutor {
    /// Create an executor and spawn its end-check thread.
    pub fn new(config: ExecutorConfig) -> Result<Self> {
        config.validate()?;

        let checker = Arc::new(Mutex::new(Checker::default()));
        let (request_sender, requests) = unbounded();
        let thread = CheckerThread::spawn(&config, Arc::clone(&checker), request_sender)?;

        Ok(Self {
            config,
            state: PlaybackState::Idle,
            sequence: None,
            default_timing: Arc::new(StopwatchTiming::new()),
            timing: None,
            start: Duration::ZERO,
            end: Duration::ZERO,
            run: 0,
            listener: None,
            checker,
            thread: Some(thread),
            requests,
            subscribers: Vec::new(),
        })
    }

    /// Replace the clock used for sequences without a preferred one.
    pub fn with_default_timing(mut self, timing: Arc<dyn TimingSource>) -> Self {
        self.default_timing = timing;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Attach (or detach) the sequence to play. Stops any active run first.
    pub fn set_sequence(&mut self, sequence: Option<Arc<dyn Sequence>>) {
        self.stop();
        self.sequence = sequence;
    }

    pub fn sequence(&self) -> Option<&Arc<dyn Sequence>> {
        self.sequence.as_ref()
    }

    /// Receive every lifecycle event from now on.
    pub fn subscribe(&mut self) -> Receiver<ExecutorEvent> {
        let (sender, receiver) = unbounded();
        self.subscribers.push(sender);
        receiver
    }

    fn emit(&mut self, event: ExecutorEvent) {
        self.subscribers.retain(|s| s.send(event.clone()).is_ok());
    }

    fn report(&mut self, err: MediaError) {
        warn!(media = %err.media, error = %err.message, "media failure");
        self.emit(ExecutorEvent::Error(err.to_string()));
    }

    fn each_media(&mut self, sequence: &Arc<dyn Sequence>, op: impl Fn(&dyn Media) -> core::result::Result<(), MediaError>) {
        for media in sequence.media() {
            if let Err(err) = op(media.as_ref()) {
                self.report(err);
            }
        }
    }

    /// Play the whole sequence.
    pub fn start(&mut self) {
        self.play(Duration::ZERO, Duration::MAX);
    }

    /// Play the sequence from `start` to `end`, both clamped to its length.
    ///
    /// The run is timed, and ends on its own once the clock reaches `end`,
    /// unless `end` lies before `start`. Then it plays until stopped. A run
    /// clamped to `end == start` ends right away.
    /// Ignored without a sequence or when not idle.
    pub fn play(&mut self, start: Duration, end: Duration) {
        if self.state != PlaybackState::Idle {
            debug!(state = ?self.state, "play ignored, executor is not idle");
            return;
        }
        let Some(sequence) = self.sequence.clone() else {
            debug!("play ignored, no sequence");
            return;
        };

        let length = sequence.length();
        let (start, end) = (start.min(length), end.min(length));

        let listener: DataListener = Arc::new(|_: &Effect| true);
        self.listener = Some(sequence.attach_data_listener(listener));

        let timing = sequence.timing().unwrap_or_else(|| Arc::clone(&self.default_timing));
        self.run += 1;
        self.start = start;
        self.end = end;
        self.timing = Some(Arc::clone(&timing));

        self.each_media(&sequence, |m| m.load(start));

        self.state = PlaybackState::Running;
        info!(run = self.run, sequence = sequence.name(), ?start, ?end, "sequence started");
        self.emit(ExecutorEvent::Started {
            sequence: Arc::clone(&sequence),
            timing: Arc::clone(&timing),
            start,
            end,
        });

        self.each_media(&sequence, |m| m.start());
        timing.set_position(start);
        timing.start();

        if self.is_timed() && timing.position() >= end {
            info!(run = self.run, "sequence ended");
            self.stop();
            return;
        }

        self.checker.lock().arm(self.run, start, end, timing);
    }

    /// Freeze the clock and media. Only while running.
    pub fn pause(&mut self) {
        if self.state != PlaybackState::Running {
            return;
        }
        {
            let mut checker = self.checker.lock();
            if !checker.is_armed() {
                return;
            }
            checker.suspend();
        }

        if let Some(timing) = &self.timing {
            timing.pause();
        }
        if let Some(sequence) = self.sequence.clone() {
            self.each_media(&sequence, |m| m.pause());
        }

        self.state = PlaybackState::Paused;
        info!(run = self.run, "sequence paused");
        self.emit(ExecutorEvent::Message(String::from("Sequence paused")));
    }

    /// Continue a paused run from where it was frozen.
    pub fn resume(&mut self) {
        if self.state != PlaybackState::Paused {
            return;
        }
        let Some(sequence) = self.sequence.clone() else {
            return;
        };
        if self.checker.lock().is_armed() {
            return;
        }

        if let Some(timing) = &self.timing {
            timing.resume();
        }
        self.each_media(&sequence, |m| m.resume());
        self.checker.lock().rearm();

        self.state = PlaybackState::Running;
        info!(run = self.run, "sequence resumed");
        self.emit(ExecutorEvent::Message(String::from("Sequence resumed")));
    }

    /// End the active run. Ignored when idle.
    ///
    /// On return the clock and media are stopped and `Ended` has been sent.
    pub fn stop(&mut self) {
        if self.state == PlaybackState::Idle {
            return;
        }

        // Under the checker lock, so a check racing with us cannot re-arm it
        self.checker.lock().disarm();

        let sequence = self.sequence.clone();
        if let (Some(sequence), Some(listener)) = (&sequence, self.listener.take()) {
            sequence.detach_data_listener(listener);
        }

        self.state = PlaybackState::Idle;
        info!(run = self.run, "sequence stopped");
        if let Some(sequence) = &sequence {
            self.emit(ExecutorEvent::Ended {
                sequence: Arc::clone(sequence),
            });
        }

        if let Some(timing) = &self.timing {
            timing.stop();
        }
        if let Some(sequence) = &sequence {
            self.each_media(sequence, |m| m.stop());
        }
    }

    fn handle_request(&mut self, request: Request) {
        match request {
            Request::Stop { run } if run == self.run && self.state != PlaybackState::Idle => {
                info!(run, "sequence reached its end");
                self.stop();
            }
            Request::Stop { run } => {
                debug!(run, current = self.run, "ignoring stale stop request");
            }
        }
    }

    /// Apply every queued request. Returns how many were handled.
    pub fn process_requests(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(request) = self.requests.try_recv() {
            self.handle_request(request);
            handled += 1;
        }
        handled
    }

    /// Block up to `timeout` for a request, then apply everything queued.
    pub fn wait_for_requests(&mut self, timeout: Duration) -> usize {
        match self.requests.recv_timeout(timeout) {
            Ok(request) => {
                self.handle_request(request);
                1 + self.process_requests()
            }
            Err(_) => 0,
        }
    }

    /// Sample the sequence at the clock's position and evaluate `graph`.
    ///
    /// Every channel registered in the graph receives the intents the
    /// sequence holds for it, after the sequence filters ran; channels with
    /// no active intents emit nothing. Returns `None` when no run is active.
    /// A timed run whose clock reached its end is stopped here and also
    /// yields `None`, so positions past the end never reach the graph.
    pub fn tick(&mut self, graph: &mut PatchGraph) -> Option<ControllerFrame> {
        if self.state == PlaybackState::Idle {
            return None;
        }
        let sequence = self.sequence.clone()?;
        let position = self.timing.as_ref()?.position();

        if self.is_timed() && position >= self.end {
            info!(run = self.run, ?position, "sequence reached its end");
            self.stop();
            return None;
        }

        let filters = sequence.sequence_filters();
        let mut tick = Tick::new(position);
        for channel in graph.channel_ids() {
            let intents = filters
                .iter()
                .fold(sequence.intents_at(channel, position), |intents, f| {
                    f.apply(channel, position, intents)
                });
            if !intents.is_empty() {
                tick.insert(channel, intents);
            }
        }

        Some(graph.evaluate(&tick))
    }

    #[inline]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == PlaybackState::Running
    }

    pub fn is_paused(&self) -> bool {
        self.state == PlaybackState::Paused
    }

    /// Whether the current run ends on its own.
    pub fn is_timed(&self) -> bool {
        self.end >= self.start
    }

    /// Name of the attached sequence.
    pub fn name(&self) -> Option<&str> {
        self.sequence.as_ref().map(|s| s.name())
    }

    /// Start of the current (or last) run.
    pub fn start_time(&self) -> Duration {
        self.start
    }

    /// End of the current (or last) run.
    pub fn end_time(&self) -> Duration {
        self.end
    }

    pub fn timing(&self) -> Option<&Arc<dyn TimingSource>> {
        self.timing.as_ref()
    }

    pub fn position(&self) -> Option<Duration> {
        self.timing.as_ref().map(|t| t.position())
    }

    pub fn sequence_filters(&self) -> Vec<Arc<dyn SequenceFilter>> {
        self.sequence
            .as_ref()
            .map(|s| s.sequence_filters())
            .unwrap_or_default()
    }

    /// Stop, then shut down the end-check thread. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        self.stop();
        // Not under the checker lock: stop takes it itself
        if let Some(thread) = self.thread.take() {
            thread.shutdown(&self.checker);
            debug!("executor disposed");
        }
    }
}

impl Drop for SequenceExecutor {
    fn drop(&mut self) {
        self.dispose();
    }
}
