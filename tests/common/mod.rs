#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use leuchtet::{ChannelId, Effect, Intent, Media, MediaError, Show, TimingSource};
use parking_lot::Mutex;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

#[derive(Default)]
struct ManualState {
    position: Duration,
    running: bool,
    paused: bool,
}

/// A clock that only moves when told to.
#[derive(Default)]
pub struct ManualTiming {
    state: Mutex<ManualState>,
}

impl ManualTiming {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Move forward by `by`, but only while running and not paused.
    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock();
        if state.running && !state.paused {
            state.position += by;
        }
    }
}

impl TimingSource for ManualTiming {
    fn position(&self) -> Duration {
        self.state.lock().position
    }

    fn set_position(&self, position: Duration) {
        self.state.lock().position = position;
    }

    fn start(&self) {
        let mut state = self.state.lock();
        state.running = true;
        state.paused = false;
    }

    fn stop(&self) {
        let mut state = self.state.lock();
        state.running = false;
        state.paused = false;
    }

    fn pause(&self) {
        let mut state = self.state.lock();
        if state.running {
            state.paused = true;
        }
    }

    fn resume(&self) {
        self.state.lock().paused = false;
    }

    fn is_running(&self) -> bool {
        self.state.lock().running
    }

    fn is_paused(&self) -> bool {
        self.state.lock().paused
    }
}

/// Media that records every call and optionally fails to load.
pub struct RecordingMedia {
    name: String,
    fail_load: bool,
    calls: Mutex<Vec<String>>,
}

impl RecordingMedia {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail_load: false,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail_load: true,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

impl Media for RecordingMedia {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self, start: Duration) -> Result<(), MediaError> {
        self.record(format!("load {}ms", start.as_millis()));
        if self.fail_load {
            return Err(MediaError::new(&self.name, "file not found"));
        }
        Ok(())
    }

    fn start(&self) -> Result<(), MediaError> {
        self.record("start".into());
        Ok(())
    }

    fn pause(&self) -> Result<(), MediaError> {
        self.record("pause".into());
        Ok(())
    }

    fn resume(&self) -> Result<(), MediaError> {
        self.record("resume".into());
        Ok(())
    }

    fn stop(&self) -> Result<(), MediaError> {
        self.record("stop".into());
        Ok(())
    }
}

/// A show where `channel` holds a full-level intent for its whole length.
pub fn steady_show(length: Duration, channel: ChannelId) -> Show {
    Show::new("Steady", length).with_effect(Effect::new(
        channel,
        Duration::ZERO,
        length,
        Intent::level(1.0),
    ))
}
