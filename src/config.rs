//! Executor and graph configuration.

use core::time::Duration;

use crate::{Error, Result};

/// Cadence of the natural-end check while a run is active.
pub const DEFAULT_END_CHECK_INTERVAL: Duration = Duration::from_millis(10);

/// Configuration for a [`SequenceExecutor`](crate::SequenceExecutor).
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// How often the timer thread compares the clock against the run's end.
    pub end_check_interval: Duration,
    /// Name given to the end-check thread.
    pub thread_name: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            end_check_interval: DEFAULT_END_CHECK_INTERVAL,
            thread_name: String::from("leuchtet-end-check"),
        }
    }
}

impl ExecutorConfig {
    pub fn with_end_check_interval(mut self, interval: Duration) -> Self {
        self.end_check_interval = interval;
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.end_check_interval.is_zero() || self.end_check_interval > Duration::from_secs(1) {
            return Err(Error::InvalidConfig(format!(
                "end_check_interval {:?} out of range (0-1s, exclusive of 0)",
                self.end_check_interval
            )));
        }
        if self.thread_name.is_empty() {
            return Err(Error::InvalidConfig("thread_name must not be empty".into()));
        }
        Ok(())
    }
}

/// Configuration for a [`PatchGraph`](crate::PatchGraph).
#[derive(Debug, Clone, Copy)]
pub struct GraphConfig {
    /// Initial capacity for nodes and bindings.
    pub capacity: usize,
    /// Number of setups a filter handle can queue between evaluation passes.
    pub setup_queue_size: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            setup_queue_size: 16,
        }
    }
}

impl GraphConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_setup_queue_size(mut self, size: usize) -> Self {
        self.setup_queue_size = size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.setup_queue_size == 0 {
            return Err(Error::InvalidConfig(
                "setup_queue_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
