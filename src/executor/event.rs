//! Lifecycle events delivered to executor subscribers.

use core::fmt;
use core::time::Duration;
use std::sync::Arc;

use crate::sequence::Sequence;
use crate::timing::TimingSource;

/// A lifecycle notification from a [`SequenceExecutor`](super::SequenceExecutor).
///
/// Every run that reaches `Running` produces exactly one `Started` followed by
/// exactly one `Ended`.
#[derive(Clone)]
pub enum ExecutorEvent {
    Started {
        sequence: Arc<dyn Sequence>,
        timing: Arc<dyn TimingSource>,
        start: Duration,
        end: Duration,
    },
    Ended {
        sequence: Arc<dyn Sequence>,
    },
    /// Informational text, e.g. pause and resume notices.
    Message(String),
    /// A non-fatal failure, typically from a media participant.
    Error(String),
}

impl ExecutorEvent {
    pub fn is_started(&self) -> bool {
        matches!(self, ExecutorEvent::Started { .. })
    }

    pub fn is_ended(&self) -> bool {
        matches!(self, ExecutorEvent::Ended { .. })
    }
}

impl fmt::Debug for ExecutorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorEvent::Started {
                sequence,
                start,
                end,
                ..
            } => f
                .debug_struct("Started")
                .field("sequence", &sequence.name())
                .field("start", start)
                .field("end", end)
                .finish_non_exhaustive(),
            ExecutorEvent::Ended { sequence } => f
                .debug_struct("Ended")
                .field("sequence", &sequence.name())
                .finish(),
            ExecutorEvent::Message(text) => f.debug_tuple("Message").field(text).finish(),
            ExecutorEvent::Error(text) => f.debug_tuple("Error").field(text).finish(),
        }
    }
}
