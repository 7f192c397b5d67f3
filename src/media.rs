//! Media participants kept in step with the clock.

use core::time::Duration;

use crate::error::MediaError;

/// Something that plays alongside a sequence, e.g. an audio track.
///
/// The executor only drives the lifecycle. Failures are reported through
/// [`ExecutorEvent::Error`](crate::ExecutorEvent::Error) and never stop
/// playback.
pub trait Media: Send + Sync {
    fn name(&self) -> &str;

    /// Prepare playback from `start`. Called before the run begins.
    fn load(&self, start: Duration) -> Result<(), MediaError>;

    fn start(&self) -> Result<(), MediaError>;

    fn pause(&self) -> Result<(), MediaError>;

    fn resume(&self) -> Result<(), MediaError>;

    fn stop(&self) -> Result<(), MediaError>;
}
