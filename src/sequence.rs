//! Sequences: timed intent data plus everything that plays along with it.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use core::time::Duration;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::intent::Intent;
use crate::media::Media;
use crate::node::ChannelId;
use crate::timing::TimingSource;

/// One authored data point: a channel holds an intent for a span of time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Effect {
    pub channel: ChannelId,
    pub start: Duration,
    pub duration: Duration,
    pub intent: Intent,
}

impl Effect {
    pub fn new(channel: ChannelId, start: Duration, duration: Duration, intent: Intent) -> Self {
        Self {
            channel,
            start,
            duration,
            intent,
        }
    }

    #[inline]
    pub fn end(&self) -> Duration {
        self.start.saturating_add(self.duration)
    }

    /// Whether the effect is active at `position` (start inclusive, end exclusive).
    pub fn covers(&self, position: Duration) -> bool {
        self.start <= position && position < self.end()
    }
}

/// Receives data points written to a sequence while it plays.
///
/// Returning `true` marks the data point as consumed.
pub type DataListener = Arc<dyn Fn(&Effect) -> bool + Send + Sync>;

/// Token returned by [`Sequence::attach_data_listener`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// A transform applied to a channel's intents before they enter the patch graph.
pub trait SequenceFilter: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, channel: ChannelId, position: Duration, intents: Vec<Intent>) -> Vec<Intent>;
}

/// What the executor needs from a show.
pub trait Sequence: Send + Sync {
    fn name(&self) -> &str;

    fn length(&self) -> Duration;

    /// Preferred clock. The executor falls back to its own when `None`.
    fn timing(&self) -> Option<Arc<dyn TimingSource>> {
        None
    }

    fn media(&self) -> Vec<Arc<dyn Media>> {
        Vec::new()
    }

    fn sequence_filters(&self) -> Vec<Arc<dyn SequenceFilter>> {
        Vec::new()
    }

    /// Every intent authored for `channel` that is active at `position`.
    fn intents_at(&self, channel: ChannelId, position: Duration) -> Vec<Intent>;

    fn attach_data_listener(&self, listener: DataListener) -> ListenerId;

    /// Returns `false` if the listener was not attached.
    fn detach_data_listener(&self, id: ListenerId) -> bool;
}

/// An in-memory [`Sequence`].
///
/// ```
/// use std::time::Duration;
/// use leuchtet::{ChannelId, Effect, Intent, Sequence, Show};
///
/// let show = Show::new("Porch", Duration::from_secs(10)).with_effect(Effect::new(
///     ChannelId(0),
///     Duration::from_secs(1),
///     Duration::from_secs(2),
///     Intent::level(1.0),
/// ));
///
/// assert_eq!(show.intents_at(ChannelId(0), Duration::from_millis(1500)), vec![Intent::level(1.0)]);
/// assert!(show.intents_at(ChannelId(0), Duration::from_secs(3)).is_empty());
/// ```
pub struct Show {
    name: String,
    length: Duration,
    effects: RwLock<Vec<Effect>>,
    media: Vec<Arc<dyn Media>>,
    timing: Option<Arc<dyn TimingSource>>,
    filters: Vec<Arc<dyn SequenceFilter>>,
    listeners: Mutex<Vec<(ListenerId, DataListener)>>,
    next_listener: AtomicU64,
}

impl Show {
    pub fn new(name: impl Into<String>, length: Duration) -> Self {
        Self {
            name: name.into(),
            length,
            effects: RwLock::new(Vec::new()),
            media: Vec::new(),
            timing: None,
            filters: Vec::new(),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(0),
        }
    }

    pub fn with_effect(self, effect: Effect) -> Self {
        self.effects.write().push(effect);
        self
    }

    pub fn with_media(mut self, media: Arc<dyn Media>) -> Self {
        self.media.push(media);
        self
    }

    pub fn with_timing(mut self, timing: Arc<dyn TimingSource>) -> Self {
        self.timing = Some(timing);
        self
    }

    pub fn with_sequence_filter(mut self, filter: Arc<dyn SequenceFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Add an effect, offering it to attached listeners first.
    ///
    /// Returns `true` if the effect was stored, `false` if a listener
    /// consumed it.
    pub fn insert_effect(&self, effect: Effect) -> bool {
        let listeners: Vec<DataListener> = self.listeners.lock().iter().map(|(_, l)| l.clone()).collect();
        if listeners.iter().any(|listener| listener(&effect)) {
            tracing::trace!(show = %self.name, channel = %effect.channel, "effect consumed by listener");
            return false;
        }
        self.effects.write().push(effect);
        true
    }

    pub fn effects(&self) -> Vec<Effect> {
        self.effects.read().clone()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl fmt::Debug for Show {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Show")
            .field("name", &self.name)
            .field("length", &self.length)
            .field("effects", &self.effects.read().len())
            .field("media", &self.media.len())
            .finish_non_exhaustive()
    }
}

impl Sequence for Show {
    fn name(&self) -> &str {
        &self.name
    }

    fn length(&self) -> Duration {
        self.length
    }

    fn timing(&self) -> Option<Arc<dyn TimingSource>> {
        self.timing.clone()
    }

    fn media(&self) -> Vec<Arc<dyn Media>> {
        self.media.clone()
    }

    fn sequence_filters(&self) -> Vec<Arc<dyn SequenceFilter>> {
        self.filters.clone()
    }

    fn intents_at(&self, channel: ChannelId, position: Duration) -> Vec<Intent> {
        self.effects
            .read()
            .iter()
            .filter(|e| e.channel == channel && e.covers(position))
            .map(|e| e.intent)
            .collect()
    }

    fn attach_data_listener(&self, listener: DataListener) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, listener));
        id
    }

    fn detach_data_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }
}
