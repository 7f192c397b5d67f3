//! Leuchtet - show playback and intent patching for lighting controllers
//!
//! Design principles:
//! - A sequence plays against a clock; the executor owns the lifecycle
//! - A background thread only *detects* the end of a run, the owner stops it
//! - Intents flow from channels through filters to controller outputs
//! - Filters receive configuration via setup ring buffers, never mid-pass
//! - Graph edits are checked up front and leave the graph untouched on error

mod config;
mod error;
mod executor;
mod graph;
mod intent;
mod media;
mod node;
mod patch;
mod registry;
mod sequence;
mod timing;
pub mod nodes;

pub use config::{ExecutorConfig, GraphConfig, DEFAULT_END_CHECK_INTERVAL};
pub use error::{BindingFault, ChannelError, Error, MediaError, PatchError, Result};
pub use executor::{ExecutorEvent, PlaybackState, SequenceExecutor};
pub use graph::{ControllerFrame, FilterHandle, PatchGraph, Tick};
pub use intent::{DataKind, FlowData, Intent};
pub use media::Media;
pub use node::{
    AnySetup, Binding, ChannelId, ControllerId, DynFilter, Filter, FilterId, NodeId, OutputId,
    TickContext,
};
pub use patch::SharedPatch;
pub use registry::{FilterFactory, FilterRegistry};
pub use sequence::{DataListener, Effect, ListenerId, Sequence, SequenceFilter, Show};
pub use timing::{StopwatchTiming, TimingSource};
