//! Built-in patch graph nodes.
//!
//! Nodes are organized into three categories:
//!
//! ## Sources ([`source`])
//!
//! Seed the graph with intents and have no inputs:
//! - [`ChannelTree`] - Channel groups and the leaves that become channel nodes
//!
//! ## Effects ([`effect`])
//!
//! Transform intents (inputs → outputs):
//! - [`ColorFilter`] - Split intents into color components, one output each
//! - [`Passthrough`] - Copy the input unchanged
//!
//! ## Sinks ([`sink`])
//!
//! Consume intents and have no outputs:
//! - [`Controller`] - A hardware device whose outputs become controller output nodes
//!
//! # Setup Types
//!
//! Filters are reconfigured through their [`Setup`](crate::Filter::Setup) type:
//! - [`ColorFilter`] takes a `Vec<ColorComponent>` and resizes its outputs to match
//!
//! Filters without configuration (like [`Passthrough`]) use `()`.

pub mod source;
pub mod effect;
pub mod sink;

// Re-export common types at the top level for convenience
pub use source::ChannelTree;
pub use effect::{ColorComponent, ColorFilter, Passthrough};
pub use sink::Controller;
