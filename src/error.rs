//! Error types for the executor and the patch graph.

use thiserror::Error;

use crate::intent::DataKind;
use crate::node::{ChannelId, NodeId};

/// Error type for crate-level operations (construction, configuration).
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Failed to spawn end-check thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;

/// Graph invariant violations.
///
/// Every operation that returns one of these leaves the graph exactly as it
/// was before the call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatchError {
    /// A node with this identity is already part of the graph. This points at
    /// a bookkeeping bug upstream of the graph.
    #[error("Node {0} is already registered")]
    DuplicateNode(NodeId),

    #[error("Invalid binding: {0}")]
    InvalidBinding(#[from] BindingFault),

    #[error("Binding {upstream} -> {downstream} would create a cycle")]
    Cycle { upstream: NodeId, downstream: NodeId },

    #[error("Data kind mismatch: {upstream} produces {produced}, {downstream} expects {expected}")]
    TypeMismatch {
        upstream: NodeId,
        produced: DataKind,
        downstream: NodeId,
        expected: DataKind,
    },

    #[error("Filter {0} must declare at least one input and one output")]
    FilterArity(NodeId),

    #[error("Unknown filter kind `{0}`")]
    UnknownFilterKind(String),

    #[error("Filter kind `{0}` is already registered")]
    DuplicateFilterKind(String),
}

/// Why a `connect` call was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingFault {
    #[error("node {0} is not part of the graph")]
    UnknownNode(NodeId),

    #[error("node {node} has {count} outputs, output {index} does not exist")]
    OutputOutOfRange { node: NodeId, index: usize, count: usize },

    #[error("node {node} has {count} inputs, input {index} does not exist")]
    InputOutOfRange { node: NodeId, index: usize, count: usize },

    #[error("input {index} of node {node} is already bound, disconnect it first")]
    InputOccupied { node: NodeId, index: usize },
}

/// Errors from editing a [`ChannelTree`](crate::nodes::source::ChannelTree).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Unknown channel {0}")]
    UnknownChannel(ChannelId),

    #[error("Channel {0} is a leaf and cannot hold children")]
    ParentIsLeaf(ChannelId),

    #[error("No channel ids left after {0}")]
    IdsExhausted(ChannelId),
}

/// A failure reported by a media participant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{media}: {message}")]
pub struct MediaError {
    pub media: String,
    pub message: String,
}

impl MediaError {
    pub fn new(media: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            media: media.into(),
            message: message.into(),
        }
    }
}
