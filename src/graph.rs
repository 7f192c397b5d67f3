//! Patch graph - owns data-flow nodes, their bindings and filter setup queues

use core::time::Duration;
use std::collections::BTreeMap;

use hashbrown::HashMap;
use itertools::Itertools;
use petgraph::algo::{has_path_connecting, toposort};
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rtrb::{Consumer, Producer, RingBuffer};
use tracing::{debug, error, trace};

use crate::config::GraphConfig;
use crate::error::{BindingFault, PatchError};
use crate::intent::{DataKind, FlowData};
use crate::node::{
    Binding, ChannelId, DynFilter, Filter, FilterId, NodeId, OutputId, TickContext,
};
use crate::nodes::sink::Controller;
use crate::nodes::source::ChannelTree;

/// Handle for sending setups to a filter in a [`PatchGraph`].
///
/// Setups are buffered in a lock-free ring buffer and applied before the next
/// evaluation pass (or on [`PatchGraph::apply_pending_setups`]). If the buffer
/// is full, [`FilterHandle::send`] returns `Err(setup)`.
pub struct FilterHandle<S: Send + 'static> {
    id: FilterId,
    sender: Producer<S>,
}

impl<S: Send + 'static> FilterHandle<S> {
    /// Queue a configuration replacement for the filter.
    ///
    /// Lock-free and safe to call from any thread.
    pub fn send(&mut self, setup: S) -> Result<(), S> {
        self.sender.push(setup).map_err(|rtrb::PushError::Full(s)| s)
    }

    pub fn id(&self) -> FilterId {
        self.id
    }
}

// Type-erased wrapper so we can store heterogeneous filters
trait ErasedFilter: Send {
    fn apply_setups(&mut self) -> usize;
    fn filter(&self) -> &dyn DynFilter;
    fn handle(&mut self, ctx: &TickContext, inputs: &[Option<FlowData>], outputs: &mut [Option<FlowData>]);
}

struct FilterWrapper<F: Filter> {
    filter: F,
    receiver: Consumer<F::Setup>,
}

impl<F: Filter> ErasedFilter for FilterWrapper<F> {
    fn apply_setups(&mut self) -> usize {
        // Split borrow to avoid conflict between receiver and filter
        let receiver = &mut self.receiver;
        let filter = &mut self.filter;

        let mut applied = 0;
        while let Ok(setup) = receiver.pop() {
            Filter::setup(filter, setup);
            applied += 1;
        }
        applied
    }

    fn filter(&self) -> &dyn DynFilter {
        &self.filter
    }

    fn handle(&mut self, ctx: &TickContext, inputs: &[Option<FlowData>], outputs: &mut [Option<FlowData>]) {
        Filter::handle(&mut self.filter, ctx, inputs, outputs);
    }
}

enum NodeKind {
    Channel,
    Filter(Box<dyn ErasedFilter>),
    Output,
}

struct NodeSlot {
    id: NodeId,
    kind: NodeKind,
    inputs: Vec<Option<Binding>>,
}

impl NodeSlot {
    fn num_outputs(&self) -> usize {
        match &self.kind {
            NodeKind::Channel => 1,
            NodeKind::Filter(f) => f.filter().num_outputs(),
            NodeKind::Output => 0,
        }
    }

    fn output_kind(&self) -> Option<DataKind> {
        match &self.kind {
            NodeKind::Channel => Some(DataKind::MultipleIntents),
            NodeKind::Filter(f) => Some(f.filter().output_kind()),
            NodeKind::Output => None,
        }
    }

    fn input_kind(&self) -> Option<DataKind> {
        match &self.kind {
            NodeKind::Channel => None,
            NodeKind::Filter(f) => Some(f.filter().input_kind()),
            NodeKind::Output => Some(DataKind::MultipleIntents),
        }
    }

    fn input_names(&self) -> Vec<String> {
        match &self.kind {
            NodeKind::Channel => Vec::new(),
            NodeKind::Filter(f) => (0..self.inputs.len()).map(|i| f.filter().input_name(i)).collect(),
            NodeKind::Output => vec![String::from("Input")],
        }
    }

    fn output_names(&self) -> Vec<String> {
        match &self.kind {
            NodeKind::Channel => vec![String::from("Intents")],
            NodeKind::Filter(f) => (0..self.num_outputs()).map(|i| f.filter().output_name(i)).collect(),
            NodeKind::Output => Vec::new(),
        }
    }
}

/// Edge weight: which output of the source feeds which input of the target.
#[derive(Clone, Copy, Debug)]
struct Patch {
    output: usize,
    input: usize,
}

/// The intent values a tick seeds into the graph, keyed by channel.
#[derive(Clone, Debug, Default)]
pub struct Tick {
    position: Duration,
    channels: HashMap<ChannelId, FlowData>,
}

impl Tick {
    pub fn new(position: Duration) -> Self {
        Self {
            position,
            channels: HashMap::new(),
        }
    }

    /// Set the value a channel emits this tick (builder pattern).
    pub fn with(mut self, channel: ChannelId, data: impl Into<FlowData>) -> Self {
        self.insert(channel, data);
        self
    }

    pub fn insert(&mut self, channel: ChannelId, data: impl Into<FlowData>) {
        self.channels.insert(channel, data.into());
    }

    pub fn channel(&self, channel: ChannelId) -> Option<&FlowData> {
        self.channels.get(&channel)
    }

    #[inline]
    pub fn position(&self) -> Duration {
        self.position
    }
}

/// What every controller output received during one evaluation pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ControllerFrame {
    position: Duration,
    values: BTreeMap<OutputId, Option<FlowData>>,
}

impl ControllerFrame {
    #[inline]
    pub fn position(&self) -> Duration {
        self.position
    }

    /// The value at `output`, or `None` if it was absent or the output is unknown.
    pub fn get(&self, output: OutputId) -> Option<&FlowData> {
        self.values.get(&output)?.as_ref()
    }

    pub fn contains(&self, output: OutputId) -> bool {
        self.values.contains_key(&output)
    }

    /// Every controller output in id order.
    pub fn iter(&self) -> impl Iterator<Item = (OutputId, Option<&FlowData>)> {
        self.values.iter().map(|(id, value)| (*id, value.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

type InnerGraph = StableDiGraph<NodeSlot, Patch>;

/// The live-editable data-flow graph of channels, filters and controller outputs.
///
/// Bindings are kept twice: on each node's input slots and as graph edges.
/// Every mutation updates both, and every failed mutation leaves both
/// untouched.
///
/// ```
/// use leuchtet::{ChannelId, ControllerId, FilterId, FlowData, Intent, OutputId, PatchGraph, Tick};
/// use leuchtet::nodes::Passthrough;
///
/// let mut graph = PatchGraph::new();
/// let channel = ChannelId(0);
/// let output = OutputId::new(ControllerId(0), 0);
///
/// graph.register_channel(channel)?;
/// graph.add_filter(FilterId(0), Passthrough::default())?;
/// graph.register_output(output)?;
///
/// graph.connect(channel, 0, FilterId(0), 0)?;
/// graph.connect(FilterId(0), 0, output, 0)?;
///
/// let tick = Tick::new(Default::default()).with(channel, vec![Intent::level(1.0)]);
/// let frame = graph.evaluate(&tick);
/// assert_eq!(frame.get(output), Some(&FlowData::Intents(vec![Intent::level(1.0)])));
/// # Ok::<(), leuchtet::PatchError>(())
/// ```
pub struct PatchGraph {
    graph: InnerGraph,
    node_indices: HashMap<NodeId, NodeIndex>,
    /// Cached evaluation order, invalidated by every edge or node change
    order: Option<Vec<NodeIndex>>,
    /// Per-pass output values, reused between passes
    values: HashMap<NodeIndex, Vec<Option<FlowData>>>,
    config: GraphConfig,
}

impl Default for PatchGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl PatchGraph {
    pub fn new() -> Self {
        Self::build(GraphConfig::default())
    }

    pub fn with_config(config: GraphConfig) -> crate::Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: GraphConfig) -> Self {
        Self {
            graph: InnerGraph::with_capacity(config.capacity, config.capacity),
            node_indices: HashMap::with_capacity(config.capacity),
            order: None,
            values: HashMap::with_capacity(config.capacity),
            config,
        }
    }

    fn insert(&mut self, id: NodeId, kind: NodeKind, inputs: usize) -> Result<NodeIndex, PatchError> {
        if self.node_indices.contains_key(&id) {
            error!(node = %id, "duplicate node registration");
            return Err(PatchError::DuplicateNode(id));
        }

        let idx = self.graph.add_node(NodeSlot {
            id,
            kind,
            inputs: vec![None; inputs],
        });
        self.node_indices.insert(id, idx);
        self.order = None;
        trace!(node = %id, "registered node");
        Ok(idx)
    }

    fn ensure_absent<'a>(&self, ids: impl IntoIterator<Item = &'a NodeId>) -> Result<(), PatchError> {
        for id in ids {
            if self.node_indices.contains_key(id) {
                error!(node = %id, "duplicate node registration");
                return Err(PatchError::DuplicateNode(*id));
            }
        }
        Ok(())
    }

    /// Add a channel node. Channels have one output and no inputs.
    pub fn register_channel(&mut self, channel: ChannelId) -> Result<(), PatchError> {
        self.insert(NodeId::Channel(channel), NodeKind::Channel, 0).map(|_| ())
    }

    /// Add a channel node for every leaf of `tree`.
    ///
    /// Either every leaf is registered or, on a duplicate, none is.
    pub fn register_channels(&mut self, tree: &ChannelTree) -> Result<Vec<ChannelId>, PatchError> {
        let leaves = tree.leaves();
        let ids: Vec<NodeId> = leaves.iter().map(|c| NodeId::Channel(*c)).collect();
        self.ensure_absent(&ids)?;
        for id in ids {
            self.insert(id, NodeKind::Channel, 0)?;
        }
        Ok(leaves)
    }

    /// Add a controller output node. Outputs have one input and no outputs.
    pub fn register_output(&mut self, output: OutputId) -> Result<(), PatchError> {
        self.insert(NodeId::Output(output), NodeKind::Output, 1).map(|_| ())
    }

    /// Add an output node for every output of `controller`.
    ///
    /// Either every output is registered or, on a duplicate, none is.
    pub fn register_controller(&mut self, controller: &Controller) -> Result<(), PatchError> {
        let ids: Vec<NodeId> = controller.outputs().map(NodeId::Output).collect();
        self.ensure_absent(&ids)?;
        for id in ids {
            self.insert(id, NodeKind::Output, 1)?;
        }
        Ok(())
    }

    /// Add a filter, returning a handle for sending it setups.
    ///
    /// A filter needs at least one input and one output when added. Later
    /// setups may change its output count.
    pub fn add_filter<F: Filter>(&mut self, id: FilterId, filter: F) -> Result<FilterHandle<F::Setup>, PatchError> {
        let node = NodeId::Filter(id);
        let inputs = Filter::num_inputs(&filter);
        if inputs == 0 || Filter::num_outputs(&filter) == 0 {
            return Err(PatchError::FilterArity(node));
        }

        let (producer, consumer) = RingBuffer::new(self.config.setup_queue_size);
        let wrapper = FilterWrapper {
            filter,
            receiver: consumer,
        };
        self.insert(node, NodeKind::Filter(Box::new(wrapper)), inputs)?;

        Ok(FilterHandle { id, sender: producer })
    }

    pub fn contains(&self, node: impl Into<NodeId>) -> bool {
        self.node_indices.contains_key(&node.into())
    }

    pub fn len(&self) -> usize {
        self.node_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_indices.is_empty()
    }

    /// Every node id, in id order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.node_indices.keys().copied().sorted().collect()
    }

    /// Every registered channel, in id order.
    pub fn channel_ids(&self) -> Vec<ChannelId> {
        self.node_indices
            .keys()
            .filter_map(|id| match id {
                NodeId::Channel(channel) => Some(*channel),
                _ => None,
            })
            .sorted()
            .collect()
    }

    pub fn input_names(&self, node: impl Into<NodeId>) -> Option<Vec<String>> {
        let idx = self.node_indices.get(&node.into())?;
        Some(self.graph[*idx].input_names())
    }

    pub fn output_names(&self, node: impl Into<NodeId>) -> Option<Vec<String>> {
        let idx = self.node_indices.get(&node.into())?;
        Some(self.graph[*idx].output_names())
    }

    /// The binding held by `input` of `node`, if any.
    pub fn binding(&self, node: impl Into<NodeId>, input: usize) -> Option<Binding> {
        let idx = self.node_indices.get(&node.into())?;
        self.graph[*idx].inputs.get(input).copied().flatten()
    }

    /// Every `(destination, input)` currently fed by `source`.
    pub fn dependents(&self, source: impl Into<NodeId>) -> Vec<(NodeId, usize)> {
        let idx = match self.node_indices.get(&source.into()) {
            Some(idx) => *idx,
            None => return Vec::new(),
        };
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (self.graph[e.target()].id, e.weight().input))
            .sorted()
            .collect()
    }

    /// Every binding as `(destination, input, binding)`, in destination order.
    pub fn bindings(&self) -> Vec<(NodeId, usize, Binding)> {
        self.graph
            .node_indices()
            .map(|idx| &self.graph[idx])
            .flat_map(|slot| {
                slot.inputs
                    .iter()
                    .enumerate()
                    .filter_map(move |(input, b)| b.map(|b| (slot.id, input, b)))
            })
            .sorted_by_key(|(node, input, _)| (*node, *input))
            .collect()
    }

    fn index_of(&self, id: NodeId) -> Result<NodeIndex, PatchError> {
        self.node_indices
            .get(&id)
            .copied()
            .ok_or(PatchError::InvalidBinding(BindingFault::UnknownNode(id)))
    }

    /// Bind output `output` of `source` to input `input` of `destination`.
    ///
    /// Fails without touching the graph if either node is unknown, an index is
    /// out of range, the input is already bound, the data kinds disagree, or
    /// the binding would close a cycle.
    pub fn connect(
        &mut self,
        source: impl Into<NodeId>,
        output: usize,
        destination: impl Into<NodeId>,
        input: usize,
    ) -> Result<(), PatchError> {
        let (source, destination) = (source.into(), destination.into());
        let src = self.index_of(source)?;
        let dst = self.index_of(destination)?;

        let src_slot = &self.graph[src];
        let dst_slot = &self.graph[dst];

        let count = src_slot.num_outputs();
        if output >= count {
            return Err(BindingFault::OutputOutOfRange { node: source, index: output, count }.into());
        }
        let count = dst_slot.inputs.len();
        if input >= count {
            return Err(BindingFault::InputOutOfRange { node: destination, index: input, count }.into());
        }
        if dst_slot.inputs[input].is_some() {
            return Err(BindingFault::InputOccupied { node: destination, index: input }.into());
        }

        if let (Some(produced), Some(expected)) = (src_slot.output_kind(), dst_slot.input_kind()) {
            if produced != expected {
                return Err(PatchError::TypeMismatch {
                    upstream: source,
                    produced,
                    downstream: destination,
                    expected,
                });
            }
        }

        // The new edge closes a cycle iff the source is already reachable from the destination
        if has_path_connecting(&self.graph, dst, src, None) {
            return Err(PatchError::Cycle {
                upstream: source,
                downstream: destination,
            });
        }

        self.graph.add_edge(src, dst, Patch { output, input });
        self.graph[dst].inputs[input] = Some(Binding { source, output });
        self.order = None;

        debug!(%source, output, %destination, input, "connected");
        Ok(())
    }

    /// Clear the binding on `input` of `destination`.
    ///
    /// Returns the binding that was removed. Disconnecting an unbound input
    /// (or an unknown node) does nothing.
    pub fn disconnect(&mut self, destination: impl Into<NodeId>, input: usize) -> Option<Binding> {
        let destination = destination.into();
        let dst = *self.node_indices.get(&destination)?;
        let removed = self.unbind(dst, input);
        if let Some(binding) = removed {
            debug!(source = %binding.source, output = binding.output, %destination, input, "disconnected");
        }
        removed
    }

    fn unbind(&mut self, dst: NodeIndex, input: usize) -> Option<Binding> {
        let binding = self.graph[dst].inputs.get_mut(input)?.take()?;

        let edge = self
            .graph
            .edges_directed(dst, Direction::Incoming)
            .find(|e| e.weight().input == input)
            .map(|e| e.id());
        if let Some(edge) = edge {
            self.graph.remove_edge(edge);
        }

        self.order = None;
        Some(binding)
    }

    /// Remove a node, unbinding everything it feeds first.
    ///
    /// Returns `false` if the node was not part of the graph.
    pub fn remove(&mut self, node: impl Into<NodeId>) -> bool {
        let id = node.into();
        let idx = match self.node_indices.get(&id) {
            Some(idx) => *idx,
            None => return false,
        };

        let dependents: Vec<(NodeIndex, usize)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.target(), e.weight().input))
            .collect();
        for (dst, input) in dependents {
            self.unbind(dst, input);
        }

        self.graph.remove_node(idx);
        self.node_indices.remove(&id);
        self.values.remove(&idx);
        self.order = None;

        debug!(node = %id, "removed node");
        true
    }

    /// Remove every output node of a controller. Returns how many were removed.
    pub fn remove_controller(&mut self, controller: &Controller) -> usize {
        controller.outputs().filter(|output| self.remove(*output)).count()
    }

    /// Apply every queued filter setup now.
    ///
    /// Bindings from outputs that no longer exist after a setup are
    /// disconnected. Returns the number of setups applied.
    pub fn apply_pending_setups(&mut self) -> usize {
        let indices: Vec<NodeIndex> = self.graph.node_indices().collect();
        let mut applied = 0;

        for idx in indices {
            let (count, outputs, inputs) = match &mut self.graph[idx].kind {
                NodeKind::Filter(f) => {
                    let count = f.apply_setups();
                    (count, f.filter().num_outputs(), f.filter().num_inputs())
                }
                _ => continue,
            };
            if count == 0 {
                continue;
            }
            applied += count;

            let stale: Vec<(NodeIndex, usize)> = self
                .graph
                .edges_directed(idx, Direction::Outgoing)
                .filter(|e| e.weight().output >= outputs)
                .map(|e| (e.target(), e.weight().input))
                .collect();
            for (dst, input) in stale {
                if let Some(binding) = self.unbind(dst, input) {
                    debug!(source = %binding.source, output = binding.output, "output removed by setup, disconnected");
                }
            }

            let current = self.graph[idx].inputs.len();
            for input in inputs..current {
                self.unbind(idx, input);
            }
            self.graph[idx].inputs.resize(inputs, None);
        }

        applied
    }

    /// The order nodes are evaluated in: every source before its destinations.
    pub fn evaluation_order(&mut self) -> Vec<NodeId> {
        let order = match self.order.take() {
            Some(order) => order,
            None => self.compute_order(),
        };
        let ids = order.iter().map(|idx| self.graph[*idx].id).collect();
        self.order = Some(order);
        ids
    }

    fn compute_order(&self) -> Vec<NodeIndex> {
        match toposort(&self.graph, None) {
            Ok(order) => order,
            Err(cycle) => {
                error!(node = %self.graph[cycle.node_id()].id, "patch graph contains a cycle");
                Vec::new()
            }
        }
    }

    /// Run one evaluation pass.
    ///
    /// Queued setups are applied first. Channels emit what `tick` holds for
    /// them (absent if nothing), filters see absent values on unbound inputs,
    /// and every controller output reports what reached its input.
    pub fn evaluate(&mut self, tick: &Tick) -> ControllerFrame {
        self.apply_pending_setups();

        let order = match self.order.take() {
            Some(order) => order,
            None => self.compute_order(),
        };

        let ctx = TickContext {
            position: tick.position(),
        };
        let mut frame = ControllerFrame {
            position: tick.position(),
            values: BTreeMap::new(),
        };
        self.values.clear();

        for &idx in &order {
            let inputs: Vec<Option<FlowData>> = self.graph[idx]
                .inputs
                .iter()
                .map(|b| b.and_then(|b| self.read(b)))
                .collect();

            let slot = &mut self.graph[idx];
            let outputs = match (&slot.id, &mut slot.kind) {
                (NodeId::Channel(channel), NodeKind::Channel) => vec![tick.channel(*channel).cloned()],
                (_, NodeKind::Filter(filter)) => {
                    let mut outputs = vec![None; filter.filter().num_outputs()];
                    filter.handle(&ctx, &inputs, &mut outputs);
                    outputs
                }
                (NodeId::Output(output), NodeKind::Output) => {
                    frame.values.insert(*output, inputs.into_iter().next().flatten());
                    continue;
                }
                _ => continue,
            };
            self.values.insert(idx, outputs);
        }

        self.order = Some(order);
        frame
    }

    fn read(&self, binding: Binding) -> Option<FlowData> {
        let idx = self.node_indices.get(&binding.source)?;
        self.values.get(idx)?.get(binding.output)?.clone()
    }
}
