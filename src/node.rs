//! Node identities and the filter trait.

use core::any::Any;
use core::fmt;
use core::time::Duration;

use crate::intent::{DataKind, FlowData};

/// Identity of a channel in a [`ChannelTree`](crate::nodes::source::ChannelTree).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ChannelId(pub u32);

/// Identity of a filter instance.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct FilterId(pub u32);

/// Identity of a hardware controller.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ControllerId(pub u32);

/// One physical output on a controller.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct OutputId {
    pub controller: ControllerId,
    pub index: u16,
}

impl OutputId {
    pub fn new(controller: ControllerId, index: u16) -> Self {
        Self { controller, index }
    }
}

/// Identity of a node in a [`PatchGraph`](crate::PatchGraph).
///
/// The variant doubles as the node's role: channels only produce, controller
/// outputs only consume, filters do both.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum NodeId {
    Channel(ChannelId),
    Filter(FilterId),
    Output(OutputId),
}

impl From<ChannelId> for NodeId {
    fn from(id: ChannelId) -> Self {
        NodeId::Channel(id)
    }
}

impl From<FilterId> for NodeId {
    fn from(id: FilterId) -> Self {
        NodeId::Filter(id)
    }
}

impl From<OutputId> for NodeId {
    fn from(id: OutputId) -> Self {
        NodeId::Output(id)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel#{}", self.0)
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "filter#{}", self.0)
    }
}

impl fmt::Display for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "controller#{}[{}]", self.controller.0, self.index)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Channel(id) => id.fmt(f),
            NodeId::Filter(id) => id.fmt(f),
            NodeId::Output(id) => id.fmt(f),
        }
    }
}

/// The upstream end of a patch: which node, and which of its outputs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Binding {
    pub source: NodeId,
    pub output: usize,
}

/// Information available while a filter handles a tick.
#[derive(Clone, Copy, Debug)]
pub struct TickContext {
    /// Sequence position this tick was sampled at.
    pub position: Duration,
}

/// A transform stage in the patch graph.
///
/// Filters never touch their configuration during evaluation on their own.
/// New configuration arrives as a [`Setup`](Filter::Setup) value sent through
/// a [`FilterHandle`](crate::FilterHandle); the graph applies queued setups
/// before the next evaluation pass, never in the middle of one.
///
/// ```
/// use leuchtet::{DataKind, Filter, FlowData, Intent, TickContext};
///
/// /// Scales every intent by a fixed level.
/// struct Dimmer {
///     level: f32,
/// }
///
/// impl Filter for Dimmer {
///     type Setup = f32;
///
///     fn input_kind(&self) -> DataKind { DataKind::MultipleIntents }
///     fn output_kind(&self) -> DataKind { DataKind::MultipleIntents }
///     fn num_outputs(&self) -> usize { 1 }
///
///     fn setup(&mut self, level: f32) {
///         self.level = level.clamp(0.0, 1.0);
///     }
///
///     fn handle(
///         &mut self,
///         _ctx: &TickContext,
///         inputs: &[Option<FlowData>],
///         outputs: &mut [Option<FlowData>],
///     ) {
///         let level = self.level;
///         // Absent in, absent out.
///         outputs[0] = inputs[0].as_ref().map(|data| {
///             data.map(|i| Intent::rgb(i.red * level, i.green * level, i.blue * level))
///         });
///     }
/// }
/// ```
pub trait Filter: Send + 'static {
    /// Configuration replacement accepted by [`setup`](Filter::setup).
    ///
    /// Use `()` for filters without configuration.
    type Setup: Send + 'static;

    /// Data kind accepted on every input.
    fn input_kind(&self) -> DataKind;

    /// Data kind produced on every output.
    fn output_kind(&self) -> DataKind;

    /// Number of input slots. Must be at least one.
    fn num_inputs(&self) -> usize {
        1
    }

    /// Number of output slots under the current configuration.
    fn num_outputs(&self) -> usize;

    fn input_name(&self, index: usize) -> String {
        format!("Input {}", index + 1)
    }

    fn output_name(&self, index: usize) -> String {
        format!("Output {}", index + 1)
    }

    /// Replace the configuration.
    fn setup(&mut self, setup: Self::Setup);

    /// Transform one tick's inputs into outputs.
    ///
    /// `inputs` has [`num_inputs`](Filter::num_inputs) entries, `None` for an
    /// unbound or absent input. `outputs` has
    /// [`num_outputs`](Filter::num_outputs) entries, all `None` on entry.
    fn handle(
        &mut self,
        ctx: &TickContext,
        inputs: &[Option<FlowData>],
        outputs: &mut [Option<FlowData>],
    );
}

/// Type-erased setup value used by [`DynFilter`].
pub type AnySetup = Box<dyn Any + Send>;

/// Object-safe form of [`Filter`], produced by the
/// [`FilterRegistry`](crate::FilterRegistry).
///
/// Every `Filter` is a `DynFilter`; `Box<dyn DynFilter>` is itself a
/// `Filter` whose setup is an [`AnySetup`] that must downcast to the
/// concrete filter's `Setup` type.
pub trait DynFilter: Send {
    fn input_kind(&self) -> DataKind;
    fn output_kind(&self) -> DataKind;
    fn num_inputs(&self) -> usize;
    fn num_outputs(&self) -> usize;
    fn input_name(&self, index: usize) -> String;
    fn output_name(&self, index: usize) -> String;

    /// Apply a setup, handing it back if it has the wrong type.
    fn setup_any(&mut self, setup: AnySetup) -> Result<(), AnySetup>;

    fn handle(
        &mut self,
        ctx: &TickContext,
        inputs: &[Option<FlowData>],
        outputs: &mut [Option<FlowData>],
    );
}

impl<F: Filter> DynFilter for F {
    fn input_kind(&self) -> DataKind {
        Filter::input_kind(self)
    }

    fn output_kind(&self) -> DataKind {
        Filter::output_kind(self)
    }

    fn num_inputs(&self) -> usize {
        Filter::num_inputs(self)
    }

    fn num_outputs(&self) -> usize {
        Filter::num_outputs(self)
    }

    fn input_name(&self, index: usize) -> String {
        Filter::input_name(self, index)
    }

    fn output_name(&self, index: usize) -> String {
        Filter::output_name(self, index)
    }

    fn setup_any(&mut self, setup: AnySetup) -> Result<(), AnySetup> {
        let setup = setup.downcast::<F::Setup>()?;
        Filter::setup(self, *setup);
        Ok(())
    }

    fn handle(
        &mut self,
        ctx: &TickContext,
        inputs: &[Option<FlowData>],
        outputs: &mut [Option<FlowData>],
    ) {
        Filter::handle(self, ctx, inputs, outputs)
    }
}

impl Filter for Box<dyn DynFilter> {
    type Setup = AnySetup;

    fn input_kind(&self) -> DataKind {
        (**self).input_kind()
    }

    fn output_kind(&self) -> DataKind {
        (**self).output_kind()
    }

    fn num_inputs(&self) -> usize {
        (**self).num_inputs()
    }

    fn num_outputs(&self) -> usize {
        (**self).num_outputs()
    }

    fn input_name(&self, index: usize) -> String {
        (**self).input_name(index)
    }

    fn output_name(&self, index: usize) -> String {
        (**self).output_name(index)
    }

    fn setup(&mut self, setup: AnySetup) {
        if (**self).setup_any(setup).is_err() {
            tracing::warn!("ignoring filter setup of the wrong type");
        }
    }

    fn handle(
        &mut self,
        ctx: &TickContext,
        inputs: &[Option<FlowData>],
        outputs: &mut [Option<FlowData>],
    ) {
        (**self).handle(ctx, inputs, outputs)
    }
}
