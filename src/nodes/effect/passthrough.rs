//! Identity filter

use crate::intent::{DataKind, FlowData};
use crate::node::{Filter, TickContext};

/// Copies its single input to its single output unchanged.
///
/// Absent stays absent.
#[derive(Clone, Copy, Debug)]
pub struct Passthrough {
    kind: DataKind,
}

impl Passthrough {
    pub fn new(kind: DataKind) -> Self {
        Self { kind }
    }
}

impl Default for Passthrough {
    fn default() -> Self {
        Self::new(DataKind::MultipleIntents)
    }
}

impl Filter for Passthrough {
    type Setup = ();

    fn input_kind(&self) -> DataKind {
        self.kind
    }

    fn output_kind(&self) -> DataKind {
        self.kind
    }

    #[inline]
    fn num_outputs(&self) -> usize {
        1
    }

    fn setup(&mut self, _setup: ()) {}

    fn handle(
        &mut self,
        _ctx: &TickContext,
        inputs: &[Option<FlowData>],
        outputs: &mut [Option<FlowData>],
    ) {
        if let (Some(input), Some(output)) = (inputs.first(), outputs.first_mut()) {
            *output = input.clone();
        }
    }
}
