//! Color component filter

use crate::intent::{DataKind, FlowData, Intent};
use crate::node::{Filter, TickContext};

/// A single sub-transform of the [`ColorFilter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorComponent {
    /// Keep only the red component
    Red,
    /// Keep only the green component
    Green,
    /// Keep only the blue component
    Blue,
    /// Keep the part shared by red and green
    Yellow,
    /// Keep the part shared by all three components
    White,
    /// Leave the intent untouched
    PassThrough,
}

impl ColorComponent {
    pub fn name(self) -> &'static str {
        match self {
            ColorComponent::Red => "Red",
            ColorComponent::Green => "Green",
            ColorComponent::Blue => "Blue",
            ColorComponent::Yellow => "Yellow",
            ColorComponent::White => "White",
            ColorComponent::PassThrough => "Pass-through",
        }
    }

    pub fn isolate(self, intent: Intent) -> Intent {
        let Intent { red, green, blue } = intent;
        match self {
            ColorComponent::Red => Intent::rgb(red, 0.0, 0.0),
            ColorComponent::Green => Intent::rgb(0.0, green, 0.0),
            ColorComponent::Blue => Intent::rgb(0.0, 0.0, blue),
            ColorComponent::Yellow => {
                let yellow = red.min(green);
                Intent::rgb(yellow, yellow, 0.0)
            }
            ColorComponent::White => Intent::level(red.min(green).min(blue)),
            ColorComponent::PassThrough => intent,
        }
    }
}

/// Splits incoming intents into color components, one output per component.
///
/// The output arity equals the length of the configured component list, so
/// an empty list yields a filter with no outputs. An absent input produces
/// absent values on every output.
#[derive(Clone, Debug)]
pub struct ColorFilter {
    components: Vec<ColorComponent>,
}

impl ColorFilter {
    pub fn new(components: Vec<ColorComponent>) -> Self {
        Self { components }
    }

    /// Red, green and blue outputs, in that order.
    pub fn rgb() -> Self {
        Self::new(vec![
            ColorComponent::Red,
            ColorComponent::Green,
            ColorComponent::Blue,
        ])
    }

    #[inline]
    pub fn components(&self) -> &[ColorComponent] {
        &self.components
    }
}

impl Default for ColorFilter {
    fn default() -> Self {
        Self::rgb()
    }
}

impl Filter for ColorFilter {
    type Setup = Vec<ColorComponent>;

    fn input_kind(&self) -> DataKind {
        DataKind::MultipleIntents
    }

    fn output_kind(&self) -> DataKind {
        DataKind::MultipleIntents
    }

    #[inline]
    fn num_outputs(&self) -> usize {
        self.components.len()
    }

    fn output_name(&self, index: usize) -> String {
        self.components
            .get(index)
            .map(|c| c.name().to_string())
            .unwrap_or_default()
    }

    fn setup(&mut self, components: Vec<ColorComponent>) {
        self.components = components;
    }

    fn handle(
        &mut self,
        _ctx: &TickContext,
        inputs: &[Option<FlowData>],
        outputs: &mut [Option<FlowData>],
    ) {
        let input = match inputs.first() {
            Some(Some(input)) => input,
            _ => return,
        };

        for (output, component) in outputs.iter_mut().zip(self.components.iter()) {
            *output = Some(input.map(|intent| component.isolate(intent)));
        }
    }
}
