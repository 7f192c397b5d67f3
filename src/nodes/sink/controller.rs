//! Hardware controllers and their outputs

use crate::node::{ControllerId, OutputId};

/// A hardware device with a fixed number of physical outputs.
///
/// Each output becomes one controller output node in the patch graph, with a
/// single input and no outputs. What the device does with the values is up to
/// the hardware sink consuming the [`ControllerFrame`](crate::ControllerFrame).
#[derive(Clone, Debug)]
pub struct Controller {
    id: ControllerId,
    name: String,
    output_names: Vec<String>,
}

impl Controller {
    /// Create a controller whose outputs are named `"<name> [n]"`.
    pub fn new(id: ControllerId, name: impl Into<String>, output_count: u16) -> Self {
        let name = name.into();
        let output_names = (1..=output_count)
            .map(|n| format!("{} [{}]", name, n))
            .collect();
        Self {
            id,
            name,
            output_names,
        }
    }

    /// Rename one output. Empty names fall back to the default.
    pub fn with_output_name(mut self, index: u16, output_name: impl Into<String>) -> Self {
        let output_name = output_name.into();
        if let Some(slot) = self.output_names.get_mut(index as usize) {
            *slot = if output_name.is_empty() {
                format!("{} [{}]", self.name, index + 1)
            } else {
                output_name
            };
        }
        self
    }

    #[inline]
    pub fn id(&self) -> ControllerId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn output_count(&self) -> u16 {
        self.output_names.len() as u16
    }

    pub fn output_name(&self, index: u16) -> Option<&str> {
        self.output_names.get(index as usize).map(String::as_str)
    }

    pub fn outputs(&self) -> impl Iterator<Item = OutputId> + '_ {
        (0..self.output_count()).map(move |index| OutputId::new(self.id, index))
    }
}
