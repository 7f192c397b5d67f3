//! Intent values and the data that flows along patch bindings.

use core::fmt;

/// A desired output color/level for one channel at one instant.
///
/// Components are normalized to `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Intent {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

impl Intent {
    pub const OFF: Intent = Intent {
        red: 0.0,
        green: 0.0,
        blue: 0.0,
    };

    /// Create an intent from color components, clamping each to `0.0..=1.0`.
    pub fn rgb(red: f32, green: f32, blue: f32) -> Self {
        Self {
            red: red.clamp(0.0, 1.0),
            green: green.clamp(0.0, 1.0),
            blue: blue.clamp(0.0, 1.0),
        }
    }

    /// A white intent at the given level.
    pub fn level(level: f32) -> Self {
        Self::rgb(level, level, level)
    }

    /// Brightness as the strongest component.
    #[inline]
    pub fn brightness(&self) -> f32 {
        self.red.max(self.green).max(self.blue)
    }
}

/// Tag identifying the value domain carried by a slot.
///
/// Both ends of a binding must agree on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataKind {
    SingleIntent,
    MultipleIntents,
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataKind::SingleIntent => f.write_str("single intent"),
            DataKind::MultipleIntents => f.write_str("multiple intents"),
        }
    }
}

/// A value travelling along a binding during one tick.
///
/// Slots that receive nothing this tick see `None` ("absent") instead.
#[derive(Clone, Debug, PartialEq)]
pub enum FlowData {
    Intent(Intent),
    Intents(Vec<Intent>),
}

impl FlowData {
    pub fn kind(&self) -> DataKind {
        match self {
            FlowData::Intent(_) => DataKind::SingleIntent,
            FlowData::Intents(_) => DataKind::MultipleIntents,
        }
    }

    /// Apply `f` to every intent, keeping the shape of the data.
    pub fn map(&self, f: impl Fn(Intent) -> Intent) -> FlowData {
        match self {
            FlowData::Intent(intent) => FlowData::Intent(f(*intent)),
            FlowData::Intents(intents) => {
                FlowData::Intents(intents.iter().copied().map(f).collect())
            }
        }
    }

    pub fn intents(&self) -> &[Intent] {
        match self {
            FlowData::Intent(intent) => core::slice::from_ref(intent),
            FlowData::Intents(intents) => intents,
        }
    }
}

impl From<Intent> for FlowData {
    fn from(intent: Intent) -> Self {
        FlowData::Intent(intent)
    }
}

impl From<Vec<Intent>> for FlowData {
    fn from(intents: Vec<Intent>) -> Self {
        FlowData::Intents(intents)
    }
}
