//! Runtime-selectable filter kinds

use hashbrown::HashMap;
use itertools::Itertools;

use crate::error::PatchError;
use crate::node::{DynFilter, Filter};
use crate::nodes::{ColorFilter, Passthrough};

/// Builds a fresh filter instance of one kind.
pub type FilterFactory = Box<dyn Fn() -> Box<dyn DynFilter> + Send + Sync>;

struct FilterKind {
    description: String,
    factory: FilterFactory,
}

/// Filter factories keyed by a stable string identifier.
///
/// Populated once at startup and then used to build filters by name, e.g.
/// when a stored patch refers to filter kinds rather than Rust types.
/// Filters created here are `Box<dyn DynFilter>`, which can be added to a
/// [`PatchGraph`](crate::PatchGraph) like any other filter; their setups are
/// sent as [`AnySetup`](crate::AnySetup) values.
pub struct FilterRegistry {
    kinds: HashMap<String, FilterKind>,
}

impl Default for FilterRegistry {
    /// A registry holding the built-in kinds.
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl FilterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            kinds: HashMap::new(),
        }
    }

    /// A registry with the `color` and `passthrough` kinds.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.kinds.insert(
            String::from("color"),
            FilterKind {
                description: String::from("Splits intents into red, green, blue, yellow or white"),
                factory: Box::new(|| Box::new(ColorFilter::default()) as Box<dyn DynFilter>),
            },
        );
        registry.kinds.insert(
            String::from("passthrough"),
            FilterKind {
                description: String::from("Copies its input to its output unchanged"),
                factory: Box::new(|| Box::new(Passthrough::default()) as Box<dyn DynFilter>),
            },
        );
        registry
    }

    /// Register a filter type built with `Default::default()`.
    pub fn register<F: Filter + Default>(
        &mut self,
        kind: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<(), PatchError> {
        self.register_with(kind, description, || Box::new(F::default()) as Box<dyn DynFilter>)
    }

    /// Register a filter kind with a custom factory.
    pub fn register_with<G>(
        &mut self,
        kind: impl Into<String>,
        description: impl Into<String>,
        factory: G,
    ) -> Result<(), PatchError>
    where
        G: Fn() -> Box<dyn DynFilter> + Send + Sync + 'static,
    {
        let kind = kind.into();
        if self.kinds.contains_key(&kind) {
            return Err(PatchError::DuplicateFilterKind(kind));
        }

        tracing::debug!(%kind, "registered filter kind");
        self.kinds.insert(
            kind,
            FilterKind {
                description: description.into(),
                factory: Box::new(factory),
            },
        );
        Ok(())
    }

    /// Build a new filter of the given kind.
    pub fn create(&self, kind: &str) -> Result<Box<dyn DynFilter>, PatchError> {
        self.kinds
            .get(kind)
            .map(|k| (k.factory)())
            .ok_or_else(|| PatchError::UnknownFilterKind(kind.to_string()))
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.kinds.contains_key(kind)
    }

    pub fn description(&self, kind: &str) -> Option<&str> {
        self.kinds.get(kind).map(|k| k.description.as_str())
    }

    /// Every registered kind, sorted.
    pub fn available(&self) -> Vec<&str> {
        self.kinds.keys().map(String::as_str).sorted().collect()
    }
}
