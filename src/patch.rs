//! A patch graph shared between an editor and the playback thread.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::graph::{ControllerFrame, PatchGraph, Tick};

/// Cloneable, lock-guarded handle to a [`PatchGraph`].
///
/// Edits and evaluation passes are serialized by the lock, so an edit never
/// lands in the middle of a pass.
#[derive(Clone, Default)]
pub struct SharedPatch {
    inner: Arc<Mutex<PatchGraph>>,
}

impl SharedPatch {
    pub fn new(graph: PatchGraph) -> Self {
        Self {
            inner: Arc::new(Mutex::new(graph)),
        }
    }

    /// Run `f` with exclusive access to the graph.
    pub fn edit<R>(&self, f: impl FnOnce(&mut PatchGraph) -> R) -> R {
        let mut graph = self.inner.lock();
        f(&mut graph)
    }

    pub fn evaluate(&self, tick: &Tick) -> ControllerFrame {
        self.inner.lock().evaluate(tick)
    }
}

impl From<PatchGraph> for SharedPatch {
    fn from(graph: PatchGraph) -> Self {
        Self::new(graph)
    }
}
