//! Scoped behavior overrides
//!
//! A [`ConfigStack`] holds a base [`Behavior`] plus any number of pushed
//! layers. Whoever pushes a layer gets a [`ConfigGuard`]; the layer lives
//! exactly as long as the guard does.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Behavior flags consulted by chains, tasks and the embedding frame loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Behavior {
    /// Pause the agent when the host window loses focus
    #[serde(rename = "pause-on-lost-focus")]
    pub pause_on_lost_focus: bool,

    /// Log the current task path whenever it changes
    #[serde(rename = "show-task-chains")]
    pub show_task_chains: bool,

    /// Keep the user chain alive with an idle task once its goal is done
    #[serde(rename = "idle-when-not-active")]
    pub idle_when_not_active: bool,

    /// Let the hazard chain pull the agent out of dangerous cells
    #[serde(rename = "hazard-avoidance")]
    pub hazard_avoidance: bool,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            pause_on_lost_focus: true,
            show_task_chains: true,
            idle_when_not_active: false,
            hazard_avoidance: true,
        }
    }
}

#[derive(Debug)]
struct StackInner {
    base: Behavior,
    layers: Vec<(u64, Behavior)>,
    next_id: u64,
}

impl StackInner {
    fn top_mut(&mut self) -> &mut Behavior {
        match self.layers.last_mut() {
            Some((_, layer)) => layer,
            None => &mut self.base,
        }
    }

    fn top(&self) -> &Behavior {
        self.layers.last().map(|(_, layer)| layer).unwrap_or(&self.base)
    }
}

/// Shared stack of behavior layers. Cloning yields another handle to the
/// same stack.
#[derive(Debug, Clone)]
pub struct ConfigStack {
    inner: Arc<Mutex<StackInner>>,
}

impl ConfigStack {
    pub fn new(base: Behavior) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StackInner {
                base,
                layers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Push a copy of the current top layer
    pub fn push(&self) -> ConfigGuard {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        let copy = inner.top().clone();
        inner.layers.push((id, copy));
        debug!(id, depth = inner.layers.len(), "ConfigStack::push: called");
        ConfigGuard {
            id,
            stack: Arc::downgrade(&self.inner),
        }
    }

    /// Modify the top layer (the base when nothing is pushed)
    pub fn update(&self, f: impl FnOnce(&mut Behavior)) {
        let mut inner = self.lock();
        f(inner.top_mut());
    }

    /// Effective behavior
    pub fn current(&self) -> Behavior {
        self.lock().top().clone()
    }

    /// Number of pushed layers
    pub fn depth(&self) -> usize {
        self.lock().layers.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StackInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ConfigStack {
    fn default() -> Self {
        Self::new(Behavior::default())
    }
}

/// Owner of one pushed layer; popping happens on drop
#[must_use = "dropping the guard pops the layer immediately"]
pub struct ConfigGuard {
    id: u64,
    stack: Weak<Mutex<StackInner>>,
}

impl ConfigGuard {
    /// Modify this guard's own layer
    pub fn update(&self, f: impl FnOnce(&mut Behavior)) {
        if let Some(stack) = self.stack.upgrade() {
            let mut inner = stack.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some((_, layer)) = inner.layers.iter_mut().find(|(id, _)| *id == self.id) {
                f(layer);
            }
        }
    }

    /// Pop the layer now
    pub fn pop(self) {}
}

impl Drop for ConfigGuard {
    fn drop(&mut self) {
        if let Some(stack) = self.stack.upgrade() {
            let mut inner = stack.lock().unwrap_or_else(PoisonError::into_inner);
            inner.layers.retain(|(id, _)| *id != self.id);
            debug!(id = self.id, depth = inner.layers.len(), "ConfigGuard::drop: popped");
        }
    }
}

impl std::fmt::Debug for ConfigGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigGuard").field("id", &self.id).finish()
    }
}
