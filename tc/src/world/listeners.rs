//! Cell-loaded listener registry and RAII subscriptions

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tracing::debug;

use crate::domain::CellPos;

/// Callback invoked with each newly loaded cell
pub type CellListener = Arc<dyn Fn(CellPos) + Send + Sync>;

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    listeners: BTreeMap<u64, CellListener>,
}

/// Thread-safe set of cell-loaded listeners
///
/// Sensor implementations embed one of these and call [`notify`](Self::notify)
/// from whatever thread delivers cell data.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: CellListener) -> Subscription {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.insert(id, listener);
        debug!(id, count = inner.listeners.len(), "ListenerRegistry::subscribe: registered");
        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Call every listener with `cell`.
    ///
    /// Listeners run after the registry lock is released, so they may
    /// subscribe or unsubscribe without deadlocking.
    pub fn notify(&self, cell: CellPos) {
        let listeners: Vec<CellListener> = {
            let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner.listeners.values().cloned().collect()
        };
        for listener in listeners {
            listener(cell);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Registration handle; unregisters its listener when dropped
#[must_use = "dropping a subscription unregisters the listener"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<RegistryInner>>,
}

impl Subscription {
    /// Unregister now
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut inner = registry.lock().unwrap_or_else(PoisonError::into_inner);
            inner.listeners.remove(&self.id);
            debug!(id = self.id, "Subscription::drop: unregistered");
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
