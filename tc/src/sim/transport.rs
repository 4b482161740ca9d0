//! Recording transport

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::dispatch::DispatchError;
use crate::world::Transport;

#[derive(Debug, Default)]
struct Shared {
    sent: Mutex<Vec<String>>,
    failure: Mutex<Option<String>>,
    unavailable: AtomicBool,
}

/// Transport that records every line instead of sending it anywhere
#[derive(Debug, Default)]
pub struct SimTransport {
    shared: Arc<Shared>,
}

impl SimTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for inspecting and steering the transport after it has been
    /// moved into a dispatcher
    pub fn handle(&self) -> TransportHandle {
        TransportHandle {
            shared: self.shared.clone(),
        }
    }
}

impl Transport for SimTransport {
    fn send_now(&mut self, text: &str) -> Result<(), DispatchError> {
        if self.shared.unavailable.load(Ordering::SeqCst) {
            return Err(DispatchError::TransportUnavailable { text: text.to_string() });
        }
        if let Some(reason) = self.shared.failure.lock().unwrap_or_else(PoisonError::into_inner).take() {
            return Err(DispatchError::SendFailed {
                text: text.to_string(),
                reason,
            });
        }
        self.shared
            .sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_string());
        Ok(())
    }
}

/// Shared view of a [`SimTransport`]
#[derive(Debug, Clone)]
pub struct TransportHandle {
    shared: Arc<Shared>,
}

impl TransportHandle {
    /// Lines delivered so far, in send order
    pub fn sent(&self) -> Vec<String> {
        self.shared.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_available(&self, available: bool) {
        self.shared.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Make the next send fail with `reason`
    pub fn fail_next(&self, reason: impl Into<String>) {
        *self.shared.failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(reason.into());
    }
}
