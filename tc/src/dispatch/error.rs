//! Dispatcher error types

use thiserror::Error;

/// Errors surfaced when a queued message could not be sent.
/// The message is dropped in every case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Transport unavailable, dropped message: {text}")]
    TransportUnavailable { text: String },

    #[error("Send failed ({reason}), dropped message: {text}")]
    SendFailed { text: String, reason: String },
}

impl DispatchError {
    /// Check if the transport was missing altogether
    pub fn is_transport_unavailable(&self) -> bool {
        matches!(self, DispatchError::TransportUnavailable { .. })
    }

    /// Text of the dropped message
    pub fn text(&self) -> &str {
        match self {
            DispatchError::TransportUnavailable { text } => text,
            DispatchError::SendFailed { text, .. } => text,
        }
    }
}
