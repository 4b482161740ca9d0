//! Queue types for the dispatcher

use serde::Serialize;

use crate::domain::MessagePriority;

/// A message waiting to go out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// Public chat line
    Chat { text: String },
    /// Private message to one recipient
    Whisper { to: String, text: String },
}

impl OutboundMessage {
    /// Text handed to the transport
    pub fn wire_text(&self) -> String {
        match self {
            OutboundMessage::Chat { text } => text.clone(),
            OutboundMessage::Whisper { to, text } => format!("/msg {} {}", to, text),
        }
    }
}

/// Queue entry ranked by priority, then by submission order
#[derive(Debug, Clone)]
pub(crate) struct QueuedMessage {
    pub seq: u64,
    pub priority: MessagePriority,
    pub message: OutboundMessage,
}

impl Eq for QueuedMessage {}

impl PartialEq for QueuedMessage {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Ord for QueuedMessage {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Higher priority first, then lower sequence number
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueuedMessage {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// A message that left the queue and reached the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentMessage {
    pub seq: u64,
    pub priority: MessagePriority,
    pub text: String,
}

/// Counters for the dispatcher
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct DispatcherStats {
    pub total_enqueued: u64,
    pub total_sent: u64,
    pub total_failed: u64,
    /// Dropped because the queue was full
    pub total_dropped: u64,
    pub peak_queue_depth: usize,
}
