//! Rate-limited outbound message dispatcher
//!
//! Queues chat and whisper messages by priority and releases them through
//! three nested throttle gates, so bursts are allowed but sustained volume
//! is slowed progressively.

mod config;
mod core;
mod error;
mod queue;

pub use config::DispatcherConfig;
pub use self::core::Dispatcher;
pub use error::DispatchError;
pub use queue::{DispatcherStats, OutboundMessage, SentMessage};
