//! Priority levels for outbound messages

use serde::{Deserialize, Serialize};

/// Priority class of a queued outbound message
///
/// The dispatcher always sends the highest class first; within a class,
/// messages leave in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessagePriority {
    /// Chatter that may be dropped first when the queue is full
    Low,
    /// Status reports, such as a user task finishing
    #[default]
    Normal,
    /// Replies to whoever is directing the agent
    High,
    /// Warnings that must go out ahead of everything else
    Critical,
}

impl std::fmt::Display for MessagePriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Normal => write!(f, "normal"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for MessagePriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(format!("Unknown message priority: {}", s)),
        }
    }
}
