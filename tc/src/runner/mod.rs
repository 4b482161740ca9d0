//! Arbitration between chains
//!
//! Each tick the runner lets every chain sense the world, picks the active
//! chain with the highest priority, tells the previously selected chain it
//! lost control, and ticks the winner.

mod core;

pub use self::core::{ChainId, ChainStatus, Runner, RunnerStatus};
