//! taskchain - priority-arbitrated task chains for one autonomous agent
//!
//! Several behavior streams ("chains") compete for a single agent every
//! tick. The winning chain runs a tree of tasks that re-derives what it
//! wants each tick and keeps any sub-task whose goal has not changed, so
//! preempted work resumes instead of restarting.
//!
//! # Core Concepts
//!
//! - **Equality-based reuse**: a "new" task equal to the running one is a no-op
//! - **Cooperative ticks**: every task returns control each tick, nothing blocks
//! - **Resumable search**: breadth-first exploration over cells that load asynchronously
//! - **Throttled output**: outbound messages leave through a tiered rate limiter
//!
//! # Modules
//!
//! - [`task`] - Task trait, lifecycle wrapper and built-in tasks
//! - [`chain`] - Chains owning a task tree
//! - [`runner`] - Arbitration between chains
//! - [`dispatch`] - Rate-limited message dispatcher
//! - [`world`] - Collaborator interfaces and the agent context
//! - [`sim`] - In-process collaborators for tests and the `tc` binary
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod chain;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod runner;
pub mod sim;
pub mod task;
pub mod timer;
pub mod world;

// Re-export commonly used types
pub use chain::{FinishedTask, HazardChain, SingleTaskChain, TaskChain, UserTaskChain};
pub use config::{Config, RunnerConfig, SimConfig};
pub use dispatch::{DispatchError, Dispatcher, DispatcherConfig, DispatcherStats, OutboundMessage, SentMessage};
pub use domain::{CELL_SIZE, CellData, CellPos, MessagePriority, RegionId, Terrain, Vec3};
pub use runner::{ChainId, ChainStatus, Runner, RunnerStatus};
pub use task::builtin::{CellSearchTask, EscapeHazardTask, GetToCellTask, IdleTask, SearchSpace, TerrainSearch};
pub use task::{Task, TaskNode, TaskState};
pub use timer::{Clock, ManualClock, Stopwatch, SystemClock, Timer};
pub use world::{Agent, AgentBody, Behavior, ConfigGuard, ConfigStack, Movement, MovementGoal, Subscription, Transport, WorldSensor};
