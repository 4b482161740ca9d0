//! Collaborator interfaces consumed by the scheduling core
//!
//! Sensing, movement, body state and the outbound transport are owned by
//! whatever embeds the engine. The core only talks to them through these
//! traits; [`crate::sim`] provides in-process implementations.

mod agent;
mod listeners;
mod settings;

use crate::dispatch::DispatchError;
use crate::domain::{CellData, CellPos, RegionId, Vec3};

pub use agent::Agent;
pub use listeners::{CellListener, ListenerRegistry, Subscription};
pub use settings::{Behavior, ConfigGuard, ConfigStack};

/// Read access to the world grid
///
/// Queries never block: a cell that has not arrived yet is simply reported
/// as not loaded. Implementations must invoke cell-loaded listeners without
/// holding their own internal locks, because listeners may call back into
/// the sensor.
pub trait WorldSensor: Send + Sync {
    /// Whether the contents of `cell` are currently known
    fn is_cell_loaded(&self, cell: CellPos) -> bool;

    /// Contents of a loaded cell, `None` if not loaded
    fn cell_at(&self, cell: CellPos) -> Option<CellData>;

    /// Register a listener called whenever a cell finishes loading.
    /// Dropping the returned subscription unregisters it.
    fn on_cell_loaded(&self, listener: CellListener) -> Subscription;
}

/// Target handed to the movement collaborator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MovementGoal {
    Cell(CellPos),
    Position(Vec3),
    Entity(u64),
}

impl std::fmt::Display for MovementGoal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cell(cell) => write!(f, "cell {}", cell),
            Self::Position(pos) => write!(f, "position {}", pos),
            Self::Entity(id) => write!(f, "entity #{}", id),
        }
    }
}

/// Movement/pathfinding engine
pub trait Movement: Send {
    /// Start pursuing `goal`, replacing any previous goal
    fn set_goal(&mut self, goal: MovementGoal);

    /// Drop the current goal
    fn cancel(&mut self);

    /// True while a goal has been accepted and is being pursued
    fn is_active(&self) -> bool;

    fn goal(&self) -> Option<MovementGoal>;
}

/// Position and region of the controlled agent
pub trait AgentBody: Send + Sync {
    fn position(&self) -> Vec3;
    fn region(&self) -> RegionId;
}

/// Outbound message channel used by the dispatcher
pub trait Transport: Send {
    /// Send a line right away. Failures are reported, never retried.
    fn send_now(&mut self, text: &str) -> Result<(), DispatchError>;
}
