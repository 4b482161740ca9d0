//! Agent context handed to every chain and task tick

use std::sync::Arc;

use crate::dispatch::Dispatcher;
use crate::domain::{CellPos, RegionId, Vec3};
use crate::timer::Clock;

use super::{AgentBody, Behavior, ConfigStack, Movement, WorldSensor};

/// Everything a task may read or command while it is being ticked
pub struct Agent {
    pub world: Arc<dyn WorldSensor>,
    pub movement: Box<dyn Movement>,
    pub body: Arc<dyn AgentBody>,
    pub settings: ConfigStack,
    pub messages: Dispatcher,
    pub clock: Arc<dyn Clock>,
}

impl Agent {
    pub fn new(
        world: Arc<dyn WorldSensor>,
        movement: Box<dyn Movement>,
        body: Arc<dyn AgentBody>,
        settings: ConfigStack,
        messages: Dispatcher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            world,
            movement,
            body,
            settings,
            messages,
            clock,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.body.position()
    }

    pub fn current_cell(&self) -> CellPos {
        self.body.position().cell()
    }

    pub fn region(&self) -> RegionId {
        self.body.region()
    }

    /// Effective behavior flags
    pub fn behavior(&self) -> Behavior {
        self.settings.current()
    }
}
