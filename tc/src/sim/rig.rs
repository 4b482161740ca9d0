//! Wiring of a fully simulated agent

use std::sync::Arc;

use crate::dispatch::{Dispatcher, DispatcherConfig};
use crate::domain::CellPos;
use crate::timer::Clock;
use crate::world::{Agent, Behavior, ConfigStack};

use super::movement::{MovementDriver, SimMovement};
use super::transport::{SimTransport, TransportHandle};
use super::world::{SimBody, SimWorld};

/// Handles to the simulated collaborators behind an [`Agent`]
#[derive(Clone)]
pub struct SimRig {
    pub world: Arc<SimWorld>,
    pub body: Arc<SimBody>,
    pub driver: MovementDriver,
    pub transport: TransportHandle,
}

impl SimRig {
    /// Build an agent standing in `start`, wired to simulated collaborators
    pub fn agent(
        world: Arc<SimWorld>,
        start: CellPos,
        speed: f64,
        behavior: Behavior,
        dispatcher: DispatcherConfig,
        clock: Arc<dyn Clock>,
    ) -> (Agent, SimRig) {
        let body = Arc::new(SimBody::at_cell(start));
        let movement = SimMovement::new(body.clone(), speed);
        let driver = movement.driver();
        let transport = SimTransport::new();
        let handle = transport.handle();

        let agent = Agent::new(
            world.clone(),
            Box::new(movement),
            body.clone(),
            ConfigStack::new(behavior),
            Dispatcher::new(dispatcher, Box::new(transport), clock.clone()),
            clock,
        );
        let rig = SimRig {
            world,
            body,
            driver,
            transport: handle,
        };
        (agent, rig)
    }
}
