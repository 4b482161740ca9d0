//! Straight-line movement for the simulated agent

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::world::{AgentBody, Movement, MovementGoal};

use super::world::SimBody;

#[derive(Debug, Default)]
struct MoveState {
    goal: Option<MovementGoal>,
    arrivals: u64,
}

/// Movement collaborator that walks the body toward its goal
///
/// The agent owns this as its `Box<dyn Movement>`; the frame loop keeps a
/// [`MovementDriver`] to advance the body each frame.
#[derive(Debug)]
pub struct SimMovement {
    state: Arc<Mutex<MoveState>>,
    body: Arc<SimBody>,
    speed: f64,
}

impl SimMovement {
    /// `speed` is in world units per step
    pub fn new(body: Arc<SimBody>, speed: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(MoveState::default())),
            body,
            speed,
        }
    }

    pub fn driver(&self) -> MovementDriver {
        MovementDriver {
            state: self.state.clone(),
            body: self.body.clone(),
            speed: self.speed,
        }
    }

    fn lock(&self) -> MutexGuard<'_, MoveState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Movement for SimMovement {
    fn set_goal(&mut self, goal: MovementGoal) {
        debug!(%goal, "SimMovement::set_goal: called");
        self.lock().goal = Some(goal);
    }

    fn cancel(&mut self) {
        debug!("SimMovement::cancel: called");
        self.lock().goal = None;
    }

    fn is_active(&self) -> bool {
        self.lock().goal.is_some()
    }

    fn goal(&self) -> Option<MovementGoal> {
        self.lock().goal
    }
}

/// Frame-loop side of [`SimMovement`]
#[derive(Debug, Clone)]
pub struct MovementDriver {
    state: Arc<Mutex<MoveState>>,
    body: Arc<SimBody>,
    speed: f64,
}

impl MovementDriver {
    /// Move the body one step toward the goal; clears the goal on arrival
    pub fn step(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let pos = self.body.position();
        let target = match state.goal {
            None => return,
            Some(MovementGoal::Cell(cell)) => cell.center(pos.y),
            Some(MovementGoal::Position(p)) => p,
            Some(MovementGoal::Entity(id)) => {
                debug!(id, "MovementDriver::step: entity goals are not simulated, dropping");
                state.goal = None;
                return;
            }
        };

        let distance = pos.distance(target);
        if distance <= self.speed {
            self.body.set_position(target);
            state.goal = None;
            state.arrivals += 1;
            debug!(%target, "MovementDriver::step: arrived");
            return;
        }
        let f = self.speed / distance;
        let mut next = pos;
        next.x += (target.x - pos.x) * f;
        next.y += (target.y - pos.y) * f;
        next.z += (target.z - pos.z) * f;
        self.body.set_position(next);
    }

    /// Number of goals reached so far
    pub fn arrivals(&self) -> u64 {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).arrivals
    }
}
