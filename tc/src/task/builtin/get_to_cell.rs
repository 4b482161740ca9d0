//! Walk into a grid cell

use tracing::debug;

use crate::domain::CellPos;
use crate::task::{Task, structural_eq};
use crate::world::{Agent, MovementGoal};

/// Move until the agent stands inside `target`
///
/// Reaching a cell is also what makes the world load it, which is how
/// the search task pulls in cells it cannot see yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetToCellTask {
    target: CellPos,
}

impl GetToCellTask {
    pub fn new(target: CellPos) -> Self {
        Self { target }
    }

    pub fn target(&self) -> CellPos {
        self.target
    }

    fn goal(&self) -> MovementGoal {
        MovementGoal::Cell(self.target)
    }
}

impl Task for GetToCellTask {
    fn describe(&self) -> String {
        format!("Going to cell {}", self.target)
    }

    fn on_start(&mut self, agent: &mut Agent) {
        agent.movement.set_goal(self.goal());
    }

    fn on_tick(&mut self, agent: &mut Agent) -> Option<Box<dyn Task>> {
        if !agent.movement.is_active() || agent.movement.goal() != Some(self.goal()) {
            debug!(target = %self.target, "GetToCellTask::on_tick: movement idle, re-issuing goal");
            agent.movement.set_goal(self.goal());
        }
        None
    }

    fn on_stop(&mut self, agent: &mut Agent, _interrupt: Option<&dyn Task>) {
        if agent.movement.goal() == Some(self.goal()) {
            agent.movement.cancel();
        }
    }

    fn is_finished(&self, agent: &Agent) -> bool {
        agent.current_cell() == self.target
    }

    fn is_equal(&self, other: &dyn Task) -> bool {
        structural_eq(self, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DispatcherConfig;
    use crate::domain::Terrain;
    use crate::sim::{SimRig, SimWorld};
    use crate::task::{TaskNode, TaskState};
    use crate::timer::ManualClock;
    use crate::world::Behavior;
    use std::sync::Arc;

    fn rig() -> (Agent, SimRig) {
        SimRig::agent(
            Arc::new(SimWorld::uniform(Terrain::Plains)),
            CellPos::new(0, 0),
            4.0,
            Behavior::default(),
            DispatcherConfig::default(),
            Arc::new(ManualClock::new()),
        )
    }

    #[test]
    fn test_walks_to_target_and_finishes() {
        let (mut agent, rig) = rig();
        let mut node = TaskNode::new(GetToCellTask::new(CellPos::new(2, 0)));

        for _ in 0..20 {
            node.tick(&mut agent);
            if node.is_done() {
                break;
            }
            rig.driver.step();
        }
        assert_eq!(node.state(), TaskState::Finished);
        assert_eq!(agent.current_cell(), CellPos::new(2, 0));
    }

    #[test]
    fn test_reissues_goal_when_movement_dropped() {
        let (mut agent, _rig) = rig();
        let mut node = TaskNode::new(GetToCellTask::new(CellPos::new(3, 3)));
        node.tick(&mut agent);
        agent.movement.cancel();
        node.tick(&mut agent);
        assert_eq!(agent.movement.goal(), Some(MovementGoal::Cell(CellPos::new(3, 3))));
    }

    #[test]
    fn test_stop_cancels_own_goal_only() {
        let (mut agent, _rig) = rig();
        let mut node = TaskNode::new(GetToCellTask::new(CellPos::new(3, 3)));
        node.tick(&mut agent);
        node.stop(&mut agent, None);
        assert!(!agent.movement.is_active());

        let mut other = TaskNode::new(GetToCellTask::new(CellPos::new(1, 1)));
        other.tick(&mut agent);
        agent.movement.set_goal(MovementGoal::Entity(4));
        other.stop(&mut agent, None);
        assert_eq!(agent.movement.goal(), Some(MovementGoal::Entity(4)));
    }

    #[test]
    fn test_equal_by_target() {
        let a = GetToCellTask::new(CellPos::new(1, 2));
        assert!(a.is_equal(&GetToCellTask::new(CellPos::new(1, 2))));
        assert!(!a.is_equal(&GetToCellTask::new(CellPos::new(2, 1))));
    }
}
