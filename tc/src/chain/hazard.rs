//! Chain that gets the agent out of hazardous cells

use tracing::info;

use crate::task::TaskNode;
use crate::task::builtin::EscapeHazardTask;
use crate::world::Agent;

use super::{SingleTaskChain, TaskChain};

/// Priority of hazard escape, above any user goal
pub const HAZARD_CHAIN_PRIORITY: f32 = 100.0;

/// Takes over whenever the agent stands in a hazard cell
#[derive(Debug)]
pub struct HazardChain {
    inner: SingleTaskChain,
}

impl Default for HazardChain {
    fn default() -> Self {
        Self::new()
    }
}

impl HazardChain {
    pub fn new() -> Self {
        Self {
            inner: SingleTaskChain::new("Hazard Avoidance"),
        }
    }

    fn in_hazard(agent: &Agent) -> bool {
        agent
            .world
            .cell_at(agent.current_cell())
            .is_some_and(|data| data.hazard)
    }
}

impl TaskChain for HazardChain {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn priority(&self, _agent: &Agent) -> f32 {
        HAZARD_CHAIN_PRIORITY
    }

    fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    fn observe(&mut self, agent: &mut Agent) {
        if !agent.behavior().hazard_avoidance {
            if self.inner.is_active() {
                self.inner.clear(agent);
            }
            return;
        }
        if !self.inner.is_active() && Self::in_hazard(agent) {
            self.inner.set_task(agent, Box::new(EscapeHazardTask::default()));
        }
    }

    fn on_tick(&mut self, agent: &mut Agent) {
        if let Some(state) = self.inner.tick_task(agent) {
            info!(%state, cell = %agent.current_cell(), "Hazard escape ended");
            self.inner.clear(agent);
        }
    }

    fn on_interrupt(&mut self, agent: &mut Agent, by: Option<&str>) {
        self.inner.interrupt(agent, by);
    }

    fn stop(&mut self, agent: &mut Agent) {
        self.inner.clear(agent);
    }

    fn current_task(&self) -> Option<&TaskNode> {
        self.inner.task()
    }
}
