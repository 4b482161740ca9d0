//! Leave a hazardous cell

use tracing::{debug, info};

use crate::domain::CellPos;
use crate::task::{Task, structural_eq};
use crate::world::{Agent, ConfigGuard};

use super::GetToCellTask;

/// How far to look for a safe cell, in cells
const DEFAULT_SEARCH_RADIUS: i32 = 4;

/// Walk to the nearest loaded cell that is not a hazard
///
/// Keeps the agent from pausing while it escapes, through a behavior layer
/// that lives exactly as long as the task runs.
#[derive(Debug)]
pub struct EscapeHazardTask {
    search_radius: i32,
    focus_guard: Option<ConfigGuard>,
}

impl PartialEq for EscapeHazardTask {
    fn eq(&self, other: &Self) -> bool {
        self.search_radius == other.search_radius
    }
}

impl Default for EscapeHazardTask {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_RADIUS)
    }
}

impl EscapeHazardTask {
    pub fn new(search_radius: i32) -> Self {
        Self {
            search_radius,
            focus_guard: None,
        }
    }

    fn is_safe(agent: &Agent, cell: CellPos) -> bool {
        agent.world.cell_at(cell).is_some_and(|data| !data.hazard)
    }

    /// Nearest known-safe cell, ring by ring
    fn nearest_safe(&self, agent: &Agent) -> Option<CellPos> {
        let here = agent.current_cell();
        let pos = agent.position();
        (1..=self.search_radius).find_map(|ring| {
            let mut best: Option<(CellPos, f64)> = None;
            for x in here.x - ring..=here.x + ring {
                for z in here.z - ring..=here.z + ring {
                    let cell = CellPos::new(x, z);
                    if cell.grid_distance(here) != ring || !Self::is_safe(agent, cell) {
                        continue;
                    }
                    let dist = cell.horizontal_distance_sq(pos);
                    if best.is_none_or(|(_, best_dist)| dist < best_dist) {
                        best = Some((cell, dist));
                    }
                }
            }
            best.map(|(cell, _)| cell)
        })
    }
}

impl Task for EscapeHazardTask {
    fn describe(&self) -> String {
        "Escaping hazard".to_string()
    }

    fn on_start(&mut self, agent: &mut Agent) {
        let guard = agent.settings.push();
        guard.update(|b| b.pause_on_lost_focus = false);
        self.focus_guard = Some(guard);
        info!(cell = %agent.current_cell(), "Standing in a hazard, escaping");
    }

    fn on_tick(&mut self, agent: &mut Agent) -> Option<Box<dyn Task>> {
        let target = match self.nearest_safe(agent) {
            Some(cell) => cell,
            None => {
                // Nothing known to be safe yet; step aside and look again
                let fallback = agent.current_cell().neighbors()[0];
                debug!(%fallback, "EscapeHazardTask::on_tick: no safe cell in range");
                fallback
            }
        };
        Some(Box::new(GetToCellTask::new(target)))
    }

    fn on_stop(&mut self, _agent: &mut Agent, _interrupt: Option<&dyn Task>) {
        self.focus_guard = None;
    }

    fn is_finished(&self, agent: &Agent) -> bool {
        Self::is_safe(agent, agent.current_cell())
    }

    fn is_equal(&self, other: &dyn Task) -> bool {
        structural_eq(self, other)
    }
}
