//! Behavior streams competing for the agent
//!
//! Each chain owns at most one task tree and reports a priority. The
//! [`crate::runner::Runner`] ticks whichever active chain ranks highest.

mod hazard;
mod single;
mod user;

pub use hazard::HazardChain;
pub use single::SingleTaskChain;
pub use user::{FinishedTask, UserTaskChain};

use crate::task::{AsAny, TaskNode};
use crate::world::Agent;

/// One independently prioritized behavior stream
pub trait TaskChain: AsAny + Send {
    /// Display name, also passed to the chain that gets interrupted
    fn name(&self) -> &str;

    /// Priority while active. Must not be NaN.
    fn priority(&self, agent: &Agent) -> f32;

    /// Whether the chain currently wants control
    fn is_active(&self) -> bool;

    /// Sense the world before arbitration
    ///
    /// Called every tick on every chain, active or not, so a chain can
    /// adopt a task when its trigger appears.
    fn observe(&mut self, _agent: &mut Agent) {}

    /// Advance the chain's task tree by one step
    fn on_tick(&mut self, agent: &mut Agent);

    /// Another chain took over; `by` is its name, if any chain did
    fn on_interrupt(&mut self, agent: &mut Agent, by: Option<&str>);

    /// Stop and drop whatever the chain is running
    fn stop(&mut self, agent: &mut Agent);

    /// Root of the task tree, if one is held
    fn current_task(&self) -> Option<&TaskNode>;

    /// Task descriptions from root to leaf
    fn task_path(&self) -> Vec<String> {
        self.current_task().map(TaskNode::task_path).unwrap_or_default()
    }
}
