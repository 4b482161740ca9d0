//! Chain holding a single root task

use tracing::{debug, info};

use crate::task::{Task, TaskNode, TaskState};
use crate::world::Agent;

/// Root-task bookkeeping shared by the concrete chains
///
/// Adopting a task equal to the one already held is a no-op, so callers
/// can re-request their goal every tick. After an interruption the held
/// task is reset rather than dropped, and resumes on the next tick.
#[derive(Debug)]
pub struct SingleTaskChain {
    name: String,
    main_task: Option<TaskNode>,
    interrupted: bool,
}

impl SingleTaskChain {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            main_task: None,
            interrupted: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adopt `task` unless an equal one is already held. Returns whether
    /// the task was adopted.
    pub fn set_task(&mut self, agent: &mut Agent, task: Box<dyn Task>) -> bool {
        if let Some(current) = &self.main_task {
            if current.is_equal_to(&*task) {
                debug!(chain = %self.name, task = %task.describe(), "SingleTaskChain::set_task: already running");
                return false;
            }
        }
        if let Some(mut old) = self.main_task.take() {
            old.stop(agent, Some(&*task));
        }

        let mut node = TaskNode::from_boxed(task);
        node.reset();
        info!(chain = %self.name, task = %node.describe(), "Chain task set");
        self.main_task = Some(node);
        true
    }

    /// Stop and drop the held task
    pub fn clear(&mut self, agent: &mut Agent) {
        if let Some(mut task) = self.main_task.take() {
            debug!(chain = %self.name, task = %task.describe(), "SingleTaskChain::clear: called");
            task.stop(agent, None);
        }
        self.interrupted = false;
    }

    pub fn is_active(&self) -> bool {
        self.main_task.is_some()
    }

    pub fn task(&self) -> Option<&TaskNode> {
        self.main_task.as_ref()
    }

    pub fn was_interrupted(&self) -> bool {
        self.interrupted
    }

    /// Tick the held task.
    ///
    /// Returns the task's final state once it is finished or stopped, in
    /// which case the owning chain runs its completion handling.
    pub fn tick_task(&mut self, agent: &mut Agent) -> Option<TaskState> {
        let interrupted = std::mem::take(&mut self.interrupted);
        let task = self.main_task.as_mut()?;
        if interrupted {
            debug!(chain = %self.name, task = %task.describe(), "SingleTaskChain::tick_task: resuming after interruption");
            task.reset();
        }

        if task.is_done() {
            return Some(task.state());
        }
        task.tick(agent);
        task.is_done().then(|| task.state())
    }

    /// Record an interruption and stop the held task if it is running
    pub fn interrupt(&mut self, agent: &mut Agent, by: Option<&str>) {
        debug!(chain = %self.name, by = by.unwrap_or("none"), "SingleTaskChain::interrupt: called");
        self.interrupted = true;
        if let Some(task) = self.main_task.as_mut() {
            if task.is_running() {
                task.stop(agent, None);
            }
        }
    }
}
