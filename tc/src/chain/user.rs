//! Chain running the goal a user asked for

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::domain::MessagePriority;
use crate::task::builtin::IdleTask;
use crate::task::{Task, TaskNode, TaskState};
use crate::timer::{Clock, Stopwatch};
use crate::world::Agent;

use super::{SingleTaskChain, TaskChain};

/// Priority of user requested work
pub const USER_CHAIN_PRIORITY: f32 = 50.0;

/// Record of a user task that ended
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinishedTask {
    pub description: String,
    pub state: TaskState,
    pub elapsed: Duration,
}

/// Runs one user goal at a time and reports when it is done
#[derive(Debug)]
pub struct UserTaskChain {
    inner: SingleTaskChain,
    stopwatch: Stopwatch,
    history: Vec<FinishedTask>,
}

impl UserTaskChain {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: SingleTaskChain::new("User Tasks"),
            stopwatch: Stopwatch::new(clock),
            history: Vec::new(),
        }
    }

    /// Start working on `task`. Re-requesting the current goal keeps its
    /// progress and does not restart the stopwatch.
    pub fn run_task(&mut self, agent: &mut Agent, task: impl Task) -> bool {
        let adopted = self.inner.set_task(agent, Box::new(task));
        if adopted {
            self.stopwatch.begin();
        }
        adopted
    }

    /// Tasks that ended, oldest first
    pub fn history(&self) -> &[FinishedTask] {
        &self.history
    }

    fn on_task_finish(&mut self, agent: &mut Agent, state: TaskState) {
        let elapsed = self.stopwatch.stop();
        let description = self.inner.task().map(TaskNode::describe).unwrap_or_default();
        let verb = match state {
            TaskState::Stopped => "STOPPED",
            _ => "FINISHED",
        };
        info!(task = %description, %state, elapsed_ms = elapsed.as_millis() as u64, "User task ended");
        agent.messages.enqueue_chat(
            format!("User task {}: {} (took {:.1}s)", verb, description, elapsed.as_secs_f64()),
            MessagePriority::Normal,
        );
        self.history.push(FinishedTask {
            description,
            state,
            elapsed,
        });

        if agent.behavior().idle_when_not_active {
            self.inner.set_task(agent, Box::new(IdleTask));
        } else {
            self.inner.clear(agent);
        }
    }
}

impl TaskChain for UserTaskChain {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn priority(&self, _agent: &Agent) -> f32 {
        USER_CHAIN_PRIORITY
    }

    fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    fn on_tick(&mut self, agent: &mut Agent) {
        if let Some(state) = self.inner.tick_task(agent) {
            self.on_task_finish(agent, state);
        }
    }

    fn on_interrupt(&mut self, agent: &mut Agent, by: Option<&str>) {
        self.inner.interrupt(agent, by);
    }

    fn stop(&mut self, agent: &mut Agent) {
        self.inner.clear(agent);
        self.stopwatch.stop();
    }

    fn current_task(&self) -> Option<&TaskNode> {
        self.inner.task()
    }
}
