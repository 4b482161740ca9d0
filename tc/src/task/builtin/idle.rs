//! Task that holds a chain active without doing anything

use crate::task::{Task, structural_eq};
use crate::world::Agent;

/// Does nothing, forever
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdleTask;

impl Task for IdleTask {
    fn describe(&self) -> String {
        "Idle".to_string()
    }

    fn on_start(&mut self, _agent: &mut Agent) {}

    fn on_tick(&mut self, _agent: &mut Agent) -> Option<Box<dyn Task>> {
        None
    }

    fn on_stop(&mut self, _agent: &mut Agent, _interrupt: Option<&dyn Task>) {}

    fn is_finished(&self, _agent: &Agent) -> bool {
        false
    }

    fn is_equal(&self, other: &dyn Task) -> bool {
        structural_eq(self, other)
    }
}
