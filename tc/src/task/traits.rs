//! Task trait definition

use std::any::Any;

use crate::world::Agent;

/// Upcast to `Any` for type-discriminated comparisons and downcasts
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A unit of work in a chain's task tree
///
/// Implementations hold only their own intent and progress; the lifecycle
/// (start, stop, child ownership) is driven by [`super::TaskNode`].
pub trait Task: AsAny + Send {
    /// Human-readable description, stable for the life of the task
    fn describe(&self) -> String;

    /// Called on the first tick after construction or `reset`
    fn on_start(&mut self, agent: &mut Agent);

    /// One evaluation step. Return a child to delegate to, or `None` when
    /// this task did its own work this tick.
    fn on_tick(&mut self, agent: &mut Agent) -> Option<Box<dyn Task>>;

    /// Cleanup. `interrupt` is the task replacing this one, `None` when the
    /// task finished or was stopped by its chain.
    fn on_stop(&mut self, agent: &mut Agent, interrupt: Option<&dyn Task>);

    /// Completion predicate, evaluated every tick before `on_tick`
    fn is_finished(&self, agent: &Agent) -> bool;

    /// Semantic equality. Must return false for tasks of another type.
    fn is_equal(&self, other: &dyn Task) -> bool;

    /// Optional progress line shown next to the description
    fn status(&self) -> Option<String> {
        None
    }
}

/// Downcast `other` to `T` if it is the same kind of task
pub fn same_kind<T: Task>(other: &dyn Task) -> Option<&T> {
    other.as_any().downcast_ref::<T>()
}

/// Equality by type and fields, for tasks that derive `PartialEq`
pub fn structural_eq<T: Task + PartialEq>(this: &T, other: &dyn Task) -> bool {
    same_kind::<T>(other).is_some_and(|other| other == this)
}
