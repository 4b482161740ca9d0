//! Task lifecycle wrapper and delegation

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::world::Agent;

use super::traits::{Task, same_kind};

/// Lifecycle state of a task node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Constructed or reset, `on_start` not yet run
    #[default]
    Fresh,
    Running,
    /// Completion predicate held
    Finished,
    /// Stopped from outside while running
    Stopped,
}

impl TaskState {
    /// Finished or stopped
    pub fn is_done(&self) -> bool {
        matches!(self, TaskState::Finished | TaskState::Stopped)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Fresh => write!(f, "fresh"),
            TaskState::Running => write!(f, "running"),
            TaskState::Finished => write!(f, "finished"),
            TaskState::Stopped => write!(f, "stopped"),
        }
    }
}

/// A task plus its lifecycle state and the child it currently delegates to
///
/// The node owns its child exclusively. Replacing the child stops the old
/// one before the new one is installed.
pub struct TaskNode {
    task: Box<dyn Task>,
    state: TaskState,
    child: Option<Box<TaskNode>>,
    had_control: bool,
    resumed: bool,
}

impl TaskNode {
    pub fn new(task: impl Task) -> Self {
        Self::from_boxed(Box::new(task))
    }

    pub fn from_boxed(task: Box<dyn Task>) -> Self {
        Self {
            task,
            state: TaskState::Fresh,
            child: None,
            had_control: false,
            resumed: false,
        }
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TaskState::Running
    }

    pub fn is_done(&self) -> bool {
        self.state.is_done()
    }

    /// True when this node ran before its last `reset`
    pub fn is_resumed(&self) -> bool {
        self.resumed
    }

    pub fn task(&self) -> &dyn Task {
        &*self.task
    }

    /// The wrapped task as its concrete type
    pub fn downcast_ref<T: Task>(&self) -> Option<&T> {
        same_kind::<T>(&*self.task)
    }

    pub fn child(&self) -> Option<&TaskNode> {
        self.child.as_deref()
    }

    /// Deepest node of the delegation chain
    pub fn leaf(&self) -> &TaskNode {
        let mut node = self;
        while let Some(child) = node.child.as_deref() {
            node = child;
        }
        node
    }

    /// Whether the wrapped task is semantically equal to `other`
    pub fn is_equal_to(&self, other: &dyn Task) -> bool {
        self.task.is_equal(other)
    }

    /// Description plus the task's status line, if it has one
    pub fn describe(&self) -> String {
        match self.task.status() {
            Some(status) => format!("{} ({})", self.task.describe(), status),
            None => self.task.describe(),
        }
    }

    /// Descriptions from this node down to the leaf
    pub fn task_path(&self) -> Vec<String> {
        let mut path = vec![self.describe()];
        let mut node = self;
        while let Some(child) = node.child.as_deref() {
            path.push(child.describe());
            node = child;
        }
        path
    }

    /// Back to `Fresh` with no child; the task itself keeps its fields
    pub fn reset(&mut self) {
        debug!(task = %self.task.describe(), state = %self.state, "TaskNode::reset: called");
        self.resumed = self.had_control;
        self.state = TaskState::Fresh;
        self.child = None;
    }

    /// Run one step of this node and, through delegation, its subtree
    pub fn tick(&mut self, agent: &mut Agent) {
        match self.state {
            TaskState::Finished | TaskState::Stopped => {
                debug!(task = %self.task.describe(), state = %self.state, "TaskNode::tick: not live, skipping");
                return;
            }
            TaskState::Fresh => {
                debug!(task = %self.task.describe(), resumed = self.resumed, "TaskNode::tick: starting");
                self.task.on_start(agent);
                self.state = TaskState::Running;
                self.had_control = true;
            }
            TaskState::Running => {}
        }

        if self.task.is_finished(agent) {
            if let Some(child) = self.child.as_mut() {
                child.stop(agent, None);
            }
            self.child = None;
            self.task.on_stop(agent, None);
            self.state = TaskState::Finished;
            debug!(task = %self.task.describe(), "TaskNode::tick: finished");
            return;
        }

        match self.task.on_tick(agent) {
            Some(next) => self.delegate(agent, next),
            None => {
                if let Some(mut child) = self.child.take() {
                    debug!(child = %child.task.describe(), "TaskNode::tick: no child wanted, stopping held child");
                    child.stop(agent, None);
                }
            }
        }
    }

    fn delegate(&mut self, agent: &mut Agent, next: Box<dyn Task>) {
        let reuse = self.child.as_ref().is_some_and(|child| child.task.is_equal(&*next));

        if reuse {
            if let Some(child) = self.child.as_mut() {
                if child.is_done() {
                    child.reset();
                }
            }
        } else {
            if let Some(mut old) = self.child.take() {
                debug!(old = %old.task.describe(), new = %next.describe(), "TaskNode::delegate: replacing child");
                old.stop(agent, Some(&*next));
            }
            let mut node = TaskNode::from_boxed(next);
            node.reset();
            self.child = Some(Box::new(node));
        }

        if let Some(child) = self.child.as_mut() {
            child.tick(agent);
        }
    }

    /// Stop this node and its live child. `interrupt` is the task taking
    /// over, if any. No-op unless running.
    pub fn stop(&mut self, agent: &mut Agent, interrupt: Option<&dyn Task>) {
        if self.state != TaskState::Running {
            debug!(task = %self.task.describe(), state = %self.state, "TaskNode::stop: not running, ignoring");
            return;
        }
        if let Some(child) = self.child.as_mut() {
            child.stop(agent, interrupt);
        }
        self.task.on_stop(agent, interrupt);
        self.state = TaskState::Stopped;
        debug!(
            task = %self.task.describe(),
            interrupt = %interrupt.map(|t| t.describe()).unwrap_or_default(),
            "TaskNode::stop: stopped"
        );
    }
}

impl std::fmt::Debug for TaskNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskNode")
            .field("task", &self.describe())
            .field("state", &self.state)
            .field("child", &self.child)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DispatcherConfig;
    use crate::domain::{CellPos, Terrain};
    use crate::sim::{SimRig, SimWorld};
    use crate::task::structural_eq;
    use crate::timer::ManualClock;
    use crate::world::Behavior;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn agent() -> Agent {
        let world = Arc::new(SimWorld::uniform(Terrain::Plains));
        let (agent, _rig) = SimRig::agent(
            world,
            CellPos::new(0, 0),
            4.0,
            Behavior::default(),
            DispatcherConfig::default(),
            Arc::new(ManualClock::new()),
        );
        agent
    }

    #[derive(Debug, Default)]
    struct Calls {
        starts: AtomicUsize,
        stops: AtomicUsize,
        ticks: AtomicUsize,
        interrupted_by: Mutex<Vec<String>>,
    }

    /// Leaf that counts its hooks; finishes after `work` ticks
    struct Leaf {
        name: &'static str,
        work: usize,
        done: usize,
        calls: Arc<Calls>,
    }

    impl Leaf {
        fn new(name: &'static str, work: usize, calls: &Arc<Calls>) -> Self {
            Self {
                name,
                work,
                done: 0,
                calls: calls.clone(),
            }
        }
    }

    impl Task for Leaf {
        fn describe(&self) -> String {
            format!("Leaf {}", self.name)
        }

        fn on_start(&mut self, _agent: &mut Agent) {
            self.calls.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_tick(&mut self, _agent: &mut Agent) -> Option<Box<dyn Task>> {
            self.done += 1;
            self.calls.ticks.fetch_add(1, Ordering::SeqCst);
            None
        }

        fn on_stop(&mut self, _agent: &mut Agent, interrupt: Option<&dyn Task>) {
            self.calls.stops.fetch_add(1, Ordering::SeqCst);
            if let Some(task) = interrupt {
                self.calls.interrupted_by.lock().unwrap().push(task.describe());
            }
        }

        fn is_finished(&self, _agent: &Agent) -> bool {
            self.done >= self.work
        }

        fn is_equal(&self, other: &dyn Task) -> bool {
            same_kind::<Leaf>(other).is_some_and(|o| o.name == self.name)
        }

        fn status(&self) -> Option<String> {
            Some(format!("{}/{}", self.done, self.work))
        }
    }

    /// Parent that delegates to whichever leaf `wanted` names
    struct Parent {
        wanted: Arc<Mutex<Option<&'static str>>>,
        calls: Arc<Calls>,
    }

    impl Task for Parent {
        fn describe(&self) -> String {
            "Parent".to_string()
        }

        fn on_start(&mut self, _agent: &mut Agent) {}

        fn on_tick(&mut self, _agent: &mut Agent) -> Option<Box<dyn Task>> {
            let wanted = *self.wanted.lock().unwrap();
            wanted.map(|name| Box::new(Leaf::new(name, 100, &self.calls)) as Box<dyn Task>)
        }

        fn on_stop(&mut self, _agent: &mut Agent, _interrupt: Option<&dyn Task>) {}

        fn is_finished(&self, _agent: &Agent) -> bool {
            false
        }

        fn is_equal(&self, other: &dyn Task) -> bool {
            same_kind::<Parent>(other).is_some()
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Plain {
        n: u32,
    }

    impl Task for Plain {
        fn describe(&self) -> String {
            format!("Plain {}", self.n)
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

    fn parent(calls: &Arc<Calls>, wanted: Option<&'static str>) -> (TaskNode, Arc<Mutex<Option<&'static str>>>) {
        let wanted = Arc::new(Mutex::new(wanted));
        let node = TaskNode::new(Parent {
            wanted: wanted.clone(),
            calls: calls.clone(),
        });
        (node, wanted)
    }

    #[test]
    fn test_equality_is_reflexive_and_type_discriminated() {
        let calls = Arc::new(Calls::default());
        let a = Plain { n: 1 };
        let leaf = Leaf::new("x", 1, &calls);

        assert!(a.is_equal(&a));
        assert!(a.is_equal(&Plain { n: 1 }));
        assert!(!a.is_equal(&Plain { n: 2 }));
        assert!(!a.is_equal(&leaf));
        assert!(!leaf.is_equal(&a));
        assert!(leaf.is_equal(&Leaf::new("x", 5, &calls)));
    }

    #[test]
    fn test_lifecycle_fresh_running_finished() {
        let mut agent = agent();
        let calls = Arc::new(Calls::default());
        let mut node = TaskNode::new(Leaf::new("a", 2, &calls));
        assert_eq!(node.state(), TaskState::Fresh);

        node.tick(&mut agent);
        assert_eq!(node.state(), TaskState::Running);
        node.tick(&mut agent);
        assert_eq!(node.state(), TaskState::Running);
        node.tick(&mut agent);
        assert_eq!(node.state(), TaskState::Finished);

        // Never ticked again once finished
        node.tick(&mut agent);
        assert_eq!(calls.starts.load(Ordering::SeqCst), 1);
        assert_eq!(calls.ticks.load(Ordering::SeqCst), 2);
        assert_eq!(calls.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_only_while_running() {
        let mut agent = agent();
        let calls = Arc::new(Calls::default());
        let mut node = TaskNode::new(Leaf::new("a", 10, &calls));

        node.stop(&mut agent, None);
        assert_eq!(node.state(), TaskState::Fresh);
        assert_eq!(calls.stops.load(Ordering::SeqCst), 0);

        node.tick(&mut agent);
        node.stop(&mut agent, None);
        assert_eq!(node.state(), TaskState::Stopped);
        node.stop(&mut agent, None);
        assert_eq!(calls.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_equal_child_is_reused_not_restarted() {
        let mut agent = agent();
        let calls = Arc::new(Calls::default());
        let (mut node, _wanted) = parent(&calls, Some("a"));

        node.tick(&mut agent);
        let before = node.child().unwrap() as *const TaskNode;
        node.tick(&mut agent);
        node.tick(&mut agent);
        let after = node.child().unwrap() as *const TaskNode;

        assert_eq!(before, after);
        assert_eq!(calls.starts.load(Ordering::SeqCst), 1);
        assert_eq!(calls.ticks.load(Ordering::SeqCst), 3);
        assert_eq!(node.child().unwrap().downcast_ref::<Leaf>().unwrap().done, 3);
    }

    #[test]
    fn test_unequal_child_replaced_with_interrupter() {
        let mut agent = agent();
        let calls = Arc::new(Calls::default());
        let (mut node, wanted) = parent(&calls, Some("a"));

        node.tick(&mut agent);
        *wanted.lock().unwrap() = Some("b");
        node.tick(&mut agent);

        assert_eq!(node.child().unwrap().task().describe(), "Leaf b");
        assert_eq!(calls.stops.load(Ordering::SeqCst), 1);
        assert_eq!(*calls.interrupted_by.lock().unwrap(), vec!["Leaf b".to_string()]);
        assert_eq!(calls.starts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_no_child_wanted_stops_held_child() {
        let mut agent = agent();
        let calls = Arc::new(Calls::default());
        let (mut node, wanted) = parent(&calls, Some("a"));

        node.tick(&mut agent);
        *wanted.lock().unwrap() = None;
        node.tick(&mut agent);

        assert!(node.child().is_none());
        assert_eq!(calls.stops.load(Ordering::SeqCst), 1);
        assert!(calls.interrupted_by.lock().unwrap().is_empty());
    }

    #[test]
    fn test_stop_cascades_to_child() {
        let mut agent = agent();
        let calls = Arc::new(Calls::default());
        let (mut node, _wanted) = parent(&calls, Some("a"));
        node.tick(&mut agent);

        let interrupter = Plain { n: 9 };
        node.stop(&mut agent, Some(&interrupter));

        assert_eq!(node.state(), TaskState::Stopped);
        assert_eq!(node.child().unwrap().state(), TaskState::Stopped);
        assert_eq!(*calls.interrupted_by.lock().unwrap(), vec!["Plain 9".to_string()]);
    }

    #[test]
    fn test_reset_resumes_with_same_identity() {
        let mut agent = agent();
        let calls = Arc::new(Calls::default());
        let mut node = TaskNode::new(Leaf::new("a", 10, &calls));

        node.tick(&mut agent);
        node.tick(&mut agent);
        node.stop(&mut agent, None);
        assert!(!node.is_resumed());

        node.reset();
        assert_eq!(node.state(), TaskState::Fresh);
        assert!(node.is_resumed());
        node.tick(&mut agent);

        assert_eq!(calls.starts.load(Ordering::SeqCst), 2);
        // Progress made before the interruption survives
        assert_eq!(node.downcast_ref::<Leaf>().unwrap().done, 3);
    }

    #[test]
    fn test_stopped_equal_child_is_reset_and_reused() {
        let mut agent = agent();
        let calls = Arc::new(Calls::default());
        let (mut node, _wanted) = parent(&calls, Some("a"));

        node.tick(&mut agent);
        node.stop(&mut agent, None);
        let before = node.child().unwrap() as *const TaskNode;

        // Resume the parent without clearing its child slot
        node.state = TaskState::Running;
        node.tick(&mut agent);

        let child = node.child().unwrap();
        assert_eq!(child as *const TaskNode, before);
        assert_eq!(child.state(), TaskState::Running);
        assert!(child.is_resumed());
        assert_eq!(calls.starts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_task_path_and_describe() {
        let mut agent = agent();
        let calls = Arc::new(Calls::default());
        let (mut node, _wanted) = parent(&calls, Some("a"));
        node.tick(&mut agent);

        assert_eq!(node.task_path(), vec!["Parent".to_string(), "Leaf a (1/100)".to_string()]);
        assert_eq!(node.leaf().task().describe(), "Leaf a");
    }

    #[test]
    fn test_parent_finish_stops_child_first() {
        struct Finishing {
            calls: Arc<Calls>,
            finish: Arc<Mutex<bool>>,
        }
        impl Task for Finishing {
            fn describe(&self) -> String {
                "Finishing".to_string()
            }
            fn on_start(&mut self, _agent: &mut Agent) {}
            fn on_tick(&mut self, _agent: &mut Agent) -> Option<Box<dyn Task>> {
                Some(Box::new(Leaf::new("c", 100, &self.calls)))
            }
            fn on_stop(&mut self, _agent: &mut Agent, _interrupt: Option<&dyn Task>) {
                // Child must already be stopped
                assert_eq!(self.calls.stops.load(Ordering::SeqCst), 1);
            }
            fn is_finished(&self, _agent: &Agent) -> bool {
                *self.finish.lock().unwrap()
            }
            fn is_equal(&self, other: &dyn Task) -> bool {
                same_kind::<Finishing>(other).is_some()
            }
        }

        let mut agent = agent();
        let calls = Arc::new(Calls::default());
        let finish = Arc::new(Mutex::new(false));
        let mut node = TaskNode::new(Finishing {
            calls: calls.clone(),
            finish: finish.clone(),
        });

        node.tick(&mut agent);
        *finish.lock().unwrap() = true;
        node.tick(&mut agent);

        assert_eq!(node.state(), TaskState::Finished);
        assert!(node.child().is_none());
    }
}
