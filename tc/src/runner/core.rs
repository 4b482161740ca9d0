//! Runner implementation

use serde::Serialize;
use tracing::{debug, info};

use crate::chain::TaskChain;
use crate::world::{Agent, ConfigGuard};

/// Handle to a registered chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ChainId(usize);

impl ChainId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Activity of one registered chain
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainStatus {
    pub name: String,
    pub active: bool,
}

/// Snapshot of the runner for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunnerStatus {
    pub enabled: bool,
    pub current_chain: Option<String>,
    pub task_path: Vec<String>,
    pub chains: Vec<ChainStatus>,
}

/// Picks the highest-priority active chain every tick and runs it
///
/// Ties go to the chain registered first.
pub struct Runner {
    chains: Vec<Box<dyn TaskChain>>,
    current: Option<ChainId>,
    enabled: bool,
    focus_override: Option<ConfigGuard>,
    last_path: Vec<String>,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    /// Disabled runner with no chains
    pub fn new() -> Self {
        Self {
            chains: Vec::new(),
            current: None,
            enabled: false,
            focus_override: None,
            last_path: Vec::new(),
        }
    }

    pub fn register_chain(&mut self, chain: Box<dyn TaskChain>) -> ChainId {
        let id = ChainId(self.chains.len());
        debug!(chain = chain.name(), id = id.0, "Runner::register_chain: called");
        self.chains.push(chain);
        id
    }

    pub fn chain(&self, id: ChainId) -> Option<&dyn TaskChain> {
        self.chains.get(id.0).map(|chain| &**chain)
    }

    /// Registered chain as its concrete type
    pub fn chain_as<T: TaskChain>(&self, id: ChainId) -> Option<&T> {
        let chain: &dyn TaskChain = &**self.chains.get(id.0)?;
        chain.as_any().downcast_ref::<T>()
    }

    /// Registered chain as its concrete type, mutably
    pub fn chain_as_mut<T: TaskChain>(&mut self, id: ChainId) -> Option<&mut T> {
        let chain: &mut dyn TaskChain = &mut **self.chains.get_mut(id.0)?;
        chain.as_any_mut().downcast_mut::<T>()
    }

    pub fn chains(&self) -> impl Iterator<Item = &dyn TaskChain> {
        self.chains.iter().map(|chain| &**chain)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn current_chain_id(&self) -> Option<ChainId> {
        self.current
    }

    pub fn current_chain(&self) -> Option<&dyn TaskChain> {
        self.current.and_then(|id| self.chain(id))
    }

    /// Start running chains. Also keeps the agent from pausing when its
    /// window loses focus, until `disable`.
    pub fn enable(&mut self, agent: &mut Agent) {
        if self.enabled {
            debug!("Runner::enable: already enabled");
            return;
        }
        let guard = agent.settings.push();
        guard.update(|b| b.pause_on_lost_focus = false);
        self.focus_override = Some(guard);
        self.enabled = true;
        info!(chains = self.chains.len(), "Runner enabled");
    }

    /// Stop every chain and stop running
    pub fn disable(&mut self, agent: &mut Agent) {
        if self.enabled {
            self.focus_override = None;
            info!("Runner disabled");
        }
        for chain in &mut self.chains {
            chain.stop(agent);
        }
        self.enabled = false;
        self.current = None;
        self.last_path.clear();
    }

    /// One arbitration round
    pub fn tick(&mut self, agent: &mut Agent) {
        if !self.enabled {
            return;
        }

        for chain in &mut self.chains {
            chain.observe(agent);
        }

        let mut selected = None;
        let mut max_priority = f32::NEG_INFINITY;
        for (idx, chain) in self.chains.iter().enumerate() {
            if !chain.is_active() {
                continue;
            }
            let priority = chain.priority(agent);
            assert!(!priority.is_nan(), "chain '{}' returned a NaN priority", chain.name());
            if priority > max_priority {
                max_priority = priority;
                selected = Some(ChainId(idx));
            }
        }

        if let Some(prev) = self.current {
            if selected != Some(prev) {
                let by = selected.map(|id| self.chains[id.0].name().to_string());
                info!(
                    from = self.chains[prev.0].name(),
                    to = by.as_deref().unwrap_or("none"),
                    "Switching chain"
                );
                self.chains[prev.0].on_interrupt(agent, by.as_deref());
            }
        }
        self.current = selected;

        if let Some(id) = selected {
            self.chains[id.0].on_tick(agent);
            self.log_task_path(agent);
        }
    }

    fn log_task_path(&mut self, agent: &Agent) {
        if !agent.behavior().show_task_chains {
            return;
        }
        let Some(chain) = self.current_chain() else {
            return;
        };
        let path = chain.task_path();
        if path != self.last_path {
            info!(chain = chain.name(), path = %path.join(" -> "), "Task chain");
            self.last_path = path;
        }
    }

    pub fn status(&self) -> RunnerStatus {
        let current = self.current_chain();
        RunnerStatus {
            enabled: self.enabled,
            current_chain: current.map(|chain| chain.name().to_string()),
            task_path: current.map(|chain| chain.task_path()).unwrap_or_default(),
            chains: self
                .chains
                .iter()
                .map(|chain| ChainStatus {
                    name: chain.name().to_string(),
                    active: chain.is_active(),
                })
                .collect(),
        }
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("chains", &self.chains.iter().map(|c| c.name()).collect::<Vec<_>>())
            .field("current", &self.current)
            .field("enabled", &self.enabled)
            .finish()
    }
}
