//! Resumable breadth-first search over lazily loaded cells
//!
//! The world only reveals a cell once it has loaded, and loading happens
//! off the tick loop. The search keeps a frontier of cells it has decided
//! to visit but cannot see yet, walks toward the closest one, and picks up
//! load events through a listener that appends to a shared inbox.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::domain::{CellPos, Terrain, Vec3};
use crate::task::{Task, same_kind};
use crate::world::{Agent, Subscription, WorldSensor};

use super::GetToCellTask;

/// Decides which cells the search expands through
pub trait SearchSpace: std::fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Whether the search continues past `cell`. Only called for loaded cells.
    fn contains(&self, world: &dyn WorldSensor, cell: CellPos) -> bool;

    fn describe(&self) -> String;
}

/// Connected cells of a single terrain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerrainSearch {
    pub terrain: Terrain,
}

impl TerrainSearch {
    pub fn new(terrain: Terrain) -> Self {
        Self { terrain }
    }
}

impl SearchSpace for TerrainSearch {
    fn contains(&self, world: &dyn WorldSensor, cell: CellPos) -> bool {
        world.cell_at(cell).is_some_and(|data| data.terrain == self.terrain)
    }

    fn describe(&self) -> String {
        self.terrain.to_string()
    }
}

#[derive(Debug, Default)]
struct SearchState {
    considered: HashSet<CellPos>,
    searched: HashSet<CellPos>,
    frontier: Vec<CellPos>,
    just_arrived: Vec<CellPos>,
}

impl SearchState {
    fn clear(&mut self) {
        self.considered.clear();
        self.searched.clear();
        self.frontier.clear();
        self.just_arrived.clear();
    }

    /// Search `cell` if it is loaded. Returns true once the cell is searched.
    fn try_search<S: SearchSpace>(&mut self, cell: CellPos, world: &dyn WorldSensor, space: &S) -> bool {
        if self.searched.contains(&cell) {
            return true;
        }
        if !world.is_cell_loaded(cell) {
            return false;
        }

        let mut pending = VecDeque::new();
        self.mark_searched(cell, world, space, &mut pending);
        while let Some(next) = pending.pop_front() {
            if !self.considered.insert(next) {
                continue;
            }
            if world.is_cell_loaded(next) {
                self.mark_searched(next, world, space, &mut pending);
            } else {
                self.frontier.push(next);
            }
        }
        true
    }

    fn mark_searched<S: SearchSpace>(
        &mut self,
        cell: CellPos,
        world: &dyn WorldSensor,
        space: &S,
        pending: &mut VecDeque<CellPos>,
    ) {
        self.searched.insert(cell);
        if space.contains(world, cell) {
            pending.extend(cell.neighbors());
        }
    }

    fn search_or_queue<S: SearchSpace>(&mut self, cell: CellPos, world: &dyn WorldSensor, space: &S) {
        if !self.considered.insert(cell) {
            return;
        }
        if !self.try_search(cell, world, space) {
            self.frontier.push(cell);
        }
    }

    /// Retry frontier cells whose load events arrived since the last tick
    fn drain_arrivals<S: SearchSpace>(&mut self, world: &dyn WorldSensor, space: &S) {
        let arrived = std::mem::take(&mut self.just_arrived);
        for cell in arrived {
            let Some(idx) = self.frontier.iter().position(|c| *c == cell) else {
                continue;
            };
            if self.try_search(cell, world, space) {
                self.frontier.remove(idx);
            }
        }
    }

    /// Closest frontier cell to `pos`; the first one wins a tie
    fn closest(&self, pos: Vec3) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, cell) in self.frontier.iter().enumerate() {
            let dist = cell.horizontal_distance_sq(pos);
            if best.is_none_or(|(_, best_dist)| dist < best_dist) {
                best = Some((idx, dist));
            }
        }
        best.map(|(idx, _)| idx)
    }
}

fn lock(state: &Mutex<SearchState>) -> MutexGuard<'_, SearchState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Explore every cell of a search space reachable from `start`
///
/// Finished once the frontier is empty. Equal to another search with the
/// same start and space, so re-requesting it keeps the progress made.
pub struct CellSearchTask<S: SearchSpace> {
    start: CellPos,
    space: S,
    state: Arc<Mutex<SearchState>>,
    subscription: Option<Subscription>,
}

impl<S: SearchSpace> CellSearchTask<S> {
    pub fn new(start: CellPos, space: S) -> Self {
        Self {
            start,
            space,
            state: Arc::new(Mutex::new(SearchState::default())),
            subscription: None,
        }
    }

    /// Search starting from the cell containing `position`
    pub fn from_position(position: Vec3, space: S) -> Self {
        Self::new(position.cell(), space)
    }

    pub fn start(&self) -> CellPos {
        self.start
    }

    pub fn space(&self) -> &S {
        &self.space
    }

    pub fn searched(&self) -> HashSet<CellPos> {
        lock(&self.state).searched.clone()
    }

    pub fn frontier(&self) -> Vec<CellPos> {
        lock(&self.state).frontier.clone()
    }

    pub fn considered_count(&self) -> usize {
        lock(&self.state).considered.len()
    }

    /// Whether a listener is currently registered with the world
    pub fn is_listening(&self) -> bool {
        self.subscription.is_some()
    }
}

impl<S: SearchSpace> Task for CellSearchTask<S> {
    fn describe(&self) -> String {
        format!("Searching {} from {}", self.space.describe(), self.start)
    }

    fn on_start(&mut self, agent: &mut Agent) {
        let mut state = lock(&self.state);
        state.clear();

        // Listen before looking, so a load between the two is not missed
        let inbox = self.state.clone();
        self.subscription = Some(agent.world.on_cell_loaded(Arc::new(move |cell: CellPos| {
            let mut state = lock(&inbox);
            if !state.searched.contains(&cell) {
                state.just_arrived.push(cell);
            }
        })));

        state.search_or_queue(self.start, agent.world.as_ref(), &self.space);
        debug!(
            start = %self.start,
            searched = state.searched.len(),
            queued = state.frontier.len(),
            "CellSearchTask::on_start: called"
        );
    }

    fn on_tick(&mut self, agent: &mut Agent) -> Option<Box<dyn Task>> {
        let world = agent.world.as_ref();
        let pos = agent.position();

        let target = {
            let mut state = lock(&self.state);
            state.drain_arrivals(world, &self.space);
            loop {
                let Some(idx) = state.closest(pos) else {
                    break None;
                };
                let cell = state.frontier[idx];
                // Movement may have loaded it before the event reached us
                if state.try_search(cell, world, &self.space) {
                    state.frontier.remove(idx);
                    continue;
                }
                break Some(cell);
            }
        };

        match target {
            Some(cell) => Some(Box::new(GetToCellTask::new(cell))),
            None => {
                warn!(start = %self.start, "No cells left to visit, search space exhausted");
                None
            }
        }
    }

    fn on_stop(&mut self, _agent: &mut Agent, interrupt: Option<&dyn Task>) {
        debug!(
            start = %self.start,
            interrupted = interrupt.is_some(),
            "CellSearchTask::on_stop: releasing listener"
        );
        self.subscription = None;
    }

    fn is_finished(&self, _agent: &Agent) -> bool {
        lock(&self.state).frontier.is_empty()
    }

    fn is_equal(&self, other: &dyn Task) -> bool {
        same_kind::<Self>(other).is_some_and(|other| other.start == self.start && other.space == self.space)
    }

    fn status(&self) -> Option<String> {
        let state = lock(&self.state);
        Some(format!("{} searched, {} queued", state.searched.len(), state.frontier.len()))
    }
}
