//! Simulated world grid and agent body

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::domain::{CellData, CellPos, RegionId, Terrain, Vec3};
use crate::world::{AgentBody, CellListener, ListenerRegistry, Subscription, WorldSensor};

#[derive(Debug, Default)]
struct WorldState {
    terrain: HashMap<CellPos, Terrain>,
    loaded: HashSet<CellPos>,
    hazards: HashSet<CellPos>,
}

/// In-memory world whose cells load only when told to
///
/// Every cell has a terrain from the start, but sensors only see cells that
/// were loaded. Loading notifies listeners after the world lock is released.
pub struct SimWorld {
    state: Mutex<WorldState>,
    default_terrain: Terrain,
    listeners: ListenerRegistry,
}

impl SimWorld {
    /// Unbounded world where every cell has `terrain`
    pub fn uniform(terrain: Terrain) -> Self {
        Self {
            state: Mutex::new(WorldState::default()),
            default_terrain: terrain,
            listeners: ListenerRegistry::new(),
        }
    }

    /// Patchy terrain within `radius` cells of the origin, ocean beyond.
    ///
    /// Each cell takes the terrain of its nearest random site, which gives
    /// connected regions of one terrain for searches to walk.
    pub fn generate(seed: u64, radius: i32) -> Self {
        let radius = radius.max(0);
        let mut rng = StdRng::seed_from_u64(seed);
        let site_count = ((radius * radius) / 12).max(4);
        let sites: Vec<(CellPos, Terrain)> = (0..site_count)
            .map(|_| {
                let pos = CellPos::new(rng.random_range(-radius..=radius), rng.random_range(-radius..=radius));
                let terrain = Terrain::ALL[rng.random_range(0..Terrain::ALL.len() - 1)];
                (pos, terrain)
            })
            .collect();

        let mut terrain = HashMap::new();
        for x in -radius..=radius {
            for z in -radius..=radius {
                let cell = CellPos::new(x, z);
                let nearest = sites
                    .iter()
                    .min_by_key(|(site, _)| (site.x - x).pow(2) + (site.z - z).pow(2))
                    .map(|(_, t)| *t)
                    .unwrap_or_default();
                terrain.insert(cell, nearest);
            }
        }
        debug!(seed, radius, sites = site_count, "SimWorld::generate: done");

        Self {
            state: Mutex::new(WorldState {
                terrain,
                ..Default::default()
            }),
            default_terrain: Terrain::Ocean,
            listeners: ListenerRegistry::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WorldState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_terrain(&self, cell: CellPos, terrain: Terrain) {
        self.lock().terrain.insert(cell, terrain);
    }

    pub fn terrain_of(&self, cell: CellPos) -> Terrain {
        self.lock().terrain.get(&cell).copied().unwrap_or(self.default_terrain)
    }

    pub fn set_hazard(&self, cell: CellPos, hazard: bool) {
        let mut state = self.lock();
        if hazard {
            state.hazards.insert(cell);
        } else {
            state.hazards.remove(&cell);
        }
    }

    /// Mark a cell loaded; returns false if it already was
    pub fn load_cell(&self, cell: CellPos) -> bool {
        let newly = self.lock().loaded.insert(cell);
        if newly {
            self.listeners.notify(cell);
        }
        newly
    }

    /// Load every cell within `radius` (Chebyshev) of `center`; returns how
    /// many were newly loaded
    pub fn load_around(&self, center: CellPos, radius: i32) -> usize {
        let mut fresh = Vec::new();
        {
            let mut state = self.lock();
            for x in center.x - radius..=center.x + radius {
                for z in center.z - radius..=center.z + radius {
                    let cell = CellPos::new(x, z);
                    if state.loaded.insert(cell) {
                        fresh.push(cell);
                    }
                }
            }
        }
        for cell in &fresh {
            self.listeners.notify(*cell);
        }
        fresh.len()
    }

    /// Forget a cell's contents without notifying anyone
    pub fn unload_cell(&self, cell: CellPos) {
        self.lock().loaded.remove(&cell);
    }

    pub fn loaded_count(&self) -> usize {
        self.lock().loaded.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl WorldSensor for SimWorld {
    fn is_cell_loaded(&self, cell: CellPos) -> bool {
        self.lock().loaded.contains(&cell)
    }

    fn cell_at(&self, cell: CellPos) -> Option<CellData> {
        let state = self.lock();
        if !state.loaded.contains(&cell) {
            return None;
        }
        Some(CellData {
            terrain: state.terrain.get(&cell).copied().unwrap_or(self.default_terrain),
            hazard: state.hazards.contains(&cell),
        })
    }

    fn on_cell_loaded(&self, listener: CellListener) -> Subscription {
        self.listeners.subscribe(listener)
    }
}

/// Shared position/region of the simulated agent
#[derive(Debug)]
pub struct SimBody {
    position: Mutex<Vec3>,
    region: Mutex<RegionId>,
}

impl SimBody {
    pub fn new(position: Vec3) -> Self {
        Self {
            position: Mutex::new(position),
            region: Mutex::new(RegionId::overworld()),
        }
    }

    /// Body standing at the centre of `cell`
    pub fn at_cell(cell: CellPos) -> Self {
        Self::new(cell.center(64.0))
    }

    pub fn set_position(&self, position: Vec3) {
        *self.position.lock().unwrap_or_else(PoisonError::into_inner) = position;
    }

    pub fn set_region(&self, region: RegionId) {
        *self.region.lock().unwrap_or_else(PoisonError::into_inner) = region;
    }
}

impl AgentBody for SimBody {
    fn position(&self) -> Vec3 {
        *self.position.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn region(&self) -> RegionId {
        self.region.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}
