//! Tasks shipped with the engine

mod cell_search;
mod escape_hazard;
mod get_to_cell;
mod idle;

pub use cell_search::{CellSearchTask, SearchSpace, TerrainSearch};
pub use escape_hazard::EscapeHazardTask;
pub use get_to_cell::GetToCellTask;
pub use idle::IdleTask;
