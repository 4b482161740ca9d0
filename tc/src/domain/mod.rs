//! Domain types for taskchain
//!
//! Grid coordinates, world positions, cell contents and message priorities.
//! These are plain values shared by every other module.

mod cell;
mod priority;

pub use cell::{CELL_SIZE, CellData, CellPos, RegionId, Terrain, Vec3};
pub use priority::MessagePriority;
