//! In-process world used by the `tc` binary and by tests
//!
//! Implements every collaborator interface in [`crate::world`]: a grid
//! that loads on demand, a body, straight-line movement and a transport
//! that records what it sends.

mod loader;
mod movement;
mod rig;
mod transport;
mod world;

pub use loader::spawn_loader;
pub use movement::{MovementDriver, SimMovement};
pub use rig::SimRig;
pub use transport::{SimTransport, TransportHandle};
pub use world::{SimBody, SimWorld};
