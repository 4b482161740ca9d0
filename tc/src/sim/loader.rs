//! Background cell loader
//!
//! Stands in for the network thread that streams world data: it loads the
//! cells around the agent on its own tokio task, so cell-loaded listeners
//! fire off the tick loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::world::AgentBody;

use super::world::SimWorld;

/// Shortest period the loader polls at
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Load cells within `radius` of the body every `interval` until aborted
pub fn spawn_loader(world: Arc<SimWorld>, body: Arc<dyn AgentBody>, radius: i32, interval: Duration) -> JoinHandle<()> {
    debug!(radius, ?interval, "spawn_loader: called");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(MIN_INTERVAL));
        loop {
            ticker.tick().await;
            let center = body.position().cell();
            let loaded = world.load_around(center, radius);
            if loaded > 0 {
                debug!(%center, loaded, total = world.loaded_count(), "spawn_loader: loaded cells");
            }
        }
    })
}
