//! Helpers for reaching the sliding window stack from the simulation world.

use crate::proto::sliding_window::SwStack;
use crate::sim::World;

use super::{NetWorld, Network};

/// Runs `f` with the network and its sliding window stack borrowed apart.
pub(crate) fn with_sw_stack<F, R>(world: &mut dyn World, f: F) -> R
where
    F: FnOnce(&mut Network, &mut SwStack) -> R,
{
    let w = NetWorld::from_world(world);
    let mut sw = std::mem::take(&mut w.net.sw);
    let result = f(&mut w.net, &mut sw);
    w.net.sw = sw;
    result
}
