//! 网络世界实现
//!
//! 定义链路层仿真的世界（World）实现，持有网络拓扑。

use super::network::Network;
use crate::sim::World;
use std::any::Any;

/// 默认的网络世界实现：持有 Network。
#[derive(Default)]
pub struct NetWorld {
    pub net: Network,
}

impl NetWorld {
    /// 事件执行时取回具体世界。本 crate 的事件只会在 `NetWorld` 上运行。
    pub(crate) fn from_world(world: &mut dyn World) -> &mut NetWorld {
        world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld")
    }
}

impl World for NetWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
