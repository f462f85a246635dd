//! 世界 trait
//!
//! 事件通过 `World` 访问被仿真的对象（拓扑、协议栈、统计）。

use super::simulator::Simulator;
use std::any::Any;

/// 仿真世界：由网络层实现（见 `net::NetWorld`），测试中也可以用哑实现。
pub trait World: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// 每执行完一个事件调用一次。
    fn on_tick(&mut self, _sim: &mut Simulator) {}
}
