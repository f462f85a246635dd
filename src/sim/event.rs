//! 事件 trait
//!
//! 链路层的每个动作（帧到达、载波重听、退避结束、重传定时器）都是一个事件。

use super::simulator::Simulator;
use super::world::World;

/// 可调度的仿真事件。
///
/// `self: Box<Self>` 让事件在执行时取回自身所有权，帧可以直接 move 给接收方。
pub trait Event: Send + 'static {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World);
}
