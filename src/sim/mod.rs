//! 离散事件仿真内核
//!
//! 时间、事件堆和 `World` 接口，外加场景文件的数据结构。

mod event;
mod scenario;
mod scheduled_event;
mod simulator;
mod time;
mod world;

pub use event::Event;
pub use scenario::{
    AttachSpec, HostSpec, HubSpec, LinkDefaults, LinkSpec, ScenarioSpec, SwitchSpec, TrafficSpec,
};
pub use scheduled_event::ScheduledEvent;
pub use simulator::Simulator;
pub use time::SimTime;
pub use world::World;
