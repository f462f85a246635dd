//! 网络模拟模块
//!
//! 此模块包含链路层仿真的核心组件：帧与校验、节点（主机/交换机）、
//! 点对点链路、Hub 共享网段以及网络拓扑。

// 子模块声明
mod address;
mod deliver_frame;
mod error;
mod frame;
mod id;
mod link;
mod medium;
mod net_world;
mod network;
mod network_csma;
mod network_viz;
mod node;
pub mod parity;
mod proto_bridge;
mod report;
mod segment;
mod stats;
mod switch;

// 重新导出公共接口
pub use address::Address;
pub use deliver_frame::{DeliverFrame, SendFrame};
pub use error::LinkError;
pub use frame::{Frame, FrameKind, HEADER_BYTES, MIN_FRAME_BYTES};
pub use id::{LinkId, NodeId, PortNo, PortRef, SegmentId};
pub use link::Link;
pub(crate) use link::tx_time;
pub use medium::{DeliveryResult, Medium};
pub use net_world::NetWorld;
pub use network::Network;
pub use node::{Host, Node};
pub(crate) use proto_bridge::with_sw_stack;
pub use report::{TxOutcome, TxReport};
pub use segment::{HubOpts, Segment};
pub use stats::Stats;
pub use switch::{ForwardDecision, ForwardingTable, Switch};
