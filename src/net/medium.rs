//! 介质抽象
//!
//! 端口接入的介质：独占的点对点 Connection，或共享的 Hub 网段。

use super::id::{LinkId, SegmentId};
use crate::sim::SimTime;

/// 端口接入的介质
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Medium {
    /// 点对点链路（记录本端出方向的单向链路）
    Link(LinkId),
    /// 共享网段
    Segment(SegmentId),
}

/// 发送请求的即时结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryResult {
    /// 点对点链路：必然送达，`arrive` 为到达对端的时刻
    Sent { arrive: SimTime },
    /// 共享网段：已交给 CSMA/CD，最终结果见 `TxReport`
    Contending,
    /// 端口未接入任何介质
    NoPeer,
}
