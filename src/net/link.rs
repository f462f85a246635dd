//! 点对点链路
//!
//! 一条全双工 Connection 由两条单向 `Link` 组成。链路独占、无竞争：
//! 帧按发送顺序串行化，到达时间 = max(now, busy_until) + 发送时延 + 传播时延。

use std::collections::VecDeque;

use super::frame::Frame;
use super::id::PortRef;
use crate::sim::SimTime;

/// 以 `bandwidth_bps` 发送 `bytes` 字节所需的时间（向上取整到纳秒）。
pub(crate) fn tx_time(bytes: u32, bandwidth_bps: u64) -> SimTime {
    if bandwidth_bps == 0 {
        return SimTime(u64::MAX / 4);
    }
    let bits = u128::from(bytes).saturating_mul(8);
    let bps = u128::from(bandwidth_bps);
    let nanos = (bits.saturating_mul(1_000_000_000u128) + (bps - 1)) / bps;
    SimTime(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// 单向链路
#[derive(Debug)]
pub struct Link {
    pub from: PortRef,
    pub to: PortRef,
    pub latency: SimTime,
    pub bandwidth_bps: u64,
    pub busy_until: SimTime,
    /// 待注入的比特错误：下一个经过的帧翻转队首位置的比特
    pub(crate) faults: VecDeque<usize>,
}

impl Link {
    /// 创建新链路
    pub fn new(from: PortRef, to: PortRef, latency: SimTime, bandwidth_bps: u64) -> Self {
        Self {
            from,
            to,
            latency,
            bandwidth_bps,
            busy_until: SimTime::ZERO,
            faults: VecDeque::new(),
        }
    }

    /// 计算发送指定字节数所需的时间
    pub(crate) fn tx_time(&self, bytes: u32) -> SimTime {
        tx_time(bytes, self.bandwidth_bps)
    }

    /// 占用链路发送一帧，返回 (开始发送, 到达对端) 时刻。
    pub(crate) fn reserve(&mut self, now: SimTime, frame: &Frame) -> (SimTime, SimTime) {
        let start = now.max(self.busy_until);
        let depart = start.saturating_add(self.tx_time(frame.wire_bytes()));
        self.busy_until = depart;
        (start, depart.saturating_add(self.latency))
    }

    /// 若有待注入的错误，返回被破坏的副本；否则原样返回。
    pub(crate) fn apply_faults(&mut self, frame: Frame) -> Frame {
        match self.faults.pop_front() {
            Some(bit) => frame.with_bit_flipped(bit),
            None => frame,
        }
    }
}
