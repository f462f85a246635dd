//! 共享网段（Hub 广播域）
//!
//! Hub 没有转发智能：成功发送的帧会被交付给网段上除发送者以外的所有站点。
//! 网段上的访问由 [`CsmaCd`] 串行化。

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::frame::Frame;
use super::id::{PortRef, SegmentId};
use crate::mac::{CsmaCd, CsmaConfig};
use crate::sim::SimTime;

/// 共享网段参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubOpts {
    pub bandwidth_bps: u64,
    /// 站点之间的传播时延
    pub latency: SimTime,
    pub csma: CsmaConfig,
}

impl Default for HubOpts {
    fn default() -> Self {
        Self {
            bandwidth_bps: 10_000_000,
            latency: SimTime::from_micros(1),
            csma: CsmaConfig::default(),
        }
    }
}

/// 共享网段
#[derive(Debug)]
pub struct Segment {
    pub id: SegmentId,
    pub name: String,
    pub latency: SimTime,
    stations: Vec<PortRef>,
    pub(crate) csma: CsmaCd,
    pub(crate) faults: VecDeque<usize>,
}

impl Segment {
    pub(crate) fn new(id: SegmentId, name: impl Into<String>, latency: SimTime, csma: CsmaCd) -> Self {
        Self {
            id,
            name: name.into(),
            latency,
            stations: Vec::new(),
            csma,
            faults: VecDeque::new(),
        }
    }

    /// 已接入的站点，按接入顺序
    pub fn stations(&self) -> &[PortRef] {
        &self.stations
    }

    pub(crate) fn add_station(&mut self, station: PortRef) {
        self.stations.push(station);
    }

    pub fn csma(&self) -> &CsmaCd {
        &self.csma
    }

    /// 除发送者以外的所有站点（Hub 泛洪的目标）
    pub fn receivers(&self, sender: PortRef) -> impl Iterator<Item = PortRef> + '_ {
        self.stations.iter().copied().filter(move |s| *s != sender)
    }

    pub(crate) fn apply_faults(&mut self, frame: Frame) -> Frame {
        match self.faults.pop_front() {
            Some(bit) => frame.with_bit_flipped(bit),
            None => frame,
        }
    }
}
