//! 网络拓扑管理
//!
//! 持有节点、点对点链路、共享网段和端口接入关系，负责把帧送上介质、
//! 把到达的帧交给节点，并收集统计与结果事件。

use std::collections::HashMap;

use super::address::Address;
use super::deliver_frame::DeliverFrame;
use super::error::LinkError;
use super::frame::{Frame, FrameKind};
use super::id::{LinkId, NodeId, PortNo, PortRef, SegmentId};
use super::link::Link;
use super::medium::{DeliveryResult, Medium};
use super::node::{Host, Node};
use super::report::{TxOutcome, TxReport};
use super::segment::{HubOpts, Segment};
use super::stats::Stats;
use super::switch::{ForwardingTable, Switch};
use crate::mac::{BackoffSource, CsmaAttempt, CsmaCd, SeededBackoff};
use crate::proto::sliding_window::SwStack;
use crate::sim::{SimTime, Simulator};
use crate::viz::{VizLogger, VizNodeKind};
use tracing::{debug, info, trace, warn};

/// 网络拓扑
#[derive(Default)]
pub struct Network {
    nodes: Vec<Option<Box<dyn Node>>>,
    pub(crate) node_names: Vec<String>,
    pub(crate) node_kinds: Vec<VizNodeKind>,
    port_counts: Vec<usize>,
    addresses: HashMap<Address, NodeId>,
    pub(crate) links: Vec<Link>,
    pub(crate) segments: Vec<Segment>,
    ports: HashMap<PortRef, Medium>,
    /// 新建网段时派生退避种子
    seed: u64,
    /// 正在交付的帧在最后一跳网段上的冲突次数
    arrival_retries: u32,
    pub stats: Stats,
    pub reports: Vec<TxReport>,
    pub viz: Option<VizLogger>,
    pub(crate) sw: SwStack,
}

impl Network {
    /// 以给定种子创建网络；每个 Hub 网段的退避随机源由它派生。
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// 之后新建的 Hub 网段从这个种子派生退避随机源
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
    }

    fn push_node(&mut self, node: Box<dyn Node>) -> NodeId {
        let id = node.id();
        self.node_names.push(node.name().to_string());
        self.node_kinds.push(node.kind());
        self.port_counts.push(node.port_count());
        self.nodes.push(Some(node));
        id
    }

    /// 添加终端设备。地址必须唯一。
    pub fn add_host(&mut self, name: impl Into<String>, address: Address) -> Result<NodeId, LinkError> {
        if address.is_group() {
            return Err(LinkError::InvalidAddress(address.to_string()));
        }
        if self.addresses.contains_key(&address) {
            return Err(LinkError::DuplicateAddress(address));
        }
        let id = NodeId(self.nodes.len());
        self.addresses.insert(address, id);
        Ok(self.push_node(Box::new(Host::new(id, name, address))))
    }

    /// 添加交换机节点
    pub fn add_switch(&mut self, name: impl Into<String>, ports: usize) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.push_node(Box::new(Switch::new(id, name, ports)))
    }

    /// 添加 Hub 网段，退避随机源由网络种子和网段序号派生。
    pub fn add_hub(&mut self, name: impl Into<String>, opts: HubOpts) -> SegmentId {
        let index = self.segments.len() as u64;
        let seed = self.seed ^ index.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        self.add_hub_with_backoff(name, opts, Box::new(SeededBackoff::new(seed)))
    }

    /// 添加 Hub 网段并注入退避随机源（测试用固定序列）。
    pub fn add_hub_with_backoff(
        &mut self,
        name: impl Into<String>,
        opts: HubOpts,
        backoff: Box<dyn BackoffSource>,
    ) -> SegmentId {
        let id = SegmentId(self.segments.len());
        let csma = CsmaCd::new(opts.csma, opts.bandwidth_bps, backoff);
        self.segments.push(Segment::new(id, name, opts.latency, csma));
        id
    }

    fn check_port(&self, at: PortRef) -> Result<(), LinkError> {
        let count = *self
            .port_counts
            .get(at.node.0)
            .ok_or(LinkError::UnknownNode(at.node))?;
        if at.port >= count {
            return Err(LinkError::InvalidPort {
                node: at.node,
                port: at.port,
            });
        }
        if self.ports.contains_key(&at) {
            return Err(LinkError::PortInUse {
                node: at.node,
                port: at.port,
            });
        }
        Ok(())
    }

    /// 把端口接入 Hub 网段。端口接入后不可更改。
    pub fn attach(&mut self, at: PortRef, segment: SegmentId) -> Result<(), LinkError> {
        self.check_port(at)?;
        let seg = self
            .segments
            .get_mut(segment.0)
            .ok_or(LinkError::UnknownSegment(segment))?;
        seg.add_station(at);
        self.ports.insert(at, Medium::Segment(segment));
        debug!(%at, segment = segment.0, "端口接入网段");
        Ok(())
    }

    /// 用全双工点对点链路连接两个端口，返回 a→b 方向的链路。
    pub fn connect(
        &mut self,
        a: PortRef,
        b: PortRef,
        latency: SimTime,
        bandwidth_bps: u64,
    ) -> Result<LinkId, LinkError> {
        self.check_port(a)?;
        self.check_port(b)?;
        if a == b {
            return Err(LinkError::PortInUse {
                node: b.node,
                port: b.port,
            });
        }
        let ab = LinkId(self.links.len());
        self.links.push(Link::new(a, b, latency, bandwidth_bps));
        let ba = LinkId(self.links.len());
        self.links.push(Link::new(b, a, latency, bandwidth_bps));
        self.ports.insert(a, Medium::Link(ab));
        self.ports.insert(b, Medium::Link(ba));
        debug!(%a, %b, "建立点对点链路");
        Ok(ab)
    }

    /// 端口接入的介质
    pub fn medium(&self, at: PortRef) -> Option<Medium> {
        self.ports.get(&at).copied()
    }

    /// 节点已接入介质的端口（升序）
    pub fn attached_ports(&self, node: NodeId) -> Vec<PortNo> {
        let count = self.port_counts.get(node.0).copied().unwrap_or(0);
        (0..count)
            .filter(|p| self.ports.contains_key(&PortRef::new(node, *p)))
            .collect()
    }

    pub fn node(&self, id: NodeId) -> Option<&dyn Node> {
        self.nodes.get(id.0)?.as_deref()
    }

    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        self.node_names.get(id.0).map(String::as_str)
    }

    pub fn node_by_address(&self, address: Address) -> Option<NodeId> {
        self.addresses.get(&address).copied()
    }

    pub fn host_address(&self, id: NodeId) -> Option<Address> {
        self.node(id)?.address()
    }

    /// 已交付给主机的帧
    pub fn received(&self, id: NodeId) -> &[Frame] {
        match self.node(id) {
            Some(node) => node.received(),
            None => &[],
        }
    }

    pub fn forwarding_table(&self, id: NodeId) -> Option<&ForwardingTable> {
        self.node(id)?.forwarding_table()
    }

    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.get(id.0)
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.0)
    }

    /// 让下一个经过链路 `link` 的帧翻转第 `bit` 位
    pub fn corrupt_next_on_link(&mut self, link: LinkId, bit: usize) -> Result<(), LinkError> {
        let l = self
            .links
            .get_mut(link.0)
            .ok_or(LinkError::UnknownLink(link))?;
        l.faults.push_back(bit);
        Ok(())
    }

    /// 让下一个在网段 `segment` 上成功发送的帧翻转第 `bit` 位
    pub fn corrupt_next_on_segment(&mut self, segment: SegmentId, bit: usize) -> Result<(), LinkError> {
        let s = self
            .segments
            .get_mut(segment.0)
            .ok_or(LinkError::UnknownSegment(segment))?;
        s.faults.push_back(bit);
        Ok(())
    }

    /// 主机发送一个普通数据帧
    pub fn send(
        &mut self,
        from: NodeId,
        dst: Address,
        payload: impl Into<Vec<u8>>,
        sim: &mut Simulator,
    ) -> Result<DeliveryResult, LinkError> {
        let src = self.host_address(from).ok_or(LinkError::UnknownNode(from))?;
        let frame = Frame::new(src, dst, payload);
        Ok(self.transmit(PortRef::new(from, 0), frame, sim))
    }

    /// 把帧送上 `from` 端口接入的介质
    #[tracing::instrument(skip(self, frame, sim), fields(%from, src = %frame.src(), dst = %frame.dst()))]
    pub fn transmit(&mut self, from: PortRef, frame: Frame, sim: &mut Simulator) -> DeliveryResult {
        let now = sim.now();
        match self.ports.get(&from).copied() {
            None => {
                debug!("端口未接入介质，丢弃");
                DeliveryResult::NoPeer
            }
            Some(Medium::Link(link_id)) => {
                let link = &mut self.links[link_id.0];
                let (start, arrive) = link.reserve(now, &frame);
                let to = link.to;
                let frame = link.apply_faults(frame);
                trace!(?start, ?arrive, %to, "🚀 点对点发送");
                self.viz_link_tx(now, from, to, start, arrive, &frame);
                sim.schedule(arrive, DeliverFrame { to, frame, retries: 0 });
                DeliveryResult::Sent { arrive }
            }
            Some(Medium::Segment(segment)) => {
                let seg = &mut self.segments[segment.0];
                if seg.csma.enqueue(from, frame) {
                    sim.schedule(now, CsmaAttempt { segment, station: from });
                } else {
                    trace!(queued = seg.csma.queued(from), "站点正在竞争，帧排队");
                }
                DeliveryResult::Contending
            }
        }
    }

    /// 将帧交付给节点处理。`retries` 是最后一跳网段上的冲突次数。
    #[tracing::instrument(skip(self, frame, sim), fields(%to))]
    pub fn deliver(&mut self, to: PortRef, frame: Frame, retries: u32, sim: &mut Simulator) {
        // 暂时把节点取出来，避免 &mut self 与 &mut node 的重叠借用。
        let Some(mut node) = self.nodes.get_mut(to.node.0).and_then(Option::take) else {
            warn!("目标节点不存在");
            return;
        };
        self.arrival_retries = retries;
        node.on_frame(to.port, frame, sim, self);
        self.arrival_retries = 0;
        self.nodes[to.node.0] = Some(node);
    }

    pub(crate) fn report(&mut self, report: TxReport) {
        info!(
            outcome = ?report.outcome,
            src = %report.src,
            dst = %report.dst,
            retries = report.retries,
            seq_range = ?report.seq_range,
            transfer = ?report.transfer,
            "📋 传输结果"
        );
        self.reports.push(report);
    }

    /// 帧被目的主机接收
    #[tracing::instrument(skip(self, frame, sim), fields(src = %frame.src(), dst = %frame.dst()))]
    pub(crate) fn on_delivered(&mut self, at: NodeId, frame: Frame, sim: &mut Simulator) {
        self.stats.delivered_frames += 1;
        self.stats.delivered_bytes += frame.payload().len() as u64;
        self.viz_delivered(sim.now(), at, &frame);

        // 普通帧到达目的主机即成功；滑动窗口帧的成功由传输整体上报
        if frame.kind() == FrameKind::Raw {
            let report = TxReport::new(sim.now(), TxOutcome::Success, frame.src(), frame.dst())
                .with_retries(self.arrival_retries);
            self.report(report);
        } else {
            // 数据帧产生 ACK，ACK 推动窗口
            let mut sw = std::mem::take(&mut self.sw);
            sw.on_frame(at, &frame, sim, self);
            self.sw = sw;
        }
    }

    /// 校验失败：丢帧并报告，不重试（重传是发送方滑动窗口的职责）
    pub(crate) fn on_integrity_failure(&mut self, at: NodeId, frame: &Frame, sim: &mut Simulator) {
        self.stats.integrity_drops += 1;
        self.viz_integrity_drop(sim.now(), at, frame);
        let mut report = TxReport::new(sim.now(), TxOutcome::IntegrityFailed, frame.src(), frame.dst());
        if let Some(seq) = frame.seq() {
            report = report.with_seq_range(seq, seq);
        }
        self.report(report);
    }
}
