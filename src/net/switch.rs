//! 交换机（学习网桥）
//!
//! 每个端口是一个独立的冲突域：一个端口下的 Hub 网段上的竞争不会越过交换机。
//!
//! 转发流程：
//! 1. 奇偶校验。失败则丢弃，且**不学习**源地址（被破坏的帧的源地址不可信）
//! 2. 学习 `table[src] = ingress`（仅单播源地址，后学到的覆盖先前的）
//! 3. 查目的地址：已知且不是入端口 → 单播；已知且就是入端口 → 丢弃；
//!    未知或广播 → 泛洪到除入端口外的所有已接入端口

use std::collections::HashMap;

use super::address::Address;
use super::frame::Frame;
use super::id::{NodeId, PortNo, PortRef};
use super::network::Network;
use super::node::Node;
use super::parity;
use crate::sim::Simulator;
use crate::viz::VizNodeKind;
use tracing::{debug, info, trace, warn};

/// MAC 地址表：地址 → 端口。不老化。只有交换机自己的转发操作会修改它。
#[derive(Debug, Default, Clone)]
pub struct ForwardingTable {
    entries: HashMap<Address, PortNo>,
}

impl ForwardingTable {
    /// 记录 `addr` 在 `port` 上。返回表项是否发生变化。组地址不学习。
    pub fn learn(&mut self, addr: Address, port: PortNo) -> bool {
        if addr.is_group() {
            return false;
        }
        self.entries.insert(addr, port) != Some(port)
    }

    pub fn lookup(&self, addr: Address) -> Option<PortNo> {
        self.entries.get(&addr).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Address, PortNo)> + '_ {
        self.entries.iter().map(|(a, p)| (*a, *p))
    }
}

/// 一次转发决策
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardDecision {
    /// 目的已知，只发往该端口
    Unicast(PortNo),
    /// 目的未知或为广播，发往这些端口
    Flood(Vec<PortNo>),
    /// 目的端口就是入端口，不回送
    Filter,
    /// 校验失败
    IntegrityDrop,
}

/// 交换机节点
#[derive(Debug)]
pub struct Switch {
    id: NodeId,
    name: String,
    ports: usize,
    table: ForwardingTable,
}

impl Switch {
    /// 创建新交换机
    pub fn new(id: NodeId, name: impl Into<String>, ports: usize) -> Self {
        Self {
            id,
            name: name.into(),
            ports,
            table: ForwardingTable::default(),
        }
    }

    pub fn table(&self) -> &ForwardingTable {
        &self.table
    }

    /// 对从 `ingress` 到达的帧做转发决策（含学习）。`attached` 为已接入介质的端口。
    pub fn forward(&mut self, frame: &Frame, ingress: PortNo, attached: &[PortNo]) -> ForwardDecision {
        if !parity::verify(frame) {
            return ForwardDecision::IntegrityDrop;
        }

        if self.table.learn(frame.src(), ingress) {
            debug!(src = %frame.src(), port = ingress, "学习地址");
        }

        let dst = frame.dst();
        let known = if dst.is_group() {
            None
        } else {
            self.table.lookup(dst)
        };
        match known {
            Some(port) if port == ingress => ForwardDecision::Filter,
            Some(port) => ForwardDecision::Unicast(port),
            None => ForwardDecision::Flood(
                attached.iter().copied().filter(|p| *p != ingress).collect(),
            ),
        }
    }
}

impl Node for Switch {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> VizNodeKind {
        VizNodeKind::Switch
    }

    fn port_count(&self) -> usize {
        self.ports
    }

    fn forwarding_table(&self) -> Option<&ForwardingTable> {
        Some(&self.table)
    }

    #[tracing::instrument(skip(self, frame, sim, net), fields(node_name = %self.name, node_id = ?self.id, src = %frame.src(), dst = %frame.dst()))]
    fn on_frame(&mut self, port: PortNo, frame: Frame, sim: &mut Simulator, net: &mut Network) {
        debug!("🔀 Switch 处理帧");
        net.viz_node_rx(sim.now(), self.id, port, &frame);

        let before = self.table.lookup(frame.src());
        let attached = net.attached_ports(self.id);
        let decision = self.forward(&frame, port, &attached);
        if decision != ForwardDecision::IntegrityDrop && before != self.table.lookup(frame.src()) {
            net.viz_learn(sim.now(), self.id, frame.src(), port);
        }
        trace!(?decision, "转发决策");

        match decision {
            ForwardDecision::IntegrityDrop => {
                warn!("校验失败，丢弃且不学习源地址");
                net.on_integrity_failure(self.id, &frame, sim);
            }
            ForwardDecision::Filter => {
                debug!("目的在入端口同侧，丢弃");
                net.stats.self_forward_drops += 1;
                net.viz_filter(sim.now(), self.id, port, &frame);
            }
            ForwardDecision::Unicast(out) => {
                info!(out, "单播转发");
                net.stats.unicast_frames += 1;
                net.viz_forward(sim.now(), self.id, &[out], false, &frame);
                net.transmit(PortRef::new(self.id, out), frame, sim);
            }
            ForwardDecision::Flood(outs) => {
                info!(ports = ?outs, "目的未知，泛洪");
                net.stats.flooded_frames += 1;
                net.viz_forward(sim.now(), self.id, &outs, true, &frame);
                for out in outs {
                    net.transmit(PortRef::new(self.id, out), frame.clone(), sim);
                }
            }
        }
    }
}
