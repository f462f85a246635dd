//! 节点类型
//!
//! 定义网络节点 trait 和终端设备（主机）。交换机见 `switch.rs`。

use super::address::Address;
use super::frame::Frame;
use super::id::{NodeId, PortNo};
use super::network::Network;
use super::parity;
use super::switch::ForwardingTable;
use crate::sim::Simulator;
use crate::viz::VizNodeKind;
use tracing::{debug, info, trace, warn};

/// 节点接口
pub trait Node: Send {
    /// 获取节点标识符
    fn id(&self) -> NodeId;

    /// 获取节点名称
    fn name(&self) -> &str;

    fn kind(&self) -> VizNodeKind;

    /// 端口数量，端口号为 `0..port_count()`
    fn port_count(&self) -> usize;

    /// 终端设备的 MAC 地址；交换机没有自己的地址
    fn address(&self) -> Option<Address> {
        None
    }

    /// 已交付给本节点的帧（按到达顺序）
    fn received(&self) -> &[Frame] {
        &[]
    }

    /// 交换机的地址表
    fn forwarding_table(&self) -> Option<&ForwardingTable> {
        None
    }

    /// 处理从 `port` 到达的帧
    fn on_frame(&mut self, port: PortNo, frame: Frame, sim: &mut Simulator, net: &mut Network);
}

/// 终端设备：一个地址、一个端口
#[derive(Debug)]
pub struct Host {
    id: NodeId,
    name: String,
    address: Address,
    inbox: Vec<Frame>,
}

impl Host {
    /// 创建新主机
    pub fn new(id: NodeId, name: impl Into<String>, address: Address) -> Self {
        Self {
            id,
            name: name.into(),
            address,
            inbox: Vec::new(),
        }
    }

    fn accepts(&self, frame: &Frame) -> bool {
        frame.dst() == self.address || frame.dst().is_broadcast()
    }
}

impl Node for Host {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> VizNodeKind {
        VizNodeKind::Host
    }

    fn port_count(&self) -> usize {
        1
    }

    fn address(&self) -> Option<Address> {
        Some(self.address)
    }

    fn received(&self) -> &[Frame] {
        &self.inbox
    }

    #[tracing::instrument(skip(self, frame, sim, net), fields(node_name = %self.name, node_id = ?self.id, src = %frame.src(), dst = %frame.dst()))]
    fn on_frame(&mut self, port: PortNo, frame: Frame, sim: &mut Simulator, net: &mut Network) {
        debug!("🖥️  Host 处理帧");
        net.viz_node_rx(sim.now(), self.id, port, &frame);

        if !self.accepts(&frame) {
            trace!("目的地址不是本机，网卡过滤");
            net.stats.filtered_frames += 1;
            return;
        }

        if !parity::verify(&frame) {
            warn!("校验失败，丢弃");
            net.on_integrity_failure(self.id, &frame, sim);
            return;
        }

        info!(payload_bytes = frame.payload().len(), "✅ 帧已交付");
        self.inbox.push(frame.clone());
        net.on_delivered(self.id, frame, sim);
    }
}
