//! 帧交付与注入事件

use super::address::Address;
use super::frame::Frame;
use super::id::{NodeId, PortRef};
use super::medium::DeliveryResult;
use super::net_world::NetWorld;
use crate::sim::{Event, Simulator, World};
use tracing::{debug, trace, warn};

/// 事件：把一帧交给某个节点的某个端口处理。
#[derive(Debug)]
pub struct DeliverFrame {
    pub to: PortRef,
    pub frame: Frame,
    /// 这一跳在共享网段上经历的冲突次数（点对点链路为 0）
    pub retries: u32,
}

impl Event for DeliverFrame {
    #[tracing::instrument(skip(self, sim, world), fields(to = %self.to, src = %self.frame.src(), dst = %self.frame.dst()))]
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let DeliverFrame { to, frame, retries } = *self;

        debug!(
            payload_bytes = frame.payload().len(),
            kind = ?frame.kind(),
            now = ?sim.now(),
            "📨 帧到达端口"
        );

        NetWorld::from_world(world).net.deliver(to, frame, retries, sim);

        trace!("DeliverFrame::execute 完成");
    }
}

/// 事件：主机在指定时刻发送一个普通数据帧。
#[derive(Debug)]
pub struct SendFrame {
    pub from: NodeId,
    pub dst: Address,
    pub payload: Vec<u8>,
}

impl Event for SendFrame {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let SendFrame { from, dst, payload } = *self;
        let w = NetWorld::from_world(world);
        match w.net.send(from, dst, payload, sim) {
            Ok(DeliveryResult::NoPeer) => warn!(?from, %dst, "端口未接入介质，帧被丢弃"),
            Ok(_) => {}
            Err(err) => warn!(?from, %dst, %err, "发送失败"),
        }
    }
}
