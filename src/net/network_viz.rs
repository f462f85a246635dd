//! Visualization hooks for the network.

use crate::mac::Completion;
use crate::sim::SimTime;
use crate::viz::{
    VizEvent, VizEventKind, VizFrameKind, VizLinkInfo, VizNodeInfo, VizNodeKind, VizSegmentInfo,
};

use super::{Address, Frame, FrameKind, Network, NodeId, PortNo, PortRef, SegmentId};

impl Network {
    pub(crate) fn frame_kind(frame: &Frame) -> VizFrameKind {
        match frame.kind() {
            FrameKind::Raw => VizFrameKind::Raw,
            FrameKind::Data { .. } => VizFrameKind::Data,
            FrameKind::Ack { .. } => VizFrameKind::Ack,
        }
    }

    fn viz_push(&mut self, ev: VizEvent) {
        if let Some(v) = &mut self.viz {
            v.push(ev);
        }
    }

    fn viz_frame(&mut self, t: SimTime, frame: Option<&Frame>, kind: VizEventKind) {
        if self.viz.is_none() {
            return;
        }
        self.viz_push(VizEvent {
            t_ns: t.0,
            src: frame.map(|f| f.src().to_string()),
            dst: frame.map(|f| f.dst().to_string()),
            frame_bytes: frame.map(Frame::wire_bytes),
            frame_kind: frame.map(Self::frame_kind),
            kind,
        });
    }

    /// 写入拓扑元信息（t=0）
    pub fn emit_viz_meta(&mut self) {
        if self.viz.is_none() {
            return;
        }
        let nodes = self
            .node_names
            .iter()
            .enumerate()
            .map(|(id, name)| VizNodeInfo {
                id,
                name: name.clone(),
                kind: *self.node_kinds.get(id).unwrap_or(&VizNodeKind::Switch),
                address: self.host_address(NodeId(id)).map(|a| a.to_string()),
            })
            .collect::<Vec<_>>();
        let links = self
            .links
            .iter()
            .map(|l| VizLinkInfo {
                from: l.from.node.0,
                from_port: l.from.port,
                to: l.to.node.0,
                to_port: l.to.port,
                bandwidth_bps: l.bandwidth_bps,
                latency_ns: l.latency.0,
            })
            .collect::<Vec<_>>();
        let segments = self
            .segments
            .iter()
            .map(|s| VizSegmentInfo {
                id: s.id.0,
                name: s.name.clone(),
                stations: s.stations().iter().map(|p| (p.node.0, p.port)).collect(),
                bandwidth_bps: s.csma().bandwidth_bps(),
            })
            .collect::<Vec<_>>();
        self.viz_frame(
            SimTime::ZERO,
            None,
            VizEventKind::Meta {
                nodes,
                links,
                segments,
            },
        );
    }

    pub(crate) fn viz_node_rx(&mut self, t: SimTime, node: NodeId, port: PortNo, frame: &Frame) {
        let node_kind = *self.node_kinds.get(node.0).unwrap_or(&VizNodeKind::Host);
        let node_name = self.node_names.get(node.0).cloned().unwrap_or_default();
        self.viz_frame(
            t,
            Some(frame),
            VizEventKind::NodeRx {
                node: node.0,
                port,
                node_kind,
                node_name,
            },
        );
    }

    pub(crate) fn viz_learn(&mut self, t: SimTime, node: NodeId, address: Address, port: PortNo) {
        self.viz_frame(
            t,
            None,
            VizEventKind::Learn {
                node: node.0,
                address: address.to_string(),
                port,
            },
        );
    }

    pub(crate) fn viz_forward(&mut self, t: SimTime, node: NodeId, ports: &[PortNo], flooded: bool, frame: &Frame) {
        self.viz_frame(
            t,
            Some(frame),
            VizEventKind::Forward {
                node: node.0,
                ports: ports.to_vec(),
                flooded,
            },
        );
    }

    pub(crate) fn viz_filter(&mut self, t: SimTime, node: NodeId, port: PortNo, frame: &Frame) {
        self.viz_frame(t, Some(frame), VizEventKind::Filter { node: node.0, port });
    }

    pub(crate) fn viz_integrity_drop(&mut self, t: SimTime, node: NodeId, frame: &Frame) {
        self.viz_frame(t, Some(frame), VizEventKind::IntegrityDrop { node: node.0 });
    }

    pub(crate) fn viz_delivered(&mut self, t: SimTime, node: NodeId, frame: &Frame) {
        self.viz_frame(t, Some(frame), VizEventKind::Delivered { node: node.0 });
    }

    pub(crate) fn viz_link_tx(
        &mut self,
        t: SimTime,
        from: PortRef,
        to: PortRef,
        depart: SimTime,
        arrive: SimTime,
        frame: &Frame,
    ) {
        self.viz_frame(
            t,
            Some(frame),
            VizEventKind::LinkTx {
                link_from: from.node.0,
                link_to: to.node.0,
                depart_ns: depart.0,
                arrive_ns: arrive.0,
            },
        );
    }

    pub(crate) fn viz_segment_tx_start(
        &mut self,
        t: SimTime,
        segment: SegmentId,
        station: PortRef,
        end: SimTime,
        frame: Option<&Frame>,
    ) {
        self.viz_frame(
            t,
            frame,
            VizEventKind::SegmentTxStart {
                segment: segment.0,
                node: station.node.0,
                end_ns: end.0,
            },
        );
    }

    pub(crate) fn viz_carrier_busy(&mut self, t: SimTime, segment: SegmentId, station: PortRef, until: SimTime) {
        self.viz_frame(
            t,
            None,
            VizEventKind::CarrierBusy {
                segment: segment.0,
                node: station.node.0,
                until_ns: until.0,
            },
        );
    }

    pub(crate) fn viz_collision(&mut self, t: SimTime, segment: SegmentId, nodes: Vec<usize>, jam_until: SimTime) {
        self.viz_frame(
            t,
            None,
            VizEventKind::Collision {
                segment: segment.0,
                nodes,
                jam_until_ns: jam_until.0,
            },
        );
    }

    pub(crate) fn viz_backoff(
        &mut self,
        t: SimTime,
        segment: SegmentId,
        station: PortRef,
        collisions: u32,
        slots: u64,
        resume: SimTime,
    ) {
        self.viz_frame(
            t,
            None,
            VizEventKind::Backoff {
                segment: segment.0,
                node: station.node.0,
                collisions,
                slots,
                resume_ns: resume.0,
            },
        );
    }

    pub(crate) fn viz_abort(&mut self, t: SimTime, segment: SegmentId, station: PortRef, retries: u32, frame: &Frame) {
        self.viz_frame(
            t,
            Some(frame),
            VizEventKind::Abort {
                segment: segment.0,
                node: station.node.0,
                retries,
            },
        );
    }

    pub(crate) fn viz_segment_delivered(&mut self, t: SimTime, segment: SegmentId, done: &Completion) {
        self.viz_frame(
            t,
            Some(&done.frame),
            VizEventKind::SegmentDelivered {
                segment: segment.0,
                node: done.station.node.0,
                start_ns: done.start.0,
                end_ns: done.end.0,
                retries: done.retries,
            },
        );
    }

    pub(crate) fn viz_sw_send(&mut self, t: SimTime, frame: &Frame, conn_id: u64, seq: u64, retrans: bool) {
        let retrans = if retrans { Some(true) } else { None };
        self.viz_frame(t, Some(frame), VizEventKind::SwSend { conn_id, seq, retrans });
    }

    pub(crate) fn viz_sw_ack(&mut self, t: SimTime, frame: &Frame, conn_id: u64, ack: u64, duplicate: bool) {
        self.viz_frame(
            t,
            Some(frame),
            VizEventKind::SwAck {
                conn_id,
                ack,
                duplicate,
            },
        );
    }

    pub(crate) fn viz_sw_timeout(&mut self, t: SimTime, conn_id: u64, base: u64) {
        self.viz_frame(t, None, VizEventKind::SwTimeout { conn_id, base });
    }
}
