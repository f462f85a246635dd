//! 滑动窗口（Go-Back-N）协议实现
//!
//! - 发送方最多有 `W` 个未确认帧在途，`base <= next <= base + W`
//! - 累计确认：ACK `seq` 表示 `..=seq` 都已收到
//! - 接收方只接受 `seq == expected`，否则丢弃并重发上一个 ACK（重复 ACK）
//! - 超时或收到 `dup_ack_threshold` 个重复 ACK：重传 `base..next` 全部帧
//!
//! 序号与介质无关，帧经过链路、Hub 还是交换机都一样。

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::net::{
    Address, Frame, FrameKind, LinkError, Network, NodeId, PortRef, TxOutcome, TxReport, with_sw_stack,
};
use crate::sim::{Event, SimTime, Simulator, World};

/// 一次传输的唯一标识
pub type SwConnId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwConfig {
    /// 窗口大小 W（帧数）
    pub window: u64,
    /// 每帧载荷字节数
    pub chunk_bytes: usize,
    /// 重传定时器
    pub timeout: SimTime,
    /// 连续超时（期间没有任何进展）的次数上限，超过即放弃
    pub max_timeouts: u32,
    /// 触发快速重传的重复 ACK 个数
    pub dup_ack_threshold: u32,
}

impl Default for SwConfig {
    fn default() -> Self {
        Self {
            window: 4,
            chunk_bytes: 1,
            timeout: SimTime::from_millis(2),
            max_timeouts: 8,
            dup_ack_threshold: 3,
        }
    }
}

/// 发送方处理一个 ACK 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckOutcome {
    /// 窗口前移，`acked` 个帧被确认
    Advanced { acked: u64 },
    /// 重复 ACK；达到阈值时 `fast_retransmit` 为真
    Duplicate { count: u32, fast_retransmit: bool },
    /// 过期或越界的 ACK
    Ignored,
}

/// Go-Back-N 发送方
#[derive(Debug, Clone)]
pub struct GbnSender {
    conn: SwConnId,
    src: Address,
    dst: Address,
    window: u64,
    base: u64,
    next: u64,
    pending: BTreeMap<u64, Frame>,
    dup_acks: u32,
    dup_ack_threshold: u32,
}

impl GbnSender {
    pub fn new(conn: SwConnId, src: Address, dst: Address, window: u64) -> Self {
        Self {
            conn,
            src,
            dst,
            window: window.max(1),
            base: 0,
            next: 0,
            pending: BTreeMap::new(),
            dup_acks: 0,
            dup_ack_threshold: 3,
        }
    }

    pub fn with_dup_ack_threshold(mut self, threshold: u32) -> Self {
        self.dup_ack_threshold = threshold.max(1);
        self
    }

    pub fn window(&self) -> u64 {
        self.window
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn next(&self) -> u64 {
        self.next
    }

    /// 未确认帧数
    pub fn in_flight(&self) -> u64 {
        self.next - self.base
    }

    /// 未确认的序号区间（闭区间）
    pub fn outstanding(&self) -> Option<(u64, u64)> {
        (self.next > self.base).then(|| (self.base, self.next - 1))
    }

    /// 为 `payload` 分配下一个序号并保存副本
    pub fn send(&mut self, payload: impl Into<Vec<u8>>) -> Result<Frame, LinkError> {
        if self.in_flight() >= self.window {
            return Err(LinkError::WindowFull {
                window: self.window,
                in_flight: self.in_flight(),
            });
        }
        let seq = self.next;
        let frame = Frame::with_kind(
            self.src,
            self.dst,
            payload,
            FrameKind::Data {
                conn: self.conn,
                seq,
            },
        );
        self.pending.insert(seq, frame.clone());
        self.next += 1;
        Ok(frame)
    }

    pub fn on_ack(&mut self, seq: u64) -> AckOutcome {
        if (self.base..self.next).contains(&seq) {
            let acked = seq + 1 - self.base;
            self.pending = self.pending.split_off(&(seq + 1));
            self.base = seq + 1;
            self.dup_acks = 0;
            return AckOutcome::Advanced { acked };
        }
        if self.base > 0 && seq == self.base - 1 && self.in_flight() > 0 {
            self.dup_acks = self.dup_acks.saturating_add(1);
            return AckOutcome::Duplicate {
                count: self.dup_acks,
                fast_retransmit: self.dup_acks == self.dup_ack_threshold,
            };
        }
        AckOutcome::Ignored
    }

    /// 定时器到期（定时器启动时 `seq` 是 base）。过期的定时器返回空。
    pub fn on_timeout(&mut self, seq: u64) -> Vec<Frame> {
        if seq < self.base || self.pending.is_empty() {
            return Vec::new();
        }
        self.dup_acks = 0;
        self.retransmit_all()
    }

    /// `base..next` 全部帧，按序号升序
    pub fn retransmit_all(&self) -> Vec<Frame> {
        self.pending.values().cloned().collect()
    }
}

/// 接收方对一个数据帧的处理
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvAction {
    /// 按序到达，交付并确认 `ack`
    Accept { ack: u64 },
    /// 乱序或重复，丢弃；`dup_ack` 为需要重发的累计确认
    Discard { dup_ack: Option<u64> },
}

/// Go-Back-N 接收方
#[derive(Debug, Clone, Default)]
pub struct GbnReceiver {
    expected: u64,
}

impl GbnReceiver {
    pub fn expected(&self) -> u64 {
        self.expected
    }

    pub fn on_frame(&mut self, seq: u64) -> RecvAction {
        if seq == self.expected {
            self.expected += 1;
            RecvAction::Accept { ack: seq }
        } else {
            RecvAction::Discard {
                dup_ack: self.expected.checked_sub(1),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwState {
    Running,
    Complete,
    Failed(LinkError),
}

/// 一次滑动窗口传输：发送方主机上的 sender 与接收方主机上的 receiver
#[derive(Debug, Clone)]
pub struct SwConn {
    pub id: SwConnId,
    pub src: NodeId,
    pub dst: NodeId,
    pub cfg: SwConfig,
    chunks: Vec<Vec<u8>>,
    sender: GbnSender,
    receiver: GbnReceiver,
    received: Vec<u8>,
    /// 连续超时次数，窗口前移时清零
    timeouts: u32,
    timer_epoch: u64,
    stalled: bool,
    state: SwState,
    finished_at: Option<SimTime>,
}

impl SwConn {
    pub fn new(
        id: SwConnId,
        (src, src_addr): (NodeId, Address),
        (dst, dst_addr): (NodeId, Address),
        message: &[u8],
        cfg: SwConfig,
    ) -> Self {
        let chunks = message
            .chunks(cfg.chunk_bytes.max(1))
            .map(<[u8]>::to_vec)
            .collect();
        let sender =
            GbnSender::new(id, src_addr, dst_addr, cfg.window).with_dup_ack_threshold(cfg.dup_ack_threshold);
        Self {
            id,
            src,
            dst,
            cfg,
            chunks,
            sender,
            receiver: GbnReceiver::default(),
            received: Vec::new(),
            timeouts: 0,
            timer_epoch: 0,
            stalled: false,
            state: SwState::Running,
            finished_at: None,
        }
    }

    pub fn state(&self) -> &SwState {
        &self.state
    }

    pub fn is_done(&self) -> bool {
        self.state != SwState::Running
    }

    pub fn sender(&self) -> &GbnSender {
        &self.sender
    }

    /// 接收方按序重组出的消息
    pub fn received_message(&self) -> &[u8] {
        &self.received
    }

    pub fn total_frames(&self) -> u64 {
        self.chunks.len() as u64
    }

    pub fn finished_at(&self) -> Option<SimTime> {
        self.finished_at
    }

    fn src_addr(&self) -> Address {
        self.sender.src
    }

    fn dst_addr(&self) -> Address {
        self.sender.dst
    }

    fn report(&self, at: SimTime, outcome: TxOutcome) -> TxReport {
        TxReport::new(at, outcome, self.src_addr(), self.dst_addr()).for_transfer(self.id)
    }

    /// 重新启动重传定时器（旧定时器随 epoch 失效）
    fn arm_timer(&mut self, sim: &mut Simulator) {
        self.timer_epoch += 1;
        sim.schedule_after(self.cfg.timeout, SwTimeout {
            conn_id: self.id,
            epoch: self.timer_epoch,
            seq: self.sender.base(),
        });
    }

    fn finish(&mut self, at: SimTime, state: SwState) {
        self.timer_epoch += 1;
        self.state = state;
        self.finished_at = Some(at);
    }
}

/// 所有滑动窗口传输
#[derive(Debug, Default)]
pub struct SwStack {
    conns: HashMap<SwConnId, SwConn>,
    reserved: HashSet<SwConnId>,
    next_id: SwConnId,
}

impl SwStack {
    /// 分配一个未使用的传输 id
    pub fn allocate_id(&mut self) -> SwConnId {
        while self.reserved.contains(&self.next_id) {
            self.next_id += 1;
        }
        let id = self.next_id;
        self.reserved.insert(id);
        id
    }

    /// 预留指定的传输 id
    pub fn reserve_id(&mut self, id: SwConnId) -> Result<(), LinkError> {
        if self.reserved.insert(id) {
            Ok(())
        } else {
            Err(LinkError::DuplicateTransfer(id))
        }
    }

    pub fn insert(&mut self, conn: SwConn) {
        self.reserved.insert(conn.id);
        self.conns.insert(conn.id, conn);
    }

    pub fn get(&self, id: SwConnId) -> Option<&SwConn> {
        self.conns.get(&id)
    }

    pub fn conns(&self) -> impl Iterator<Item = &SwConn> {
        self.conns.values()
    }

    /// 在窗口允许的范围内发送新帧
    pub(crate) fn pump(&mut self, id: SwConnId, sim: &mut Simulator, net: &mut Network) {
        let Some(conn) = self.conns.get_mut(&id) else {
            return;
        };
        if conn.state != SwState::Running {
            return;
        }
        let now = sim.now();
        if conn.chunks.is_empty() {
            info!(conn_id = id, "空消息，传输直接完成");
            conn.finish(now, SwState::Complete);
            net.report(conn.report(now, TxOutcome::Success));
            return;
        }

        while let Some(chunk) = conn.chunks.get(conn.sender.next() as usize) {
            match conn.sender.send(chunk.clone()) {
                Ok(frame) => {
                    let seq = conn.sender.next() - 1;
                    net.viz_sw_send(now, &frame, id, seq, false);
                    if conn.sender.in_flight() == 1 {
                        conn.arm_timer(sim);
                    }
                    debug!(conn_id = id, seq, "发送数据帧");
                    net.transmit(PortRef::new(conn.src, 0), frame, sim);
                }
                Err(err) => {
                    if !conn.stalled {
                        conn.stalled = true;
                        debug!(conn_id = id, %err, "窗口已满，等待确认");
                        let mut report = conn.report(now, TxOutcome::WindowFull);
                        if let Some((first, last)) = conn.sender.outstanding() {
                            report = report.with_seq_range(first, last);
                        }
                        net.report(report);
                    }
                    break;
                }
            }
        }
    }

    fn retransmit(conn: &mut SwConn, frames: Vec<Frame>, sim: &mut Simulator, net: &mut Network) {
        let now = sim.now();
        net.stats.retransmissions += frames.len() as u64;
        for frame in frames {
            let seq = frame.seq().unwrap_or_default();
            net.viz_sw_send(now, &frame, conn.id, seq, true);
            net.transmit(PortRef::new(conn.src, 0), frame, sim);
        }
        conn.arm_timer(sim);
    }

    /// 滑动窗口帧交付到 `at` 主机
    pub(crate) fn on_frame(&mut self, at: NodeId, frame: &Frame, sim: &mut Simulator, net: &mut Network) {
        match frame.kind() {
            FrameKind::Raw => {}
            FrameKind::Data { conn: id, seq } => {
                let Some(conn) = self.conns.get_mut(&id) else {
                    return;
                };
                if at != conn.dst {
                    return;
                }
                let (ack, duplicate) = match conn.receiver.on_frame(seq) {
                    RecvAction::Accept { ack } => {
                        conn.received.extend_from_slice(frame.payload());
                        (ack, false)
                    }
                    RecvAction::Discard { dup_ack: Some(ack) } => (ack, true),
                    RecvAction::Discard { dup_ack: None } => return,
                };
                let ack_frame =
                    Frame::with_kind(conn.dst_addr(), conn.src_addr(), Vec::new(), FrameKind::Ack { conn: id, seq: ack });
                net.viz_sw_ack(sim.now(), &ack_frame, id, ack, duplicate);
                net.transmit(PortRef::new(conn.dst, 0), ack_frame, sim);
            }
            FrameKind::Ack { conn: id, seq } => {
                let Some(conn) = self.conns.get_mut(&id) else {
                    return;
                };
                if at != conn.src || conn.state != SwState::Running {
                    return;
                }
                match conn.sender.on_ack(seq) {
                    AckOutcome::Advanced { acked } => {
                        debug!(conn_id = id, ack = seq, acked, "窗口前移");
                        conn.timeouts = 0;
                        if conn.sender.base() == conn.total_frames() {
                            let now = sim.now();
                            info!(conn_id = id, frames = conn.total_frames(), "✅ 传输完成");
                            conn.finish(now, SwState::Complete);
                            let report = conn
                                .report(now, TxOutcome::Success)
                                .with_seq_range(0, conn.total_frames() - 1);
                            net.report(report);
                            return;
                        }
                        if conn.sender.in_flight() > 0 {
                            conn.arm_timer(sim);
                        }
                        self.pump(id, sim, net);
                    }
                    AckOutcome::Duplicate {
                        fast_retransmit: true,
                        count,
                    } => {
                        debug!(conn_id = id, count, base = conn.sender.base(), "重复 ACK，快速重传");
                        let frames = conn.sender.retransmit_all();
                        Self::retransmit(conn, frames, sim, net);
                    }
                    AckOutcome::Duplicate { .. } | AckOutcome::Ignored => {}
                }
            }
        }
    }

    /// 重传定时器到期
    pub(crate) fn on_timeout(
        &mut self,
        id: SwConnId,
        epoch: u64,
        seq: u64,
        sim: &mut Simulator,
        net: &mut Network,
    ) {
        let Some(conn) = self.conns.get_mut(&id) else {
            return;
        };
        if conn.state != SwState::Running || epoch != conn.timer_epoch {
            return;
        }
        let frames = conn.sender.on_timeout(seq);
        if frames.is_empty() {
            return;
        }

        let now = sim.now();
        net.viz_sw_timeout(now, id, conn.sender.base());
        conn.timeouts += 1;
        if conn.timeouts > conn.cfg.max_timeouts {
            warn!(conn_id = id, timeouts = conn.timeouts, "❌ 重传次数耗尽，传输失败");
            let err = LinkError::IntegrityFailure {
                src: conn.src_addr(),
                dst: conn.dst_addr(),
            };
            let mut report = conn.report(now, TxOutcome::IntegrityFailed);
            if let Some((first, last)) = conn.sender.outstanding() {
                report = report.with_seq_range(first, last);
            }
            conn.finish(now, SwState::Failed(err));
            net.report(report);
            return;
        }

        debug!(conn_id = id, base = conn.sender.base(), frames = frames.len(), "⏰ 超时，回退 N 重传");
        Self::retransmit(conn, frames, sim, net);
    }

    /// 传输中的某帧在共享网段上冲突次数超限：整个传输失败
    pub(crate) fn on_medium_failure(&mut self, frame: &Frame, retries: u32, sim: &mut Simulator, net: &mut Network) {
        let (FrameKind::Data { conn: id, .. } | FrameKind::Ack { conn: id, .. }) = frame.kind() else {
            return;
        };
        let Some(conn) = self.conns.get_mut(&id) else {
            return;
        };
        if conn.state != SwState::Running {
            return;
        }
        let now = sim.now();
        warn!(conn_id = id, retries, "❌ 冲突次数超限，传输失败");
        let err = LinkError::CollisionExceeded {
            src: frame.src(),
            dst: frame.dst(),
            retries,
        };
        let mut report = conn.report(now, TxOutcome::CollisionFailed).with_retries(retries);
        if let Some((first, last)) = conn.sender.outstanding() {
            report = report.with_seq_range(first, last);
        }
        conn.finish(now, SwState::Failed(err));
        net.report(report);
    }
}

/// 启动一个滑动窗口传输
#[derive(Debug)]
pub struct SwStart {
    pub conn: SwConn,
}

impl Event for SwStart {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let SwStart { conn } = *self;
        let id = conn.id;
        info!(conn_id = id, frames = conn.total_frames(), window = conn.cfg.window, "🚀 开始传输");
        with_sw_stack(world, |net, sw| {
            sw.insert(conn);
            sw.pump(id, sim, net);
        });
    }
}

/// 重传定时器事件：epoch 不匹配说明定时器已被重置或取消
#[derive(Debug)]
pub struct SwTimeout {
    pub conn_id: SwConnId,
    pub epoch: u64,
    pub seq: u64,
}

impl Event for SwTimeout {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let SwTimeout { conn_id, epoch, seq } = *self;
        with_sw_stack(world, |net, sw| sw.on_timeout(conn_id, epoch, seq, sim, net));
    }
}

impl Network {
    /// 在 `at` 时刻启动 `src` 到 `dst` 的滑动窗口传输，返回传输 id。
    pub fn start_transfer(
        &mut self,
        sim: &mut Simulator,
        at: SimTime,
        (src, dst): (NodeId, NodeId),
        message: &[u8],
        cfg: SwConfig,
    ) -> Result<SwConnId, LinkError> {
        let ends = self.transfer_ends(src, dst)?;
        let id = self.sw.allocate_id();
        sim.schedule(at, SwStart {
            conn: SwConn::new(id, ends.0, ends.1, message, cfg),
        });
        Ok(id)
    }

    /// 同 [`Network::start_transfer`]，使用调用方指定的传输 id。
    pub fn start_transfer_with_id(
        &mut self,
        sim: &mut Simulator,
        at: SimTime,
        id: SwConnId,
        (src, dst): (NodeId, NodeId),
        message: &[u8],
        cfg: SwConfig,
    ) -> Result<SwConnId, LinkError> {
        let ends = self.transfer_ends(src, dst)?;
        self.sw.reserve_id(id)?;
        sim.schedule(at, SwStart {
            conn: SwConn::new(id, ends.0, ends.1, message, cfg),
        });
        Ok(id)
    }

    fn transfer_ends(
        &self,
        src: NodeId,
        dst: NodeId,
    ) -> Result<((NodeId, Address), (NodeId, Address)), LinkError> {
        let src_addr = self.host_address(src).ok_or(LinkError::UnknownNode(src))?;
        let dst_addr = self.host_address(dst).ok_or(LinkError::UnknownNode(dst))?;
        // 接入关系建立后不再改变，启动时检查一次即可
        for node in [src, dst] {
            if self.medium(PortRef::new(node, 0)).is_none() {
                return Err(LinkError::NotAttached { node, port: 0 });
            }
        }
        Ok(((src, src_addr), (dst, dst_addr)))
    }

    /// 已启动的滑动窗口传输
    pub fn transfer(&self, id: SwConnId) -> Option<&SwConn> {
        self.sw.get(id)
    }
}
