use serde::{Deserialize, Serialize};

/// 可视化事件类型
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VizEventKind {
    /// 拓扑元信息（建议作为 t=0 的第一条事件）
    Meta {
        nodes: Vec<VizNodeInfo>,
        links: Vec<VizLinkInfo>,
        segments: Vec<VizSegmentInfo>,
    },
    /// 节点在某个端口收到一帧（无论是否是发给它的）
    NodeRx {
        node: usize,
        port: usize,
        node_kind: VizNodeKind,
        node_name: String,
    },
    /// 交换机学习到（或更新）一条地址表项
    Learn { node: usize, address: String, port: usize },
    /// 交换机转发决策：单播时 `ports` 只有一个元素
    Forward {
        node: usize,
        ports: Vec<usize>,
        flooded: bool,
    },
    /// 目的端口等于入端口，交换机丢弃
    Filter { node: usize, port: usize },
    /// 校验失败丢帧
    IntegrityDrop { node: usize },
    /// 帧被交付给目的主机
    Delivered { node: usize },
    /// 点对点链路开始发送
    LinkTx {
        link_from: usize,
        link_to: usize,
        depart_ns: u64,
        arrive_ns: u64,
    },
    /// 共享网段：站点开始发送
    SegmentTxStart {
        segment: usize,
        node: usize,
        end_ns: u64,
    },
    /// 共享网段：侦听到载波，推迟
    CarrierBusy {
        segment: usize,
        node: usize,
        until_ns: u64,
    },
    /// 共享网段：冲突，`nodes` 为新卷入的站点
    Collision {
        segment: usize,
        nodes: Vec<usize>,
        jam_until_ns: u64,
    },
    /// 共享网段：站点退避
    Backoff {
        segment: usize,
        node: usize,
        collisions: u32,
        slots: u64,
        resume_ns: u64,
    },
    /// 共享网段：超过重试上限，放弃该帧
    Abort {
        segment: usize,
        node: usize,
        retries: u32,
    },
    /// 共享网段：一次成功发送（`start_ns..end_ns` 期间网段被该站点独占）
    SegmentDelivered {
        segment: usize,
        node: usize,
        start_ns: u64,
        end_ns: u64,
        retries: u32,
    },
    /// 滑动窗口：发送数据帧
    SwSend {
        conn_id: u64,
        seq: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        retrans: Option<bool>,
    },
    /// 滑动窗口：接收方发出 ACK
    SwAck { conn_id: u64, ack: u64, duplicate: bool },
    /// 滑动窗口：重传定时器超时
    SwTimeout { conn_id: u64, base: u64 },
}

/// 帧的类别（便于可视化上色）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VizFrameKind {
    Raw,
    Data,
    Ack,
}

/// 节点类型（用于可视化区分 host/switch）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VizNodeKind {
    Host,
    Switch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VizNodeInfo {
    pub id: usize,
    pub name: String,
    pub kind: VizNodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VizLinkInfo {
    pub from: usize,
    pub from_port: usize,
    pub to: usize,
    pub to_port: usize,
    /// 单向链路带宽（bps）
    pub bandwidth_bps: u64,
    /// 单向传播时延（ns）
    pub latency_ns: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VizSegmentInfo {
    pub id: usize,
    pub name: String,
    /// 接入的 (node, port)
    pub stations: Vec<(usize, usize)>,
    pub bandwidth_bps: u64,
}

/// 一个可回放的事件（JSON）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VizEvent {
    /// 仿真时间（纳秒，和 `SimTime.0` 同口径）
    pub t_ns: u64,
    pub src: Option<String>,
    pub dst: Option<String>,
    pub frame_bytes: Option<u32>,
    pub frame_kind: Option<VizFrameKind>,
    #[serde(flatten)]
    pub kind: VizEventKind,
}

/// 事件收集器（存内存，仿真结束写 JSON 文件）
#[derive(Debug, Default)]
pub struct VizLogger {
    pub events: Vec<VizEvent>,
}

impl VizLogger {
    pub fn push(&mut self, ev: VizEvent) {
        self.events.push(ev);
    }

    /// 只看事件类型（测试断言常用）
    pub fn kinds(&self) -> impl Iterator<Item = &VizEventKind> {
        self.events.iter().map(|e| &e.kind)
    }
}
