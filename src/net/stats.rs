//! 统计信息
//!
//! 定义链路层仿真统计数据结构。

/// 网络统计信息
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Stats {
    /// 交付给目的主机的帧数/载荷字节数
    pub delivered_frames: u64,
    pub delivered_bytes: u64,
    /// 主机网卡过滤掉的帧（目的地址不是自己）
    pub filtered_frames: u64,
    /// 校验失败被丢弃的帧
    pub integrity_drops: u64,
    /// 交换机：泛洪次数 / 单播次数 / 自转发丢弃次数
    pub flooded_frames: u64,
    pub unicast_frames: u64,
    pub self_forward_drops: u64,
    /// 共享网段：冲突事件数 / 推迟次数 / 因超过重试上限放弃的帧
    pub collisions: u64,
    pub deferrals: u64,
    pub collision_failures: u64,
    /// 滑动窗口重传的帧数
    pub retransmissions: u64,
}
