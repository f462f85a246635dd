//! 数据帧
//!
//! 链路层传输的基本单位。构造后不可变：转发、泛洪、重传传递的都是同一内容的副本，
//! 被破坏的帧是由 [`Frame::with_bit_flipped`] 生成的另一个实例。

use super::address::Address;
use super::parity;

/// 以太网头部 + FCS 的字节数
pub const HEADER_BYTES: u32 = 18;
/// 以太网最小帧长（字节），短帧会被填充到这个长度
pub const MIN_FRAME_BYTES: u32 = 64;

/// 帧承载的内容类别。滑动窗口协议的序号放在这里，与介质无关。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// 普通数据帧（无流控）
    Raw,
    /// 滑动窗口数据帧
    Data { conn: u64, seq: u64 },
    /// 滑动窗口确认帧（累计确认 `seq`）
    Ack { conn: u64, seq: u64 },
}

/// 数据帧
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    src: Address,
    dst: Address,
    payload: Vec<u8>,
    parity: bool,
    kind: FrameKind,
}

impl Frame {
    /// 创建普通数据帧，校验位按载荷计算。
    pub fn new(src: Address, dst: Address, payload: impl Into<Vec<u8>>) -> Self {
        Self::with_kind(src, dst, payload, FrameKind::Raw)
    }

    pub fn with_kind(
        src: Address,
        dst: Address,
        payload: impl Into<Vec<u8>>,
        kind: FrameKind,
    ) -> Self {
        let payload = payload.into();
        let parity = parity::compute_parity(&payload);
        Self {
            src,
            dst,
            payload,
            parity,
            kind,
        }
    }

    pub fn src(&self) -> Address {
        self.src
    }

    pub fn dst(&self) -> Address {
        self.dst
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// 帧中携带的校验位（发送方计算的值）
    pub fn parity(&self) -> bool {
        self.parity
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    /// 滑动窗口序号（仅 Data/Ack 帧）
    pub fn seq(&self) -> Option<u64> {
        match self.kind {
            FrameKind::Raw => None,
            FrameKind::Data { seq, .. } | FrameKind::Ack { seq, .. } => Some(seq),
        }
    }

    /// 线上长度：头部 + 载荷，不足最小帧长时填充。
    pub fn wire_bytes(&self) -> u32 {
        let len = u32::try_from(self.payload.len()).unwrap_or(u32::MAX);
        HEADER_BYTES.saturating_add(len).max(MIN_FRAME_BYTES)
    }

    /// 受校验位保护的比特数：载荷比特 + 校验位本身。
    pub fn protected_bits(&self) -> usize {
        self.payload.len() * 8 + 1
    }

    /// 返回翻转了一个比特的副本（原帧不变）。
    ///
    /// `bit` 以 [`protected_bits`](Self::protected_bits) 取模：`0..payload_bits`
    /// 落在载荷上（字节内从最高位数起），最后一个位置是校验位本身。
    pub fn with_bit_flipped(&self, bit: usize) -> Frame {
        let mut copy = self.clone();
        let bit = bit % self.protected_bits();
        match copy.payload.get_mut(bit / 8) {
            Some(byte) => *byte ^= 0x80 >> (bit % 8),
            None => copy.parity = !copy.parity,
        }
        copy
    }
}
