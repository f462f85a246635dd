//! 标识符类型
//!
//! 定义节点、端口、链路和共享网段的标识符。

use std::fmt;

/// 节点标识符（主机或交换机）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// 单向链路标识符（一条全双工 Connection 由两条单向链路组成）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(pub usize);

/// 共享网段（Hub 广播域）标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentId(pub usize);

/// 节点上的端口号，从 0 开始
pub type PortNo = usize;

/// 某个节点的某个端口：接入介质的最小单位，也是 CSMA/CD 中的“站点”。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortRef {
    pub node: NodeId,
    pub port: PortNo,
}

impl PortRef {
    pub fn new(node: NodeId, port: PortNo) -> Self {
        Self { node, port }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}:p{}", self.node.0, self.port)
    }
}
