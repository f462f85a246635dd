//! 可视化事件记录（用于离线回放与测试断言）
//!
//! 设计目标：
//! - **结构化**：用 JSON 事件而不是解析文本日志
//! - **轻量**：只收集到内存，仿真结束后由调用方决定写到哪里
//! - **可回放**：每条事件带仿真时间与帧的源/目的地址，前端可按帧或节点过滤

mod types;

pub use types::{
    VizEvent, VizEventKind, VizFrameKind, VizLinkInfo, VizLogger, VizNodeInfo, VizNodeKind,
    VizSegmentInfo,
};
