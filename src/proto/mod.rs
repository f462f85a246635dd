//! 链路层之上的流控协议
//!
//! 目前只有滑动窗口（Go-Back-N），用于跨任意介质的多帧可靠传输。

pub mod sliding_window;

pub use sliding_window::{
    AckOutcome, GbnReceiver, GbnSender, RecvAction, SwConfig, SwConn, SwConnId, SwStack, SwStart, SwState,
    SwTimeout,
};
