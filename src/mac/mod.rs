//! 介质访问控制（MAC）
//!
//! 共享网段上的 CSMA/CD：载波侦听、冲突检测、截断二进制指数退避。
//! 退避随机源通过 [`BackoffSource`] 注入，测试时可以换成固定序列。

mod backoff;
mod csma_cd;

pub use backoff::{BackoffSource, ScriptedBackoff, SeededBackoff, backoff_window};
pub use csma_cd::{
    Attempt, CollisionHit, Completion, CsmaAttempt, CsmaCd, CsmaConfig, HitVerdict, SegmentTxEnd,
};
