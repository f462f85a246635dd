//! Simulation result events.
//!
//! One [`TxReport`] per terminal transmission outcome. These are what the
//! rendering and test layers consume; the forwarding path reports here
//! instead of failing across layers.

use serde::Serialize;

use super::address::Address;
use crate::sim::SimTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TxOutcome {
    /// Frame accepted by its destination host, or a transfer completed.
    Success,
    /// CSMA/CD retry budget exhausted.
    CollisionFailed,
    /// Parity mismatch at a receiver, or a transfer gave up after its
    /// retransmission budget.
    IntegrityFailed,
    /// Sliding window sender stalled on a full window.
    WindowFull,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxReport {
    pub at: SimTime,
    pub outcome: TxOutcome,
    pub src: Address,
    pub dst: Address,
    /// Collisions suffered before the outcome: on the last hub hop for a
    /// delivered frame, 0 where not applicable.
    pub retries: u32,
    /// Inclusive sliding window sequence range the report covers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq_range: Option<(u64, u64)>,
    /// Set when the report is about a whole sliding window transfer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer: Option<u64>,
}

impl TxReport {
    pub fn new(at: SimTime, outcome: TxOutcome, src: Address, dst: Address) -> Self {
        Self {
            at,
            outcome,
            src,
            dst,
            retries: 0,
            seq_range: None,
            transfer: None,
        }
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_seq_range(mut self, first: u64, last: u64) -> Self {
        self.seq_range = Some((first, last));
        self
    }

    pub fn for_transfer(mut self, conn_id: u64) -> Self {
        self.transfer = Some(conn_id);
        self
    }
}
