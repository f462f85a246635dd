//! Link-layer error taxonomy.
//!
//! The forwarding path never raises these across layers: switches and media
//! record a [`TxReport`](super::TxReport) instead. `LinkError` is what the
//! construction API and the sliding window sender hand back to their callers,
//! and what a failed transfer keeps as its reason.

use thiserror::Error;

use super::address::Address;
use super::id::{LinkId, NodeId, PortNo, SegmentId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// Parity mismatch; the frame was dropped where it was detected.
    #[error("parity mismatch on frame {src} -> {dst}")]
    IntegrityFailure { src: Address, dst: Address },

    /// CSMA/CD retry budget exhausted for one frame.
    #[error("collision retry budget exhausted after {retries} retries ({src} -> {dst})")]
    CollisionExceeded {
        src: Address,
        dst: Address,
        retries: u32,
    },

    /// Sender-side backpressure: wait for an acknowledgment and retry.
    #[error("sliding window full: {in_flight} of {window} frames unacknowledged")]
    WindowFull { window: u64, in_flight: u64 },

    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),

    #[error("unknown link {0:?}")]
    UnknownLink(LinkId),

    #[error("unknown segment {0:?}")]
    UnknownSegment(SegmentId),

    #[error("node {node:?} has no port {port}")]
    InvalidPort { node: NodeId, port: PortNo },

    #[error("port {port} of node {node:?} is already attached")]
    PortInUse { node: NodeId, port: PortNo },

    /// The port has no medium, so nothing sent from it can arrive.
    #[error("port {port} of node {node:?} is not attached to any medium")]
    NotAttached { node: NodeId, port: PortNo },

    #[error("address {0} is already assigned")]
    DuplicateAddress(Address),

    #[error("transfer id {0} is already in use")]
    DuplicateTransfer(u64),

    #[error("invalid MAC address `{0}`")]
    InvalidAddress(String),
}
