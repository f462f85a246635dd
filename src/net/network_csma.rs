//! 共享网段上的 CSMA/CD 事件处理
//!
//! `CsmaCd` 只做状态判定；这里把判定结果落到仿真里：调度重听、退避、
//! 发送结束事件，交付成功的帧，并上报结果。

use super::deliver_frame::DeliverFrame;
use super::frame::{Frame, FrameKind};
use super::id::{PortRef, SegmentId};
use super::network::Network;
use super::report::{TxOutcome, TxReport};
use crate::mac::{Attempt, CsmaAttempt, HitVerdict, SegmentTxEnd};
use crate::sim::Simulator;
use tracing::{debug, info, trace, warn};

impl Network {
    /// 站点在网段上侦听并尝试发送
    pub(crate) fn on_csma_attempt(&mut self, segment: SegmentId, station: PortRef, sim: &mut Simulator) {
        let now = sim.now();
        let Some(seg) = self.segments.get_mut(segment.0) else {
            warn!(segment = segment.0, "网段不存在");
            return;
        };

        match seg.csma.attempt(station, now) {
            Attempt::Idle => trace!("站点队列已空"),
            Attempt::Transmit { tx, end, .. } => {
                let head = seg.csma.head(station).cloned();
                sim.schedule(end, SegmentTxEnd { segment, tx });
                self.viz_segment_tx_start(now, segment, station, end, head.as_ref());
            }
            Attempt::Defer { until } => {
                self.stats.deferrals += 1;
                self.viz_carrier_busy(now, segment, station, until);
                sim.schedule(until, CsmaAttempt { segment, station });
            }
            Attempt::Collision { jam_until, hits } => {
                self.stats.collisions += 1;
                let nodes = hits.iter().map(|h| h.station.node.0).collect();
                self.viz_collision(now, segment, nodes, jam_until);
                for hit in hits {
                    match hit.verdict {
                        HitVerdict::Retry { slots, at } => {
                            debug!(station = %hit.station, collisions = hit.collisions, slots, "💥 冲突，退避");
                            self.viz_backoff(now, segment, hit.station, hit.collisions, slots, at);
                            sim.schedule(at, CsmaAttempt { segment, station: hit.station });
                        }
                        HitVerdict::Failed { frame, retries, next_at } => {
                            self.on_collision_exceeded(segment, hit.station, frame, retries, sim);
                            if let Some(at) = next_at {
                                sim.schedule(at, CsmaAttempt { segment, station: hit.station });
                            }
                        }
                    }
                }
            }
        }
    }

    /// 网段上一次发送到达结束时刻
    pub(crate) fn on_segment_tx_end(&mut self, segment: SegmentId, tx: u64, sim: &mut Simulator) {
        let now = sim.now();
        let Some(seg) = self.segments.get_mut(segment.0) else {
            return;
        };
        let Some(done) = seg.csma.complete(tx, now) else {
            trace!(tx, "发送已冲突，忽略结束事件");
            return;
        };

        let frame = seg.apply_faults(done.frame.clone());
        let arrive = now.saturating_add(seg.latency);
        let receivers: Vec<PortRef> = seg.receivers(done.station).collect();
        if let Some(at) = done.next_at {
            sim.schedule(at, CsmaAttempt {
                segment,
                station: done.station,
            });
        }

        info!(station = %done.station, retries = done.retries, receivers = receivers.len(), "📡 网段发送成功");
        self.viz_segment_delivered(now, segment, &done);

        // 成功与否由目的主机接收时上报
        for to in receivers {
            sim.schedule(arrive, DeliverFrame {
                to,
                frame: frame.clone(),
                retries: done.retries,
            });
        }
    }

    /// 冲突次数超过上限，帧被放弃
    fn on_collision_exceeded(
        &mut self,
        segment: SegmentId,
        station: PortRef,
        frame: Frame,
        retries: u32,
        sim: &mut Simulator,
    ) {
        warn!(%station, retries, src = %frame.src(), dst = %frame.dst(), "❌ 超过重试上限，放弃该帧");
        self.stats.collision_failures += 1;
        self.viz_abort(sim.now(), segment, station, retries, &frame);
        let report = TxReport::new(sim.now(), TxOutcome::CollisionFailed, frame.src(), frame.dst())
            .with_retries(retries);
        self.report(tag_seq(report, &frame));

        if frame.kind() != FrameKind::Raw {
            let mut sw = std::mem::take(&mut self.sw);
            sw.on_medium_failure(&frame, retries, sim, self);
            self.sw = sw;
        }
    }
}

fn tag_seq(report: TxReport, frame: &Frame) -> TxReport {
    match frame.seq() {
        Some(seq) => report.with_seq_range(seq, seq),
        None => report,
    }
}
