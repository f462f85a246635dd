//! CSMA/CD 控制器
//!
//! 每个共享网段持有一个 `CsmaCd`，它是唯一有权标记网段忙/闲的对象。
//!
//! 状态机（每个站点的每次发送尝试）：
//! - 载波已可见（活动发送开始已满一个时隙，或正在 jam）→ 推迟，1-坚持：载波消失的时刻立即重听
//! - 活动发送开始不足一个时隙（载波尚未传播到）→ 冲突：所有相关站点中止，网段 jam，
//!   各自重试计数 +1，jam 结束后退避 `k * slot`，`k ∈ [0, 2^min(n, limit))`
//! - 空闲 → 发送，结束时若未冲突则成功，交付给网段上的其他站点
//! - 重试计数超过 `max_retries` → 失败（CollisionExceeded），放弃该帧

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::backoff::{BackoffSource, backoff_window};
use crate::net::{Frame, NetWorld, PortRef, SegmentId};
use crate::sim::{Event, SimTime, Simulator, World};

/// CSMA/CD 参数，默认值取 IEEE 802.3 10 Mb/s。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsmaConfig {
    /// 时隙（冲突窗口），512 bit-time
    pub slot_time: SimTime,
    /// 冲突后 jam 信号长度（bit）
    pub jam_bits: u32,
    /// 单帧最多重传次数，超过即失败
    pub max_retries: u32,
    /// 退避窗口指数上限
    pub backoff_limit: u32,
}

impl Default for CsmaConfig {
    fn default() -> Self {
        Self {
            slot_time: SimTime::from_nanos(51_200),
            jam_bits: 32,
            max_retries: 15,
            backoff_limit: 10,
        }
    }
}

#[derive(Debug, Default)]
struct StationQueue {
    pending: VecDeque<Frame>,
    /// 队首帧已经历的冲突次数
    retries: u32,
    /// 是否已有一个尝试事件在途（每个站点同一时刻只竞争一个帧）
    contending: bool,
}

#[derive(Debug, Clone)]
struct ActiveTx {
    tx: u64,
    station: PortRef,
    start: SimTime,
    /// 正常结束时刻；冲突后改为 jam 结束时刻
    end: SimTime,
    /// 非空表示这次发送已冲突
    colliders: Vec<PortRef>,
}

impl ActiveTx {
    fn collided(&self) -> bool {
        !self.colliders.is_empty()
    }
}

/// 一次发送尝试的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    /// 站点没有待发送的帧
    Idle,
    /// 介质空闲，开始发送；`end` 时刻由 [`SegmentTxEnd`] 收尾
    Transmit { tx: u64, start: SimTime, end: SimTime },
    /// 侦听到载波，`until` 时刻重新侦听
    Defer { until: SimTime },
    /// 检测到冲突；`hits` 是卷入冲突的两个站点（正在发送的在前）
    Collision {
        jam_until: SimTime,
        hits: Vec<CollisionHit>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollisionHit {
    pub station: PortRef,
    /// 该帧累计冲突次数（含本次）
    pub collisions: u32,
    pub verdict: HitVerdict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitVerdict {
    /// 退避 `slots` 个时隙后在 `at` 重试
    Retry { slots: u64, at: SimTime },
    /// 超过重试上限，帧被放弃；`next_at` 为该站点下一帧开始竞争的时刻
    Failed {
        frame: Frame,
        retries: u32,
        next_at: Option<SimTime>,
    },
}

/// 一次成功发送
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub station: PortRef,
    pub frame: Frame,
    /// 成功之前经历的冲突次数
    pub retries: u32,
    pub start: SimTime,
    pub end: SimTime,
    pub next_at: Option<SimTime>,
}

/// 单个共享网段的 CSMA/CD 状态
#[derive(Debug)]
pub struct CsmaCd {
    cfg: CsmaConfig,
    bandwidth_bps: u64,
    backoff: Box<dyn BackoffSource>,
    active: Option<ActiveTx>,
    next_tx: u64,
    stations: BTreeMap<PortRef, StationQueue>,
}

impl CsmaCd {
    pub fn new(cfg: CsmaConfig, bandwidth_bps: u64, backoff: Box<dyn BackoffSource>) -> Self {
        Self {
            cfg,
            bandwidth_bps,
            backoff,
            active: None,
            next_tx: 0,
            stations: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &CsmaConfig {
        &self.cfg
    }

    pub fn bandwidth_bps(&self) -> u64 {
        self.bandwidth_bps
    }

    /// 载波是否存在（有发送或 jam 正在进行）
    pub fn is_busy(&self, now: SimTime) -> bool {
        self.active.as_ref().is_some_and(|a| now < a.end)
    }

    /// 站点排队中的帧数（含正在竞争的队首帧）
    pub fn queued(&self, station: PortRef) -> usize {
        self.stations.get(&station).map_or(0, |q| q.pending.len())
    }

    /// 站点队首（正在竞争）的帧
    pub fn head(&self, station: PortRef) -> Option<&Frame> {
        self.stations.get(&station)?.pending.front()
    }

    fn jam_time(&self) -> SimTime {
        bit_time(u64::from(self.cfg.jam_bits), self.bandwidth_bps)
    }

    /// 帧入队。返回 `true` 表示站点此前空闲，调用方应立即调度一次尝试。
    pub fn enqueue(&mut self, station: PortRef, frame: Frame) -> bool {
        let q = self.stations.entry(station).or_default();
        q.pending.push_back(frame);
        if q.contending {
            false
        } else {
            q.contending = true;
            true
        }
    }

    /// jam 结束后清掉已冲突的发送
    fn expire(&mut self, now: SimTime) {
        if self
            .active
            .as_ref()
            .is_some_and(|a| a.collided() && now >= a.end)
        {
            self.active = None;
        }
    }

    /// 站点在 `now` 侦听并尝试发送队首帧。
    pub fn attempt(&mut self, station: PortRef, now: SimTime) -> Attempt {
        let head = self
            .stations
            .get(&station)
            .and_then(|q| q.pending.front())
            .map(Frame::wire_bytes);
        let Some(bytes) = head else {
            if let Some(q) = self.stations.get_mut(&station) {
                q.contending = false;
            }
            return Attempt::Idle;
        };

        self.expire(now);
        let slot = self.cfg.slot_time;
        let jam = self.jam_time();

        let Some(active) = self.active.as_mut() else {
            let tx = self.next_tx;
            self.next_tx = self.next_tx.wrapping_add(1);
            let end = now.saturating_add(crate::net::tx_time(bytes, self.bandwidth_bps));
            trace!(%station, tx, ?end, "介质空闲，开始发送");
            self.active = Some(ActiveTx {
                tx,
                station,
                start: now,
                end,
                colliders: Vec::new(),
            });
            return Attempt::Transmit {
                tx,
                start: now,
                end,
            };
        };

        let vulnerable = now < active.start.saturating_add(slot);
        if !vulnerable || active.collided() || active.station == station {
            trace!(%station, until = ?active.end, "侦听到载波，推迟");
            return Attempt::Defer { until: active.end };
        }

        // 载波尚未传播到该站点：冲突，双方都中止
        let jam_until = now.saturating_add(jam);
        let newly = vec![active.station, station];
        active.colliders.extend_from_slice(&newly);
        active.end = jam_until;
        debug!(tx = active.tx, colliders = active.colliders.len(), ?jam_until, "检测到冲突");

        let hits = newly
            .into_iter()
            .map(|s| self.back_off(s, jam_until))
            .collect();
        Attempt::Collision { jam_until, hits }
    }

    fn back_off(&mut self, station: PortRef, jam_until: SimTime) -> CollisionHit {
        let q = self.stations.entry(station).or_default();
        q.retries = q.retries.saturating_add(1);
        let collisions = q.retries;

        if collisions > self.cfg.max_retries {
            let frame = q.pending.pop_front();
            q.retries = 0;
            let next_at = if q.pending.is_empty() {
                q.contending = false;
                None
            } else {
                Some(jam_until)
            };
            return match frame {
                Some(frame) => CollisionHit {
                    station,
                    collisions,
                    verdict: HitVerdict::Failed {
                        frame,
                        retries: self.cfg.max_retries,
                        next_at,
                    },
                },
                // 队列为空不会进入冲突，这里只是保持类型完整
                None => CollisionHit {
                    station,
                    collisions,
                    verdict: HitVerdict::Retry {
                        slots: 0,
                        at: jam_until,
                    },
                },
            };
        }

        let window = backoff_window(collisions, self.cfg.backoff_limit);
        let slots = self.backoff.pick_slots(window);
        let at = jam_until.saturating_add(self.cfg.slot_time.saturating_mul(slots));
        CollisionHit {
            station,
            collisions,
            verdict: HitVerdict::Retry { slots, at },
        }
    }

    /// 发送 `tx` 到达结束时刻。未冲突则出队并返回成功信息。
    pub fn complete(&mut self, tx: u64, now: SimTime) -> Option<Completion> {
        let active = self.active.take_if(|a| a.tx == tx && !a.collided())?;
        let q = self.stations.get_mut(&active.station)?;
        let frame = q.pending.pop_front()?;
        let retries = std::mem::take(&mut q.retries);
        let next_at = if q.pending.is_empty() {
            q.contending = false;
            None
        } else {
            Some(now)
        };
        Some(Completion {
            station: active.station,
            frame,
            retries,
            start: active.start,
            end: active.end,
            next_at,
        })
    }
}

/// `bits` 个比特在 `bandwidth_bps` 上占用的时间
fn bit_time(bits: u64, bandwidth_bps: u64) -> SimTime {
    if bandwidth_bps == 0 {
        return SimTime(u64::MAX / 4);
    }
    let nanos = (u128::from(bits) * 1_000_000_000u128).div_ceil(u128::from(bandwidth_bps));
    SimTime(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// 事件：站点侦听并尝试发送
#[derive(Debug)]
pub struct CsmaAttempt {
    pub segment: SegmentId,
    pub station: PortRef,
}

impl Event for CsmaAttempt {
    #[tracing::instrument(skip(self, sim, world), fields(segment = self.segment.0, station = %self.station))]
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let CsmaAttempt { segment, station } = *self;
        NetWorld::from_world(world)
            .net
            .on_csma_attempt(segment, station, sim);
    }
}

/// 事件：网段上一次发送的结束时刻
#[derive(Debug)]
pub struct SegmentTxEnd {
    pub segment: SegmentId,
    pub tx: u64,
}

impl Event for SegmentTxEnd {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let SegmentTxEnd { segment, tx } = *self;
        NetWorld::from_world(world)
            .net
            .on_segment_tx_end(segment, tx, sim);
    }
}
