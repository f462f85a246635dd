//! 仿真器
//!
//! 定义离散事件仿真器，维护当前时间与事件队列。
//! 所有链路层动作（载波侦听、退避、超时重传）都以事件形式推进。

use super::event::Event;
use super::scheduled_event::ScheduledEvent;
use super::time::SimTime;
use super::world::World;
use std::collections::BinaryHeap;
use tracing::{debug, info, trace};

/// 事件驱动仿真器：维护当前时间与事件队列。
#[derive(Default)]
pub struct Simulator {
    now: SimTime,
    next_seq: u64,
    executed: u64,
    q: BinaryHeap<ScheduledEvent>,
}

impl Simulator {
    /// 获取当前仿真时间
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// 已执行的事件总数
    pub fn executed_events(&self) -> u64 {
        self.executed
    }

    /// 队列中尚未执行的事件数
    pub fn pending_events(&self) -> usize {
        self.q.len()
    }

    /// 调度事件在指定时间执行
    ///
    /// 早于当前时间的 `at` 会被钳到 `now`，仿真时间不会倒退。
    #[tracing::instrument(skip(self, ev), fields(event_type = std::any::type_name::<E>(), schedule_at = ?at))]
    pub fn schedule<E: Event>(&mut self, at: SimTime, ev: E) {
        let at = at.max(self.now);
        let seq = self.next_seq;
        trace!(now = ?self.now, seq, "调度事件");

        self.next_seq = self.next_seq.wrapping_add(1);
        self.q.push(ScheduledEvent {
            at,
            seq,
            ev: Box::new(ev),
        });

        debug!(queue_size = self.q.len(), "事件已加入队列");
    }

    /// 在 `now + delay` 调度事件
    pub fn schedule_after<E: Event>(&mut self, delay: SimTime, ev: E) {
        let at = self.now.saturating_add(delay);
        self.schedule(at, ev);
    }

    fn step(&mut self, item: ScheduledEvent, world: &mut dyn World) {
        self.executed = self.executed.saturating_add(1);
        self.now = item.at;
        trace!(
            event_num = self.executed,
            now = ?self.now,
            seq = item.seq,
            remaining_queue = self.q.len(),
            "执行事件"
        );
        item.ev.execute(self, world);
        world.on_tick(self);
    }

    /// 运行直到事件队列为空或到达 `until`。
    pub fn run_until(&mut self, until: SimTime, world: &mut dyn World) {
        while self.q.peek().is_some_and(|top| top.at <= until) {
            let Some(item) = self.q.pop() else {
                break;
            };
            self.step(item, world);
        }
        self.now = self.now.max(until);
    }

    /// 运行所有事件直到队列为空。
    #[tracing::instrument(skip(self, world))]
    pub fn run(&mut self, world: &mut dyn World) {
        info!("▶️  开始运行仿真");
        debug!(now = ?self.now, queue_size = self.q.len(), "初始状态");

        let start = self.executed;
        while let Some(item) = self.q.pop() {
            self.step(item, world);
        }

        info!(
            total_events = self.executed - start,
            final_time = ?self.now,
            "✅ 仿真完成"
        );
    }
}
