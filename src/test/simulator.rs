use crate::sim::{Event, SimTime, Simulator, World};
use std::any::Any;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct DummyWorld {
    ticks: usize,
}

impl World for DummyWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn on_tick(&mut self, _sim: &mut Simulator) {
        self.ticks = self.ticks.saturating_add(1);
    }
}

struct Push {
    id: u32,
    log: Arc<Mutex<Vec<(u32, u64)>>>,
}

impl Event for Push {
    fn execute(self: Box<Self>, sim: &mut Simulator, _world: &mut dyn World) {
        let Push { id, log } = *self;
        log.lock().expect("log lock").push((id, sim.now().0));
    }
}

struct PushThenScheduleNow {
    id: u32,
    next_id: u32,
    log: Arc<Mutex<Vec<(u32, u64)>>>,
}

impl Event for PushThenScheduleNow {
    fn execute(self: Box<Self>, sim: &mut Simulator, _world: &mut dyn World) {
        let PushThenScheduleNow { id, next_id, log } = *self;
        log.lock().expect("log lock").push((id, sim.now().0));
        sim.schedule(sim.now(), Push { id: next_id, log });
    }
}

fn ids(log: &Arc<Mutex<Vec<(u32, u64)>>>) -> Vec<u32> {
    log.lock().expect("log lock").iter().map(|(id, _)| *id).collect()
}

#[test]
fn scheduled_events_order_by_time_then_seq() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut sim = Simulator::default();
    sim.schedule(SimTime(10), Push { id: 1, log: Arc::clone(&log) });
    sim.schedule(SimTime(5), Push { id: 2, log: Arc::clone(&log) });
    sim.schedule(SimTime(10), Push { id: 3, log: Arc::clone(&log) });

    let mut world = DummyWorld::default();
    sim.run(&mut world);

    assert_eq!(ids(&log), vec![2, 1, 3]);
    assert_eq!(world.ticks, 3);
    assert_eq!(sim.now(), SimTime(10));
    assert_eq!(sim.executed_events(), 3);
}

#[test]
fn event_scheduled_now_runs_after_already_queued_ties() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut sim = Simulator::default();
    sim.schedule(
        SimTime(1),
        PushThenScheduleNow {
            id: 1,
            next_id: 9,
            log: Arc::clone(&log),
        },
    );
    sim.schedule(SimTime(1), Push { id: 2, log: Arc::clone(&log) });

    let mut world = DummyWorld::default();
    sim.run(&mut world);

    assert_eq!(ids(&log), vec![1, 2, 9]);
}

#[test]
fn scheduling_in_the_past_is_clamped_to_now() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut sim = Simulator::default();
    sim.schedule(SimTime(100), Push { id: 1, log: Arc::clone(&log) });
    let mut world = DummyWorld::default();
    sim.run(&mut world);

    sim.schedule(SimTime(3), Push { id: 2, log: Arc::clone(&log) });
    sim.schedule_after(SimTime(5), Push { id: 3, log: Arc::clone(&log) });
    sim.run(&mut world);

    assert_eq!(&*log.lock().expect("log lock"), &[(1, 100), (2, 100), (3, 105)]);
}

#[test]
fn run_until_stops_at_deadline_and_keeps_later_events() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut sim = Simulator::default();
    sim.schedule(SimTime(5), Push { id: 1, log: Arc::clone(&log) });
    sim.schedule(SimTime(50), Push { id: 2, log: Arc::clone(&log) });

    let mut world = DummyWorld::default();
    sim.run_until(SimTime(10), &mut world);

    assert_eq!(ids(&log), vec![1]);
    assert_eq!(sim.now(), SimTime(10));
    assert_eq!(sim.pending_events(), 1);

    sim.run(&mut world);
    assert_eq!(ids(&log), vec![1, 2]);
}
