use crate::mac::{CsmaConfig, ScriptedBackoff};
use crate::net::{Address, HubOpts, LinkError, NetWorld, PortRef, TxOutcome, TxReport};
use crate::proto::{SwConfig, SwState};
use crate::sim::{SimTime, Simulator};
use crate::topo::{
    HubStarOpts, SwitchStarOpts, build_hub_star, build_hub_star_with_backoff, build_switch_star,
};
use crate::viz::{VizEventKind, VizLogger};

fn transfer_reports(world: &NetWorld, id: u64) -> Vec<&TxReport> {
    world
        .net
        .reports
        .iter()
        .filter(|r| r.transfer == Some(id))
        .collect()
}

fn retransmitted_seqs(world: &NetWorld) -> Vec<u64> {
    let v = world.net.viz.as_ref().expect("viz enabled");
    v.kinds()
        .filter_map(|k| match k {
            VizEventKind::SwSend {
                seq,
                retrans: Some(true),
                ..
            } => Some(*seq),
            _ => None,
        })
        .collect()
}

fn timeout_bases(world: &NetWorld) -> Vec<u64> {
    let v = world.net.viz.as_ref().expect("viz enabled");
    v.kinds()
        .filter_map(|k| match k {
            VizEventKind::SwTimeout { base, .. } => Some(*base),
            _ => None,
        })
        .collect()
}

#[test]
fn transfer_over_switch_delivers_message_in_order() {
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    let star = build_switch_star(&mut world, &SwitchStarOpts::default()).expect("switch star");

    let message = b"HELLO WORLD";
    let id = world
        .net
        .start_transfer(
            &mut sim,
            SimTime::ZERO,
            (star.hosts[0], star.hosts[1]),
            message,
            SwConfig::default(),
        )
        .expect("start");
    sim.run(&mut world);

    let conn = world.net.transfer(id).expect("transfer exists");
    assert_eq!(conn.state(), &SwState::Complete);
    assert_eq!(conn.received_message(), message);
    assert_eq!(conn.total_frames(), message.len() as u64);
    assert!(conn.finished_at().is_some());
    assert_eq!(world.net.stats.retransmissions, 0);

    let reports = transfer_reports(&world, id);
    let full: Vec<_> = reports
        .iter()
        .filter(|r| r.outcome == TxOutcome::WindowFull)
        .collect();
    assert_eq!(full.len(), 1, "window stall is reported once per transfer");
    assert_eq!(full[0].seq_range, Some((0, 3)));

    let done = reports.last().expect("final report");
    assert_eq!(done.outcome, TxOutcome::Success);
    assert_eq!(done.seq_range, Some((0, message.len() as u64 - 1)));
    assert_eq!((done.src, done.dst), (star.addresses[0], star.addresses[1]));
}

#[test]
fn lost_first_frame_times_out_and_resends_whole_window() {
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    world.net.viz = Some(VizLogger::default());
    let star = build_switch_star(&mut world, &SwitchStarOpts::default()).expect("switch star");
    world
        .net
        .corrupt_next_on_link(star.uplinks[0], 0)
        .expect("link exists");

    let id = world
        .net
        .start_transfer(
            &mut sim,
            SimTime::ZERO,
            (star.hosts[0], star.hosts[1]),
            b"WXYZ",
            SwConfig::default(),
        )
        .expect("start");
    sim.run(&mut world);

    // 交换机丢掉 seq 0，接收方把 1..=3 当作乱序帧丢弃且不回 ACK
    let drop = world
        .net
        .reports
        .iter()
        .find(|r| r.outcome == TxOutcome::IntegrityFailed)
        .expect("integrity report");
    assert_eq!(drop.seq_range, Some((0, 0)));
    assert_eq!(drop.transfer, None);

    assert_eq!(timeout_bases(&world), vec![0]);
    assert_eq!(retransmitted_seqs(&world), vec![0, 1, 2, 3]);
    assert_eq!(world.net.stats.retransmissions, 4);

    let conn = world.net.transfer(id).expect("transfer exists");
    assert_eq!(conn.state(), &SwState::Complete);
    assert_eq!(conn.received_message(), b"WXYZ");
    let finished = conn.finished_at().expect("finished");
    assert!(finished > SimTime::from_millis(2), "completion waits for the timer");
}

#[test]
fn three_duplicate_acks_trigger_fast_retransmit() {
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    world.net.viz = Some(VizLogger::default());
    let star = build_switch_star(&mut world, &SwitchStarOpts::default()).expect("switch star");

    let message = b"ABCDEFGH";
    let id = world
        .net
        .start_transfer(
            &mut sim,
            SimTime::ZERO,
            (star.hosts[0], star.hosts[1]),
            message,
            SwConfig::default(),
        )
        .expect("start");

    // seq 0 已经离开交换机，下一帧（seq 1）在下行链路上损坏
    sim.run_until(SimTime::from_micros(80), &mut world);
    world
        .net
        .corrupt_next_on_link(star.downlinks[1], 3)
        .expect("link exists");
    sim.run(&mut world);

    let v = world.net.viz.as_ref().expect("viz enabled");
    let dup_acks = v
        .kinds()
        .filter(|k| matches!(k, VizEventKind::SwAck { duplicate: true, ack: 0, .. }))
        .count();
    assert_eq!(dup_acks, 3);
    assert!(timeout_bases(&world).is_empty(), "recovered before the timer fired");
    assert_eq!(retransmitted_seqs(&world), vec![1, 2, 3, 4]);

    let conn = world.net.transfer(id).expect("transfer exists");
    assert_eq!(conn.state(), &SwState::Complete);
    assert_eq!(conn.received_message(), message);
    assert!(conn.finished_at().expect("finished") < SimTime::from_millis(2));
}

#[test]
fn transfer_survives_a_lossy_link() {
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    let star = build_switch_star(&mut world, &SwitchStarOpts::default()).expect("switch star");
    for bit in [0, 5, 2] {
        world
            .net
            .corrupt_next_on_link(star.uplinks[2], bit)
            .expect("link exists");
    }
    // ACK 走 h3 的上行链路
    world
        .net
        .corrupt_next_on_link(star.uplinks[3], 0)
        .expect("link exists");

    let message = b"lossy but fine";
    let id = world
        .net
        .start_transfer(
            &mut sim,
            SimTime::ZERO,
            (star.hosts[2], star.hosts[3]),
            message,
            SwConfig {
                window: 3,
                ..SwConfig::default()
            },
        )
        .expect("start");
    sim.run(&mut world);

    let conn = world.net.transfer(id).expect("transfer exists");
    assert_eq!(conn.state(), &SwState::Complete);
    assert_eq!(conn.received_message(), message);
    assert!(world.net.stats.retransmissions > 0);
    assert_eq!(world.net.stats.integrity_drops, 4);
}

#[test]
fn transfer_fails_after_too_many_timeouts() {
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    world.net.viz = Some(VizLogger::default());
    let star = build_switch_star(&mut world, &SwitchStarOpts::default()).expect("switch star");
    for _ in 0..64 {
        world
            .net
            .corrupt_next_on_link(star.uplinks[0], 0)
            .expect("link exists");
    }

    let cfg = SwConfig {
        timeout: SimTime::from_millis(1),
        max_timeouts: 2,
        ..SwConfig::default()
    };
    let id = world
        .net
        .start_transfer(&mut sim, SimTime::ZERO, (star.hosts[0], star.hosts[1]), b"doomed", cfg)
        .expect("start");
    sim.run(&mut world);

    let conn = world.net.transfer(id).expect("transfer exists");
    assert_eq!(
        conn.state(),
        &SwState::Failed(LinkError::IntegrityFailure {
            src: star.addresses[0],
            dst: star.addresses[1],
        })
    );
    assert!(conn.received_message().is_empty());
    assert_eq!(timeout_bases(&world), vec![0, 0, 0]);
    assert_eq!(world.net.stats.retransmissions, 8);

    let last = transfer_reports(&world, id)
        .into_iter()
        .last()
        .expect("transfer report");
    assert_eq!(last.outcome, TxOutcome::IntegrityFailed);
    assert_eq!(last.seq_range, Some((0, 3)));
    assert!(
        !world
            .net
            .reports
            .iter()
            .any(|r| r.outcome == TxOutcome::Success),
        "nothing got through"
    );
}

#[test]
fn transfer_over_hub_completes_despite_contention() {
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    world.net.set_seed(7);
    let star = build_hub_star(&mut world, &HubStarOpts::default()).expect("hub star");

    let id = world
        .net
        .start_transfer(
            &mut sim,
            SimTime::ZERO,
            (star.hosts[0], star.hosts[1]),
            b"over the hub",
            SwConfig::default(),
        )
        .expect("start");
    // 同一网段上 h2 也在发
    for i in 0..3u64 {
        sim.schedule(SimTime::from_micros(i * 40), crate::net::SendFrame {
            from: star.hosts[2],
            dst: star.addresses[1],
            payload: b"noise".to_vec(),
        });
    }
    sim.run(&mut world);

    let conn = world.net.transfer(id).expect("transfer exists");
    assert_eq!(conn.state(), &SwState::Complete);
    assert_eq!(conn.received_message(), b"over the hub");
    let raw_ok = world
        .net
        .reports
        .iter()
        .filter(|r| r.transfer.is_none() && r.outcome == TxOutcome::Success)
        .count();
    assert_eq!(raw_ok, 3, "segment success is reported for plain frames only");
}

#[test]
fn collision_failure_aborts_the_transfer() {
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    let opts = HubStarOpts {
        hosts: 3,
        hub: HubOpts {
            csma: CsmaConfig {
                max_retries: 0,
                ..CsmaConfig::default()
            },
            ..HubOpts::default()
        },
    };
    let star = build_hub_star_with_backoff(&mut world, &opts, Box::new(ScriptedBackoff::default()))
        .expect("hub star");

    let id = world
        .net
        .start_transfer(
            &mut sim,
            SimTime::ZERO,
            (star.hosts[0], star.hosts[1]),
            b"abcd",
            SwConfig::default(),
        )
        .expect("start");
    world
        .net
        .send(star.hosts[2], star.addresses[1], b"collide".to_vec(), &mut sim)
        .expect("send");
    sim.run(&mut world);

    let conn = world.net.transfer(id).expect("transfer exists");
    assert_eq!(
        conn.state(),
        &SwState::Failed(LinkError::CollisionExceeded {
            src: star.addresses[0],
            dst: star.addresses[1],
            retries: 0,
        })
    );

    let per_frame = world
        .net
        .reports
        .iter()
        .find(|r| r.outcome == TxOutcome::CollisionFailed && r.seq_range == Some((0, 0)))
        .expect("per-frame collision report");
    assert_eq!(per_frame.transfer, None);

    let failed = transfer_reports(&world, id);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].outcome, TxOutcome::CollisionFailed);
    assert_eq!(failed[0].seq_range, Some((0, 3)));
}

#[test]
fn empty_message_completes_immediately() {
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    let star = build_switch_star(&mut world, &SwitchStarOpts::default()).expect("switch star");

    let id = world
        .net
        .start_transfer(
            &mut sim,
            SimTime::from_micros(5),
            (star.hosts[0], star.hosts[1]),
            b"",
            SwConfig::default(),
        )
        .expect("start");
    sim.run(&mut world);

    let conn = world.net.transfer(id).expect("transfer exists");
    assert_eq!(conn.state(), &SwState::Complete);
    assert_eq!(conn.finished_at(), Some(SimTime::from_micros(5)));
    assert_eq!(world.net.stats.delivered_frames, 0);
    let reports = transfer_reports(&world, id);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].outcome, TxOutcome::Success);
}

#[test]
fn transfer_ids_are_unique() {
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    let star = build_switch_star(&mut world, &SwitchStarOpts::default()).expect("switch star");
    let ends = (star.hosts[0], star.hosts[1]);

    let a = world
        .net
        .start_transfer_with_id(&mut sim, SimTime::ZERO, 0, ends, b"a", SwConfig::default())
        .expect("first");
    assert_eq!(a, 0);
    assert_eq!(
        world
            .net
            .start_transfer_with_id(&mut sim, SimTime::ZERO, 0, ends, b"b", SwConfig::default()),
        Err(LinkError::DuplicateTransfer(0))
    );
    // 自动分配跳过已占用的 id
    let b = world
        .net
        .start_transfer(&mut sim, SimTime::ZERO, ends, b"c", SwConfig::default())
        .expect("auto id");
    assert_eq!(b, 1);

    let switch = star.switch;
    assert_eq!(
        world
            .net
            .start_transfer(&mut sim, SimTime::ZERO, (switch, star.hosts[1]), b"x", SwConfig::default()),
        Err(LinkError::UnknownNode(switch))
    );
}

#[test]
fn transfer_needs_attached_endpoints() {
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    let a = world.net.add_host("a", Address::from_index(1)).expect("a");
    let b = world.net.add_host("b", Address::from_index(2)).expect("b");

    assert_eq!(
        world
            .net
            .start_transfer(&mut sim, SimTime::ZERO, (a, b), b"HELLO", SwConfig::default()),
        Err(LinkError::NotAttached { node: a, port: 0 })
    );

    let hub = world.net.add_hub("hub0", HubOpts::default());
    world.net.attach(PortRef::new(a, 0), hub).expect("attach a");
    assert_eq!(
        world
            .net
            .start_transfer_with_id(&mut sim, SimTime::ZERO, 3, (a, b), b"HELLO", SwConfig::default()),
        Err(LinkError::NotAttached { node: b, port: 0 })
    );

    sim.run(&mut world);
    assert!(world.net.reports.is_empty(), "nothing was started");
    assert!(world.net.transfer(3).is_none());
}
