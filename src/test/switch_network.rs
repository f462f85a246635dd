use crate::net::{Address, HubOpts, NetWorld, PortRef, TxOutcome};
use crate::sim::{SimTime, Simulator};
use crate::topo::{SwitchStarOpts, build_switch_star};
use crate::viz::{VizEventKind, VizLogger};

/// 从 `since` 起收到过帧的节点（按事件顺序）
fn rx_nodes_since(world: &NetWorld, since: usize) -> Vec<usize> {
    let v = world.net.viz.as_ref().expect("viz enabled");
    v.events[since..]
        .iter()
        .filter_map(|ev| match &ev.kind {
            VizEventKind::NodeRx { node, .. } => Some(*node),
            _ => None,
        })
        .collect()
}

fn forwards_since(world: &NetWorld, since: usize) -> Vec<(Vec<usize>, bool)> {
    let v = world.net.viz.as_ref().expect("viz enabled");
    v.events[since..]
        .iter()
        .filter_map(|ev| match &ev.kind {
            VizEventKind::Forward { ports, flooded, .. } => Some((ports.clone(), *flooded)),
            _ => None,
        })
        .collect()
}

fn event_count(world: &NetWorld) -> usize {
    world.net.viz.as_ref().map_or(0, |v| v.events.len())
}

#[test]
fn five_hosts_flood_then_learn_then_unicast() {
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    world.net.viz = Some(VizLogger::default());
    let star = build_switch_star(
        &mut world,
        &SwitchStarOpts {
            hosts: 5,
            ..SwitchStarOpts::default()
        },
    )
    .expect("switch star");
    let d = &star.hosts;
    let addr = &star.addresses;
    assert_eq!(addr[0], Address::from_index(1));
    assert_eq!(addr[2], Address::from_index(3));

    // D1 -> D3：交换机还不认识 addr 3，泛洪
    world.net.send(d[0], addr[2], b"ping".to_vec(), &mut sim).expect("send");
    sim.run(&mut world);
    assert_eq!(forwards_since(&world, 0), vec![(vec![1, 2, 3, 4], true)]);
    let mut rx: Vec<usize> = rx_nodes_since(&world, 0)
        .into_iter()
        .filter(|n| *n != star.switch.0)
        .collect();
    rx.sort_unstable();
    assert_eq!(rx, vec![d[1].0, d[2].0, d[3].0, d[4].0]);
    assert_eq!(world.net.received(d[2]).len(), 1);
    assert_eq!(world.net.stats.filtered_frames, 3);

    // D3 -> D1：addr 1 已学到，单播；同时学到 addr 3
    let mark = event_count(&world);
    world.net.send(d[2], addr[0], b"pong".to_vec(), &mut sim).expect("send");
    sim.run(&mut world);
    assert_eq!(forwards_since(&world, mark), vec![(vec![0], false)]);
    let table = world.net.forwarding_table(star.switch).expect("switch table");
    assert_eq!(table.lookup(addr[2]), Some(2));

    // D1 -> D3 再次发送：只发往 D3 的端口
    let mark = event_count(&world);
    world.net.send(d[0], addr[2], b"again".to_vec(), &mut sim).expect("send");
    sim.run(&mut world);
    assert_eq!(forwards_since(&world, mark), vec![(vec![2], false)]);
    assert_eq!(rx_nodes_since(&world, mark), vec![star.switch.0, d[2].0]);
    assert_eq!(world.net.received(d[2]).len(), 2);
    assert_eq!(world.net.stats.flooded_frames, 1);
    assert_eq!(world.net.stats.unicast_frames, 2);

    // 点对点链路和交换机路径上每次交付也各有一条成功结果
    let results: Vec<_> = world
        .net
        .reports
        .iter()
        .map(|r| (r.outcome, r.src, r.dst, r.retries))
        .collect();
    assert_eq!(
        results,
        vec![
            (TxOutcome::Success, addr[0], addr[2], 0),
            (TxOutcome::Success, addr[2], addr[0], 0),
            (TxOutcome::Success, addr[0], addr[2], 0),
        ]
    );
}

#[test]
fn link_delivery_time_includes_serialization_and_latency() {
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    let star = build_switch_star(
        &mut world,
        &SwitchStarOpts {
            hosts: 2,
            link_latency: SimTime::from_micros(5),
            bandwidth_bps: 10_000_000,
        },
    )
    .expect("switch star");

    let res = world
        .net
        .send(star.hosts[0], star.addresses[1], b"t".to_vec(), &mut sim)
        .expect("send");
    // 64 字节 @ 10 Mb/s = 51.2 us，加 5 us 传播
    assert_eq!(
        res,
        crate::net::DeliveryResult::Sent {
            arrive: SimTime(56_200)
        }
    );
    sim.run(&mut world);
    // 交换机存储转发，第二跳同样 56.2 us
    assert_eq!(sim.now(), SimTime(112_400));
    assert_eq!(world.net.received(star.hosts[1]).len(), 1);
}

#[test]
fn back_to_back_frames_serialize_on_a_link() {
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    let star = build_switch_star(&mut world, &SwitchStarOpts::default()).expect("switch star");
    let first = world
        .net
        .send(star.hosts[0], star.addresses[1], b"a".to_vec(), &mut sim)
        .expect("send");
    let second = world
        .net
        .send(star.hosts[0], star.addresses[1], b"b".to_vec(), &mut sim)
        .expect("send");
    let (
        crate::net::DeliveryResult::Sent { arrive: a1 },
        crate::net::DeliveryResult::Sent { arrive: a2 },
    ) = (first, second)
    else {
        panic!("links always accept");
    };
    assert_eq!(a2.0 - a1.0, 51_200);

    sim.run(&mut world);
    let got: Vec<&[u8]> = world
        .net
        .received(star.hosts[1])
        .iter()
        .map(|f| f.payload())
        .collect();
    assert_eq!(got, vec![b"a".as_slice(), b"b".as_slice()]);
}

#[test]
fn corrupted_frame_is_dropped_at_switch_without_learning() {
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    let star = build_switch_star(&mut world, &SwitchStarOpts::default()).expect("switch star");
    world
        .net
        .corrupt_next_on_link(star.uplinks[0], 5)
        .expect("link exists");

    world
        .net
        .send(star.hosts[0], star.addresses[1], b"secret".to_vec(), &mut sim)
        .expect("send");
    sim.run(&mut world);

    assert!(world.net.received(star.hosts[1]).is_empty());
    assert_eq!(world.net.stats.integrity_drops, 1);
    let table = world.net.forwarding_table(star.switch).expect("switch table");
    assert!(table.is_empty(), "corrupted source must not be learned");
    assert_eq!(world.net.reports.len(), 1);
    assert_eq!(world.net.reports[0].outcome, TxOutcome::IntegrityFailed);
    assert_eq!(world.net.reports[0].src, star.addresses[0]);

    // 故障只作用于一帧
    world
        .net
        .send(star.hosts[0], star.addresses[1], b"secret".to_vec(), &mut sim)
        .expect("send");
    sim.run(&mut world);
    assert_eq!(world.net.received(star.hosts[1]).len(), 1);
    assert_eq!(world.net.reports.len(), 2);
    assert_eq!(world.net.reports[1].outcome, TxOutcome::Success);
}

#[test]
fn switch_isolates_collision_domains_and_filters_same_side_traffic() {
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    let net = &mut world.net;
    let h0 = net.add_host("h0", Address::from_index(1)).expect("h0");
    let h1 = net.add_host("h1", Address::from_index(2)).expect("h1");
    let h2 = net.add_host("h2", Address::from_index(3)).expect("h2");
    let s = net.add_switch("s0", 2);
    let hub = net.add_hub("hub0", HubOpts::default());
    net.attach(PortRef::new(h0, 0), hub).expect("attach h0");
    net.attach(PortRef::new(h1, 0), hub).expect("attach h1");
    net.attach(PortRef::new(s, 0), hub).expect("attach s0");
    net.connect(PortRef::new(h2, 0), PortRef::new(s, 1), SimTime::from_micros(1), 10_000_000)
        .expect("connect h2");

    // h0 在 Hub 上发，h2 同时在独占链路上发：不同冲突域，互不干扰
    world
        .net
        .send(h0, Address::from_index(2), b"local".to_vec(), &mut sim)
        .expect("send");
    world
        .net
        .send(h2, Address::from_index(9), b"remote".to_vec(), &mut sim)
        .expect("send");
    sim.run(&mut world);
    assert_eq!(world.net.stats.collisions, 0);
    assert_eq!(world.net.received(h1).len(), 1);

    // h1 回复 h0：两者都在端口 0 一侧，交换机丢弃而不回送
    world
        .net
        .send(h1, Address::from_index(1), b"reply".to_vec(), &mut sim)
        .expect("send");
    sim.run(&mut world);
    assert_eq!(world.net.received(h0).len(), 1);
    assert_eq!(world.net.stats.self_forward_drops, 1);
    let table = world.net.forwarding_table(s).expect("switch table");
    assert_eq!(table.lookup(Address::from_index(1)), Some(0));
    assert_eq!(table.lookup(Address::from_index(2)), Some(0));
    assert_eq!(table.lookup(Address::from_index(3)), Some(1));
}
