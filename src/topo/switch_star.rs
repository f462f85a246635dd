//! 交换机星型拓扑构建

use crate::net::{Address, LinkError, LinkId, NetWorld, NodeId, PortRef};
use crate::sim::SimTime;

/// 交换机星型拓扑配置选项
#[derive(Debug, Clone)]
pub struct SwitchStarOpts {
    pub hosts: usize,
    pub link_latency: SimTime,
    pub bandwidth_bps: u64,
}

impl Default for SwitchStarOpts {
    fn default() -> Self {
        Self {
            hosts: 4,
            link_latency: SimTime::from_micros(1),
            bandwidth_bps: 10_000_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SwitchStar {
    pub switch: NodeId,
    pub hosts: Vec<NodeId>,
    pub addresses: Vec<Address>,
    /// 主机 `i` 到交换机方向的链路
    pub uplinks: Vec<LinkId>,
    /// 交换机到主机 `i` 方向的链路
    pub downlinks: Vec<LinkId>,
}

/// 构建交换机星型拓扑
///
/// 拓扑结构：主机 `h{i}` 经点对点链路接到交换机 `s0` 的端口 `i`。
pub fn build_switch_star(world: &mut NetWorld, opts: &SwitchStarOpts) -> Result<SwitchStar, LinkError> {
    let switch = world.net.add_switch("s0", opts.hosts);
    let mut hosts = Vec::with_capacity(opts.hosts);
    let mut addresses = Vec::with_capacity(opts.hosts);
    let mut uplinks = Vec::with_capacity(opts.hosts);
    let mut downlinks = Vec::with_capacity(opts.hosts);
    for i in 0..opts.hosts {
        let address = Address::from_index(i as u32 + 1);
        let h = world.net.add_host(format!("h{i}"), address)?;
        let up = world.net.connect(
            PortRef::new(h, 0),
            PortRef::new(switch, i),
            opts.link_latency,
            opts.bandwidth_bps,
        )?;
        hosts.push(h);
        addresses.push(address);
        uplinks.push(up);
        // connect 先建 a→b，紧接着建 b→a
        downlinks.push(LinkId(up.0 + 1));
    }
    Ok(SwitchStar {
        switch,
        hosts,
        addresses,
        uplinks,
        downlinks,
    })
}
