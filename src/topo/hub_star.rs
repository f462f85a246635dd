//! Hub 星型拓扑构建

use crate::mac::BackoffSource;
use crate::net::{Address, HubOpts, LinkError, NetWorld, NodeId, PortRef, SegmentId};

/// Hub 星型拓扑配置选项
#[derive(Debug, Clone)]
pub struct HubStarOpts {
    pub hosts: usize,
    pub hub: HubOpts,
}

impl Default for HubStarOpts {
    fn default() -> Self {
        Self {
            hosts: 3,
            hub: HubOpts::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HubStar {
    pub segment: SegmentId,
    pub hosts: Vec<NodeId>,
    pub addresses: Vec<Address>,
}

/// 构建 Hub 星型拓扑
///
/// 拓扑结构：h0..h{n-1} 都接在同一个共享网段 hub0 上，
/// 主机 `i` 的地址为 `Address::from_index(i + 1)`。
pub fn build_hub_star(world: &mut NetWorld, opts: &HubStarOpts) -> Result<HubStar, LinkError> {
    let segment = world.net.add_hub("hub0", opts.hub.clone());
    attach_hosts(world, segment, opts.hosts)
}

/// 同 [`build_hub_star`]，网段使用指定的退避随机源。
pub fn build_hub_star_with_backoff(
    world: &mut NetWorld,
    opts: &HubStarOpts,
    backoff: Box<dyn BackoffSource>,
) -> Result<HubStar, LinkError> {
    let segment = world.net.add_hub_with_backoff("hub0", opts.hub.clone(), backoff);
    attach_hosts(world, segment, opts.hosts)
}

fn attach_hosts(world: &mut NetWorld, segment: SegmentId, n: usize) -> Result<HubStar, LinkError> {
    let mut hosts = Vec::with_capacity(n);
    let mut addresses = Vec::with_capacity(n);
    for i in 0..n {
        let address = Address::from_index(i as u32 + 1);
        let h = world.net.add_host(format!("h{i}"), address)?;
        world.net.attach(PortRef::new(h, 0), segment)?;
        hosts.push(h);
        addresses.push(address);
    }
    Ok(HubStar {
        segment,
        hosts,
        addresses,
    })
}
