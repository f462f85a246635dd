//! 从场景描述构建拓扑并注入流量

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::net::{Address, HubOpts, LinkError, NetWorld, NodeId, PortRef, SegmentId, SendFrame};
use crate::proto::SwConnId;
use crate::sim::{ScenarioSpec, SimTime, Simulator, TrafficSpec};

pub const SCHEMA_VERSION: u32 = 1;

const DEFAULT_LATENCY_US: u64 = 1;
const DEFAULT_BANDWIDTH_MBPS: u64 = 10;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid scenario JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported schema_version {0} (expected {SCHEMA_VERSION})")]
    SchemaVersion(u32),

    #[error("duplicate device name `{0}`")]
    DuplicateName(String),

    #[error("unknown device `{0}`")]
    UnknownDevice(String),

    #[error("unknown hub `{0}`")]
    UnknownHub(String),

    #[error("`{0}` is not a host")]
    NotAHost(String),

    #[error(transparent)]
    Link(#[from] LinkError),
}

/// 场景构建结果：名字到仿真 id 的映射
#[derive(Debug, Clone, Default)]
pub struct BuiltScenario {
    pub devices: HashMap<String, NodeId>,
    pub hubs: HashMap<String, SegmentId>,
    pub transfers: Vec<SwConnId>,
}

impl BuiltScenario {
    pub fn device(&self, name: &str) -> Result<NodeId, ScenarioError> {
        self.devices
            .get(name)
            .copied()
            .ok_or_else(|| ScenarioError::UnknownDevice(name.to_string()))
    }

    fn hub(&self, name: &str) -> Result<SegmentId, ScenarioError> {
        self.hubs
            .get(name)
            .copied()
            .ok_or_else(|| ScenarioError::UnknownHub(name.to_string()))
    }

    fn host(&self, world: &NetWorld, name: &str) -> Result<(NodeId, Address), ScenarioError> {
        let id = self.device(name)?;
        let address = world
            .net
            .host_address(id)
            .ok_or_else(|| ScenarioError::NotAHost(name.to_string()))?;
        Ok((id, address))
    }

    fn insert_device(&mut self, name: &str, id: NodeId) -> Result<(), ScenarioError> {
        if self.devices.contains_key(name) || self.hubs.contains_key(name) {
            return Err(ScenarioError::DuplicateName(name.to_string()));
        }
        self.devices.insert(name.to_string(), id);
        Ok(())
    }
}

pub fn parse_scenario(raw: &str) -> Result<ScenarioSpec, ScenarioError> {
    let spec: ScenarioSpec = serde_json::from_str(raw)?;
    if spec.schema_version != SCHEMA_VERSION {
        return Err(ScenarioError::SchemaVersion(spec.schema_version));
    }
    Ok(spec)
}

pub fn load_scenario(path: &Path) -> Result<ScenarioSpec, ScenarioError> {
    let raw = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_scenario(&raw)
}

fn mbps(v: u64) -> u64 {
    v.saturating_mul(1_000_000)
}

/// 构建场景描述的拓扑，并把流量调度进 `sim`。
#[tracing::instrument(skip_all, fields(hosts = spec.hosts.len(), traffic = spec.traffic.len()))]
pub fn build_scenario(
    world: &mut NetWorld,
    sim: &mut Simulator,
    spec: &ScenarioSpec,
) -> Result<BuiltScenario, ScenarioError> {
    let mut built = BuiltScenario::default();
    if let Some(seed) = spec.seed {
        world.net.set_seed(seed);
    }

    let link_defaults = spec.link.clone().unwrap_or_default();
    let default_latency_us = link_defaults.latency_us.unwrap_or(DEFAULT_LATENCY_US);
    let default_bandwidth_mbps = link_defaults.bandwidth_mbps.unwrap_or(DEFAULT_BANDWIDTH_MBPS);

    for host in &spec.hosts {
        let id = world.net.add_host(host.name.clone(), host.address)?;
        built.insert_device(&host.name, id)?;
    }
    for sw in &spec.switches {
        let id = world.net.add_switch(sw.name.clone(), sw.ports);
        built.insert_device(&sw.name, id)?;
    }
    for hub in &spec.hubs {
        if built.devices.contains_key(&hub.name) || built.hubs.contains_key(&hub.name) {
            return Err(ScenarioError::DuplicateName(hub.name.clone()));
        }
        let opts = HubOpts {
            bandwidth_bps: mbps(hub.bandwidth_mbps.unwrap_or(default_bandwidth_mbps)),
            latency: SimTime::from_micros(hub.latency_us.unwrap_or(default_latency_us)),
            csma: spec.csma.clone().unwrap_or_default(),
        };
        let id = world.net.add_hub(hub.name.clone(), opts);
        built.hubs.insert(hub.name.clone(), id);
    }

    for link in &spec.links {
        let a = PortRef::new(built.device(&link.a)?, link.a_port);
        let b = PortRef::new(built.device(&link.b)?, link.b_port);
        let latency = SimTime::from_micros(link.latency_us.unwrap_or(default_latency_us));
        let bandwidth_bps = mbps(link.bandwidth_mbps.unwrap_or(default_bandwidth_mbps));
        world.net.connect(a, b, latency, bandwidth_bps)?;
    }
    for att in &spec.attach {
        let at = PortRef::new(built.device(&att.device)?, att.port);
        world.net.attach(at, built.hub(&att.hub)?)?;
    }

    for traffic in &spec.traffic {
        match traffic {
            TrafficSpec::Frame {
                from,
                to,
                payload,
                at_us,
            } => {
                let (from, _) = built.host(world, from)?;
                let dst = if built.devices.contains_key(to) {
                    built.host(world, to)?.1
                } else {
                    to.parse::<Address>()
                        .map_err(|_| ScenarioError::UnknownDevice(to.clone()))?
                };
                debug!(?from, %dst, at_us, "调度单帧");
                sim.schedule(SimTime::from_micros(*at_us), SendFrame {
                    from,
                    dst,
                    payload: payload.as_bytes().to_vec(),
                });
            }
            TrafficSpec::Transfer {
                id,
                from,
                to,
                message,
                at_us,
                window,
            } => {
                let (src, _) = built.host(world, from)?;
                let (dst, _) = built.host(world, to)?;
                let mut cfg = spec.sliding_window.clone().unwrap_or_default();
                if let Some(w) = window {
                    cfg.window = *w;
                }
                let at = SimTime::from_micros(*at_us);
                let conn_id = match id {
                    Some(id) => world
                        .net
                        .start_transfer_with_id(sim, at, *id, (src, dst), message.as_bytes(), cfg)?,
                    None => world.net.start_transfer(sim, at, (src, dst), message.as_bytes(), cfg)?,
                };
                built.transfers.push(conn_id);
            }
        }
    }

    info!(
        devices = built.devices.len(),
        hubs = built.hubs.len(),
        transfers = built.transfers.len(),
        "场景构建完成"
    );
    Ok(built)
}
