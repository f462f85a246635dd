use serde::{Deserialize, Serialize};

use crate::mac::CsmaConfig;
use crate::net::Address;
use crate::proto::sliding_window::SwConfig;

/// Scenario file: topology description plus the traffic to inject.
///
/// Device names are the handles used by links, hub attachments and traffic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub schema_version: u32,
    /// Seed for every backoff source in the scenario.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub link: Option<LinkDefaults>,
    #[serde(default)]
    pub csma: Option<CsmaConfig>,
    #[serde(default)]
    pub sliding_window: Option<SwConfig>,
    pub hosts: Vec<HostSpec>,
    #[serde(default)]
    pub hubs: Vec<HubSpec>,
    #[serde(default)]
    pub switches: Vec<SwitchSpec>,
    #[serde(default)]
    pub links: Vec<LinkSpec>,
    #[serde(default)]
    pub attach: Vec<AttachSpec>,
    #[serde(default)]
    pub traffic: Vec<TrafficSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkDefaults {
    #[serde(default)]
    pub latency_us: Option<u64>,
    #[serde(default)]
    pub bandwidth_mbps: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSpec {
    pub name: String,
    pub address: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubSpec {
    pub name: String,
    #[serde(default)]
    pub bandwidth_mbps: Option<u64>,
    #[serde(default)]
    pub latency_us: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchSpec {
    pub name: String,
    pub ports: usize,
}

/// Dedicated point-to-point connection between two device ports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSpec {
    pub a: String,
    #[serde(default)]
    pub a_port: usize,
    pub b: String,
    #[serde(default)]
    pub b_port: usize,
    #[serde(default)]
    pub latency_us: Option<u64>,
    #[serde(default)]
    pub bandwidth_mbps: Option<u64>,
}

/// Attaches a device port to a hub segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachSpec {
    pub device: String,
    #[serde(default)]
    pub port: usize,
    pub hub: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrafficSpec {
    /// A single raw frame. `to` is a host name or a literal MAC address.
    Frame {
        from: String,
        to: String,
        payload: String,
        #[serde(default)]
        at_us: u64,
    },
    /// A go-back-N sliding window transfer of `message`.
    Transfer {
        #[serde(default)]
        id: Option<u64>,
        from: String,
        to: String,
        message: String,
        #[serde(default)]
        at_us: u64,
        /// Overrides `sliding_window.window` for this transfer.
        #[serde(default)]
        window: Option<u64>,
    },
}
