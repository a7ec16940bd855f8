//! Configuration schema definitions.
//!
//! `AgentConfig` is the fully resolved snapshot the lifecycle controller
//! holds as active. `ConfigOverlay` is the partial form read from config
//! files and CLI flags; overlays are merged onto the defaults in order.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// Resolved agent configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentConfig {
    /// Region the agent belongs to.
    pub region: String,

    /// Datacenter within the region.
    pub datacenter: String,

    /// Name used to identify this node in the cluster.
    pub node_name: String,

    /// Directory for persistent state. Must be absolute when set.
    pub data_dir: Option<String>,

    /// Requested log level, as given by the operator.
    pub log_level: String,

    /// Default address every service binds to.
    pub bind_addr: String,

    /// Per-service ports.
    pub ports: Ports,

    /// Per-service bind address overrides.
    pub addresses: Addresses,

    /// Addresses advertised to the rest of the cluster.
    pub advertise: AdvertiseAddrs,

    /// Leave the cluster gracefully on SIGINT.
    pub leave_on_interrupt: bool,

    /// Leave the cluster gracefully on SIGTERM.
    pub leave_on_terminate: bool,

    /// Also send log output to the local syslog daemon.
    pub enable_syslog: bool,

    /// Syslog facility, e.g. `LOCAL0` or `DAEMON`.
    pub syslog_facility: String,

    /// Build metadata stamped during acquisition.
    pub version: String,
    pub version_prerelease: String,
    pub revision: String,

    /// Config files that contributed to this snapshot.
    pub files: Vec<String>,

    /// Listen addresses, filled in by address normalization.
    pub normalized: Option<NormalizedAddrs>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            region: "global".to_string(),
            datacenter: "dc1".to_string(),
            node_name: String::new(),
            data_dir: None,
            log_level: "INFO".to_string(),
            bind_addr: "127.0.0.1".to_string(),
            ports: Ports::default(),
            addresses: Addresses::default(),
            advertise: AdvertiseAddrs::default(),
            leave_on_interrupt: false,
            leave_on_terminate: false,
            enable_syslog: false,
            syslog_facility: "LOCAL0".to_string(),
            version: String::new(),
            version_prerelease: String::new(),
            revision: String::new(),
            files: Vec::new(),
            normalized: None,
        }
    }
}

impl AgentConfig {
    /// Merge an overlay over this config. Fields set in the overlay win.
    pub fn apply(&mut self, overlay: &ConfigOverlay) {
        if let Some(region) = &overlay.region {
            self.region = region.clone();
        }
        if let Some(datacenter) = &overlay.datacenter {
            self.datacenter = datacenter.clone();
        }
        if let Some(node_name) = &overlay.node_name {
            self.node_name = node_name.clone();
        }
        if let Some(data_dir) = &overlay.data_dir {
            self.data_dir = Some(data_dir.clone());
        }
        if let Some(log_level) = &overlay.log_level {
            self.log_level = log_level.clone();
        }
        if let Some(bind_addr) = &overlay.bind_addr {
            self.bind_addr = bind_addr.clone();
        }
        if let Some(ports) = &overlay.ports {
            self.ports.http = ports.http.unwrap_or(self.ports.http);
            self.ports.rpc = ports.rpc.unwrap_or(self.ports.rpc);
            self.ports.serf = ports.serf.unwrap_or(self.ports.serf);
        }
        if let Some(addresses) = &overlay.addresses {
            self.addresses.merge(addresses);
        }
        if let Some(advertise) = &overlay.advertise {
            self.advertise.merge(advertise);
        }
        if let Some(leave) = overlay.leave_on_interrupt {
            self.leave_on_interrupt = leave;
        }
        if let Some(leave) = overlay.leave_on_terminate {
            self.leave_on_terminate = leave;
        }
        if let Some(enable) = overlay.enable_syslog {
            self.enable_syslog = enable;
        }
        if let Some(facility) = &overlay.syslog_facility {
            self.syslog_facility = facility.clone();
        }
    }

    /// Version string including the prerelease suffix.
    pub fn full_version(&self) -> String {
        format!("{}{}", self.version, self.version_prerelease)
    }
}

/// Service ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ports {
    pub http: u16,
    pub rpc: u16,
    pub serf: u16,
}

impl Default for Ports {
    fn default() -> Self {
        Self {
            http: 5656,
            rpc: 5657,
            serf: 5658,
        }
    }
}

/// Per-service bind address overrides. `None` falls back to `bind_addr`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Addresses {
    pub http: Option<String>,
    pub rpc: Option<String>,
    pub serf: Option<String>,
}

impl Addresses {
    fn merge(&mut self, other: &Addresses) {
        if other.http.is_some() {
            self.http = other.http.clone();
        }
        if other.rpc.is_some() {
            self.rpc = other.rpc.clone();
        }
        if other.serf.is_some() {
            self.serf = other.serf.clone();
        }
    }
}

/// Advertised addresses. `None` falls back to the normalized listen address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdvertiseAddrs {
    pub rpc: Option<String>,
    pub serf: Option<String>,
}

impl AdvertiseAddrs {
    fn merge(&mut self, other: &AdvertiseAddrs) {
        if other.rpc.is_some() {
            self.rpc = other.rpc.clone();
        }
        if other.serf.is_some() {
            self.serf = other.serf.clone();
        }
    }
}

/// Socket addresses resolved from binds, ports and advertise settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NormalizedAddrs {
    pub http: SocketAddr,
    pub rpc: SocketAddr,
    pub serf: SocketAddr,
    pub advertise_rpc: SocketAddr,
    pub advertise_serf: SocketAddr,
}

/// Partial configuration read from a file or from CLI flags.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverlay {
    pub region: Option<String>,
    pub datacenter: Option<String>,
    pub node_name: Option<String>,
    pub data_dir: Option<String>,
    pub log_level: Option<String>,
    pub bind_addr: Option<String>,
    pub ports: Option<PortsOverlay>,
    pub addresses: Option<Addresses>,
    pub advertise: Option<AdvertiseAddrs>,
    pub leave_on_interrupt: Option<bool>,
    pub leave_on_terminate: Option<bool>,
    pub enable_syslog: Option<bool>,
    pub syslog_facility: Option<String>,
}

impl ConfigOverlay {
    /// True when the overlay sets nothing at all.
    pub fn is_empty(&self) -> bool {
        self == &ConfigOverlay::default()
    }
}

/// Port overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PortsOverlay {
    pub http: Option<u16>,
    pub rpc: Option<u16>,
    pub serf: Option<u16>,
}
