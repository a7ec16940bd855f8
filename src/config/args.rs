//! Command line flags.

use std::path::PathBuf;

use clap::Parser;

use crate::config::schema::ConfigOverlay;

/// Starts the Maya agent and runs until an interrupt is received.
///
/// Configuration comes primarily from the config files given with
/// `--config`; a subset of options may be passed directly as flags, which
/// are merged over the file values.
#[derive(Debug, Parser)]
#[command(name = "maya-agent", version)]
pub struct AgentArgs {
    /// Path to a config file or a directory of config files. May be given
    /// multiple times; later files are merged over earlier ones.
    #[arg(long = "config", value_name = "PATH")]
    pub config: Vec<PathBuf>,

    /// Address the agent binds all of its network services to.
    #[arg(long = "bind", value_name = "ADDR")]
    pub bind: Option<String>,

    /// Region the agent is a member of.
    #[arg(long = "region")]
    pub region: Option<String>,

    /// Directory used to store state and other persistent data.
    #[arg(long = "data-dir", value_name = "PATH")]
    pub data_dir: Option<String>,

    /// Datacenter the agent is a member of.
    #[arg(long = "dc", value_name = "DATACENTER")]
    pub datacenter: Option<String>,

    /// Log verbosity: TRACE, DEBUG, INFO, WARN or ERROR.
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Name of the local node. Must be unique per region.
    #[arg(long = "node", value_name = "NAME")]
    pub node: Option<String>,

    /// Gracefully leave the cluster on SIGINT.
    #[arg(long = "leave-on-interrupt")]
    pub leave_on_interrupt: bool,

    /// Gracefully leave the cluster on SIGTERM.
    #[arg(long = "leave-on-terminate")]
    pub leave_on_terminate: bool,
}

impl AgentArgs {
    /// Flags as an overlay. Unset flags leave file values alone.
    pub fn overlay(&self) -> ConfigOverlay {
        ConfigOverlay {
            region: self.region.clone(),
            datacenter: self.datacenter.clone(),
            node_name: self.node.clone(),
            data_dir: self.data_dir.clone(),
            log_level: self.log_level.clone(),
            bind_addr: self.bind.clone(),
            leave_on_interrupt: self.leave_on_interrupt.then_some(true),
            leave_on_terminate: self.leave_on_terminate.then_some(true),
            ..Default::default()
        }
    }
}
