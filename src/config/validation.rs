//! Configuration validation.
//!
//! # Responsibilities
//! - Resolve bind addresses and ports into socket addresses
//! - Default advertise addresses from the listen addresses
//! - Verify directory paths are absolute
//!
//! # Design Decisions
//! - Runs on the merged config, after CLI flags are applied
//! - First failure wins; the caller reports it and rejects the snapshot

use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use crate::config::loader::ConfigError;
use crate::config::schema::{AgentConfig, NormalizedAddrs};

/// Fill in `config.normalized` from binds, ports and advertise settings.
pub fn normalize_addrs(config: &mut AgentConfig) -> Result<(), ConfigError> {
    let bind = config.bind_addr.as_str();
    let http = listen_addr(
        "HTTP",
        config.addresses.http.as_deref().unwrap_or(bind),
        config.ports.http,
    )?;
    let rpc = listen_addr(
        "RPC",
        config.addresses.rpc.as_deref().unwrap_or(bind),
        config.ports.rpc,
    )?;
    let serf = listen_addr(
        "Serf",
        config.addresses.serf.as_deref().unwrap_or(bind),
        config.ports.serf,
    )?;

    let advertise_rpc = advertise_addr("RPC", config.advertise.rpc.as_deref(), rpc)?;
    let advertise_serf = advertise_addr("Serf", config.advertise.serf.as_deref(), serf)?;

    config.normalized = Some(NormalizedAddrs {
        http,
        rpc,
        serf,
        advertise_rpc,
        advertise_serf,
    });
    Ok(())
}

/// Directory-like settings must be absolute paths.
pub fn verify_paths(config: &AgentConfig) -> Result<(), ConfigError> {
    let dirs = [("data-dir", config.data_dir.as_deref())];
    for (name, dir) in dirs {
        match dir {
            Some(dir) if !dir.is_empty() && !Path::new(dir).is_absolute() => {
                return Err(ConfigError::RelativePath {
                    name,
                    path: dir.to_string(),
                });
            }
            _ => {}
        }
    }
    Ok(())
}

fn listen_addr(service: &'static str, host: &str, port: u16) -> Result<SocketAddr, ConfigError> {
    let ip: IpAddr = host.trim().parse().map_err(|e| ConfigError::Address {
        service,
        value: host.to_string(),
        reason: format!("{e}"),
    })?;
    Ok(SocketAddr::new(ip, port))
}

fn advertise_addr(
    service: &'static str,
    advertise: Option<&str>,
    listen: SocketAddr,
) -> Result<SocketAddr, ConfigError> {
    let Some(value) = advertise else {
        if listen.ip().is_unspecified() {
            return Err(ConfigError::Address {
                service,
                value: listen.to_string(),
                reason: "an advertise address is required when binding to all interfaces"
                    .to_string(),
            });
        }
        return Ok(listen);
    };

    let value = value.trim();
    if let Ok(addr) = value.parse::<SocketAddr>() {
        return Ok(addr);
    }
    let ip: IpAddr = value.parse().map_err(|e| ConfigError::Address {
        service,
        value: value.to_string(),
        reason: format!("{e}"),
    })?;
    Ok(SocketAddr::new(ip, listen.port()))
}
