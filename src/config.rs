//! Configuration for the control-plane daemon.
//!
//! The TOML file lists the map-resolvers, map-servers and proxy-ETRs as
//! address literals or hostnames. Loading resolves those entries into the
//! read-only [`ControlConfig`] value handed to the dispatcher; an entry that
//! cannot be used is logged and skipped rather than failing the whole load.

use std::{io, path::Path};

use log::warn;
use serde::Deserialize;

use crate::{
    resolve::{PreferredFamily, Resolve},
    server_list::ServerList,
    CONTROL_PORT,
};

/// On-disk daemon configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Map-resolver addresses or hostnames.
    #[serde(default)]
    pub map_resolvers: Vec<String>,
    /// Map-server addresses or hostnames.
    #[serde(default)]
    pub map_servers: Vec<String>,
    /// Proxy-ETR addresses or hostnames.
    #[serde(default)]
    pub proxy_etrs: Vec<String>,
    /// UDP port the control sockets bind to.
    pub control_port: Option<u16>,
    /// Restrict RLOCs to one family: "ipv4" or "ipv6".
    pub preferred_family: Option<String>,
}

/// Error loading a configuration file.
#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Parse(toml::de::Error),
}

/// The resolved, read-only control-plane configuration.
///
/// The dispatcher and the handlers treat this as immutable; a
/// reconfiguration builds a fresh value instead of mutating this one under
/// the running loop.
#[derive(Debug, Clone, Default)]
pub struct ControlConfig {
    pub map_resolvers: ServerList,
    pub map_servers: ServerList,
    pub proxy_etrs: ServerList,
    pub control_port: u16,
    pub preferred_family: PreferredFamily,
}

impl ConfigFile {
    /// Read and parse the configuration file at `path`.
    pub fn load(path: &Path) -> Result<ConfigFile, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Resolve the configured names into a [`ControlConfig`].
    pub fn resolve<R: Resolve>(&self, resolver: &R) -> ControlConfig {
        let preferred_family = match self.preferred_family.as_deref() {
            None => PreferredFamily::Any,
            Some("ipv4") => PreferredFamily::V4,
            Some("ipv6") => PreferredFamily::V6,
            Some(other) => {
                warn!("Unknown preferred_family {other:?}, using both families");
                PreferredFamily::Any
            }
        };

        let config = ControlConfig {
            map_resolvers: ServerList::resolve(&self.map_resolvers, preferred_family, resolver),
            map_servers: ServerList::resolve(&self.map_servers, preferred_family, resolver),
            proxy_etrs: ServerList::resolve(&self.proxy_etrs, preferred_family, resolver),
            control_port: self.control_port.unwrap_or(CONTROL_PORT),
            preferred_family,
        };

        if config.map_resolvers.is_empty() {
            warn!("No usable map resolver configured");
        }
        config.map_resolvers.log_entries("Map-Resolver");
        config.map_servers.log_entries("Map-Server");
        config.proxy_etrs.log_entries("Proxy-ETR");

        config
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Io(e) => f.write_fmt(format_args!("could not read config file: {e}")),
            Self::Parse(e) => f.write_fmt(format_args!("could not parse config file: {e}")),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(value: io::Error) -> Self {
        ConfigError::Io(value)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        ConfigError::Parse(value)
    }
}
