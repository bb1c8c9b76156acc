//! The name-resolution collaborator interface.
//!
//! Resolution only happens while configuration is loaded, before the dispatch
//! loop starts, so the system resolver implementation is allowed to block.

use std::{
    io,
    net::{IpAddr, ToSocketAddrs},
};

use crate::address::LispAddr;

/// Family hint handed to the resolver, mirroring the daemon-wide RLOC family
/// restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreferredFamily {
    /// No restriction, results of both families are used.
    #[default]
    Any,
    /// Only IPv4 results are used.
    V4,
    /// Only IPv6 results are used.
    V6,
}

impl PreferredFamily {
    fn admits(&self, addr: IpAddr) -> bool {
        match self {
            PreferredFamily::Any => true,
            PreferredFamily::V4 => addr.is_ipv4(),
            PreferredFamily::V6 => addr.is_ipv6(),
        }
    }
}

/// Resolves a hostname to addresses. Inputs have already passed the name
/// qualification rule, literals never reach a resolver.
pub trait Resolve {
    fn resolve(&self, name: &str, preferred: PreferredFamily) -> io::Result<Vec<LispAddr>>;
}

/// [`Resolve`] implementation backed by the host resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl Resolve for SystemResolver {
    fn resolve(&self, name: &str, preferred: PreferredFamily) -> io::Result<Vec<LispAddr>> {
        // The port is irrelevant, ToSocketAddrs just needs one to build
        // socket addresses out of the A/AAAA results.
        let addrs = (name, 0)
            .to_socket_addrs()?
            .map(|sa| sa.ip())
            .filter(|ip| preferred.admits(*ip))
            .map(LispAddr::from)
            .collect();
        Ok(addrs)
    }
}
