//! Owned sets of control-plane server addresses.
//!
//! Map-resolvers, map-servers and proxy-ETRs are each configured as a list of
//! literals or hostnames. The lists are built once at configuration time and
//! are read-only for the lifetime of the dispatch loop; reconfiguration
//! replaces a list wholesale.

use log::{info, warn};

use crate::{
    address::LispAddr,
    afi::Afi,
    resolve::{PreferredFamily, Resolve},
};

/// An owned, read-only collection of server addresses of one role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerList {
    addrs: Vec<LispAddr>,
}

impl ServerList {
    /// Build a list from configured entries, resolving hostnames through
    /// `resolver`.
    ///
    /// An entry which fails to parse or resolve is logged and skipped, the
    /// remaining entries still make it into the list. A configuration with
    /// zero usable servers is the caller's problem to detect.
    pub fn resolve<R: Resolve>(
        entries: &[String],
        preferred: PreferredFamily,
        resolver: &R,
    ) -> ServerList {
        let mut addrs = Vec::new();
        for entry in entries {
            match LispAddr::from_text(entry, preferred, resolver) {
                Ok(resolved) => addrs.extend(resolved),
                Err(e) => {
                    warn!("Skipping unusable server entry {entry}: {e}");
                }
            }
        }
        ServerList { addrs }
    }

    /// Create a list directly from addresses.
    pub fn from_addrs(addrs: Vec<LispAddr>) -> ServerList {
        ServerList { addrs }
    }

    /// The first server of the given family, if any.
    pub fn find(&self, afi: Afi) -> Option<LispAddr> {
        self.addrs.iter().copied().find(|addr| addr.afi() == afi)
    }

    /// The preferred server: IPv4 has priority over IPv6 when both are
    /// available.
    pub fn preferred(&self) -> Option<LispAddr> {
        self.find(Afi::Ipv4).or_else(|| self.find(Afi::Ipv6))
    }

    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LispAddr> {
        self.addrs.iter()
    }

    /// Log the list contents under the given role label.
    pub fn log_entries(&self, label: &str) {
        for addr in &self.addrs {
            info!("{label}: {addr}");
        }
    }
}
