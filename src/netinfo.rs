//! Local Interface Enumeration
//!
//! Backs the `myip` command: every IPv4 address, per interface.

use std::net::{IpAddr, Ipv4Addr};

use anyhow::Context;

use crate::Result;

/// Returns `(interface name, address)` for every local IPv4 interface.
pub fn local_ipv4_interfaces() -> Result<Vec<(String, Ipv4Addr)>> {
    let interfaces = local_ip_address::list_afinet_netifas()
        .context("failed to enumerate network interfaces")?;
    Ok(interfaces
        .into_iter()
        .filter_map(|(name, addr)| match addr {
            IpAddr::V4(v4) => Some((name, v4)),
            IpAddr::V6(_) => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumerates_at_least_one_interface() {
        let interfaces = local_ipv4_interfaces().unwrap();
        assert!(!interfaces.is_empty());
    }
}
