//! Network address discovery.
//!
//! Works out which URLs other machines on the LAN can use to reach the
//! daemon. Only IPv4 addresses are advertised; loopback is used as a last
//! resort when no other interface has an address.

use std::net::{IpAddr, Ipv4Addr, SocketAddrV4};

/// Keep non-loopback IPv4 addresses, falling back to `127.0.0.1`.
///
/// Duplicates are removed; the input order is otherwise preserved.
pub fn accessible_addresses(addrs: impl IntoIterator<Item = IpAddr>) -> Vec<Ipv4Addr> {
    let mut accessible: Vec<Ipv4Addr> = Vec::new();

    for addr in addrs {
        let IpAddr::V4(v4) = addr else {
            continue;
        };
        if v4.is_loopback() || v4.is_unspecified() || accessible.contains(&v4) {
            continue;
        }
        accessible.push(v4);
    }

    if accessible.is_empty() {
        accessible.push(Ipv4Addr::LOCALHOST);
    }
    accessible
}

/// Enumerate the addresses assigned to local interfaces.
///
/// Failures are logged and produce an empty list.
pub fn interface_addresses() -> Vec<IpAddr> {
    let ifaddrs = match nix::ifaddrs::getifaddrs() {
        Ok(ifaddrs) => ifaddrs,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to enumerate network interfaces");
            return Vec::new();
        }
    };

    ifaddrs
        .filter_map(|ifaddr| {
            let address = ifaddr.address?;
            let sin = address.as_sockaddr_in()?;
            tracing::trace!(interface = %ifaddr.interface_name, "found IPv4 address");
            Some(IpAddr::V4(*SocketAddrV4::from(*sin).ip()))
        })
        .collect()
}

/// `http://ip:port` for every advertised address.
pub fn service_urls(addrs: &[Ipv4Addr], port: u16) -> Vec<String> {
    addrs
        .iter()
        .map(|ip| format!("http://{ip}:{port}"))
        .collect()
}

/// URLs for the given port on this machine's interfaces.
pub fn local_service_urls(port: u16) -> Vec<String> {
    service_urls(&accessible_addresses(interface_addresses()), port)
}
