//! Local interface address lookup

use nix::ifaddrs::getifaddrs;
use std::net::{Ipv4Addr, SocketAddrV4};

use crate::error::ConfigError;

/// First IPv4 address bound to the named interface
pub fn interface_ipv4(name: &str) -> Result<Ipv4Addr, ConfigError> {
    let addrs = getifaddrs().map_err(|e| ConfigError::Interface {
        name: name.to_string(),
        reason: e.to_string(),
    })?;

    addrs
        .filter(|ifa| ifa.interface_name == name)
        .filter_map(|ifa| ifa.address)
        .find_map(|addr| addr.as_sockaddr_in().map(|sin| *SocketAddrV4::from(*sin).ip()))
        .ok_or_else(|| ConfigError::Interface {
            name: name.to_string(),
            reason: "no IPv4 address assigned".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_has_ipv4() {
        // Every Linux host running the test suite has "lo"
        if cfg!(target_os = "linux") {
            if let Ok(ip) = interface_ipv4("lo") {
                assert!(ip.is_loopback());
            }
        }
    }

    #[test]
    fn test_unknown_interface() {
        assert!(matches!(
            interface_ipv4("adac-no-such-if0"),
            Err(ConfigError::Interface { .. })
        ));
    }
}
