//! Candidate host enumeration for collector discovery.
//!
//! Given the local machine's IPv4 address and subnet mask, computes every
//! usable host address on the subnet: the open interval strictly between the
//! network address (`addr & mask`) and the broadcast address (`addr | !mask`).
//! The client probes these in ascending order until one accepts a TCP
//! connection on the collector port.
//!
//! Pure arithmetic on big-endian `u32` values; no I/O.

use std::net::{IpAddr, Ipv4Addr};

use thiserror::Error;

/// Error type for subnet enumeration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubnetError {
    /// An IPv6 address or mask was supplied; only IPv4 subnets are scanned.
    #[error("IPv6 is not supported for subnet scanning: {0}")]
    Ipv6Unsupported(IpAddr),
}

/// Computes every usable host address on the subnet of `addr`/`mask`.
///
/// The result excludes both the network and broadcast addresses and is
/// ordered ascending.  A /31 or /32 mask yields an empty list.
///
/// # Errors
///
/// Returns [`SubnetError::Ipv6Unsupported`] if either argument is IPv6; this
/// is a configuration error, not a runtime condition to retry.
///
/// # Examples
///
/// ```rust
/// use pose_core::subnet::host_addresses;
///
/// let hosts = host_addresses(
///     "192.168.1.17".parse().unwrap(),
///     "255.255.255.0".parse().unwrap(),
/// )
/// .unwrap();
/// assert_eq!(hosts.len(), 254);
/// assert_eq!(hosts[0], "192.168.1.1".parse::<std::net::Ipv4Addr>().unwrap());
/// ```
pub fn host_addresses(addr: IpAddr, mask: IpAddr) -> Result<Vec<Ipv4Addr>, SubnetError> {
    let addr = require_v4(addr)?;
    let mask = require_v4(mask)?;

    let addr_bits = u32::from(addr);
    let mask_bits = u32::from(mask);

    let network = addr_bits & mask_bits;
    let broadcast = addr_bits | !mask_bits;

    // Open interval: both endpoints are reserved.
    let hosts = (network.saturating_add(1)..broadcast)
        .map(Ipv4Addr::from)
        .collect();
    Ok(hosts)
}

fn require_v4(ip: IpAddr) -> Result<Ipv4Addr, SubnetError> {
    match ip {
        IpAddr::V4(v4) => Ok(v4),
        IpAddr::V6(_) => Err(SubnetError::Ipv6Unsupported(ip)),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
