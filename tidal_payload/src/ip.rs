//! Client addresses.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Draw a client address, IPv4 with roughly `ipv4_percent` percent
/// probability and IPv6 otherwise.
///
/// Addresses are uniform over their space. No attempt is made to keep them
/// routable.
pub fn address<R>(rng: &mut R, ipv4_percent: u8) -> IpAddr
where
    R: rand::Rng + ?Sized,
{
    if crate::roll(rng) <= ipv4_percent {
        IpAddr::V4(Ipv4Addr::from(rng.random::<u32>()))
    } else {
        IpAddr::V6(Ipv6Addr::from(rng.random::<u128>()))
    }
}
