//! CIDR blocks

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::RouteError;

/// An IPv4 or IPv6 network, e.g. `10.0.0.0/8`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CidrBlock {
    network: IpAddr,
    prefix: u8,
}

impl CidrBlock {
    /// Parse `addr/prefix`; a bare address is a single-host block.
    ///
    /// Host bits must be zero (`10.0.0.1/8` is rejected).
    ///
    /// # Errors
    /// Returns `RouteError::InvalidSelector` on malformed input
    pub fn parse(value: &str) -> Result<Self, RouteError> {
        let invalid = |reason: String| RouteError::InvalidSelector {
            network: value.to_string(),
            reason,
        };

        let (addr, prefix) = match value.split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (value, None),
        };

        let network: IpAddr = addr
            .trim()
            .parse()
            .map_err(|_| invalid(format!("'{addr}' is not an IP address")))?;

        let max = max_prefix(network);
        let prefix = match prefix {
            Some(p) => p
                .trim()
                .parse::<u8>()
                .map_err(|_| invalid(format!("prefix '{p}' is not a number")))?,
            None => max,
        };
        if prefix > max {
            return Err(invalid(format!("prefix /{prefix} exceeds /{max}")));
        }

        let block = Self { network, prefix };
        if block.masked(network) != to_bits(network) {
            return Err(invalid("has host bits set".to_string()));
        }

        Ok(block)
    }

    /// Network address
    #[must_use]
    pub fn network(&self) -> IpAddr {
        self.network
    }

    /// Prefix length
    #[must_use]
    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Whether `ip` lies inside this block; always false across families
    #[must_use]
    pub fn contains(&self, ip: IpAddr) -> bool {
        if ip.is_ipv4() != self.network.is_ipv4() {
            return false;
        }
        self.masked(ip) == to_bits(self.network)
    }

    fn masked(&self, ip: IpAddr) -> u128 {
        let max = u32::from(max_prefix(ip));
        let host_bits = max - u32::from(self.prefix);
        let mask = if host_bits >= 128 {
            0
        } else {
            u128::MAX << host_bits
        };
        to_bits(ip) & mask
    }
}

fn max_prefix(ip: IpAddr) -> u8 {
    match ip {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

fn to_bits(ip: IpAddr) -> u128 {
    match ip {
        IpAddr::V4(v4) => u128::from(u32::from(v4)),
        IpAddr::V6(v6) => u128::from(v6),
    }
}

impl fmt::Display for CidrBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

impl FromStr for CidrBlock {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_contains_v4() {
        let block = CidrBlock::parse("10.0.0.0/8").unwrap();
        assert!(block.contains(ip("10.1.2.3")));
        assert!(block.contains(ip("10.255.255.255")));
        assert!(!block.contains(ip("11.0.0.1")));
        assert!(!block.contains(ip("192.168.1.1")));
    }

    #[test]
    fn test_zero_prefix_matches_everything_in_family() {
        let block = CidrBlock::parse("0.0.0.0/0").unwrap();
        assert!(block.contains(ip("203.0.113.9")));
        assert!(!block.contains(ip("2001:db8::1")));
    }

    #[test]
    fn test_single_host_block() {
        let block = CidrBlock::parse("172.16.5.4").unwrap();
        assert_eq!(block.prefix(), 32);
        assert!(block.contains(ip("172.16.5.4")));
        assert!(!block.contains(ip("172.16.5.5")));
    }

    #[test]
    fn test_contains_v6() {
        let block = CidrBlock::parse("2001:db8::/32").unwrap();
        assert!(block.contains(ip("2001:db8:abcd::1")));
        assert!(!block.contains(ip("2001:db9::1")));
        assert!(!block.contains(ip("10.0.0.1")));

        let all = CidrBlock::parse("::/0").unwrap();
        assert!(all.contains(ip("fe80::1")));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(CidrBlock::parse("10.0.0.0/33").is_err());
        assert!(CidrBlock::parse("10.0.0/8").is_err());
        assert!(CidrBlock::parse("10.0.0.0/x").is_err());
        assert!(CidrBlock::parse("bastion").is_err());
        assert!(CidrBlock::parse("10.0.0.1/8").is_err());
    }

    #[test]
    fn test_display() {
        let block = CidrBlock::parse("192.168.0.0/16").unwrap();
        assert_eq!(block.to_string(), "192.168.0.0/16");
    }
}
