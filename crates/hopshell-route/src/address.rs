//! Target address resolution
//!
//! Turns a `user@host[:port]` target into the address used as routing key.
//! A failed DNS lookup degrades to the literal hostname instead of aborting;
//! such a key never satisfies a CIDR test, so the run falls through to the
//! default route (or fails with `NotFound` when there is none).

use std::net::IpAddr;

use async_trait::async_trait;
use hopshell_exec::HostSpec;
use serde::Serialize;
use tracing::{debug, instrument, warn};

/// Hostname to address lookup
#[async_trait]
pub trait HostLookup: Send + Sync {
    /// All addresses for `host`, in resolver order
    async fn lookup(&self, host: &str) -> std::io::Result<Vec<IpAddr>>;
}

/// System resolver via `tokio::net::lookup_host`
#[derive(Debug, Clone, Default)]
pub struct DnsLookup;

#[async_trait]
impl HostLookup for DnsLookup {
    async fn lookup(&self, host: &str) -> std::io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, 0)).await?;
        Ok(addrs.map(|sa| sa.ip()).collect())
    }
}

/// How the routing key was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Target was already an IP literal
    Literal,
    /// Resolved through DNS
    Dns,
    /// Lookup failed; key is the hostname itself
    Unresolved,
}

/// Target host with its routing key, fixed for the rest of the run
#[derive(Debug, Clone)]
pub struct TargetHost {
    raw: HostSpec,
    resolved_ip: String,
    resolution: Resolution,
}

impl TargetHost {
    /// Target as given on the command line
    #[must_use]
    pub fn raw(&self) -> &HostSpec {
        &self.raw
    }

    /// Routing key: an IP address, or the bare hostname if unresolved
    #[must_use]
    pub fn resolved_ip(&self) -> &str {
        &self.resolved_ip
    }

    /// How `resolved_ip` was obtained
    #[must_use]
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Parsed address, when the key is one
    #[must_use]
    pub fn ip(&self) -> Option<IpAddr> {
        self.resolved_ip.parse().ok()
    }
}

/// Resolves targets to routing keys
pub struct AddressResolver<L = DnsLookup> {
    lookup: L,
}

impl AddressResolver<DnsLookup> {
    /// Resolver backed by system DNS
    #[must_use]
    pub fn new() -> Self {
        Self { lookup: DnsLookup }
    }
}

impl Default for AddressResolver<DnsLookup> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: HostLookup> AddressResolver<L> {
    /// Resolver with a custom lookup
    pub fn with_lookup(lookup: L) -> Self {
        Self { lookup }
    }

    /// Resolve a target to its routing key
    #[instrument(skip(self, target), fields(target = %target))]
    pub async fn resolve(&self, target: &HostSpec) -> TargetHost {
        let host = target.host();

        if let Ok(ip) = host.parse::<IpAddr>() {
            debug!(ip = %ip, "target is an IP literal");
            return TargetHost {
                raw: target.clone(),
                resolved_ip: ip.to_string(),
                resolution: Resolution::Literal,
            };
        }

        match self.lookup.lookup(host).await {
            Ok(addrs) => match pick_address(&addrs) {
                Some(ip) => {
                    debug!(host = %host, ip = %ip, "resolved target");
                    TargetHost {
                        raw: target.clone(),
                        resolved_ip: ip.to_string(),
                        resolution: Resolution::Dns,
                    }
                }
                None => unresolved(target, "no addresses returned"),
            },
            Err(e) => unresolved(target, &e.to_string()),
        }
    }
}

/// First IPv4 address, else the first address at all
fn pick_address(addrs: &[IpAddr]) -> Option<IpAddr> {
    addrs
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
}

fn unresolved(target: &HostSpec, reason: &str) -> TargetHost {
    warn!(
        host = %target.host(),
        reason = %reason,
        "could not resolve target, routing on the hostname"
    );
    TargetHost {
        raw: target.clone(),
        resolved_ip: target.host().to_string(),
        resolution: Resolution::Unresolved,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    struct StaticLookup(HashMap<&'static str, Vec<IpAddr>>);

    #[async_trait]
    impl HostLookup for StaticLookup {
        async fn lookup(&self, host: &str) -> std::io::Result<Vec<IpAddr>> {
            self.0.get(host).cloned().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "unknown host")
            })
        }
    }

    fn resolver() -> AddressResolver<StaticLookup> {
        let mut map = HashMap::new();
        map.insert(
            "db01.internal",
            vec!["2001:db8::5".parse().unwrap(), "10.4.0.5".parse().unwrap()],
        );
        map.insert("v6only.internal", vec!["2001:db8::6".parse().unwrap()]);
        map.insert("empty.internal", Vec::new());
        AddressResolver::with_lookup(StaticLookup(map))
    }

    #[tokio::test]
    async fn test_literal_ip_skips_lookup() {
        let target = HostSpec::parse("admin@10.1.2.3:2222").unwrap();
        let resolved = resolver().resolve(&target).await;

        assert_eq!(resolved.resolved_ip(), "10.1.2.3");
        assert_eq!(resolved.resolution(), Resolution::Literal);
        assert_eq!(resolved.raw().as_str(), "admin@10.1.2.3:2222");
    }

    #[tokio::test]
    async fn test_dns_prefers_ipv4() {
        let target = HostSpec::parse("ops@db01.internal").unwrap();
        let resolved = resolver().resolve(&target).await;

        assert_eq!(resolved.resolved_ip(), "10.4.0.5");
        assert_eq!(resolved.resolution(), Resolution::Dns);

        let v6 = resolver()
            .resolve(&HostSpec::parse("v6only.internal").unwrap())
            .await;
        assert_eq!(v6.resolved_ip(), "2001:db8::6");
    }

    #[tokio::test]
    async fn test_failed_lookup_degrades_to_hostname() {
        for spec in ["ops@nowhere.invalid", "empty.internal"] {
            let target = HostSpec::parse(spec).unwrap();
            let resolved = resolver().resolve(&target).await;

            assert_eq!(resolved.resolved_ip(), target.host());
            assert_eq!(resolved.resolution(), Resolution::Unresolved);
            assert!(resolved.ip().is_none());
        }
    }
}
