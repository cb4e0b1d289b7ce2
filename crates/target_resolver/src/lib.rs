//! Target Resolver - network specification expansion and DNS resolution
//!
//! Turns a target string into addresses. Supported token forms:
//! - single IPv4 address: "1.2.3.4"
//! - range: "192.168.1.1-192.168.1.10" (or the short form "192.168.1.1-10")
//! - CIDR: "192.168.1.0/24"
//! - hostname: "cam.example.com" (only through [`TargetResolver::resolve`])
//!
//! Expansion is lazy: a [`TargetSpec`] yields its addresses on demand, in ascending
//! numeric order, and can be iterated any number of times.

use camscout_common::{ScanError, ScanResult};
use ipnet::Ipv4Net;
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use tracing::debug;

/// Largest number of addresses a single scan may enumerate (a /16).
pub const MAX_TARGETS: u64 = 1 << 16;

/// Environment switch that lifts [`MAX_TARGETS`].
pub const ALLOW_LARGE_ENV: &str = "CAMSCOUT_ALLOW_LARGE_SCAN";

/// Parsed network specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSpec {
    Single(Ipv4Addr),
    Range { start: Ipv4Addr, end: Ipv4Addr },
    Cidr(Ipv4Net),
}

impl TargetSpec {
    /// Parse a single specification using the default safety ceiling.
    pub fn parse(spec: &str) -> ScanResult<Self> {
        Self::parse_with_limit(spec, default_limit())
    }

    /// Parse a single specification, rejecting anything that would enumerate more
    /// than `limit` addresses.
    pub fn parse_with_limit(spec: &str, limit: u64) -> ScanResult<Self> {
        let t = spec.trim();
        if t.is_empty() {
            return Err(ScanError::invalid("empty target specification"));
        }

        let parsed = if t.contains('/') {
            let net: Ipv4Net = t
                .parse()
                .map_err(|_| ScanError::invalid(format!("invalid CIDR block: {t}")))?;
            TargetSpec::Cidr(net.trunc())
        } else if let Some((a, b)) = t.split_once('-') {
            parse_range(a.trim(), b.trim())?
        } else {
            let ip: Ipv4Addr = t
                .parse()
                .map_err(|_| ScanError::invalid(format!("not an IPv4 address, range or CIDR: {t}")))?;
            TargetSpec::Single(ip)
        };

        let count = parsed.len();
        if count > limit {
            return Err(ScanError::invalid(format!(
                "{t} expands to {count} addresses which exceeds the allowed limit of {limit}. \
                 Set {ALLOW_LARGE_ENV}=1 to override."
            )));
        }
        Ok(parsed)
    }

    /// Parse a comma-separated list; the ceiling applies to the combined count.
    pub fn parse_list(specs: &str) -> ScanResult<Vec<Self>> {
        let limit = default_limit();
        let mut out = Vec::new();
        let mut total = 0u64;
        for token in specs.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let spec = Self::parse_with_limit(token, limit)?;
            total += spec.len();
            if total > limit {
                return Err(ScanError::invalid(format!(
                    "target list expands to more than {limit} addresses"
                )));
            }
            out.push(spec);
        }
        if out.is_empty() {
            return Err(ScanError::invalid("no targets specified"));
        }
        Ok(out)
    }

    /// Inclusive numeric bounds of the addresses this spec yields.
    fn bounds(&self) -> (u32, u32) {
        match *self {
            TargetSpec::Single(ip) => (u32::from(ip), u32::from(ip)),
            TargetSpec::Range { start, end } => (u32::from(start), u32::from(end)),
            TargetSpec::Cidr(net) => {
                let first = u32::from(net.network());
                let last = u32::from(net.broadcast());
                // network and broadcast are not hosts, except in /31 and /32
                if net.prefix_len() >= 31 {
                    (first, last)
                } else {
                    (first + 1, last - 1)
                }
            }
        }
    }

    /// Exact number of addresses this spec yields.
    #[must_use]
    pub fn len(&self) -> u64 {
        let (first, last) = self.bounds();
        u64::from(last) - u64::from(first) + 1
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Lazy ascending sequence of the addresses; each call starts from the beginning.
    #[must_use]
    pub fn addresses(&self) -> AddressIter {
        let (first, last) = self.bounds();
        AddressIter {
            next: u64::from(first),
            last: u64::from(last),
        }
    }
}

impl std::fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetSpec::Single(ip) => write!(f, "{ip}"),
            TargetSpec::Range { start, end } => write!(f, "{start}-{end}"),
            TargetSpec::Cidr(net) => write!(f, "{net}"),
        }
    }
}

/// Iterator over a contiguous block of IPv4 addresses.
#[derive(Debug, Clone)]
pub struct AddressIter {
    next: u64,
    last: u64,
}

impl Iterator for AddressIter {
    type Item = IpAddr;

    fn next(&mut self) -> Option<IpAddr> {
        if self.next > self.last {
            return None;
        }
        let ip = Ipv4Addr::from(self.next as u32);
        self.next += 1;
        Some(IpAddr::V4(ip))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = (self.last + 1).saturating_sub(self.next) as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for AddressIter {}

fn parse_range(a: &str, b: &str) -> ScanResult<TargetSpec> {
    let start: Ipv4Addr = a
        .parse()
        .map_err(|_| ScanError::invalid(format!("invalid range start: {a}")))?;

    // "10.0.0.1-20" shares the first three octets with the start
    let end: Ipv4Addr = match b.parse::<u8>() {
        Ok(last) => {
            let o = start.octets();
            Ipv4Addr::new(o[0], o[1], o[2], last)
        }
        Err(_) => b
            .parse()
            .map_err(|_| ScanError::invalid(format!("invalid range end: {b}")))?,
    };

    if u32::from(start) > u32::from(end) {
        return Err(ScanError::invalid(format!("invalid range {a}-{b}: start > end")));
    }
    Ok(TargetSpec::Range { start, end })
}

fn default_limit() -> u64 {
    let allow_large = std::env::var(ALLOW_LARGE_ENV)
        .map(|v| v == "1")
        .unwrap_or(false);
    if allow_large {
        u64::from(u32::MAX) + 1
    } else {
        MAX_TARGETS
    }
}

fn looks_like_hostname(t: &str) -> bool {
    t.chars().any(|c| c.is_ascii_alphabetic())
        && t.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}

pub struct TargetResolver;

impl TargetResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a comma-separated target string into unique IPv4 addresses.
    ///
    /// Specs expand lazily into the result; hostnames are resolved inside
    /// `tokio::task::spawn_blocking` so the runtime is never blocked on DNS.
    pub async fn resolve(targets: &str) -> ScanResult<Vec<IpAddr>> {
        if targets.trim().is_empty() {
            return Err(ScanError::invalid("no targets specified"));
        }

        let limit = default_limit();
        let mut seen = HashSet::new();
        let mut ips: Vec<IpAddr> = Vec::new();
        let mut hostnames: Vec<String> = Vec::new();

        for token in targets.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match TargetSpec::parse_with_limit(token, limit) {
                Ok(spec) => {
                    for ip in spec.addresses() {
                        if seen.insert(ip) {
                            ips.push(ip);
                        }
                    }
                    if ips.len() as u64 > limit {
                        return Err(ScanError::invalid(format!(
                            "targets expand to more than {limit} addresses"
                        )));
                    }
                }
                Err(e) if looks_like_hostname(token) => {
                    debug!("{} is not a network spec ({}), resolving as hostname", token, e);
                    hostnames.push(token.to_string());
                }
                Err(e) => return Err(e),
            }
        }

        if !hostnames.is_empty() {
            let resolved: Vec<Vec<IpAddr>> = tokio::task::spawn_blocking(move || {
                hostnames
                    .into_iter()
                    .map(|h| match (h.as_str(), 0).to_socket_addrs() {
                        Ok(addrs) => addrs
                            .map(|a| a.ip())
                            .filter(IpAddr::is_ipv4)
                            .collect::<Vec<IpAddr>>(),
                        Err(e) => {
                            debug!("DNS lookup for {} failed: {}", h, e);
                            Vec::new()
                        }
                    })
                    .collect()
            })
            .await
            .map_err(|e| ScanError::invalid(format!("blocking DNS resolution failed: {e}")))?;

            for ip in resolved.into_iter().flatten() {
                if seen.insert(ip) {
                    ips.push(ip);
                }
            }
        }

        if ips.is_empty() {
            return Err(ScanError::invalid("no valid IPv4 addresses found in targets"));
        }
        Ok(ips)
    }
}

impl Default for TargetResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Best-effort /24 around the primary local IPv4 address.
///
/// Connecting a UDP socket only selects a route; no packet is sent. Falls back to
/// `192.168.1.0/24` when no route is available.
pub fn local_network() -> TargetSpec {
    let fallback = TargetSpec::Cidr(Ipv4Net::new(Ipv4Addr::new(192, 168, 1, 0), 24).expect("valid prefix"));
    match local_ipv4() {
        Some(ip) => Ipv4Net::new(ip, 24)
            .map(|n| TargetSpec::Cidr(n.trunc()))
            .unwrap_or(fallback),
        None => fallback,
    }
}

/// Primary local IPv4 address, if a default route exists.
pub fn local_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    match socket.local_addr().ok()? {
        SocketAddr::V4(v4) if !v4.ip().is_unspecified() => Some(*v4.ip()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v4(a: u8, b: u8, c: u8, d: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(a, b, c, d))
    }

    #[test]
    fn single_ip() {
        let spec = TargetSpec::parse("8.8.8.8").unwrap();
        assert_eq!(spec.addresses().collect::<Vec<_>>(), vec![v4(8, 8, 8, 8)]);
    }

    #[test]
    fn cidr_counts_match_prefix() {
        for (prefix, expected) in [(32u8, 1u64), (31, 2), (30, 2), (29, 6), (24, 254), (20, 4094)] {
            let spec = TargetSpec::parse(&format!("10.1.0.0/{prefix}")).unwrap();
            let addrs: Vec<IpAddr> = spec.addresses().collect();
            assert_eq!(addrs.len() as u64, expected, "/{prefix}");
            assert_eq!(spec.len(), expected);
            assert!(addrs.windows(2).all(|w| w[0] < w[1]), "ascending, no duplicates");
        }
    }

    #[test]
    fn cidr_host_bits_are_truncated() {
        let spec = TargetSpec::parse("192.168.1.77/30").unwrap();
        let addrs: Vec<IpAddr> = spec.addresses().collect();
        assert_eq!(addrs, vec![v4(192, 168, 1, 77), v4(192, 168, 1, 78)]);
    }

    #[test]
    fn sequence_is_restartable() {
        let spec = TargetSpec::parse("192.168.1.0/29").unwrap();
        let first: Vec<_> = spec.addresses().collect();
        let second: Vec<_> = spec.addresses().collect();
        assert_eq!(first, second);
        assert_eq!(spec.addresses().len(), 6);
    }

    #[test]
    fn ranges() {
        let spec = TargetSpec::parse("192.168.1.1-192.168.1.3").unwrap();
        assert_eq!(spec.len(), 3);
        let spec = TargetSpec::parse("192.168.1.250 - 10").err();
        assert!(spec.is_some(), "start > end is rejected");
        let spec = TargetSpec::parse("192.168.1.10-12").unwrap();
        assert_eq!(
            spec.addresses().collect::<Vec<_>>(),
            vec![v4(192, 168, 1, 10), v4(192, 168, 1, 11), v4(192, 168, 1, 12)]
        );
    }

    #[test]
    fn garbage_is_invalid_specification() {
        for bad in ["", "abc", "10.0.0.0/33", "10.0.0.1-", "1.2.3", "::1"] {
            let err = TargetSpec::parse(bad).unwrap_err();
            assert!(matches!(err, ScanError::InvalidSpecification(_)), "{bad}");
        }
    }

    #[test]
    fn large_cidr_rejected() {
        let r = TargetSpec::parse_with_limit("10.0.0.0/8", MAX_TARGETS);
        assert!(r.is_err());
        let r = TargetSpec::parse_with_limit("10.0.0.0/16", MAX_TARGETS);
        assert!(r.is_ok());
    }

    #[test]
    fn large_cidr_allowed_with_higher_limit() {
        let spec = TargetSpec::parse_with_limit("10.0.0.0/8", 1 << 24).unwrap();
        assert_eq!(spec.len(), (1 << 24) - 2);
        // still lazy: only the first few are materialized
        assert_eq!(spec.addresses().take(2).collect::<Vec<_>>(), vec![v4(10, 0, 0, 1), v4(10, 0, 0, 2)]);
    }

    #[test]
    fn parse_list_sums_specs() {
        let specs = TargetSpec::parse_list("10.0.0.1, 10.0.1.0/30,10.0.2.1-10.0.2.4").unwrap();
        assert_eq!(specs.iter().map(TargetSpec::len).sum::<u64>(), 1 + 2 + 4);
        assert!(TargetSpec::parse_list(" , ").is_err());
    }

    #[tokio::test]
    async fn test_resolve_dedupes_and_keeps_order() {
        let ips = TargetResolver::resolve("192.168.1.2,192.168.1.1-192.168.1.3").await.unwrap();
        assert_eq!(ips, vec![v4(192, 168, 1, 2), v4(192, 168, 1, 1), v4(192, 168, 1, 3)]);
    }

    #[tokio::test]
    async fn test_resolve_localhost_name() {
        let ips = TargetResolver::resolve("localhost").await.unwrap();
        assert!(ips.iter().all(IpAddr::is_ipv4));
        assert!(!ips.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_rejects_malformed() {
        assert!(TargetResolver::resolve("").await.is_err());
        assert!(TargetResolver::resolve("10.0.0.0/40").await.is_err());
    }

    #[test]
    fn local_network_is_a_slash_24() {
        match local_network() {
            TargetSpec::Cidr(net) => assert_eq!(net.prefix_len(), 24),
            other => panic!("unexpected {other:?}"),
        }
    }
}
