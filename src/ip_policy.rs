//! IP Policy (C6, §4.6), grounded on the original `ip_policy_util`: client
//! IP resolution through trusted proxies, CIDR containment for v4/v6, and
//! the localhost bypass.

use crate::error::{GatewayError, Result};
use crate::models::IpMode;
use std::net::IpAddr;

/// Header names checked, in order, once the direct peer is a trusted proxy.
const FORWARD_HEADERS: &[&str] = &["x-forwarded-for", "x-real-ip", "cf-connecting-ip"];

pub struct IpPolicy {
    pub trust_xff: bool,
    pub trusted_proxies: Vec<IpNet>,
    pub allow_localhost_bypass: bool,
}

impl IpPolicy {
    /// Resolve the effective client IP from the direct peer and request
    /// headers. `header_lookup` is case-insensitive; callers pass a closure
    /// over their header map so this module stays transport-agnostic.
    pub fn resolve_client_ip<'a>(
        &self,
        peer: IpAddr,
        header_lookup: impl Fn(&str) -> Option<&'a str>,
    ) -> IpAddr {
        if !self.trust_xff {
            return peer;
        }
        let proxy_trusted = self.trusted_proxies.is_empty() || self.trusted_proxies.iter().any(|n| n.contains(peer));
        if !proxy_trusted {
            return peer;
        }
        for header in FORWARD_HEADERS {
            if let Some(value) = header_lookup(header) {
                if let Some(first) = value.split(',').next() {
                    if let Ok(ip) = first.trim().parse::<IpAddr>() {
                        return ip;
                    }
                }
            }
        }
        peer
    }

    /// True when the bypass should short-circuit all further IP checks:
    /// configured on, peer is loopback, and no forwarding headers are
    /// present (a forwarded request is never "direct").
    pub fn localhost_bypass_applies<'a>(&self, peer: IpAddr, header_lookup: impl Fn(&str) -> Option<&'a str>) -> bool {
        if !self.allow_localhost_bypass || !peer.is_loopback() {
            return false;
        }
        let forwarding_headers = ["forwarded", "x-forwarded-for", "x-real-ip", "cf-connecting-ip"];
        !forwarding_headers.iter().any(|h| header_lookup(h).is_some())
    }

    /// Denylist wins regardless of mode; in `Whitelist` mode an empty or
    /// non-matching allowlist also denies.
    pub fn check(&self, mode: IpMode, whitelist: &[IpNet], blacklist: &[IpNet], ip: IpAddr) -> Result<()> {
        if blacklist.iter().any(|n| n.contains(ip)) {
            return Err(GatewayError::IpDenied("SEC010"));
        }
        if mode == IpMode::Whitelist && !whitelist.iter().any(|n| n.contains(ip)) {
            return Err(GatewayError::IpDenied("SEC010"));
        }
        Ok(())
    }
}

/// A parsed single IP or CIDR network, v4 or v6.
#[derive(Debug, Clone, Copy)]
pub struct IpNet {
    addr: IpAddr,
    prefix_len: u8,
}

impl IpNet {
    pub fn parse(spec: &str) -> Option<Self> {
        match spec.split_once('/') {
            Some((addr, len)) => {
                let addr: IpAddr = addr.trim().parse().ok()?;
                let prefix_len: u8 = len.trim().parse().ok()?;
                let max = if addr.is_ipv4() { 32 } else { 128 };
                if prefix_len > max {
                    return None;
                }
                Some(Self { addr, prefix_len })
            }
            None => {
                let addr: IpAddr = spec.trim().parse().ok()?;
                let prefix_len = if addr.is_ipv4() { 32 } else { 128 };
                Some(Self { addr, prefix_len })
            }
        }
    }

    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.addr, ip) {
            (IpAddr::V4(net), IpAddr::V4(candidate)) => {
                let mask = u32::MAX.checked_shl(32 - self.prefix_len as u32).unwrap_or(0);
                (u32::from(net) & mask) == (u32::from(candidate) & mask)
            }
            (IpAddr::V6(net), IpAddr::V6(candidate)) => {
                let mask = u128::MAX.checked_shl(128 - self.prefix_len as u32).unwrap_or(0);
                (u128::from(net) & mask) == (u128::from(candidate) & mask)
            }
            _ => false,
        }
    }
}

pub fn parse_all(specs: &[String]) -> Vec<IpNet> {
    specs.iter().filter_map(|s| IpNet::parse(s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cidr_v4_containment() {
        let net = IpNet::parse("10.0.0.0/8").unwrap();
        assert!(net.contains("10.1.2.3".parse().unwrap()));
        assert!(!net.contains("11.0.0.1".parse().unwrap()));
    }

    #[test]
    fn cidr_v6_containment() {
        let net = IpNet::parse("2001:db8::/32").unwrap();
        assert!(net.contains("2001:db8::1".parse().unwrap()));
        assert!(!net.contains("2001:db9::1".parse().unwrap()));
    }

    #[test]
    fn denylist_wins_even_in_allow_all_mode() {
        let policy = IpPolicy { trust_xff: false, trusted_proxies: vec![], allow_localhost_bypass: false };
        let blacklist = parse_all(&["10.0.0.5".to_string()]);
        assert!(policy.check(IpMode::AllowAll, &[], &blacklist, "10.0.0.5".parse().unwrap()).is_err());
    }

    #[test]
    fn empty_whitelist_denies_everything_in_whitelist_mode() {
        let policy = IpPolicy { trust_xff: false, trusted_proxies: vec![], allow_localhost_bypass: false };
        assert!(policy.check(IpMode::Whitelist, &[], &[], "1.2.3.4".parse().unwrap()).is_err());
    }

    #[test]
    fn untrusted_proxy_peer_is_used_verbatim() {
        let policy = IpPolicy {
            trust_xff: true,
            trusted_proxies: parse_all(&["10.0.0.1".to_string()]),
            allow_localhost_bypass: false,
        };
        let peer: IpAddr = "10.0.0.2".parse().unwrap();
        let resolved = policy.resolve_client_ip(peer, |_| Some("1.2.3.4"));
        assert_eq!(resolved, peer);
    }

    #[test]
    fn trusted_proxy_peer_takes_left_most_forwarded_for() {
        let policy = IpPolicy {
            trust_xff: true,
            trusted_proxies: parse_all(&["10.0.0.1".to_string()]),
            allow_localhost_bypass: false,
        };
        let peer: IpAddr = "10.0.0.1".parse().unwrap();
        let resolved = policy.resolve_client_ip(peer, |h| if h == "x-forwarded-for" { Some("1.2.3.4, 10.0.0.1") } else { None });
        assert_eq!(resolved, "1.2.3.4".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn localhost_bypass_requires_no_forwarding_headers() {
        let policy = IpPolicy { trust_xff: false, trusted_proxies: vec![], allow_localhost_bypass: true };
        let peer: IpAddr = "127.0.0.1".parse().unwrap();
        assert!(policy.localhost_bypass_applies(peer, |_| None));
        assert!(!policy.localhost_bypass_applies(peer, |h| if h == "x-forwarded-for" { Some("1.2.3.4") } else { None }));
    }
}
