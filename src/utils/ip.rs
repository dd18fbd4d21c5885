//! 客户端 IP 解析
//!
//! 只有来自可信代理（或未配置代理时的私有地址）的连接才采信 X-Forwarded-For，
//! 公网直连时始终使用对端地址，防止伪造。

use std::net::{IpAddr, SocketAddr};

use actix_web::HttpRequest;
use actix_web::http::header::HeaderMap;
use tracing::{debug, warn};

/// 检查 IP 是否为私有地址或 localhost
pub fn is_private_or_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback(),
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || (v6.segments()[0] & 0xfe00) == 0xfc00 // fc00::/7
                || (v6.segments()[0] & 0xffc0) == 0xfe80 // fe80::/10
        }
    }
}

/// 一条可信代理规则：单个地址或 CIDR 网段
#[derive(Debug, Clone, PartialEq, Eq)]
enum ProxyRule {
    Addr(IpAddr),
    Network { base: IpAddr, prefix: u8 },
}

impl ProxyRule {
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match raw.split_once('/') {
            Some((base, prefix)) => {
                let base: IpAddr = base.parse().ok()?;
                let prefix: u8 = prefix.parse().ok()?;
                let max = if base.is_ipv4() { 32 } else { 128 };
                (prefix <= max).then_some(ProxyRule::Network { base, prefix })
            }
            None => raw.parse().ok().map(ProxyRule::Addr),
        }
    }

    fn matches(&self, ip: &IpAddr) -> bool {
        match self {
            ProxyRule::Addr(addr) => addr == ip,
            ProxyRule::Network { base, prefix } => match (ip, base) {
                (IpAddr::V4(ip), IpAddr::V4(net)) => {
                    let mask = u32::MAX.checked_shl(32 - *prefix as u32).unwrap_or(0);
                    (u32::from(*ip) & mask) == (u32::from(*net) & mask)
                }
                (IpAddr::V6(ip), IpAddr::V6(net)) => {
                    let mask = u128::MAX.checked_shl(128 - *prefix as u32).unwrap_or(0);
                    (u128::from(*ip) & mask) == (u128::from(*net) & mask)
                }
                _ => false,
            },
        }
    }
}

/// 预解析可信代理列表的客户端 IP 解析器
#[derive(Debug, Clone, Default)]
pub struct ClientIpResolver {
    rules: Vec<ProxyRule>,
}

impl ClientIpResolver {
    pub fn new(trusted_proxies: &[String]) -> Self {
        let rules = trusted_proxies
            .iter()
            .filter_map(|raw| {
                let rule = ProxyRule::parse(raw);
                if rule.is_none() {
                    warn!("Ignoring invalid trusted proxy entry '{}'", raw);
                }
                rule
            })
            .collect();
        Self { rules }
    }

    pub fn is_trusted_proxy(&self, ip: &IpAddr) -> bool {
        self.rules.iter().any(|rule| rule.matches(ip))
    }

    /// 根据对端地址与请求头得到真实客户端 IP
    ///
    /// 1. 显式配置了可信代理：对端命中才采信转发头
    /// 2. 未配置：对端为私有/本地地址时视为反向代理
    /// 3. 其他情况使用对端地址
    pub fn resolve(&self, peer: Option<&str>, headers: &HeaderMap) -> Option<String> {
        let peer = peer?;
        let Some(peer_ip) = parse_peer(peer) else {
            return Some(peer.to_string());
        };

        let proxied = if self.rules.is_empty() {
            is_private_or_local(&peer_ip)
        } else {
            self.is_trusted_proxy(&peer_ip)
        };

        if proxied && let Some(forwarded) = forwarded_ip(headers) {
            debug!("Using forwarded client IP {} (peer {})", forwarded, peer_ip);
            return Some(forwarded);
        }

        Some(peer_ip.to_string())
    }

    pub fn client_ip(&self, req: &HttpRequest) -> Option<String> {
        let conn_info = req.connection_info();
        self.resolve(conn_info.peer_addr(), req.headers())
    }
}

/// peer_addr 可能带端口
fn parse_peer(peer: &str) -> Option<IpAddr> {
    peer.parse::<SocketAddr>()
        .map(|addr| addr.ip())
        .or_else(|_| peer.parse::<IpAddr>())
        .ok()
}

/// X-Forwarded-For 取第一个（原始客户端），其次 X-Real-IP
fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .map(|s| s.trim().to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::{HeaderName, HeaderValue};

    fn headers_with(name: &'static str, value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
        headers
    }

    #[test]
    fn test_is_private_or_local() {
        assert!(is_private_or_local(&"10.0.0.1".parse().unwrap()));
        assert!(is_private_or_local(&"192.168.1.1".parse().unwrap()));
        assert!(is_private_or_local(&"::1".parse().unwrap()));
        assert!(is_private_or_local(&"fd00::1".parse().unwrap()));
        assert!(!is_private_or_local(&"8.8.8.8".parse().unwrap()));
        assert!(!is_private_or_local(
            &"2001:4860:4860::8888".parse().unwrap()
        ));
    }

    #[test]
    fn test_cidr_rules() {
        let resolver = ClientIpResolver::new(&[
            "192.168.1.0/24".to_string(),
            "2001:db8::/32".to_string(),
            "10.0.0.1".to_string(),
            "not-an-ip".to_string(),
        ]);
        assert!(resolver.is_trusted_proxy(&"192.168.1.77".parse().unwrap()));
        assert!(!resolver.is_trusted_proxy(&"192.168.2.1".parse().unwrap()));
        assert!(resolver.is_trusted_proxy(&"2001:db8::1".parse().unwrap()));
        assert!(resolver.is_trusted_proxy(&"10.0.0.1".parse().unwrap()));
        assert!(!resolver.is_trusted_proxy(&"10.0.0.2".parse().unwrap()));
    }

    #[test]
    fn test_public_peer_ignores_forwarded_header() {
        let resolver = ClientIpResolver::default();
        let headers = headers_with("x-forwarded-for", "1.2.3.4");
        assert_eq!(
            resolver.resolve(Some("8.8.8.8:5000"), &headers).as_deref(),
            Some("8.8.8.8")
        );
    }

    #[test]
    fn test_private_peer_uses_forwarded_header() {
        let resolver = ClientIpResolver::default();
        let headers = headers_with("x-forwarded-for", "1.2.3.4, 10.0.0.2");
        assert_eq!(
            resolver.resolve(Some("10.0.0.2:5000"), &headers).as_deref(),
            Some("1.2.3.4")
        );
    }

    #[test]
    fn test_explicit_proxy_list_is_strict() {
        let resolver = ClientIpResolver::new(&["172.16.0.1".to_string()]);
        let headers = headers_with("x-real-ip", "5.6.7.8");
        assert_eq!(
            resolver.resolve(Some("10.0.0.2"), &headers).as_deref(),
            Some("10.0.0.2")
        );
        assert_eq!(
            resolver.resolve(Some("172.16.0.1"), &headers).as_deref(),
            Some("5.6.7.8")
        );
    }
}
