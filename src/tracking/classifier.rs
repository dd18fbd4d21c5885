//! 访客分类：设备/浏览器/系统、bot 识别、可疑 referrer、访客指纹

use sha2::{Digest, Sha256};
use url::Url;
use woothee::parser::Parser;

use crate::storage::models::DeviceType;

/// 命中任一标记即视为 bot（小写比较）
const BOT_MARKERS: &[&str] = &[
    "bot",
    "crawler",
    "spider",
    "slurp",
    "curl/",
    "wget/",
    "python-requests",
    "python-urllib",
    "go-http-client",
    "headlesschrome",
    "phantomjs",
    "facebookexternalhit",
    "preview",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub device_type: DeviceType,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub is_bot: bool,
}

fn known(value: &str) -> Option<String> {
    (!value.is_empty() && value != "UNKNOWN").then(|| value.to_string())
}

pub fn classify_user_agent(user_agent: &str) -> ClientInfo {
    let lower = user_agent.to_ascii_lowercase();
    let parsed = Parser::new().parse(user_agent).unwrap_or_default();

    let is_tablet = lower.contains("ipad")
        || lower.contains("tablet")
        || (lower.contains("android") && !lower.contains("mobile"));
    let device_type = if is_tablet {
        DeviceType::Tablet
    } else if matches!(parsed.category, "smartphone" | "mobilephone") || lower.contains("mobile") {
        DeviceType::Mobile
    } else {
        DeviceType::Desktop
    };

    let is_bot = user_agent.trim().is_empty()
        || parsed.category == "crawler"
        || BOT_MARKERS.iter().any(|m| lower.contains(m));

    ClientInfo {
        device_type,
        browser: known(parsed.name),
        os: known(parsed.os),
        is_bot,
    }
}

/// 回环地址或指向自身 Host 的 referrer 视为可疑
pub fn is_suspicious_referrer(referrer: Option<&str>, host: Option<&str>) -> bool {
    let Some(referrer) = referrer.map(str::trim).filter(|r| !r.is_empty()) else {
        return false;
    };
    let Ok(url) = Url::parse(referrer) else {
        return false;
    };
    let Some(ref_host) = url.host_str() else {
        return false;
    };
    let ref_host = ref_host.trim_start_matches('[').trim_end_matches(']');

    if ref_host.eq_ignore_ascii_case("localhost")
        || ref_host == "0.0.0.0"
        || ref_host
            .parse::<std::net::IpAddr>()
            .is_ok_and(|ip| ip.is_loopback() || ip.is_unspecified())
    {
        return true;
    }

    host.map(|h| h.split(':').next().unwrap_or(h))
        .is_some_and(|h| h.eq_ignore_ascii_case(ref_host))
}

/// `sha256(ip|user_agent)` 的十六进制，不落原始 IP
pub fn visitor_fingerprint(ip: &str, user_agent: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ip.as_bytes());
    hasher.update(b"|");
    hasher.update(user_agent.as_bytes());
    hex::encode(hasher.finalize())
}
