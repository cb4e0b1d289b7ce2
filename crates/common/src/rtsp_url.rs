//! RTSP URL helpers: validation, parsing and generation.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use url::Url;

use crate::error::{ScanError, ScanResult};

/// Port assumed when a URL does not carry one.
pub const DEFAULT_RTSP_PORT: u16 = 554;

static DOMAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)*[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?$",
    )
    .expect("static domain regex")
});

/// Components of an `rtsp://` URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtspUrl {
    pub hostname: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Path plus query, always starting with `/`.
    pub path: String,
}

/// Check that `url` is a usable RTSP URL; `Err` carries a human-readable reason.
pub fn validate_rtsp_url(url: &str) -> Result<(), String> {
    let url = url.trim();
    if url.is_empty() {
        return Err("URL is empty".to_string());
    }
    if !url.starts_with("rtsp://") {
        return Err("URL must start with 'rtsp://'".to_string());
    }

    let parsed = Url::parse(url).map_err(|e| format!("Invalid URL format: {e}"))?;
    let host = host_of(&parsed).ok_or_else(|| "Missing hostname".to_string())?;
    if !is_valid_hostname(&host) {
        return Err(format!("Invalid hostname: {host}"));
    }
    if parsed.port() == Some(0) {
        return Err("Invalid port: 0".to_string());
    }
    Ok(())
}

/// Split a validated RTSP URL into its parts.
pub fn parse_rtsp_url(url: &str) -> ScanResult<RtspUrl> {
    validate_rtsp_url(url).map_err(ScanError::InvalidSpecification)?;
    let parsed = Url::parse(url.trim()).map_err(|e| ScanError::invalid(e.to_string()))?;
    let hostname = host_of(&parsed).ok_or_else(|| ScanError::invalid("Missing hostname"))?;

    let mut path = match parsed.path() {
        "" => "/".to_string(),
        p => p.to_string(),
    };
    if let Some(q) = parsed.query() {
        path.push('?');
        path.push_str(q);
    }

    Ok(RtspUrl {
        hostname,
        port: parsed.port().unwrap_or(DEFAULT_RTSP_PORT),
        username: Some(parsed.username())
            .filter(|u| !u.is_empty())
            .map(str::to_string),
        password: parsed.password().map(str::to_string),
        path,
    })
}

/// Build `rtsp://[user[:pass]@]host:port/path`.
///
/// The userinfo segment is omitted entirely when both username and password are empty.
pub fn generate_rtsp_url(host: &str, port: u16, path: &str, username: &str, password: &str) -> String {
    let host = match host.parse::<IpAddr>() {
        Ok(IpAddr::V6(v6)) => format!("[{v6}]"),
        _ => host.to_string(),
    };
    let slash = if path.starts_with('/') { "" } else { "/" };
    let auth = match (username.is_empty(), password.is_empty()) {
        (true, true) => String::new(),
        (false, true) => format!("{username}@"),
        _ => format!("{username}:{password}@"),
    };
    format!("rtsp://{auth}{host}:{port}{slash}{path}")
}

fn host_of(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    if host.is_empty() {
        return None;
    }
    Some(host.trim_start_matches('[').trim_end_matches(']').to_string())
}

fn is_valid_hostname(host: &str) -> bool {
    host.parse::<IpAddr>().is_ok() || DOMAIN_RE.is_match(host)
}
