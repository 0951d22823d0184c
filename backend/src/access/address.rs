//! Canonical client address derivation.
//!
//! Candidate order: first entry of `X-Forwarded-For`, then `X-Real-IP`, then
//! the socket peer address. A header candidate is skipped when absent, blank
//! or the literal `unknown` (any case).

use std::net::{IpAddr, Ipv4Addr};

use axum::http::HeaderMap;

use crate::error::AddressError;

pub const FORWARDED_FOR: &str = "x-forwarded-for";
pub const REAL_IP: &str = "x-real-ip";

/// Derive the canonical client address from its three candidate sources.
///
/// IPv6 loopback becomes `127.0.0.1` and IPv4-mapped IPv6 addresses are
/// unwrapped to plain IPv4. The chosen candidate must be an IP literal.
pub fn normalize_client_ip(
    forwarded_for: Option<&str>,
    real_ip: Option<&str>,
    remote_addr: &str,
) -> Result<IpAddr, AddressError> {
    let candidate = forwarded_for
        .and_then(|list| usable(list.split(',').next()))
        .or_else(|| usable(real_ip))
        .unwrap_or_else(|| remote_addr.trim());

    canonicalize(candidate)
}

/// Same as [`normalize_client_ip`], reading the candidates from request headers.
pub fn client_ip_from_headers(
    headers: &HeaderMap,
    remote_addr: IpAddr,
) -> Result<IpAddr, AddressError> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    normalize_client_ip(header(FORWARDED_FOR), header(REAL_IP), &remote_addr.to_string())
}

fn usable(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("unknown"))
}

fn canonicalize(candidate: &str) -> Result<IpAddr, AddressError> {
    let ip: IpAddr = candidate
        .parse()
        .map_err(|_| AddressError::Unresolvable(candidate.to_string()))?;

    Ok(match ip {
        IpAddr::V6(v6) if v6.is_loopback() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(IpAddr::V6(v6)),
        v4 => v4,
    })
}
