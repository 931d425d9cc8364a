//! Voter identity extraction.
//!
//! A voter is identified by the IP address of the connection (the port is
//! dropped). Behind a trusted reverse proxy the first `X-Forwarded-For`
//! entry can be used instead.

use super::AppState;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use std::convert::Infallible;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Voter id used when no address is known at all
pub const UNKNOWN_VOTER: &str = "unknown";

/// Network-address-derived voter identity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VoterId(String);

impl VoterId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve the voter from the peer address and request headers.
    pub fn resolve(peer: Option<SocketAddr>, headers: &HeaderMap, trust_forwarded: bool) -> Self {
        if trust_forwarded {
            if let Some(ip) = forwarded_ip(headers) {
                return VoterId(ip.to_string());
            }
        }
        match peer {
            Some(addr) => VoterId(addr.ip().to_string()),
            None => VoterId(UNKNOWN_VOTER.to_string()),
        }
    }
}

impl fmt::Display for VoterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromRequestParts<AppState> for VoterId {
    type Rejection = Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let peer = peer_addr(parts);
        let voter = VoterId::resolve(peer, &parts.headers, state.trust_forwarded_for);
        async move { Ok(voter) }
    }
}

/// Peer address recorded by `into_make_service_with_connect_info`, if any.
fn peer_addr(parts: &Parts) -> Option<SocketAddr> {
    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0)
}

/// First parseable address in `X-Forwarded-For`.
fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let raw = headers.get("x-forwarded-for")?.to_str().ok()?;
    raw.split(',').next()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer(s: &str) -> Option<SocketAddr> {
        Some(s.parse().unwrap())
    }

    #[test]
    fn test_port_is_ignored() {
        let headers = HeaderMap::new();
        let a = VoterId::resolve(peer("10.0.0.5:41000"), &headers, false);
        let b = VoterId::resolve(peer("10.0.0.5:52000"), &headers, false);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "10.0.0.5");
    }

    #[test]
    fn test_missing_peer_is_unknown() {
        let voter = VoterId::resolve(None, &HeaderMap::new(), false);
        assert_eq!(voter.as_str(), UNKNOWN_VOTER);
    }

    #[test]
    fn test_forwarded_for_ignored_unless_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9"));

        let voter = VoterId::resolve(peer("127.0.0.1:9000"), &headers, false);
        assert_eq!(voter.as_str(), "127.0.0.1");
    }

    #[test]
    fn test_forwarded_for_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );

        let voter = VoterId::resolve(peer("127.0.0.1:9000"), &headers, true);
        assert_eq!(voter.as_str(), "203.0.113.9");
    }

    #[test]
    fn test_garbage_forwarded_for_falls_back_to_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("not-an-ip"));

        let voter = VoterId::resolve(peer("192.168.0.2:1234"), &headers, true);
        assert_eq!(voter.as_str(), "192.168.0.2");
    }
}
