//! Rate limiting middleware using governor and `tower_governor`.
//!
//! - `auth_rate_limiter`: Strict limits for the admin login (~10/min)
//! - `api_rate_limiter`: Relaxed limits for public write endpoints (~100/min)

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Proxy headers consulted for the client IP, in order.
const CLIENT_IP_HEADERS: &[&str] = &["cf-connecting-ip", "x-real-ip", "fly-client-ip"];

/// Key extractor that prefers proxy headers, then the socket peer address.
///
/// Requests with neither share one bucket keyed on the unspecified address.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl ClientIpKeyExtractor {
    fn header_ip<T>(req: &Request<T>) -> Option<IpAddr> {
        let headers = req.headers();

        let single = CLIENT_IP_HEADERS.iter().find_map(|name| {
            headers
                .get(*name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        });
        if single.is_some() {
            return single;
        }

        // First hop of X-Forwarded-For
        headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    }
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let ip = Self::header_ip(req)
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        Ok(ip)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

fn limiter(replenish_secs: u64, burst: u32) -> Option<RateLimiterLayer> {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(replenish_secs)
        .burst_size(burst)
        .finish();

    if config.is_none() {
        tracing::warn!(replenish_secs, burst, "Rejected rate limiter configuration");
    }
    config.map(|config| GovernorLayer::new(Arc::new(config)))
}

/// Rate limiter for the admin login: 1 request every 6 seconds, burst of 5.
#[must_use]
pub fn auth_rate_limiter() -> Option<RateLimiterLayer> {
    limiter(6, 5)
}

/// Rate limiter for public writes: 1 request per second, burst of 50.
#[must_use]
pub fn api_rate_limiter() -> Option<RateLimiterLayer> {
    limiter(1, 50)
}
