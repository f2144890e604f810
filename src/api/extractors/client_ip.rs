use axum::{
    extract::{ConnectInfo, FromRequestParts, FromRef},
    http::request::Parts,
};
use crate::error::AppError;
use crate::state::AppState;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::warn;

/// Caller address: first `X-Forwarded-For` entry, then `X-Real-IP`, then the peer.
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts.headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        if let Some(forwarded) = header("x-forwarded-for")
            && let Some(first) = forwarded.split(',').next()
            && !first.trim().is_empty()
        {
            return Ok(ClientIp(first.trim().to_string()));
        }

        if let Some(real_ip) = header("x-real-ip") {
            return Ok(ClientIp(real_ip.to_string()));
        }

        let peer = parts.extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Ok(ClientIp(peer))
    }
}

/// Passes only while the caller's IP is within the per-minute quota.
pub struct RateLimited(pub String);

impl<S> FromRequestParts<S> for RateLimited
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Ok(ClientIp(ip)) = ClientIp::from_request_parts(parts, state).await;
        let app_state = <Arc<AppState> as FromRef<S>>::from_ref(state);

        if app_state.rate_limiter.check_key(&ip).is_err() {
            warn!(client_ip = %ip, "rate limit exceeded");
            return Err(AppError::TooManyRequests);
        }
        Ok(RateLimited(ip))
    }
}
