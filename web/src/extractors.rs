//! Custom Axum extractors.
//!
//! - `ClientIp`: caller address, used as the login throttle origin
//! - `UserAgent`: `User-Agent` header for audit logs
//! - `Authenticated`: the logged-in identity, or `401`
//! - `CsrfToken`: the session's anti-forgery token (issued on first use)
//!
//! [`SessionHandle`](crate::session::SessionHandle) is itself an extractor.
//!
//! # Examples
//!
//! ```ignore
//! async fn handler(
//!     Authenticated(identity): Authenticated,
//!     CsrfToken(token): CsrfToken,
//!     client_ip: ClientIp,
//! ) -> Json<Page> {
//!     tracing::info!(identity = %identity.identity, client_ip = %client_ip.0, "Rendering page");
//!     Json(Page { token })
//! }
//! ```

use crate::error::AppError;
use crate::session::SessionHandle;
use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use sessionguard_auth::SessionIdentity;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Request extension enabling `X-Forwarded-For` / `X-Real-IP`.
///
/// Only install this behind a reverse proxy that overwrites those headers;
/// otherwise callers could pick their own throttle origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustProxy(pub bool);

/// Client IP address.
///
/// # Priority
///
/// 1. `X-Forwarded-For` (first IP), only with [`TrustProxy`]`(true)`
/// 2. `X-Real-IP`, only with [`TrustProxy`]`(true)`
/// 3. Connection peer address
/// 4. `127.0.0.1` when the server runs without connect info (tests)
#[derive(Debug, Clone, Copy)]
pub struct ClientIp(pub IpAddr);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let trust_proxy = parts
            .extensions
            .get::<TrustProxy>()
            .is_some_and(|trust| trust.0);
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0.ip());

        Ok(Self(extract_client_ip(&parts.headers, peer, trust_proxy)))
    }
}

/// Extract client IP from headers or connection info.
fn extract_client_ip(headers: &HeaderMap, peer: Option<IpAddr>, trust_proxy: bool) -> IpAddr {
    if trust_proxy {
        let forwarded = headers
            .get("X-Forwarded-For")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .and_then(|first| first.trim().parse::<IpAddr>().ok());
        if let Some(ip) = forwarded {
            return ip;
        }

        let real_ip = headers
            .get("X-Real-IP")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<IpAddr>().ok());
        if let Some(ip) = real_ip {
            return ip;
        }
    }

    peer.unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

/// User-Agent header.
///
/// Extracts the `User-Agent` header, or returns "Unknown" if not present.
#[derive(Debug, Clone)]
pub struct UserAgent(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for UserAgent
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .headers
            .get("User-Agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("Unknown")
            .to_string();

        Ok(Self(user_agent))
    }
}

/// The logged-in caller.
///
/// Rejects with `401` when the session has no identity.
#[derive(Debug, Clone)]
pub struct Authenticated(pub SessionIdentity);

#[async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = SessionHandle::from_request_parts(parts, state).await?;
        session
            .identity()
            .map(Self)
            .ok_or_else(|| AppError::unauthorized("Authentication required"))
    }
}

/// The session's CSRF token, issued if the session has none yet.
#[derive(Debug, Clone)]
pub struct CsrfToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for CsrfToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = SessionHandle::from_request_parts(parts, state).await?;
        Ok(Self(session.csrf_token()))
    }
}
