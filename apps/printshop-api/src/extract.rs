//! # Request Extractors
//!
//! - [`ApiJson`], [`ApiPath`], [`ApiQuery`]: axum's extractors with their
//!   rejections turned into [`ApiError`] bodies
//! - [`Actor`]: the authenticated user plus the request metadata the audit
//!   log wants
//!
//! ## Client Address
//! ```text
//! X-Forwarded-For: 203.0.113.7, 10.0.0.2   →  "203.0.113.7"
//! (no header)                              →  socket peer address
//! (no header, no ConnectInfo)              →  None
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequest, FromRequestParts};
use axum::http::header::USER_AGENT;
use axum::http::request::Parts;
use printshop_core::{AuditEvent, RequestContext};

use crate::auth::AuthUser;
use crate::error::ApiError;

/// JSON body with `{ code, message }` rejections.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Path parameters with `{ code, message }` rejections.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Query string with `{ code, message }` rejections.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Client address and user agent of the current request.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta(pub RequestContext);

impl RequestMeta {
    fn from_parts(parts: &Parts) -> Self {
        let forwarded_for = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok());
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());
        let user_agent = parts.headers.get(USER_AGENT).and_then(|v| v.to_str().ok());

        RequestMeta(RequestContext::new(forwarded_for, peer.as_deref(), user_agent))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestMeta {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestMeta::from_parts(parts))
    }
}

/// Who is changing something, and from where.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user: AuthUser,
    pub context: RequestContext,
}

impl Actor {
    /// An actor outside of any HTTP request, e.g. a user registering.
    pub fn new(user: AuthUser, context: RequestContext) -> Self {
        Actor { user, context }
    }

    /// Attaches the username and request metadata to an audit event.
    pub fn stamp(&self, event: AuditEvent) -> AuditEvent {
        event
            .actor(Some(self.user.username.clone()))
            .context(self.context.clone())
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        let RequestMeta(context) = RequestMeta::from_parts(parts);
        Ok(Actor { user, context })
    }
}
