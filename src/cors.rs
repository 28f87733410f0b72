//! CORS origin policy and request middleware.
//!
//! The relay routes carry hand-rolled CORS handling because the policy is
//! richer than a plain allow-list: allowed origins are echoed back, preflight
//! requests short-circuit, and a disallowed origin on a non-preflight request
//! is rejected outright.

use std::fmt;

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::AppState;

/// Parsed origin allow-list.
///
/// An empty or missing configuration, or a list containing `*`, allows any
/// origin.
#[derive(Debug, Clone)]
pub struct AllowedOrigins {
    origins: Vec<String>,
    allow_any: bool,
}

impl AllowedOrigins {
    /// Parse a comma-separated origin list.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let origins: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();

        if origins.is_empty() {
            return Self {
                origins: vec!["*".to_owned()],
                allow_any: true,
            };
        }

        let allow_any = origins.iter().any(|o| o == "*");
        Self { origins, allow_any }
    }

    /// Whether the policy allows every origin.
    #[must_use]
    pub fn allows_any(&self) -> bool {
        self.allow_any
    }

    /// The `Access-Control-Allow-Origin` value for a request origin, if the
    /// policy grants one.
    ///
    /// Allowed origins are echoed back; under the any-origin policy a request
    /// without an `Origin` header gets `*`.
    #[must_use]
    pub fn resolve(&self, origin: Option<&str>) -> Option<String> {
        match origin {
            Some(o) if self.allow_any => Some(o.to_owned()),
            None if self.allow_any => Some("*".to_owned()),
            Some(o) => self
                .origins
                .iter()
                .any(|allowed| allowed == o)
                .then(|| o.to_owned()),
            None => None,
        }
    }
}

impl fmt::Display for AllowedOrigins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.origins.join(", "))
    }
}

/// CORS middleware for the relay routes.
///
/// Disallowed origins on non-preflight requests receive `403` without the
/// CORS response headers; `OPTIONS` short-circuits with `204` before routing.
pub async fn cors_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let allowed = state.allowed_origins.resolve(origin.as_deref());

    if allowed.is_none() && !state.allowed_origins.allows_any() && origin.is_some() {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Origin not allowed." })),
        )
            .into_response();
    }

    let mut response = if req.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(req).await
    };

    let headers = response.headers_mut();
    if let Some(value) = allowed.and_then(|v| HeaderValue::from_str(&v).ok()) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
    headers.insert(header::VARY, HeaderValue::from_static("Origin"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}
