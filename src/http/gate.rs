//! Access gate middleware and the `Claims` extractor.
//!
//! `require_role` runs [`authorize`] against the route's required role and,
//! on success, stores the verified [`Claims`] in request extensions.
//! Handlers take `Claims` as an argument to read them back.

use crate::crypto::token::Claims;
use crate::domain::Role;
use crate::http::error::ApiError;
use crate::manager::PaymentManager;
use crate::policy::authorize;
use axum::extract::{Request, State};
use axum::http::header;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

/// Middleware state: who verifies tokens and which role the routes need.
#[derive(Clone)]
pub struct RoleGate {
    manager: Arc<PaymentManager>,
    required: Role,
}

impl RoleGate {
    /// Gate requiring exactly `required`.
    pub fn new(manager: Arc<PaymentManager>, required: Role) -> Self {
        Self { manager, required }
    }
}

/// Reject the request unless it carries a bearer token for the gate's role.
pub async fn require_role(
    State(gate): State<RoleGate>,
    mut request: Request,
    next: Next,
) -> Response {
    // A header that is not visible ASCII is present but unusable.
    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .map(|v| v.to_str().unwrap_or_default());

    match authorize(header, gate.manager.tokens(), gate.required) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for Claims {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("no verified identity on request".to_string()))
    }
}
