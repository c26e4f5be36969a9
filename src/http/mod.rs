//! HTTP surface of the service.
//!
//! ```text
//! GET  /health                                   public
//! POST /webhooks/payment                         public, signature-checked
//! GET  /artifacts/<ticket_form_id>.svg           public, static
//! POST /transactions                             Guest
//! POST /check-ins                                Admin
//! POST /transactions/:order_id/artifacts/retry   Admin
//! ```
//!
//! Layer order (outermost first): TraceLayer → RoleGate → Handler

pub mod error;
pub mod gate;
pub mod handlers;

use crate::domain::Role;
use crate::manager::PaymentManager;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use gate::{require_role, RoleGate};
use std::path::Path;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// The manager every handler delegates to.
    pub manager: Arc<PaymentManager>,
}

/// Build the service router. Artifacts are served from `artifact_dir`.
pub fn router(manager: Arc<PaymentManager>, artifact_dir: impl AsRef<Path>) -> Router {
    let guest = Router::new()
        .route("/transactions", post(handlers::register_purchase))
        .route_layer(from_fn_with_state(
            RoleGate::new(manager.clone(), Role::Guest),
            require_role,
        ));

    let admin = Router::new()
        .route("/check-ins", post(handlers::check_in))
        .route(
            "/transactions/:order_id/artifacts/retry",
            post(handlers::retry_artifacts),
        )
        .route_layer(from_fn_with_state(
            RoleGate::new(manager.clone(), Role::Admin),
            require_role,
        ));

    let public = Router::new()
        .route("/health", get(handlers::health))
        .route("/webhooks/payment", post(handlers::payment_notification));

    Router::new()
        .merge(public)
        .merge(guest)
        .merge(admin)
        .with_state(AppState { manager })
        .nest_service("/artifacts", ServeDir::new(artifact_dir.as_ref()))
        .layer(TraceLayer::new_for_http())
}
