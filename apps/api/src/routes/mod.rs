//! # HTTP Routes
//!
//! ```text
//! /health                                   public
//! /api/v1/auth/login                        public
//! /api/v1/auth/{profile,change-password}    ┐
//! /api/v1/users[/{id}]                      │
//! /api/v1/categories[/{id}]                 │ require_auth
//! /api/v1/products[/...]                    │ (+ authorize per handler)
//! /api/v1/sales[/...]                       │
//! /api/v1/dashboard/...                     ┘
//! ```
//!
//! Deletes and cancellations answer with a [`MessageResponse`].

pub mod auth;
pub mod categories;
pub mod dashboard;
pub mod products;
pub mod sales;
pub mod users;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{middleware, Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::auth::require_auth;
use crate::state::AppState;

/// `{ "message": "..." }` acknowledgement for requests with nothing to return.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl MessageResponse {
    pub fn new(message: &'static str) -> Json<Self> {
        Json(MessageResponse { message })
    }
}

/// Builds the complete application router.
pub fn build_app(state: AppState) -> Router {
    let protected = Router::new()
        .merge(auth::protected_router())
        .merge(users::router())
        .merge(categories::router())
        .merge(products::router())
        .merge(sales::router())
        .merge(dashboard::router())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let v1 = Router::new().merge(auth::public_router()).merge(protected);

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", v1)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    if state.db.health_check().await {
        (StatusCode::OK, Json(json!({ "status": "ok", "database": "ok" })))
    } else {
        tracing::error!("Health check failed: database unreachable");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded", "database": "unreachable" })),
        )
    }
}
