//! # PDV API
//!
//! REST server for the point-of-sale back office.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        PDV API Server                                   │
//! │                                                                         │
//! │  Register / back office ───► HTTP (8080) ───► routes ───► pdv-db        │
//! │                                   │                          │          │
//! │                          TraceLayer + JWT              SQLite (WAL)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`build_app`] returns the full router, so tests drive the same routes
//! the binary serves.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::build_app;
pub use state::AppState;
