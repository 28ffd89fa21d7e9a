//! Shared application state.

use std::sync::Arc;

use pdv_db::Database;

use crate::auth::JwtManager;

/// Handed to every handler through axum's `State` extractor.
///
/// Cloning is cheap: the database is a pool handle and the JWT keys sit
/// behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtManager>,
}

impl AppState {
    pub fn new(db: Database, jwt: JwtManager) -> Self {
        AppState {
            db,
            jwt: Arc::new(jwt),
        }
    }
}
