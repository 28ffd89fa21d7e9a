//! Login, profile and password change.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use pdv_core::validation::validate_password;
use pdv_core::User;
use pdv_db::password::verify_password;

use crate::auth::{authenticate, Principal};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn public_router() -> Router<AppState> {
    Router::new().route("/auth/login", post(login))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/auth/profile", get(profile))
        .route("/auth/change-password", put(change_password))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: User,
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(body) = payload?;

    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::validation("email and password are required"));
    }

    let user = authenticate(&state.db, &body.email, &body.password).await?;
    let token = state.jwt.issue(&user)?;

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer",
        expires_in: state.jwt.lifetime_secs(),
        user,
    }))
}

async fn profile(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<User>> {
    state
        .db
        .users()
        .get_by_id(&principal.user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("User", &principal.user_id))
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

async fn change_password(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = payload?;
    validate_password(&body.new_password)?;

    let user = state
        .db
        .users()
        .get_by_id(&principal.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", &principal.user_id))?;

    if !verify_password(&body.current_password, &user.password_hash) {
        return Err(ApiError::validation("Current password is incorrect"));
    }

    state
        .db
        .users()
        .update_password(&user.id, &body.new_password)
        .await?;

    info!(user_id = %user.id, "Password changed");
    Ok(Json(json!({ "message": "Password changed successfully" })))
}
