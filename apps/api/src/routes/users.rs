//! User administration (admin only).
//!
//! An admin cannot change their own role, deactivate themselves or delete
//! their own account, so there is always one admin able to log in.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::Deserialize;

use pdv_core::validation::{validate_email, validate_password, validate_user_name};
use pdv_core::{Action, Role, User};
use pdv_db::{NewUser, UserUpdate};

use crate::auth::{authorize, Principal};
use crate::error::{ApiError, ApiResult};
use crate::routes::MessageResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(get_user).put(update_user).delete(delete_user))
}

async fn list_users(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<Vec<User>>> {
    authorize(&principal, Action::ManageUsers)?;
    Ok(Json(state.db.users().list().await?))
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Cashier
}

async fn create_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<User>)> {
    authorize(&principal, Action::ManageUsers)?;
    let Json(body) = payload?;

    validate_user_name(&body.name)?;
    validate_email(&body.email)?;
    validate_password(&body.password)?;

    let user = state
        .db
        .users()
        .create(NewUser {
            name: body.name,
            email: body.email,
            password: body.password,
            role: body.role,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    authorize(&principal, Action::ManageUsers)?;

    state
        .db
        .users()
        .get_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("User", &id))
}

/// `password` is optional; when present it replaces the current one.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub password: Option<String>,
}

async fn update_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult<Json<User>> {
    authorize(&principal, Action::ManageUsers)?;
    let Json(body) = payload?;

    validate_user_name(&body.name)?;
    validate_email(&body.email)?;
    if let Some(password) = body.password.as_deref() {
        validate_password(password)?;
    }

    if id == principal.user_id {
        if body.role != principal.role {
            return Err(ApiError::validation("You cannot change your own role"));
        }
        if body.active == Some(false) {
            return Err(ApiError::validation("You cannot deactivate your own account"));
        }
    }

    let user = state
        .db
        .users()
        .update(
            &id,
            UserUpdate {
                name: body.name,
                email: body.email,
                role: body.role,
                active: body.active,
                password: body.password,
            },
        )
        .await?;

    Ok(Json(user))
}

async fn delete_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    authorize(&principal, Action::ManageUsers)?;

    if id == principal.user_id {
        return Err(ApiError::validation("You cannot delete your own account"));
    }

    state.db.users().delete(&id).await?;
    Ok(MessageResponse::new("User deleted successfully"))
}
