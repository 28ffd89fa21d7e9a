//! Product categories. A category with products cannot be deleted.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::Deserialize;

use pdv_core::validation::validate_category_name;
use pdv_core::{Action, Category};
use pdv_db::{CategoryUpdate, NewCategory};

use crate::auth::{authorize, Principal};
use crate::error::{ApiError, ApiResult};
use crate::routes::MessageResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryQuery {
    /// Include deactivated categories.
    #[serde(default)]
    pub all: bool,
}

async fn list_categories(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    query: Result<Query<CategoryQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Category>>> {
    authorize(&principal, Action::ViewCatalog)?;
    let Query(query) = query?;
    Ok(Json(state.db.categories().list(!query.all).await?))
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

async fn create_category(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<CreateCategoryRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    authorize(&principal, Action::ManageCatalog)?;
    let Json(body) = payload?;
    validate_category_name(&body.name)?;

    let category = state
        .db
        .categories()
        .create(NewCategory {
            name: body.name.trim().to_string(),
            description: body.description,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(category)))
}

async fn get_category(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Json<Category>> {
    authorize(&principal, Action::ViewCatalog)?;

    state
        .db
        .categories()
        .get_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Category", &id))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

async fn update_category(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateCategoryRequest>, JsonRejection>,
) -> ApiResult<Json<Category>> {
    authorize(&principal, Action::ManageCatalog)?;
    let Json(body) = payload?;
    validate_category_name(&body.name)?;

    let category = state
        .db
        .categories()
        .update(
            &id,
            CategoryUpdate {
                name: body.name.trim().to_string(),
                description: body.description,
                active: body.active,
            },
        )
        .await?;

    Ok(Json(category))
}

async fn delete_category(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    authorize(&principal, Action::DeleteCatalog)?;

    state.db.categories().delete(&id).await?;
    Ok(MessageResponse::new("Category deleted successfully"))
}
