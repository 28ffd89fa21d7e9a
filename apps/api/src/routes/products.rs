//! Product catalog, manual stock adjustment and product maintenance.
//!
//! Deleting is only possible for products that were never sold; sold
//! products are switched off with `PUT` and `"active": false`.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pdv_core::money::{self, Money};
use pdv_core::validation::{
    validate_non_negative, validate_price, validate_product_name, validate_search_query,
    validate_stock_quantity,
};
use pdv_core::{Action, CoreError, Product, StockAdjustment};
use pdv_db::{DbError, NewProduct, ProductFilter, ProductUpdate};

use crate::auth::{authorize, Principal};
use crate::error::{ApiError, ApiResult};
use crate::routes::MessageResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/barcode/{barcode}", get(get_by_barcode))
        .route(
            "/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/products/{id}/stock", put(adjust_stock))
}

/// Product as sent over the wire, with decimal prices.
#[derive(Debug, Clone, Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub barcode: Option<String>,
    #[serde(with = "money::decimal")]
    pub price: Money,
    #[serde(with = "money::decimal")]
    pub cost_price: Money,
    pub stock: i64,
    pub min_stock: i64,
    pub unit: String,
    pub active: bool,
    pub low_stock: bool,
    pub category_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        ProductResponse {
            price: p.price(),
            cost_price: p.cost_price(),
            low_stock: p.is_low_stock(),
            id: p.id,
            name: p.name,
            description: p.description,
            barcode: p.barcode,
            stock: p.stock,
            min_stock: p.min_stock,
            unit: p.unit,
            active: p.active,
            category_id: p.category_id,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub active: Option<bool>,
    pub category_id: Option<String>,
    pub limit: Option<u32>,
}

async fn list_products(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    query: Result<Query<ProductQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<ProductResponse>>> {
    authorize(&principal, Action::ViewCatalog)?;
    let Query(query) = query?;

    let search = match query.search.as_deref() {
        Some(s) if !s.trim().is_empty() => Some(validate_search_query(s)?),
        _ => None,
    };

    let mut filter = ProductFilter {
        search,
        active: query.active,
        category_id: query.category_id,
        ..Default::default()
    };
    if let Some(limit) = query.limit {
        filter.limit = limit.clamp(1, 500);
    }

    let products = state.db.products().list(&filter).await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

async fn get_product(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Json<ProductResponse>> {
    authorize(&principal, Action::ViewCatalog)?;

    state
        .db
        .products()
        .get_by_id(&id)
        .await?
        .map(|p| Json(p.into()))
        .ok_or_else(|| ApiError::from(CoreError::ProductNotFound(id.clone())))
}

async fn get_by_barcode(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(barcode): Path<String>,
) -> ApiResult<Json<ProductResponse>> {
    authorize(&principal, Action::ViewCatalog)?;

    state
        .db
        .products()
        .get_by_barcode(&barcode)
        .await?
        .map(|p| Json(p.into()))
        .ok_or_else(|| ApiError::from(CoreError::ProductNotFound(barcode.clone())))
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(with = "money::decimal")]
    pub price: Money,
    #[serde(default, with = "money::decimal::option")]
    pub cost_price: Option<Money>,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub min_stock: i64,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_unit() -> String {
    "un".to_string()
}

fn default_active() -> bool {
    true
}

async fn create_product(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ProductResponse>)> {
    authorize(&principal, Action::ManageCatalog)?;
    let Json(body) = payload?;

    let cost_price = body.cost_price.unwrap_or_default();
    validate_product_name(&body.name)?;
    validate_price(body.price)?;
    validate_non_negative("cost_price", cost_price)?;
    validate_stock_quantity("stock", body.stock)?;
    validate_stock_quantity("min_stock", body.min_stock)?;

    let product = state
        .db
        .products()
        .create(NewProduct {
            name: body.name.trim().to_string(),
            description: body.description,
            barcode: body.barcode.filter(|b| !b.trim().is_empty()),
            price: body.price,
            cost_price,
            stock: body.stock,
            min_stock: body.min_stock,
            unit: body.unit,
            category_id: body.category_id,
            active: body.active,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(product.into())))
}

#[derive(Debug, Deserialize)]
pub struct StockAdjustmentRequest {
    #[serde(rename = "type")]
    pub kind: StockAdjustment,
    pub quantity: i64,
}

async fn adjust_stock(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    payload: Result<Json<StockAdjustmentRequest>, JsonRejection>,
) -> ApiResult<Json<ProductResponse>> {
    authorize(&principal, Action::ManageCatalog)?;
    let Json(body) = payload?;

    let product = state
        .db
        .products()
        .adjust_stock(&id, body.kind, body.quantity)
        .await?;

    Ok(Json(product.into()))
}

/// Full replacement of the editable fields. Omitted optional fields keep
/// their stored value, except `description`, `barcode` and `category_id`,
/// which are cleared.
#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(with = "money::decimal")]
    pub price: Money,
    #[serde(default, with = "money::decimal::option")]
    pub cost_price: Option<Money>,
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub min_stock: Option<i64>,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

async fn update_product(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> ApiResult<Json<ProductResponse>> {
    authorize(&principal, Action::ManageCatalog)?;
    let Json(body) = payload?;

    validate_product_name(&body.name)?;
    validate_price(body.price)?;
    if let Some(cost_price) = body.cost_price {
        validate_non_negative("cost_price", cost_price)?;
    }
    if let Some(stock) = body.stock {
        validate_stock_quantity("stock", stock)?;
    }
    if let Some(min_stock) = body.min_stock {
        validate_stock_quantity("min_stock", min_stock)?;
    }

    let product = state
        .db
        .products()
        .update(
            &id,
            ProductUpdate {
                name: body.name.trim().to_string(),
                description: body.description,
                barcode: body.barcode.filter(|b| !b.trim().is_empty()),
                price: body.price,
                cost_price: body.cost_price,
                stock: body.stock,
                min_stock: body.min_stock,
                unit: body.unit,
                category_id: body.category_id,
                active: body.active,
            },
        )
        .await?;

    Ok(Json(product.into()))
}

async fn delete_product(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    authorize(&principal, Action::DeleteCatalog)?;

    match state.db.products().delete(&id).await {
        Ok(()) => Ok(MessageResponse::new("Product deleted successfully")),
        Err(DbError::NotFound { .. }) => Err(CoreError::ProductNotFound(id).into()),
        Err(other) => Err(other.into()),
    }
}
