//! Back-office dashboard (manager/admin).

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Extension, Json, Router};
use chrono::Utc;
use serde::Deserialize;

use pdv_core::Action;
use pdv_db::repository::report::DEFAULT_TOP_PRODUCTS;
use pdv_db::{DashboardStats, Period, TopProduct};

use crate::auth::{authorize, Principal};
use crate::error::ApiResult;
use crate::routes::products::ProductResponse;
use crate::state::AppState;

/// Upper bound for `?limit=` on the best-sellers list.
const MAX_TOP_PRODUCTS: u32 = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard/stats", get(stats))
        .route("/dashboard/low-stock", get(low_stock))
        .route("/dashboard/top-products", get(top_products))
}

async fn stats(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<DashboardStats>> {
    authorize(&principal, Action::ViewReports)?;
    Ok(Json(state.db.reports().dashboard_stats(Utc::now()).await?))
}

async fn low_stock(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<Vec<ProductResponse>>> {
    authorize(&principal, Action::ViewReports)?;

    let products = state.db.reports().low_stock().await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Default, Deserialize)]
pub struct TopProductsQuery {
    pub period: Option<String>,
    pub limit: Option<u32>,
}

async fn top_products(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    query: Result<Query<TopProductsQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<TopProduct>>> {
    authorize(&principal, Action::ViewReports)?;
    let Query(query) = query?;

    let period = match query.period.as_deref() {
        Some(p) => p.parse::<Period>()?,
        None => Period::default(),
    };
    let limit = query
        .limit
        .unwrap_or(DEFAULT_TOP_PRODUCTS)
        .clamp(1, MAX_TOP_PRODUCTS);

    let top = state
        .db
        .reports()
        .top_products(period, limit, Utc::now())
        .await?;
    Ok(Json(top))
}
