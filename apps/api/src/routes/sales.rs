//! # Sales Endpoints
//!
//! `POST /sales` and `PUT /sales/{id}/cancel` are thin wrappers around the
//! sale engine in `pdv-db`; everything else is a read.
//!
//! ## Sale JSON
//! ```json
//! {
//!   "id": "…", "total": 7.0, "discount": 0.7, "tax": 0.0,
//!   "final_total": 6.3, "payment_method": "cash",
//!   "amount_received": 10.0, "change": 3.7, "status": "completed",
//!   "user_id": "…", "created_at": "…",
//!   "items": [{ "id": "…", "product_id": "…", "quantity": 2,
//!               "unit_price": 3.5, "total": 7.0 }]
//! }
//! ```
//! `amount_received` and `change` are omitted for non-cash sales.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pdv_core::money::{self, Money};
use pdv_core::{Action, CoreError, PaymentMethod, Sale, SaleItem, SaleRequest, SaleStatus};
use pdv_db::{DateRange, SaleDetail, SaleFilter, SalesReport};

use crate::auth::{authorize, Principal};
use crate::error::{ApiError, ApiResult};
use crate::routes::MessageResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sales", get(list_sales).post(create_sale))
        .route("/sales/report", get(sales_report))
        .route("/sales/{id}", get(get_sale))
        .route("/sales/{id}/cancel", put(cancel_sale))
}

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct SaleSummary {
    pub id: String,
    #[serde(with = "money::decimal")]
    pub total: Money,
    #[serde(with = "money::decimal")]
    pub discount: Money,
    #[serde(with = "money::decimal")]
    pub tax: Money,
    #[serde(with = "money::decimal")]
    pub final_total: Money,
    pub payment_method: PaymentMethod,
    #[serde(
        with = "money::decimal::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount_received: Option<Money>,
    #[serde(
        with = "money::decimal::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub change: Option<Money>,
    pub status: SaleStatus,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Sale> for SaleSummary {
    fn from(sale: Sale) -> Self {
        SaleSummary {
            total: sale.total(),
            discount: Money::from_cents(sale.discount_cents),
            tax: Money::from_cents(sale.tax_cents),
            final_total: sale.final_total(),
            amount_received: sale.amount_received_cents.map(Money::from_cents),
            change: sale.change_cents.map(Money::from_cents),
            id: sale.id,
            payment_method: sale.payment_method,
            status: sale.status,
            user_id: sale.user_id,
            created_at: sale.created_at,
            updated_at: sale.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SaleItemResponse {
    pub id: String,
    pub product_id: String,
    pub quantity: i64,
    #[serde(with = "money::decimal")]
    pub unit_price: Money,
    #[serde(with = "money::decimal")]
    pub total: Money,
}

impl From<SaleItem> for SaleItemResponse {
    fn from(item: SaleItem) -> Self {
        SaleItemResponse {
            unit_price: item.unit_price(),
            total: item.total(),
            id: item.id,
            product_id: item.product_id,
            quantity: item.quantity,
        }
    }
}

/// A sale with its lines.
#[derive(Debug, Clone, Serialize)]
pub struct SaleResponse {
    #[serde(flatten)]
    pub sale: SaleSummary,
    pub items: Vec<SaleItemResponse>,
}

impl From<SaleDetail> for SaleResponse {
    fn from(detail: SaleDetail) -> Self {
        SaleResponse {
            sale: detail.sale.into(),
            items: detail.items.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SaleListResponse {
    pub sales: Vec<SaleSummary>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

// =============================================================================
// Handlers
// =============================================================================

async fn create_sale(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<SaleRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SaleResponse>)> {
    authorize(&principal, Action::RecordSale)?;
    let Json(request) = payload?;

    let detail = state.db.create_sale(&request, &principal.user_id).await?;
    Ok((StatusCode::CREATED, Json(detail.into())))
}

async fn cancel_sale(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    authorize(&principal, Action::CancelSale)?;

    // the sale itself is read back with GET
    state.db.cancel_sale(&id).await?;
    Ok(MessageResponse::new("Sale cancelled successfully"))
}

async fn get_sale(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Json<SaleResponse>> {
    authorize(&principal, Action::ViewSales)?;

    state
        .db
        .sales()
        .get_detail(&id)
        .await?
        .map(|detail| Json(detail.into()))
        .ok_or_else(|| ApiError::from(CoreError::SaleNotFound(id.clone())))
}

#[derive(Debug, Default, Deserialize)]
pub struct SaleQuery {
    pub user_id: Option<String>,
    pub status: Option<String>,
    pub payment_method: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

async fn list_sales(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    query: Result<Query<SaleQuery>, QueryRejection>,
) -> ApiResult<Json<SaleListResponse>> {
    authorize(&principal, Action::ViewSales)?;
    let Query(query) = query?;

    let defaults = SaleFilter::default();
    let filter = SaleFilter {
        user_id: query.user_id,
        status: query.status.as_deref().map(str::parse::<SaleStatus>).transpose()?,
        payment_method: query
            .payment_method
            .as_deref()
            .map(str::parse::<PaymentMethod>)
            .transpose()?,
        range: DateRange::parse(query.start_date.as_deref(), query.end_date.as_deref())?,
        page: query.page.unwrap_or(defaults.page),
        limit: query.limit.unwrap_or(defaults.limit),
    };

    let page = state.db.sales().list(&filter).await?;
    Ok(Json(SaleListResponse {
        sales: page.sales.into_iter().map(Into::into).collect(),
        total: page.total,
        page: page.page,
        limit: page.limit,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

async fn sales_report(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> ApiResult<Json<SalesReport>> {
    authorize(&principal, Action::ViewReports)?;
    let Query(query) = query?;

    let range = DateRange::parse(query.start_date.as_deref(), query.end_date.as_deref())?;
    Ok(Json(state.db.reports().sales_report(&range).await?))
}
