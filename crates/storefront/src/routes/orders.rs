//! Order submission route.

use axum::{Json, extract::State};
use nut_barn_core::{OrderRef, Price};
use serde::Serialize;
use tracing::instrument;

use crate::error::Result;
use crate::extract::ApiJson;
use crate::services::orders::{self, OrderRequest};
use crate::state::AppState;

/// Body returned for an accepted order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub success: bool,
    pub order_ref: OrderRef,
    pub total_in_cents: Price,
    pub message: String,
}

/// Accept an order placed by email.
///
/// POST /api/orders
///
/// Prices are looked up again from the catalog; whatever the client thinks
/// an item costs is never read.
///
/// # Errors
///
/// Returns 400 for malformed or invalid input and unknown products, 500 when
/// the business inbox is not configured, 502 when the notification cannot be
/// delivered.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<OrderRequest>,
) -> Result<Json<OrderResponse>> {
    let order = request.validate()?;
    let placed = orders::place_order(state.catalog().as_ref(), state.mailer(), order).await?;

    Ok(Json(OrderResponse {
        success: true,
        order_ref: placed.order_ref,
        total_in_cents: placed.total,
        message: placed.message,
    }))
}
