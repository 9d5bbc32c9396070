//! Product catalog routes.

use axum::{
    Json,
    extract::{Path, State},
};
use nut_barn_core::Product;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// List every product.
///
/// GET /api/products
pub async fn index(State(state): State<AppState>) -> Json<Vec<Product>> {
    Json(state.catalog().products().to_vec())
}

/// Show one product.
///
/// GET /api/products/{id}
///
/// # Errors
///
/// Returns 404 if the product is not in the catalog.
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Product>> {
    state
        .catalog()
        .product(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}
