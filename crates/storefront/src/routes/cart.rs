//! Session-backed cart API.
//!
//! Each request rebuilds a [`CartStore`] from the JSON saved in the session,
//! applies one operation and writes the store's persisted value back. The
//! cart semantics (merging, silent no-ops for unknown products) are exactly
//! those of the client-side cart.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use nut_barn_core::cart::{CART_STORAGE_KEY, CartItem, CartStorage, CartStore, MemoryStorage};
use nut_barn_core::{Catalog, Price};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::error::{AppError, Result};
use crate::extract::ApiJson;
use crate::state::AppState;

/// Cart contents and totals as returned by every cart endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub item_count: u32,
    pub subtotal_in_cents: Price,
    /// Formatted for display, e.g. `$25.00`
    pub subtotal: String,
}

impl From<&CartStore> for CartView {
    fn from(cart: &CartStore) -> Self {
        Self {
            items: cart.items().to_vec(),
            item_count: cart.item_count(),
            subtotal_in_cents: cart.subtotal(),
            subtotal: cart.subtotal().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub id: String,
    pub quantity: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

/// A cart loaded from the session, with the storage it persists into.
struct SessionCart {
    cart: CartStore,
    storage: MemoryStorage,
}

impl SessionCart {
    async fn load(session: &Session, catalog: Arc<dyn Catalog>) -> Result<Self> {
        let storage = MemoryStorage::new();
        if let Some(saved) = session.get::<String>(CART_STORAGE_KEY).await? {
            storage
                .set(CART_STORAGE_KEY, &saved)
                .map_err(|e| AppError::Internal(e.to_string()))?;
        }
        let cart = CartStore::with_catalog(storage.clone(), catalog);
        Ok(Self { cart, storage })
    }

    /// Copy whatever the cart persisted back into the session.
    async fn save(self, session: &Session) -> Result<CartView> {
        let saved = self
            .storage
            .get(CART_STORAGE_KEY)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        if let Some(value) = saved {
            session.insert(CART_STORAGE_KEY, value).await?;
        }
        Ok(CartView::from(&self.cart))
    }
}

/// GET /api/cart
///
/// # Errors
///
/// Returns 500 if the session cannot be read.
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let loaded = SessionCart::load(&session, Arc::clone(state.catalog())).await?;
    Ok(Json(CartView::from(&loaded.cart)))
}

/// POST /api/cart/items
///
/// Unknown products are ignored; the unchanged cart is returned.
///
/// # Errors
///
/// Returns 400 for a malformed body, 500 if the session cannot be used.
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    ApiJson(request): ApiJson<AddItemRequest>,
) -> Result<Json<CartView>> {
    let mut loaded = SessionCart::load(&session, Arc::clone(state.catalog())).await?;
    loaded
        .cart
        .add_item(&request.id, request.quantity.unwrap_or(1));
    Ok(Json(loaded.save(&session).await?))
}

/// PATCH /api/cart/items/{id}
///
/// A quantity of 0 or less removes the item.
///
/// # Errors
///
/// Returns 400 for a malformed body, 500 if the session cannot be used.
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateQuantityRequest>,
) -> Result<Json<CartView>> {
    let mut loaded = SessionCart::load(&session, Arc::clone(state.catalog())).await?;
    if request.quantity <= 0 {
        loaded.cart.remove_item(&id);
    } else {
        let quantity = u32::try_from(request.quantity).unwrap_or(u32::MAX);
        loaded.cart.update_quantity(&id, quantity);
    }
    Ok(Json(loaded.save(&session).await?))
}

/// DELETE /api/cart/items/{id}
///
/// # Errors
///
/// Returns 500 if the session cannot be used.
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<CartView>> {
    let mut loaded = SessionCart::load(&session, Arc::clone(state.catalog())).await?;
    loaded.cart.remove_item(&id);
    Ok(Json(loaded.save(&session).await?))
}

/// DELETE /api/cart
///
/// # Errors
///
/// Returns 500 if the session cannot be used.
pub async fn clear(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let mut loaded = SessionCart::load(&session, Arc::clone(state.catalog())).await?;
    loaded.cart.clear_cart();
    Ok(Json(loaded.save(&session).await?))
}
