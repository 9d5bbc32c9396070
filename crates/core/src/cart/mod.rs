//! Shopping cart state.
//!
//! [`CartStore`] owns the list of items a shopper has picked, the drawer
//! open/closed flag, and the derived totals. It is synchronous and
//! single-owner: every operation runs to completion and takes `&mut self`.
//!
//! # Invariants
//!
//! - At most one [`CartItem`] per product ID; adding again merges quantities.
//! - Every stored quantity is at least 1; setting a quantity to 0 removes
//!   the item.
//! - Totals are recomputed from `items` on every read and use integer cents.
//!
//! # Persistence
//!
//! After every change to `items` the full list is written as JSON under
//! [`CART_STORAGE_KEY`] through the store's [`CartStorage`]. On construction
//! the store hydrates from that key; a corrupt value is deleted and the cart
//! starts empty. Storage failures are logged and otherwise ignored: the cart
//! never surfaces an error to its caller.
//!
//! ```
//! use nut_barn_core::cart::{CartStore, MemoryStorage};
//!
//! let storage = MemoryStorage::new();
//! let mut cart = CartStore::new(storage.clone());
//! cart.add_item("nuts-6oz", 1);
//! cart.add_item("nuts-6oz", 1);
//! assert_eq!(cart.items().len(), 1);
//! assert_eq!(cart.item_count(), 2);
//!
//! // A fresh store over the same storage sees the same cart.
//! let reloaded = CartStore::new(storage);
//! assert_eq!(reloaded.items(), cart.items());
//! ```

mod storage;

pub use storage::{CartStorage, FileStorage, MemoryStorage, NoStorage, StorageError};

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, StaticCatalog};
use crate::types::{Price, ProductId};

/// Storage key the cart is persisted under.
pub const CART_STORAGE_KEY: &str = "nutbarn-cart";

/// One product line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: ProductId,
    pub name: String,
    /// Price captured when the item was first added. Display only; orders
    /// are always re-priced on the server.
    pub unit_price_in_cents: Price,
    pub quantity: u32,
}

impl CartItem {
    /// Unit price times quantity.
    #[must_use]
    pub const fn line_total(&self) -> Price {
        self.unit_price_in_cents.times(self.quantity)
    }
}

/// What the client submits for each cart item when placing an order.
///
/// There is deliberately no price field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: ProductId,
    pub quantity: u32,
}

/// The cart state container.
pub struct CartStore<S: CartStorage = MemoryStorage> {
    items: Vec<CartItem>,
    is_open: bool,
    storage: S,
    catalog: Arc<dyn Catalog>,
}

impl<S: CartStorage> CartStore<S> {
    /// Create a cart over `storage`, priced from the built-in catalog.
    pub fn new(storage: S) -> Self {
        Self::with_catalog(storage, Arc::new(StaticCatalog))
    }

    /// Create a cart over `storage`, resolving products from `catalog`.
    pub fn with_catalog(storage: S, catalog: Arc<dyn Catalog>) -> Self {
        let items = hydrate(&storage);
        Self {
            items,
            is_open: false,
            storage,
            catalog,
        }
    }

    /// Items in the order they were first added.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Whether the cart holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether the cart drawer is open. Never persisted.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.is_open
    }

    /// Total number of units across all items.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0, |sum, item| sum.saturating_add(item.quantity))
    }

    /// Sum of unit price times quantity, in cents.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// The `{id, quantity}` list to submit with an order.
    #[must_use]
    pub fn order_lines(&self) -> Vec<OrderLine> {
        self.items
            .iter()
            .map(|item| OrderLine {
                id: item.id.clone(),
                quantity: item.quantity,
            })
            .collect()
    }

    /// Add `quantity` units of a product.
    ///
    /// Unknown product IDs are ignored, as is a quantity of 0. If the product
    /// is already in the cart its quantity grows; otherwise a new item is
    /// appended with the catalog's current name and price.
    pub fn add_item(&mut self, product_id: &str, quantity: u32) {
        if quantity == 0 {
            return;
        }
        let Some(product) = self.catalog.product(product_id) else {
            tracing::debug!(product_id, "ignoring add for unknown product");
            return;
        };

        if let Some(existing) = self.items.iter_mut().find(|i| i.id == *product_id) {
            existing.quantity = existing.quantity.saturating_add(quantity);
        } else {
            let item = CartItem {
                id: ProductId::from(product.id),
                name: product.name.to_owned(),
                unit_price_in_cents: product.price,
                quantity,
            };
            self.items.push(item);
        }
        self.persist();
    }

    /// Remove a product from the cart. No-op if it is not there.
    pub fn remove_item(&mut self, product_id: &str) {
        let before = self.items.len();
        self.items.retain(|i| i.id != *product_id);
        if self.items.len() != before {
            self.persist();
        }
    }

    /// Set a product's quantity to exactly `quantity`.
    ///
    /// A quantity of 0 removes the item. No-op if the product is not in the
    /// cart.
    pub fn update_quantity(&mut self, product_id: &str, quantity: u32) {
        if quantity == 0 {
            self.remove_item(product_id);
            return;
        }
        if let Some(item) = self.items.iter_mut().find(|i| i.id == *product_id) {
            item.quantity = quantity;
            self.persist();
        }
    }

    /// Remove every item.
    pub fn clear_cart(&mut self) {
        self.items.clear();
        self.persist();
    }

    /// Open the cart drawer.
    pub const fn open_drawer(&mut self) {
        self.is_open = true;
    }

    /// Close the cart drawer.
    pub const fn close_drawer(&mut self) {
        self.is_open = false;
    }

    /// Write the item list to storage.
    fn persist(&self) {
        if !self.storage.is_available() {
            return;
        }
        let value = match serde_json::to_string(&self.items) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize cart");
                return;
            }
        };
        if let Err(e) = self.storage.set(CART_STORAGE_KEY, &value) {
            tracing::warn!(error = %e, "failed to persist cart");
        }
    }
}

impl<S: CartStorage> std::fmt::Debug for CartStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("items", &self.items)
            .field("is_open", &self.is_open)
            .finish_non_exhaustive()
    }
}

/// Load the persisted item list, discarding anything unreadable.
fn hydrate<S: CartStorage>(storage: &S) -> Vec<CartItem> {
    if !storage.is_available() {
        return Vec::new();
    }

    let raw = match storage.get(CART_STORAGE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read persisted cart");
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<CartItem>>(&raw) {
        Ok(items) => normalize(items),
        Err(e) => {
            tracing::warn!(error = %e, "discarding corrupt persisted cart");
            if let Err(e) = storage.remove(CART_STORAGE_KEY) {
                tracing::warn!(error = %e, "failed to remove corrupt persisted cart");
            }
            Vec::new()
        }
    }
}

/// Re-establish the item invariants on data read back from storage.
///
/// Zero quantities are dropped and repeated IDs are merged into the first
/// occurrence, keeping display order.
fn normalize(items: Vec<CartItem>) -> Vec<CartItem> {
    let mut out: Vec<CartItem> = Vec::with_capacity(items.len());
    for item in items {
        if item.quantity == 0 {
            continue;
        }
        if let Some(existing) = out.iter_mut().find(|i| i.id == item.id) {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            out.push(item);
        }
    }
    out
}
