//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                - Health check (mounted in `app`)
//!
//! # Catalog
//! GET    /api/products          - All products
//! GET    /api/products/{id}     - One product
//!
//! # Submissions (rate-limited per source address)
//! POST   /api/orders            - Order via email
//! POST   /api/contact           - Contact form
//! POST   /api/checkout          - Card checkout (501 until available)
//!
//! # Content (WordPress, mock fallback)
//! GET    /api/events            - Market days and events
//! GET    /api/posts?limit=      - Newest blog posts
//! GET    /api/posts/{slug}      - One blog post
//!
//! # Cart (session)
//! GET    /api/cart              - Cart contents
//! DELETE /api/cart              - Empty the cart
//! POST   /api/cart/items        - Add an item
//! PATCH  /api/cart/items/{id}   - Set an item's quantity
//! DELETE /api/cart/items/{id}   - Remove an item
//! ```

pub mod cart;
pub mod checkout;
pub mod contact;
pub mod content;
pub mod orders;
pub mod products;

use std::sync::Arc;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, patch, post},
};

use crate::middleware::rate_limit;
use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the content routes router.
pub fn content_routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(content::events))
        .route("/posts", get(content::posts))
        .route("/posts/{slug}", get(content::post))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add))
        .route("/items/{id}", patch(cart::update).delete(cart::remove))
}

/// Create the submission routes, each behind its own rate limiter.
pub fn submission_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/orders",
            post(orders::create).route_layer(from_fn_with_state(
                Arc::clone(state.order_limiter()),
                rate_limit::enforce,
            )),
        )
        .route(
            "/contact",
            post(contact::submit).route_layer(from_fn_with_state(
                Arc::clone(state.contact_limiter()),
                rate_limit::enforce,
            )),
        )
        .route("/checkout", post(checkout::create))
}

/// Create all routes for the storefront.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/api/products", product_routes())
        .nest("/api/cart", cart_routes())
        .nest("/api", content_routes().merge(submission_routes(state)))
}
