//! Health, catalog, checkout and the headers every response carries.

#![allow(clippy::indexing_slicing)]

use axum::http::StatusCode;
use nut_barn_integration_tests::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let resp = app.get("/health").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body, "ok");
}

#[tokio::test]
async fn test_product_list() {
    let app = TestApp::new();
    let resp = app.get("/api/products").await;

    assert_eq!(resp.status, StatusCode::OK);
    let products = resp.body.as_array().expect("products array");
    assert_eq!(products.len(), 4);
    assert_eq!(products[0]["id"], "nuts-6oz");
    assert_eq!(products[0]["priceInCents"], 1000);
    assert_eq!(products[3]["weightOz"], json!(null));
}

#[tokio::test]
async fn test_product_detail() {
    let app = TestApp::new();

    let resp = app.get("/api/products/nuts-15oz").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["priceInCents"], 2300);

    let resp = app.get("/api/products/acorns").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_checkout_not_implemented() {
    let app = TestApp::new();
    let resp = app.post_json("/api/checkout", &json!({})).await;

    assert_eq!(resp.status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(resp.body["success"], false);
    assert!(
        resp.body["message"]
            .as_str()
            .expect("message")
            .contains("Order via Email")
    );
}

#[tokio::test]
async fn test_security_headers_and_request_id() {
    let app = TestApp::new();
    let resp = app.get("/api/products").await;

    assert_eq!(resp.headers["x-frame-options"], "DENY");
    assert_eq!(resp.headers["x-content-type-options"], "nosniff");
    assert_eq!(resp.headers["cache-control"], "no-store, max-age=0");
    assert!(resp.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_error_responses_carry_headers() {
    let app = TestApp::new();
    let resp = app.get("/api/posts/missing").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.headers["x-frame-options"], "DENY");
}
