//! Events and posts, served from built-in content when WordPress is absent.

#![allow(clippy::indexing_slicing)]

use axum::http::StatusCode;
use nut_barn_integration_tests::TestApp;
use nut_barn_storefront::config::StorefrontConfig;
use url::Url;

#[tokio::test]
async fn test_events_without_wordpress() {
    let app = TestApp::new();
    let resp = app.get("/api/events").await;

    assert_eq!(resp.status, StatusCode::OK);
    let events = resp.body.as_array().expect("events array");
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["id"], "holt-farmers-market");
    assert_eq!(events[0]["isRecurring"], true);
    assert_eq!(events[0]["recurringDay"], "Saturday");
    assert!(events[0].get("status").is_none());
    assert_eq!(events[1]["id"], "community-events");
}

#[tokio::test]
async fn test_posts_without_wordpress() {
    let app = TestApp::new();

    let resp = app.get("/api/posts").await;
    assert_eq!(resp.status, StatusCode::OK);
    let posts = resp.body.as_array().expect("posts array");
    assert_eq!(posts.len(), 3);
    assert_eq!(posts[0]["slug"], "five-ways-to-use-cinnamon-roasted-nuts");
    assert_eq!(posts[0]["categories"][0], "Recipes");

    let resp = app.get("/api/posts?limit=1").await;
    assert_eq!(resp.body.as_array().expect("posts array").len(), 1);
}

#[tokio::test]
async fn test_post_by_slug() {
    let app = TestApp::new();

    let resp = app.get("/api/posts/the-perfect-holiday-gift").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["id"], "post-2");

    let resp = app.get("/api/posts/no-such-post").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.body["success"], false);
}

#[tokio::test]
async fn test_bad_limit_is_400() {
    let app = TestApp::new();
    let resp = app.get("/api/posts?limit=lots").await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.body["success"], false);
}

#[tokio::test]
async fn test_unreachable_wordpress_falls_back() {
    let config = StorefrontConfig {
        wordpress_api_url: Some(Url::parse("http://127.0.0.1:9/graphql").expect("valid url")),
        ..StorefrontConfig::default()
    };
    let app = TestApp::with_config(config);

    let resp = app.get("/api/events").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body.as_array().expect("events array").len(), 2);

    let resp = app.get("/api/posts").await;
    assert_eq!(resp.body.as_array().expect("posts array").len(), 3);

    // A single post has no fallback
    let resp = app.get("/api/posts/how-we-got-started").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_content_is_cacheable() {
    let app = TestApp::new();
    let resp = app.get("/api/events").await;
    assert_eq!(resp.headers["cache-control"], "public, max-age=300");
}
