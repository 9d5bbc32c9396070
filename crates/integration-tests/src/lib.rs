//! Integration tests for The Nut Barn storefront.
//!
//! The tests drive the real router (`nut_barn_storefront::app`) in-process
//! with `tower::ServiceExt::oneshot`, so they need no running server, mail
//! relay or WordPress instance. Outgoing mail is captured by a
//! [`RecordingTransport`].
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p nut-barn-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `api` - Health, catalog, checkout and response headers
//! - `orders` - Order submission and email delivery
//! - `contact` - Contact form
//! - `rate_limit` - Per-endpoint submission limits
//! - `cart_session` - Session cart round trips
//! - `content` - Events and posts with mock fallback

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use nut_barn_core::Email;
use nut_barn_storefront::app;
use nut_barn_storefront::config::StorefrontConfig;
use nut_barn_storefront::services::mail::{Mailer, RecordingTransport};
use nut_barn_storefront::state::AppState;
use serde_json::Value;
use tower::ServiceExt;

/// Business inbox used by [`TestApp::new`].
pub const BUSINESS_INBOX: &str = "hello@thenutbarn.com";

/// Sender used by [`TestApp::new`].
pub const MAIL_FROM: &str = "The Nut Barn <orders@thenutbarn.com>";

/// A storefront router plus handles on its side effects.
pub struct TestApp {
    router: Router,
    /// Every message the app sent, when mail is configured.
    pub outbox: RecordingTransport,
}

impl TestApp {
    /// App with mail configured and delivered to [`BUSINESS_INBOX`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(StorefrontConfig::default())
    }

    /// App with mail configured, on top of `config`.
    #[must_use]
    pub fn with_config(config: StorefrontConfig) -> Self {
        let outbox = RecordingTransport::new();
        let business = Email::parse(BUSINESS_INBOX).expect("valid business inbox");
        let mailer = Mailer::new(Some(Arc::new(outbox.clone())), MAIL_FROM, Some(business));
        Self::build(config, mailer, outbox)
    }

    /// App with no mail transport: messages are logged, never sent.
    #[must_use]
    pub fn without_mail() -> Self {
        let mailer = Mailer::new(None, MAIL_FROM, None);
        Self::build(StorefrontConfig::default(), mailer, RecordingTransport::new())
    }

    /// App with a mail transport but no business inbox.
    #[must_use]
    pub fn without_business_inbox() -> Self {
        let outbox = RecordingTransport::new();
        let mailer = Mailer::new(Some(Arc::new(outbox.clone())), MAIL_FROM, None);
        Self::build(StorefrontConfig::default(), mailer, outbox)
    }

    fn build(config: StorefrontConfig, mailer: Mailer, outbox: RecordingTransport) -> Self {
        let state = AppState::with_mailer(config, mailer).expect("Failed to build app state");
        Self {
            router: app(state),
            outbox,
        }
    }

    /// Send a request through the full middleware stack.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(
            Request::get(uri)
                .body(Body::empty())
                .expect("valid request"),
        )
        .await
    }

    /// POST a JSON body from the default test address.
    pub async fn post_json(&self, uri: &str, body: &Value) -> TestResponse {
        self.post_json_from(uri, body, "203.0.113.10").await
    }

    /// POST a JSON body as if from `source_ip` behind a proxy.
    pub async fn post_json_from(&self, uri: &str, body: &Value, source_ip: &str) -> TestResponse {
        self.send(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-forwarded-for", source_ip)
                .body(Body::from(body.to_string()))
                .expect("valid request"),
        )
        .await
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// A buffered response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Parsed JSON, or the raw text as a JSON string if it was not JSON
    pub body: Value,
}

impl TestResponse {
    /// The `name=value` part of the session cookie, if one was set.
    #[must_use]
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("nutbarn_session="))
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }

    /// Field names listed in a validation error body.
    #[must_use]
    pub fn error_fields(&self) -> Vec<String> {
        self.body["errors"]
            .as_array()
            .map(|errors| {
                errors
                    .iter()
                    .filter_map(|e| e["field"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A valid pickup order for two products.
#[must_use]
pub fn sample_order() -> Value {
    serde_json::json!({
        "name": "Jane Smith",
        "email": "jane@example.com",
        "phone": "(555) 123-4567",
        "fulfillment": "pickup",
        "payment": "on-pickup",
        "items": [
            { "id": "nuts-8oz", "quantity": 2 },
            { "id": "gift-basket", "quantity": 1 }
        ],
        "notes": "See you Saturday"
    })
}

/// A valid contact form submission.
#[must_use]
pub fn sample_contact() -> Value {
    serde_json::json!({
        "name": "Sam Rivera",
        "email": "sam@example.com",
        "subject": "Wholesale inquiry",
        "message": "Do you sell to coffee shops in Lansing?"
    })
}
