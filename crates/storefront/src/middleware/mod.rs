//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request spans)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers (CSP, framing, caching)
//! 5. Session layer (tower-sessions over a bounded moka cache)
//! 6. Rate limiting (per route, orders and contact only)

pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use rate_limit::{Admission, RateLimiter, source_key};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{CacheSessionStore, create_session_layer};
