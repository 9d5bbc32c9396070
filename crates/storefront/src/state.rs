//! Application state shared across handlers.

use std::sync::Arc;

use nut_barn_core::{Catalog, StaticCatalog};

use crate::config::StorefrontConfig;
use crate::middleware::RateLimiter;
use crate::services::content::{ContentError, ContentGateway};
use crate::services::mail::{MailError, Mailer};

/// Error building application state from configuration.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("mail setup failed: {0}")]
    Mail(#[from] MailError),
    #[error("content client setup failed: {0}")]
    Content(#[from] ContentError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// catalog, mail dispatch, content gateway and the per-endpoint limiters.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: Arc<dyn Catalog>,
    mailer: Mailer,
    content: ContentGateway,
    order_limiter: Arc<RateLimiter>,
    contact_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Create application state from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay or the content HTTP client cannot
    /// be set up.
    pub fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let mailer = Mailer::from_config(&config.mail)?;
        Self::with_mailer(config, mailer)
    }

    /// Create application state with an explicit mailer.
    ///
    /// # Errors
    ///
    /// Returns an error if the content HTTP client cannot be set up.
    pub fn with_mailer(config: StorefrontConfig, mailer: Mailer) -> Result<Self, StateError> {
        let content = ContentGateway::new(config.wordpress_api_url.clone())?;
        let order_limiter = Arc::new(RateLimiter::new(&config.rate_limit));
        let contact_limiter = Arc::new(RateLimiter::new(&config.rate_limit));

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog: Arc::new(StaticCatalog),
                mailer,
                content,
                order_limiter,
                contact_limiter,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// The authoritative price table.
    #[must_use]
    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.inner.catalog
    }

    #[must_use]
    pub fn mailer(&self) -> &Mailer {
        &self.inner.mailer
    }

    #[must_use]
    pub fn content(&self) -> &ContentGateway {
        &self.inner.content
    }

    /// Limiter guarding `POST /api/orders`.
    #[must_use]
    pub fn order_limiter(&self) -> &Arc<RateLimiter> {
        &self.inner.order_limiter
    }

    /// Limiter guarding `POST /api/contact`.
    #[must_use]
    pub fn contact_limiter(&self) -> &Arc<RateLimiter> {
        &self.inner.contact_limiter
    }
}
