//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, AppError>`, and every error leaves as the same JSON shape:
//! `{"success": false, "message": "...", "errors": [{"field", "message"}]}`.

use std::time::Duration;

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use nut_barn_core::ProductId;
use serde::Serialize;
use thiserror::Error;

use crate::BUSINESS_PHONE;
use crate::services::mail::MailError;
use crate::services::orders::OrderError;
use crate::services::validation::{FieldError, ValidationErrors};

/// Message returned with every 429.
pub const RATE_LIMIT_MESSAGE: &str = "Too many requests. Please wait a moment and try again.";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Body or query string could not be read into the expected shape.
    #[error("Malformed request: {0}")]
    Malformed(String),

    /// One or more fields failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// An order line named a product that is not in the catalog.
    #[error("Unknown product: {0}")]
    UnknownProduct(ProductId),

    /// Too many submissions from one source address.
    #[error("Rate limited")]
    RateLimited { retry_after: Duration },

    /// The server is missing configuration it needs for this request.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Mail was accepted for sending but could not be delivered.
    #[error("Delivery failed: {0}")]
    Delivery(MailError),

    /// Endpoint exists but the feature is not available yet.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a [FieldError]>,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Malformed(_) | Self::Validation(_) | Self::UnknownProduct(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Configuration(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Delivery(_) => StatusCode::BAD_GATEWAY,
            Self::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Text shown to the client. Server-side details stay in the logs.
    fn client_message(&self) -> String {
        match self {
            Self::Malformed(detail) => format!("Invalid request: {detail}"),
            Self::Validation(_) => "Please correct the highlighted fields.".to_string(),
            Self::UnknownProduct(id) => format!("Unknown product: {id}"),
            Self::RateLimited { .. } => RATE_LIMIT_MESSAGE.to_string(),
            Self::Configuration(_) => "Server configuration error".to_string(),
            Self::Delivery(_) => format!(
                "We couldn't send that just now. Please call us at {BUSINESS_PHONE} \
                 or email us directly."
            ),
            Self::NotImplemented(message) => message.clone(),
            Self::NotFound(what) => format!("Not found: {what}"),
            Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(
            self,
            Self::Configuration(_) | Self::Delivery(_) | Self::Internal(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();
        let body = ErrorBody {
            success: false,
            message: self.client_message(),
            errors: match &self {
                Self::Validation(errors) => Some(errors.fields()),
                _ => None,
            },
        };
        let mut response = (status, Json(body)).into_response();

        if let Self::RateLimited { retry_after } = self {
            let seconds = retry_after.as_secs_f64().ceil().max(1.0);
            if let Ok(value) = HeaderValue::from_str(&format!("{seconds:.0}")) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }

        response
    }
}

impl From<MailError> for AppError {
    fn from(err: MailError) -> Self {
        match err {
            MailError::MissingRecipient => Self::Configuration(err.to_string()),
            MailError::Template(_) | MailError::MessageBuild(_) | MailError::InvalidAddress(_) => {
                Self::Internal(err.to_string())
            }
            MailError::Smtp(_) | MailError::Rejected(_) => Self::Delivery(err),
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::UnknownProduct(id) => Self::UnknownProduct(id),
            OrderError::Mail(mail) => mail.into(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Malformed(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Malformed(rejection.body_text())
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session: {err}"))
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::UnknownProduct(ProductId::new("acorns"));
        assert_eq!(err.to_string(), "Unknown product: acorns");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::Malformed("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Validation(ValidationErrors::default())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::RateLimited {
                retry_after: Duration::from_secs(30)
            }),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Configuration("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Delivery(MailError::Rejected("test".to_string()))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::NotImplemented("test".to_string())),
            StatusCode::NOT_IMPLEMENTED
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_validation_body_lists_fields() {
        let mut errors = ValidationErrors::default();
        errors.push("name", "is required");
        errors.push("items[0].quantity", "must be between 1 and 99");

        let json = body_json(AppError::Validation(errors).into_response()).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["errors"][0]["field"], "name");
        assert_eq!(json["errors"][1]["field"], "items[0].quantity");
    }

    #[tokio::test]
    async fn test_internal_details_not_exposed() {
        let json = body_json(AppError::Internal("db password wrong".to_string()).into_response())
            .await;
        assert_eq!(json["message"], "Internal server error");
        assert!(json.get("errors").is_none());

        let json = body_json(AppError::Configuration("CONTACT_EMAIL".to_string()).into_response())
            .await;
        assert_eq!(json["message"], "Server configuration error");
    }

    #[tokio::test]
    async fn test_delivery_message_offers_phone() {
        let response = AppError::Delivery(MailError::Rejected("550".to_string())).into_response();
        let json = body_json(response).await;
        assert!(json["message"].as_str().unwrap().contains("(517) 410-9029"));
        assert!(!json["message"].as_str().unwrap().contains("550"));
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let response = AppError::RateLimited {
            retry_after: Duration::from_millis(12_300),
        }
        .into_response();
        assert_eq!(response.headers()[RETRY_AFTER], "13");

        let response = AppError::RateLimited {
            retry_after: Duration::ZERO,
        }
        .into_response();
        assert_eq!(response.headers()[RETRY_AFTER], "1");
    }

    #[test]
    fn test_mail_error_mapping() {
        assert!(matches!(
            AppError::from(MailError::MissingRecipient),
            AppError::Configuration(_)
        ));
        assert!(matches!(
            AppError::from(MailError::Rejected("x".to_string())),
            AppError::Delivery(_)
        ));
        assert!(matches!(
            AppError::from(OrderError::UnknownProduct(ProductId::new("x"))),
            AppError::UnknownProduct(_)
        ));
    }
}
