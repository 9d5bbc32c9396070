//! Request extractors that report failures as [`AppError`].

use axum::extract::FromRequest;
use axum::response::{IntoResponse, Response};

use crate::error::AppError;

/// `axum::Json` whose rejection is the storefront's JSON error body.
///
/// Unparsable bodies and structurally wrong fields become
/// [`AppError::Malformed`] instead of axum's plain-text rejection.
#[derive(Debug, Clone, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

impl<T: serde::Serialize> IntoResponse for ApiJson<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}
