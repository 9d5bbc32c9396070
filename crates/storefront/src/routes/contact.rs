//! Contact form route.

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::instrument;

use crate::error::Result;
use crate::extract::ApiJson;
use crate::services::contact::{self, ContactRequest};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub success: bool,
    pub message: String,
}

/// Forward a contact form submission to the business inbox.
///
/// POST /api/contact
///
/// # Errors
///
/// Returns 400 for malformed or invalid input, 500 when the business inbox
/// is not configured, 502 when the message cannot be delivered.
#[instrument(skip_all)]
pub async fn submit(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ContactRequest>,
) -> Result<Json<ContactResponse>> {
    let message = request.validate()?;
    contact::send_message(state.mailer(), &message).await?;

    let first_name = message.name.split_whitespace().next().unwrap_or(&message.name);
    Ok(Json(ContactResponse {
        success: true,
        message: format!("Thanks, {first_name}! We got your message and will get back to you soon."),
    }))
}
