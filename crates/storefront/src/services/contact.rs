//! Contact form messages.

use askama::Template;
use nut_barn_core::Email;
use serde::Deserialize;
use tracing::instrument;

use crate::services::mail::{Delivery, MailError, Mailer, MessageContent};
use crate::services::validation::{ValidationErrors, Validator};

/// Contact form as submitted.
#[derive(Debug, Default, Deserialize)]
pub struct ContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

/// A contact message that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactMessage {
    pub name: String,
    pub email: Email,
    pub subject: String,
    pub body: String,
}

impl ContactRequest {
    /// Check every field, collecting all violations.
    ///
    /// # Errors
    ///
    /// Returns the full list of field violations if any check fails.
    pub fn validate(self) -> Result<ContactMessage, ValidationErrors> {
        let mut v = Validator::new();
        let name = v.text("name", self.name.as_deref(), 2, 100);
        let email = v.email("email", self.email.as_deref());
        let subject = v.text("subject", self.subject.as_deref(), 2, 200);
        let body = v.text("message", self.message.as_deref(), 10, 2000);
        v.finish()?;

        match (name, email, subject, body) {
            (Some(name), Some(email), Some(subject), Some(body)) => Ok(ContactMessage {
                name,
                email,
                subject,
                body,
            }),
            // Every None above recorded a violation, so finish() already returned
            _ => Err(ValidationErrors::default()),
        }
    }
}

#[derive(Template)]
#[template(path = "email/contact_message.html")]
struct ContactMessageHtml<'a> {
    message: &'a ContactMessage,
}

#[derive(Template)]
#[template(path = "email/contact_message.txt")]
struct ContactMessageText<'a> {
    message: &'a ContactMessage,
}

/// Render the email the business receives.
///
/// # Errors
///
/// Returns error if a template fails to render.
pub fn render(message: &ContactMessage) -> Result<MessageContent, MailError> {
    Ok(MessageContent {
        subject: format!("[The Nut Barn] {}", message.subject),
        text_body: ContactMessageText { message }.render()?,
        html_body: ContactMessageHtml { message }.render()?,
    })
}

/// Forward a contact message to the business inbox.
///
/// Replies go straight back to the sender.
///
/// # Errors
///
/// Returns error if the business inbox is missing or delivery fails.
#[instrument(skip_all)]
pub async fn send_message(mailer: &Mailer, message: &ContactMessage) -> Result<Delivery, MailError> {
    let content = render(message)?;
    let delivery = mailer
        .send_to_business(Some(&message.email), content)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Failed to send contact message"))?;
    tracing::info!(?delivery, "Contact message accepted");
    Ok(delivery)
}
