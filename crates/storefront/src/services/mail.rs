//! Outbound mail.
//!
//! [`Mailer`] is what the order and contact services talk to. It holds an
//! optional [`MailTransport`]: with one configured, messages are delivered;
//! without one, they are logged and reported as [`Delivery::Logged`] so the
//! storefront stays usable in development. Callers only ever branch on that
//! outcome, never on which transport is behind it.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use nut_barn_core::Email;
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::{MailConfig, SmtpConfig};

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum MailError {
    /// A transport is configured but there is no business inbox to send to.
    #[error("no business recipient configured (set CONTACT_EMAIL)")]
    MissingRecipient,

    /// A mailbox could not be parsed.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// The transport refused the message.
    #[error("Message rejected: {0}")]
    Rejected(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Subject and bodies of a message, before addressing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContent {
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

/// A fully addressed message handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    /// Sender mailbox, may include a display name
    pub from: String,
    pub to: Email,
    pub reply_to: Option<Email>,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

/// What happened to a dispatched message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Accepted by the transport.
    Sent,
    /// No transport configured; the message was written to the log.
    Logged,
}

/// Something that can deliver an [`OutgoingEmail`].
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver one message.
    ///
    /// # Errors
    ///
    /// Returns a [`MailError`] if the message cannot be built or the provider
    /// rejects it.
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;
}

// =============================================================================
// SMTP
// =============================================================================

/// SMTP relay transport over STARTTLS.
#[derive(Clone)]
pub struct SmtpTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpTransport {
    /// Create a transport from SMTP configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the relay hostname is unusable for TLS.
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self { mailer })
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let mut builder = Message::builder()
            .from(parse_mailbox(&email.from)?)
            .to(parse_mailbox(email.to.as_str())?)
            .subject(email.subject.as_str());
        if let Some(reply_to) = &email.reply_to {
            builder = builder.reply_to(parse_mailbox(reply_to.as_str())?);
        }

        let message = builder.multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(email.text_body.clone()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(email.html_body.clone()),
                ),
        )?;

        self.mailer.send(message).await?;
        Ok(())
    }
}

fn parse_mailbox(raw: &str) -> Result<Mailbox, MailError> {
    raw.parse()
        .map_err(|_| MailError::InvalidAddress(raw.to_string()))
}

// =============================================================================
// Recording
// =============================================================================

/// Transport that keeps every message in memory.
///
/// Used by tests and local runs that want to inspect mail. Clones share the
/// same outbox. It can be told to reject everything or only messages to
/// particular recipients.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    state: Arc<Mutex<RecordingState>>,
}

#[derive(Debug, Default)]
struct RecordingState {
    sent: Vec<OutgoingEmail>,
    fail_all: bool,
    failing: Vec<String>,
}

impl RecordingTransport {
    /// Create an empty outbox that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every subsequent message.
    pub fn fail_all(&self) {
        self.state().fail_all = true;
    }

    /// Reject subsequent messages addressed to `recipient`.
    pub fn fail_for(&self, recipient: &str) {
        self.state().failing.push(recipient.to_ascii_lowercase());
    }

    /// Messages accepted so far, oldest first.
    #[must_use]
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.state().sent.clone()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let mut state = self.state();
        let recipient = email.to.as_str().to_ascii_lowercase();
        if state.fail_all || state.failing.contains(&recipient) {
            return Err(MailError::Rejected(format!("recipient {recipient} refused")));
        }
        state.sent.push(email.clone());
        Ok(())
    }
}

// =============================================================================
// Mailer
// =============================================================================

/// Addresses and dispatches storefront mail.
#[derive(Clone)]
pub struct Mailer {
    transport: Option<Arc<dyn MailTransport>>,
    from: String,
    business: Option<Email>,
}

impl Mailer {
    /// Create a mailer.
    ///
    /// `transport: None` logs every message instead of sending it.
    #[must_use]
    pub fn new(
        transport: Option<Arc<dyn MailTransport>>,
        from: impl Into<String>,
        business: Option<Email>,
    ) -> Self {
        Self {
            transport,
            from: from.into(),
            business,
        }
    }

    /// Build a mailer from configuration, using SMTP when it is set up.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be set up or, with SMTP set up,
    /// the sender mailbox does not parse.
    pub fn from_config(config: &MailConfig) -> Result<Self, MailError> {
        let transport = match &config.smtp {
            Some(smtp) => {
                parse_mailbox(&config.from)?;
                let transport: Arc<dyn MailTransport> = Arc::new(SmtpTransport::new(smtp)?);
                Some(transport)
            }
            None => None,
        };
        Ok(Self::new(
            transport,
            config.from.clone(),
            config.contact_email.clone(),
        ))
    }

    /// Whether messages are actually delivered.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    /// The business inbox, if one is configured.
    #[must_use]
    pub const fn business_address(&self) -> Option<&Email> {
        self.business.as_ref()
    }

    /// Fail early when mail would be sent but has nowhere to go.
    ///
    /// # Errors
    ///
    /// Returns [`MailError::MissingRecipient`] if a transport is configured
    /// without a business inbox.
    pub fn ensure_business_recipient(&self) -> Result<(), MailError> {
        if self.is_configured() && self.business.is_none() {
            tracing::error!("Mail transport configured but CONTACT_EMAIL is not set");
            return Err(MailError::MissingRecipient);
        }
        Ok(())
    }

    /// Send a message to the business inbox.
    ///
    /// # Errors
    ///
    /// Returns error if the business inbox is missing or delivery fails.
    pub async fn send_to_business(
        &self,
        reply_to: Option<&Email>,
        content: MessageContent,
    ) -> Result<Delivery, MailError> {
        self.ensure_business_recipient()?;
        self.dispatch(self.business.as_ref(), reply_to, content)
            .await
    }

    /// Send a message to a customer.
    ///
    /// # Errors
    ///
    /// Returns error if delivery fails.
    pub async fn send_to(
        &self,
        to: &Email,
        reply_to: Option<&Email>,
        content: MessageContent,
    ) -> Result<Delivery, MailError> {
        self.dispatch(Some(to), reply_to, content).await
    }

    async fn dispatch(
        &self,
        to: Option<&Email>,
        reply_to: Option<&Email>,
        content: MessageContent,
    ) -> Result<Delivery, MailError> {
        let subject = single_line(&content.subject);

        let Some(transport) = &self.transport else {
            tracing::info!(
                to = to.map_or("<unset>", Email::as_str),
                subject = %subject,
                body = %content.text_body,
                "Mail transport not configured, logging message instead of sending"
            );
            return Ok(Delivery::Logged);
        };
        let to = to.ok_or(MailError::MissingRecipient)?;

        let email = OutgoingEmail {
            from: self.from.clone(),
            to: to.clone(),
            reply_to: reply_to.cloned(),
            subject,
            text_body: content.text_body,
            html_body: content.html_body,
        };
        transport.send(&email).await?;

        tracing::info!(to = %email.to, subject = %email.subject, "Email sent successfully");
        Ok(Delivery::Sent)
    }
}

impl std::fmt::Debug for Mailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailer")
            .field("configured", &self.is_configured())
            .field("from", &self.from)
            .field("business", &self.business)
            .finish()
    }
}

/// Collapse a header value onto one line.
#[must_use]
pub fn single_line(value: &str) -> String {
    value
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
