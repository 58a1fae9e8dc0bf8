//! Email composition and SMTP delivery.
//!
//! A [`ContactEmail`] is composed from an already-sanitized submission; the
//! [`Mailer`] trait delivers it. [`SmtpMailer`] speaks implicit TLS to the
//! configured relay with an explicit session timeout. When no mail
//! credentials are configured, [`dispatch`] short-circuits to
//! [`DeliveryOutcome::AcceptedNoCredentials`] so preview environments can
//! run without secrets.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, warn};

use passportal_core::sanitize::{SanitizedSubmission, html_escape};

use crate::config::MailConfig;

/// Errors from email delivery.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Smtp(String),
}

/// A composed contact email, ready to hand to a [`Mailer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactEmail {
    pub subject: String,
    /// The submitter's (sanitized) address, set as Reply-To.
    pub reply_to: String,
    pub html_body: String,
}

impl ContactEmail {
    /// Compose the notification email for a sanitized submission.
    ///
    /// Field values arrive already HTML-escaped; the only transformation
    /// here is newline-to-`<br>` in the message, which happens at render
    /// time rather than in storage. The footer carries the receipt time
    /// and source address for audit purposes.
    #[must_use]
    pub fn compose(
        submission: &SanitizedSubmission,
        received_at: DateTime<Utc>,
        client_ip: &str,
    ) -> Self {
        let company = submission.company.as_deref().unwrap_or("Not provided");
        let interest = submission
            .interest
            .map_or("Not specified", |i| i.as_str());
        let message = submission.message.replace('\n', "<br>\n");

        let html_body = format!(
            "<h2>{label}</h2>\n\
             <p><strong>Name:</strong> {name}</p>\n\
             <p><strong>Email:</strong> {email}</p>\n\
             <p><strong>Company:</strong> {company}</p>\n\
             <p><strong>Area of Interest:</strong> {interest}</p>\n\
             <p><strong>Message:</strong></p>\n\
             <p>{message}</p>\n\
             <hr>\n\
             <p><small>Received {received} from {ip}</small></p>\n",
            label = submission.kind.label(),
            name = submission.name,
            email = submission.email,
            received = received_at.to_rfc3339(),
            ip = html_escape(client_ip),
        );

        Self {
            subject: submission.kind.subject().to_owned(),
            reply_to: submission.email.clone(),
            html_body,
        }
    }
}

/// Result of a delivery attempt. All states are terminal; there is no
/// retry — a failed delivery requires the client to resubmit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The relay accepted the message.
    Sent,
    /// No mail credentials are configured; the submission was acknowledged
    /// without sending.
    AcceptedNoCredentials,
    /// The send failed. Nothing is stored; resubmission is safe.
    DeliveryFailed(String),
}

/// Attempt delivery through the configured mailer, if any.
pub async fn dispatch(mailer: Option<&Arc<dyn Mailer>>, email: &ContactEmail) -> DeliveryOutcome {
    let Some(mailer) = mailer else {
        debug!("mail credentials not configured, acknowledging without delivery");
        return DeliveryOutcome::AcceptedNoCredentials;
    };

    match mailer.send(email).await {
        Ok(()) => DeliveryOutcome::Sent,
        Err(e) => DeliveryOutcome::DeliveryFailed(e.to_string()),
    }
}

/// Async email delivery.
///
/// Implement this to provide alternative backends; tests use a recording
/// mailer.
#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    /// Deliver a composed contact email.
    async fn send(&self, email: &ContactEmail) -> Result<(), MailError>;
}

/// SMTP delivery over an implicit-TLS relay session.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    mailbox: Mailbox,
    preflight: bool,
}

impl SmtpMailer {
    /// Build a mailer from configuration. The account address is both
    /// sender and recipient; the submitter lands in Reply-To.
    ///
    /// # Errors
    ///
    /// [`MailError::InvalidAddress`] if the account address does not parse;
    /// [`MailError::Smtp`] if the relay parameters are rejected.
    pub fn from_config(config: &MailConfig) -> Result<Self, MailError> {
        let mailbox: Mailbox = config
            .account
            .parse()
            .map_err(|_| MailError::InvalidAddress(config.account.clone()))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| MailError::Smtp(e.to_string()))?
            .port(config.smtp_port)
            .timeout(Some(Duration::from_secs(config.smtp_timeout_secs)))
            .credentials(Credentials::new(
                config.account.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self {
            transport,
            mailbox,
            preflight: true,
        })
    }

    /// Disable the connection preflight.
    #[must_use]
    pub fn without_preflight(mut self) -> Self {
        self.preflight = false;
        self
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &ContactEmail) -> Result<(), MailError> {
        // Preflight connection check. A failure is logged but does not
        // abort the send: relays reject probe sessions yet still accept
        // mail on the real session.
        if self.preflight {
            if let Err(e) = self.transport.test_connection().await {
                warn!(error = %e, "SMTP preflight failed, attempting send anyway");
            }
        }

        let reply_to: Mailbox = email
            .reply_to
            .parse()
            .map_err(|_| MailError::InvalidAddress(email.reply_to.clone()))?;

        let message = Message::builder()
            .from(self.mailbox.clone())
            .to(self.mailbox.clone())
            .reply_to(reply_to)
            .subject(&email.subject)
            .header(ContentType::TEXT_HTML)
            .body(email.html_body.clone())
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Smtp(e.to_string()))?;

        debug!("contact email accepted by relay");
        Ok(())
    }
}
