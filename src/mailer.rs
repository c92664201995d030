use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use thiserror::Error;

use crate::config::SmtpConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("SMTP is not configured")]
    NotConfigured,

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("failed to build email: {0}")]
    Build(String),

    #[error("failed to send email: {0}")]
    Transport(String),
}

/// Outbound email collaborator. Delivery is fire-and-forget from the domain's
/// perspective: callers record the outcome on the notification row and never
/// roll back on failure.
#[derive(Clone)]
pub struct Mailer {
    smtp: Option<SmtpConfig>,
}

impl Mailer {
    pub fn new(smtp: Option<SmtpConfig>) -> Self {
        Self { smtp }
    }

    fn build_transport(config: &SmtpConfig) -> Result<SmtpTransport, MailError> {
        let credentials =
            Credentials::new(config.username.clone(), config.password.clone());
        let transport = SmtpTransport::relay(&config.server)
            .map_err(|e| MailError::Transport(format!("SMTP relay error: {e}")))?
            .port(config.port)
            .credentials(credentials)
            .build();
        Ok(transport)
    }

    pub async fn send(&self, to: &str, subject: &str, body: String) -> Result<(), MailError> {
        let config = self.smtp.as_ref().ok_or(MailError::NotConfigured)?;

        let from = format!("{} <{}>", config.from_name, config.from_email);
        let email = Message::builder()
            .from(
                from.parse()
                    .map_err(|e| MailError::InvalidAddress(format!("from: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| MailError::InvalidAddress(format!("to: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| MailError::Build(e.to_string()))?;

        let transport = Self::build_transport(config)?;

        // lettre's SmtpTransport is blocking; keep it off the runtime workers.
        tokio::task::spawn_blocking(move || {
            transport
                .send(&email)
                .map(|_| ())
                .map_err(|e| MailError::Transport(e.to_string()))
        })
        .await
        .map_err(|e| MailError::Transport(format!("email task failed: {e}")))?
    }
}
